// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The platform authenticator seam and its HTTP bridge.
//!
//! The authenticator lives in the user's browser, so a ceremony spans two
//! requests: `begin` returns options and parks a task waiting on a
//! [`BridgedAuthenticator`]; `finish` (or `cancel`) hands the browser's
//! answer to that task through the [`CeremonyBridge`] and waits for the
//! task's outcome.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::credential::{AuthenticationResponse, CeremonyResponse, RegistrationResponse};
use super::error::CeremonyError;
use super::options::{AuthenticationOptions, RegistrationOptions};

/// Host platform ceremony API.
///
/// Both calls suspend until the user completes or dismisses the prompt.
pub trait PlatformAuthenticator: Send + Sync {
    fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> impl Future<Output = Result<RegistrationResponse, CeremonyError>> + Send;

    fn get_assertion(
        &self,
        options: &AuthenticationOptions,
    ) -> impl Future<Output = Result<AuthenticationResponse, CeremonyError>> + Send;
}

type ResponseSlot = Result<CeremonyResponse, CeremonyError>;

/// Errors from the bridge itself (not from the ceremony).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("unknown or already completed ceremony {0}")]
    UnknownCeremony(Uuid),
    #[error("ceremony {0} ended without an outcome")]
    Abandoned(Uuid),
}

/// Authenticator whose response arrives later through the bridge.
///
/// Answers exactly one ceremony call.
pub struct BridgedAuthenticator {
    response: Mutex<Option<oneshot::Receiver<ResponseSlot>>>,
}

impl BridgedAuthenticator {
    fn take(&self) -> Option<oneshot::Receiver<ResponseSlot>> {
        self.response
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn wait(receiver: Option<oneshot::Receiver<ResponseSlot>>) -> ResponseSlot {
        match receiver {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(CeremonyError::cancelled("ceremony abandoned"))),
            None => Err(CeremonyError::invalid("ceremony response already consumed")),
        }
    }
}

impl PlatformAuthenticator for BridgedAuthenticator {
    fn create_credential(
        &self,
        _options: &RegistrationOptions,
    ) -> impl Future<Output = Result<RegistrationResponse, CeremonyError>> + Send {
        let receiver = self.take();
        async move {
            match Self::wait(receiver).await? {
                CeremonyResponse::Registration(response) => Ok(response),
                CeremonyResponse::Authentication(_) => Err(CeremonyError::invalid(
                    "expected a registration response",
                )),
            }
        }
    }

    fn get_assertion(
        &self,
        _options: &AuthenticationOptions,
    ) -> impl Future<Output = Result<AuthenticationResponse, CeremonyError>> + Send {
        let receiver = self.take();
        async move {
            match Self::wait(receiver).await? {
                CeremonyResponse::Authentication(response) => Ok(response),
                CeremonyResponse::Registration(_) => Err(CeremonyError::invalid(
                    "expected an authentication response",
                )),
            }
        }
    }
}

/// Handed to the task that drives one ceremony.
pub struct CeremonyTicket<O> {
    pub id: Uuid,
    pub authenticator: BridgedAuthenticator,
    /// The task reports its final outcome here.
    pub outcome: oneshot::Sender<O>,
}

struct Waiter<O> {
    response: oneshot::Sender<ResponseSlot>,
    outcome: oneshot::Receiver<O>,
}

/// Pending ceremonies keyed by ceremony id.
pub struct CeremonyBridge<O> {
    pending: Mutex<HashMap<Uuid, Waiter<O>>>,
}

impl<O: Send + 'static> Default for CeremonyBridge<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Send + 'static> CeremonyBridge<O> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Waiter<O>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Park a new ceremony.
    pub fn open(&self) -> CeremonyTicket<O> {
        let id = Uuid::new_v4();
        let (response_tx, response_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        self.lock().insert(
            id,
            Waiter {
                response: response_tx,
                outcome: outcome_rx,
            },
        );
        debug!(ceremony_id = %id, "ceremony opened");

        CeremonyTicket {
            id,
            authenticator: BridgedAuthenticator {
                response: Mutex::new(Some(response_rx)),
            },
            outcome: outcome_tx,
        }
    }

    /// Deliver the browser's response and wait for the ceremony outcome.
    pub async fn finish(&self, id: Uuid, response: CeremonyResponse) -> Result<O, BridgeError> {
        self.deliver(id, Ok(response)).await
    }

    /// Deliver a user cancellation and wait for the ceremony outcome.
    pub async fn cancel(&self, id: Uuid) -> Result<O, BridgeError> {
        self.deliver(id, Err(CeremonyError::cancelled("cancelled by user")))
            .await
    }

    async fn deliver(&self, id: Uuid, slot: ResponseSlot) -> Result<O, BridgeError> {
        // Removing the waiter makes every ceremony id single-use.
        let waiter = self
            .lock()
            .remove(&id)
            .ok_or(BridgeError::UnknownCeremony(id))?;

        // The task may already have finished (timed out); its outcome is
        // still waiting in the channel.
        let _ = waiter.response.send(slot);
        waiter.outcome.await.map_err(|_| BridgeError::Abandoned(id))
    }

    /// Forget a ceremony whose task has ended.
    pub fn close(&self, id: Uuid) {
        if self.lock().remove(&id).is_some() {
            debug!(ceremony_id = %id, "ceremony closed without a response");
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}
