// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction submission pipeline.
//!
//! ```text
//! Built -> Signed -> Submitted -> Pending* -> Success | Failed
//! ```
//!
//! - `build` is local and never suspends.
//! - `sign` suspends on the signer. A failed or cancelled ceremony resets
//!   the transaction to `Built`; callers retry from `sign`.
//! - `submit` posts the envelope. An immediate `ERROR` moves straight to
//!   `Failed`.
//! - `poll` queries by hash at a fixed interval. `NOT_FOUND` and `PENDING`
//!   are transient; running out of attempts is a timeout, never `Failed`.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::envelope::{network_id, Envelope, EnvelopeError, Operation, TransactionDraft};
use super::signer::{SignatureScope, TransactionSigner};
use crate::ceremony::CeremonyError;
use crate::network::{AccountState, NetworkClient, NetworkError, SendStatus, TransactionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Built,
    Signed,
    Submitted,
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed)
    }
}

/// A transaction owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    envelope: Envelope,
    hash: Option<String>,
    status: TxStatus,
}

impl PendingTransaction {
    /// Wrap an unsigned envelope built elsewhere by this service.
    pub fn from_unsigned(envelope: Envelope) -> Self {
        Self {
            envelope,
            hash: None,
            status: TxStatus::Built,
        }
    }

    /// Wrap an envelope that was signed elsewhere.
    pub fn from_signed(envelope: Envelope) -> Self {
        Self {
            envelope,
            hash: None,
            status: TxStatus::Signed,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Assigned by the network on submission.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }
}

/// Terminal result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: String,
    pub status: TxStatus,
    pub ledger: Option<u32>,
    pub result: Option<String>,
}

impl TxOutcome {
    /// Turn a `Failed` outcome into an error.
    pub fn into_success(self) -> Result<TxOutcome, SubmissionError> {
        match self.status {
            TxStatus::Success => Ok(self),
            _ => Err(TransactionError::Failed {
                hash: self.hash,
                result: self.result,
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 30,
        }
    }
}

/// Build, simulate or submit rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("malformed envelope: {0}")]
    Malformed(String),
    #[error("transaction is {actual:?}, expected {expected:?}")]
    InvalidState { expected: TxStatus, actual: TxStatus },
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("transaction {hash} failed on chain")]
    Failed {
        hash: String,
        result: Option<String>,
    },
}

impl From<EnvelopeError> for TransactionError {
    fn from(e: EnvelopeError) -> Self {
        TransactionError::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error("transaction {hash} not final after {attempts} status checks")]
    Timeout { hash: String, attempts: u32 },
}

pub struct SubmissionPipeline<'a, N> {
    network: &'a N,
    network_id: [u8; 32],
    policy: PollPolicy,
}

impl<'a, N: NetworkClient> SubmissionPipeline<'a, N> {
    pub fn new(network: &'a N, passphrase: &str, policy: PollPolicy) -> Self {
        Self {
            network,
            network_id: network_id(passphrase),
            policy,
        }
    }

    fn expect(tx: &PendingTransaction, expected: TxStatus) -> Result<(), TransactionError> {
        if tx.status == expected {
            Ok(())
        } else {
            Err(TransactionError::InvalidState {
                expected,
                actual: tx.status,
            })
        }
    }

    /// Assemble operations against the account's current sequence.
    pub fn build(
        &self,
        account: &AccountState,
        operations: Vec<Operation>,
    ) -> Result<PendingTransaction, SubmissionError> {
        if operations.is_empty() {
            return Err(TransactionError::Malformed("no operations".into()).into());
        }
        let sequence = account.sequence.checked_add(1).ok_or_else(|| {
            TransactionError::Malformed(format!(
                "account {} sequence {} cannot advance",
                account.account_id, account.sequence
            ))
        })?;
        let draft = TransactionDraft::new(&account.account_id, sequence, &operations)
            .map_err(TransactionError::from)?;

        Ok(PendingTransaction {
            envelope: draft.to_envelope().map_err(TransactionError::from)?,
            hash: None,
            status: TxStatus::Built,
        })
    }

    /// Simulate and attach resource fees. Only valid before signing.
    pub async fn prepare(&self, tx: &mut PendingTransaction) -> Result<(), SubmissionError> {
        Self::expect(tx, TxStatus::Built)?;
        tx.envelope = self
            .network
            .prepare_transaction(&tx.envelope)
            .await
            .map_err(|e| match e {
                NetworkError::Rejected(reason) => {
                    SubmissionError::from(TransactionError::Rejected(reason))
                }
                other => other.into(),
            })?;
        Ok(())
    }

    pub async fn sign<S: TransactionSigner>(
        &self,
        tx: &mut PendingTransaction,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<(), SubmissionError> {
        Self::expect(tx, TxStatus::Built)?;
        let mut draft =
            TransactionDraft::from_envelope(&tx.envelope).map_err(TransactionError::from)?;

        match self.attach_signatures(&mut draft, signer, cancel).await {
            Ok(()) => {
                tx.envelope = draft.to_envelope().map_err(TransactionError::from)?;
                tx.status = TxStatus::Signed;
                Ok(())
            }
            Err(e) => {
                // The stored envelope never holds partial signatures.
                tx.status = TxStatus::Built;
                warn!(error = %e, "signing failed; transaction reset to built");
                Err(e)
            }
        }
    }

    async fn attach_signatures<S: TransactionSigner>(
        &self,
        draft: &mut TransactionDraft,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<(), SubmissionError> {
        match signer.scope() {
            SignatureScope::SourceAccount => {
                let payload = draft
                    .signature_payload(&self.network_id)
                    .map_err(TransactionError::from)?;
                let signature = signer.sign(&payload, cancel).await?;
                draft
                    .add_signature(&signature)
                    .map_err(TransactionError::from)?;
            }
            SignatureScope::Contract(contract) => {
                let slots = draft
                    .auth_payloads(&self.network_id, &contract)
                    .map_err(TransactionError::from)?;
                if slots.is_empty() {
                    return Err(TransactionError::Malformed(
                        "no authorization entries for the wallet contract".into(),
                    )
                    .into());
                }
                for slot in &slots {
                    let signature = signer.sign(&slot.payload, cancel).await?;
                    draft
                        .set_auth_signature(slot, &signature)
                        .map_err(TransactionError::from)?;
                }
            }
        }
        Ok(())
    }

    /// Post a signed envelope. Returns the network-assigned hash.
    pub async fn submit(&self, tx: &mut PendingTransaction) -> Result<String, SubmissionError> {
        Self::expect(tx, TxStatus::Signed)?;
        let sent = self.network.send_transaction(&tx.envelope).await?;

        match sent.status {
            SendStatus::Pending | SendStatus::Duplicate => {
                info!(tx_hash = %sent.hash, status = ?sent.status, "transaction submitted");
                tx.hash = Some(sent.hash.clone());
                tx.status = TxStatus::Submitted;
                Ok(sent.hash)
            }
            SendStatus::TryAgainLater => Err(NetworkError::Busy.into()),
            SendStatus::Error => {
                tx.hash = Some(sent.hash);
                tx.status = TxStatus::Failed;
                let reason = sent.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(reason = %reason, "transaction rejected on submission");
                Err(TransactionError::Rejected(reason).into())
            }
            SendStatus::Unknown => Err(NetworkError::InvalidResponse(
                "unrecognized sendTransaction status".into(),
            )
            .into()),
        }
    }

    /// Poll a submitted transaction to a terminal state.
    pub async fn poll(&self, mut tx: PendingTransaction) -> Result<TxOutcome, SubmissionError> {
        let hash = match (&tx.status, tx.hash.clone()) {
            (TxStatus::Submitted | TxStatus::Pending, Some(hash)) => hash,
            _ => {
                return Err(TransactionError::InvalidState {
                    expected: TxStatus::Submitted,
                    actual: tx.status,
                }
                .into())
            }
        };

        for attempt in 1..=self.policy.max_attempts {
            match self.network.get_transaction(&hash).await {
                Ok(result) if result.status.is_terminal() => {
                    tx.status = match result.status {
                        TransactionStatus::Success => TxStatus::Success,
                        _ => TxStatus::Failed,
                    };
                    info!(tx_hash = %hash, attempt, status = ?result.status, "transaction final");
                    return Ok(TxOutcome {
                        hash,
                        status: tx.status,
                        ledger: result.ledger,
                        result: result.result,
                    });
                }
                Ok(result) => {
                    tx.status = TxStatus::Pending;
                    debug!(tx_hash = %hash, attempt, status = ?result.status, "transaction not final yet");
                }
                Err(e) => {
                    warn!(tx_hash = %hash, attempt, error = %e, "status check failed");
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!(tx_hash = %hash, attempts = self.policy.max_attempts, "transaction polling timed out");
        Err(SubmissionError::Timeout {
            hash,
            attempts: self.policy.max_attempts,
        })
    }

    /// Build, prepare, sign, submit and poll.
    pub async fn execute<S: TransactionSigner>(
        &self,
        account: &AccountState,
        operations: Vec<Operation>,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<TxOutcome, SubmissionError> {
        let mut tx = self.build(account, operations)?;
        self.prepare(&mut tx).await?;
        self.sign(&mut tx, signer, cancel).await?;
        self.submit(&mut tx).await?;
        self.poll(tx).await
    }

    /// Submit and poll an envelope signed by the caller.
    pub async fn submit_envelope(&self, envelope: Envelope) -> Result<TxOutcome, SubmissionError> {
        if envelope.is_empty() {
            return Err(TransactionError::Malformed("empty envelope".into()).into());
        }
        let mut tx = PendingTransaction::from_signed(envelope);
        self.submit(&mut tx).await?;
        self.poll(tx).await
    }
}
