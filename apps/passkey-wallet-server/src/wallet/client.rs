// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller-facing wallet client.
//!
//! [`PasskeyWallet`] runs real ceremonies against a platform authenticator;
//! [`MockWallet`] fabricates deterministic values after an artificial
//! delay. Both implement [`WalletClient`] with identical signatures and
//! response shapes, so callers can swap one for the other.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{WalletInfo, WalletServices};
use crate::ceremony::PlatformAuthenticator;
use crate::encoding::{b64url_encode, contract_strkey, sha256};
use crate::error::WalletError;
use crate::network::NetworkClient;
use crate::transaction::{Envelope, SignatureEntry, TransactionDraft, TransactionError};

pub trait WalletClient: Send + Sync {
    /// Register a passkey for `username` and deploy its wallet.
    fn create_wallet(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<WalletInfo, WalletError>> + Send;

    /// Sign in with an existing passkey.
    fn connect_wallet(&self) -> impl Future<Output = Result<WalletInfo, WalletError>> + Send;

    /// Sign an unsigned envelope with passkey `key_id`.
    fn sign(
        &self,
        envelope: &Envelope,
        key_id: &str,
    ) -> impl Future<Output = Result<Envelope, WalletError>> + Send;
}

/// Wallet client backed by real ceremonies.
pub struct PasskeyWallet<N, A> {
    services: Arc<WalletServices<N>>,
    authenticator: A,
    cancel: CancellationToken,
}

impl<N, A> PasskeyWallet<N, A> {
    pub fn new(services: Arc<WalletServices<N>>, authenticator: A) -> Self {
        Self {
            services,
            authenticator,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancels any ceremony this client is running.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<N: NetworkClient, A: PlatformAuthenticator> WalletClient for PasskeyWallet<N, A> {
    async fn create_wallet(&self, username: &str) -> Result<WalletInfo, WalletError> {
        let options = self.services.begin_registration(username)?;
        self.services
            .complete_registration(&self.authenticator, &options, &self.cancel)
            .await
    }

    async fn connect_wallet(&self) -> Result<WalletInfo, WalletError> {
        let options = self.services.begin_authentication()?;
        self.services
            .complete_authentication(&self.authenticator, &options, &self.cancel)
            .await
    }

    async fn sign(&self, envelope: &Envelope, key_id: &str) -> Result<Envelope, WalletError> {
        self.services
            .sign(&self.authenticator, envelope.clone(), key_id, &self.cancel)
            .await
    }
}

const MOCK_USERNAME: &str = "demo";

/// Development wallet client with fabricated values.
pub struct MockWallet {
    latency: Duration,
    last: Mutex<Option<WalletInfo>>,
}

impl MockWallet {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            last: Mutex::new(None),
        }
    }

    /// Deterministic wallet for a username.
    pub fn wallet_for(username: &str) -> WalletInfo {
        let contract_address = contract_strkey(sha256(format!("mock wallet:{username}").as_bytes()));
        let key_id = b64url_encode(&sha256(contract_address.as_bytes())[..16]);
        WalletInfo {
            key_id,
            contract_address,
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn remember(&self, info: &WalletInfo) {
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = Some(info.clone());
    }
}

impl WalletClient for MockWallet {
    async fn create_wallet(&self, username: &str) -> Result<WalletInfo, WalletError> {
        debug!(username, "mock createWallet");
        self.delay().await;
        let info = Self::wallet_for(username);
        self.remember(&info);
        Ok(info)
    }

    async fn connect_wallet(&self) -> Result<WalletInfo, WalletError> {
        debug!("mock connectWallet");
        self.delay().await;
        let last = self.last.lock().unwrap_or_else(|p| p.into_inner()).clone();
        Ok(last.unwrap_or_else(|| Self::wallet_for(MOCK_USERNAME)))
    }

    async fn sign(&self, envelope: &Envelope, key_id: &str) -> Result<Envelope, WalletError> {
        debug!(key_id, "mock sign");
        self.delay().await;

        // Envelopes that do not decode pass through unchanged.
        let Ok(mut draft) = TransactionDraft::from_envelope(envelope) else {
            return Ok(envelope.clone());
        };
        let digest = sha256(envelope.as_str().as_bytes());
        let mut signature = digest.to_vec();
        signature.extend_from_slice(&sha256(key_id.as_bytes()));
        draft
            .add_signature(&SignatureEntry::Ed25519 {
                public_key: sha256(key_id.as_bytes()),
                signature,
            })
            .and_then(|()| draft.to_envelope())
            .map_err(|e| TransactionError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{account_strkey, is_contract_address};

    #[tokio::test]
    async fn mock_values_are_deterministic() {
        let wallet = MockWallet::new(Duration::ZERO);
        let first = wallet.create_wallet("alice").await.unwrap();
        let second = MockWallet::new(Duration::ZERO)
            .create_wallet("alice")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(is_contract_address(&first.contract_address));
        assert_ne!(first, MockWallet::wallet_for("bob"));
    }

    #[tokio::test]
    async fn connect_returns_last_created_wallet() {
        let wallet = MockWallet::new(Duration::ZERO);
        assert_eq!(
            wallet.connect_wallet().await.unwrap(),
            MockWallet::wallet_for(MOCK_USERNAME)
        );
        let created = wallet.create_wallet("carol").await.unwrap();
        assert_eq!(wallet.connect_wallet().await.unwrap(), created);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_sign_appends_a_signature() {
        let wallet = MockWallet::new(Duration::from_millis(1000));
        let envelope = TransactionDraft::new(&account_strkey([1u8; 32]), 1001, &[])
            .unwrap()
            .to_envelope()
            .unwrap();

        let signed = wallet.sign(&envelope, "key-1").await.unwrap();
        let draft = TransactionDraft::from_envelope(&signed).unwrap();
        assert_eq!(draft.signatures().len(), 1);

        let opaque = Envelope::new("not xdr");
        assert_eq!(wallet.sign(&opaque, "key-1").await.unwrap(), opaque);
    }
}
