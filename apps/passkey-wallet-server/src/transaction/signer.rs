// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing capabilities used by the submission pipeline.
//!
//! The pipeline only ever sees a 32-byte payload going in and a
//! [`SignatureEntry`] coming out. Passkey private keys stay on the device;
//! the admin key is an Ed25519 seed held in memory.

use std::future::Future;

use p256::ecdsa::Signature;
use ring::signature::{Ed25519KeyPair, KeyPair};
use tokio_util::sync::CancellationToken;

use super::envelope::SignatureEntry;
use crate::ceremony::{CeremonyCoordinator, CeremonyError, PlatformAuthenticator};
use crate::challenge::Challenge;
use crate::encoding::{account_strkey, b64url_decode};

/// What a signer's signatures authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScope {
    /// The transaction itself, as its source account.
    SourceAccount,
    /// Every authorization entry naming this contract.
    Contract([u8; 32]),
}

pub trait TransactionSigner: Send + Sync {
    fn scope(&self) -> SignatureScope;

    /// Sign a payload. Passkey signers suspend until the device answers,
    /// the ceremony times out or `cancel` fires.
    fn sign(
        &self,
        payload: &[u8; 32],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<SignatureEntry, CeremonyError>> + Send;
}

#[derive(Debug, thiserror::Error)]
#[error("invalid admin seed: {0}")]
pub struct InvalidSeed(String);

/// Service account that pays for and authorizes wallet deployments.
pub struct AdminSigner {
    key_pair: Ed25519KeyPair,
    public_key: [u8; 32],
    account: String,
}

impl AdminSigner {
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, InvalidSeed> {
        let key_pair =
            Ed25519KeyPair::from_seed_unchecked(seed).map_err(|e| InvalidSeed(e.to_string()))?;
        let public_key: [u8; 32] = key_pair
            .public_key()
            .as_ref()
            .try_into()
            .map_err(|_| InvalidSeed("unexpected public key length".into()))?;

        Ok(Self {
            key_pair,
            public_key,
            account: account_strkey(public_key),
        })
    }

    /// `G…` account id.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn sign_payload(&self, payload: &[u8; 32]) -> SignatureEntry {
        SignatureEntry::Ed25519 {
            public_key: self.public_key,
            signature: self.key_pair.sign(payload).as_ref().to_vec(),
        }
    }
}

impl std::fmt::Debug for AdminSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSigner")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for AdminSigner {
    fn scope(&self) -> SignatureScope {
        SignatureScope::SourceAccount
    }

    async fn sign(
        &self,
        payload: &[u8; 32],
        _cancel: &CancellationToken,
    ) -> Result<SignatureEntry, CeremonyError> {
        Ok(self.sign_payload(payload))
    }
}

/// Signs a wallet contract's authorization entries by running an
/// authentication ceremony whose challenge is the entry payload,
/// restricted to one credential.
pub struct PasskeySigner<'a, A> {
    coordinator: &'a CeremonyCoordinator,
    authenticator: &'a A,
    key_id: String,
    contract: [u8; 32],
}

impl<'a, A: PlatformAuthenticator> PasskeySigner<'a, A> {
    pub fn new(
        coordinator: &'a CeremonyCoordinator,
        authenticator: &'a A,
        key_id: impl Into<String>,
        contract: [u8; 32],
    ) -> Self {
        Self {
            coordinator,
            authenticator,
            key_id: key_id.into(),
            contract,
        }
    }
}

impl<A: PlatformAuthenticator> TransactionSigner for PasskeySigner<'_, A> {
    fn scope(&self) -> SignatureScope {
        SignatureScope::Contract(self.contract)
    }

    async fn sign(
        &self,
        payload: &[u8; 32],
        cancel: &CancellationToken,
    ) -> Result<SignatureEntry, CeremonyError> {
        let options = self
            .coordinator
            .begin_authentication(Challenge::from_bytes(*payload))
            .allow_only(&self.key_id);
        let credential = self
            .coordinator
            .authenticate(self.authenticator, &options, cancel)
            .await?;
        let proof = credential
            .assertion()
            .ok_or_else(|| CeremonyError::invalid("signing ceremony produced no assertion"))?;

        // The wallet contract verifies compact, low-S signatures.
        let signature = Signature::from_der(&proof.signature)
            .map_err(|_| CeremonyError::invalid("assertion signature is not DER"))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        let key_id = b64url_decode(credential.id())
            .map_err(|_| CeremonyError::invalid("credential id is not base64url"))?;

        Ok(SignatureEntry::Passkey {
            key_id,
            authenticator_data: proof.authenticator_data.clone(),
            client_data_json: proof.client_data_json.clone(),
            signature: signature.to_bytes().to_vec(),
        })
    }
}
