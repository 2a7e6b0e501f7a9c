// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential → contract wallet resolution.
//!
//! - `deploy` runs once per credential: it derives the wallet address,
//!   creates the wallet contract with the passkey as its sole signer,
//!   registers it with the factory, waits for finality of both
//!   transactions, then records the mapping locally.
//! - `lookup` only reads. Login never deploys.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::locks::ResolutionLocks;
use crate::ceremony::verify::verify_assertion_signature;
use crate::ceremony::{CeremonyError, Credential, PasskeyPublicKey};
use crate::encoding::{contract_strkey, sha256};
use crate::error::WalletError;
use crate::network::NetworkClient;
use crate::storage::{WalletRecord, WalletRegistry, WalletSigner};
use crate::transaction::{
    contract_id, network_id, AdminSigner, EnvelopeError, Operation, PollPolicy, ScArg,
    SubmissionPipeline, TransactionError, TxOutcome,
};

/// Name of the factory entry point that records a wallet.
pub const REGISTER_FUNCTION: &str = "register_wallet";

/// Chain-side parameters for wallet deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployParams {
    pub network_passphrase: String,
    pub wallet_wasm_hash: [u8; 32],
    /// `C…` factory contract
    pub factory_address: String,
    pub poll: PollPolicy,
}

pub struct WalletResolver<N> {
    network: Arc<N>,
    registry: Arc<dyn WalletRegistry>,
    locks: ResolutionLocks,
    params: DeployParams,
}

/// Salt for a credential's wallet: `SHA-256(credentialId)`.
pub fn wallet_salt(credential_id: &str) -> [u8; 32] {
    sha256(credential_id.as_bytes())
}

/// Contract address `deployer` (an Ed25519 account key) produces for a
/// salt on a network.
pub fn derive_contract_address(
    passphrase: &str,
    deployer: &[u8; 32],
    salt: &[u8; 32],
) -> Result<String, EnvelopeError> {
    Ok(contract_strkey(contract_id(
        &network_id(passphrase),
        deployer,
        salt,
    )?))
}

impl<N: NetworkClient> WalletResolver<N> {
    pub fn new(network: Arc<N>, registry: Arc<dyn WalletRegistry>, params: DeployParams) -> Self {
        Self {
            network,
            registry,
            locks: ResolutionLocks::new(),
            params,
        }
    }

    /// Run one admin-signed transaction against the admin's current sequence.
    async fn run(&self, admin: &AdminSigner, operation: Operation) -> Result<TxOutcome, WalletError> {
        let account = self.network.get_account(admin.account()).await?;
        let pipeline = SubmissionPipeline::new(
            self.network.as_ref(),
            &self.params.network_passphrase,
            self.params.poll,
        );
        Ok(pipeline
            .execute(&account, vec![operation], admin, &CancellationToken::new())
            .await?
            .into_success()?)
    }

    /// Deploy the wallet for a freshly registered credential.
    pub async fn deploy(
        &self,
        admin: &AdminSigner,
        credential: &Credential,
    ) -> Result<String, WalletError> {
        let public_key = credential.public_key().ok_or_else(|| {
            CeremonyError::invalid("deploy requires a registration credential")
        })?;

        let _guard = self.locks.acquire(credential.id()).await;

        if let Some(existing) = self.registry.lookup(credential.id())? {
            warn!(
                credential_id = %credential.id(),
                contract_address = %existing.contract_address,
                "deploy refused: credential already has a wallet"
            );
            return Err(WalletError::DuplicateWallet(credential.id().to_string()));
        }

        let salt = wallet_salt(credential.id());
        let address =
            derive_contract_address(&self.params.network_passphrase, admin.public_key(), &salt)
                .map_err(TransactionError::from)?;
        info!(credential_id = %credential.id(), contract_address = %address, "deploying wallet");

        let key_arg = ScArg::Bytes(public_key.as_bytes().to_vec());
        let created = self
            .run(
                admin,
                Operation::CreateContract {
                    wasm_hash: self.params.wallet_wasm_hash,
                    salt,
                    constructor_args: vec![key_arg.clone()],
                },
            )
            .await?;
        info!(contract_address = %address, tx_hash = %created.hash, "wallet contract created");

        let registered = self
            .run(
                admin,
                Operation::InvokeContract {
                    contract: self.params.factory_address.clone(),
                    function: REGISTER_FUNCTION.to_string(),
                    args: vec![key_arg, ScArg::Address(address.clone())],
                },
            )
            .await
            .inspect_err(|e| {
                warn!(
                    contract_address = %address,
                    error = %e,
                    "wallet created but factory registration failed"
                )
            })?;

        self.registry.register(&WalletRecord {
            credential_id: credential.id().to_string(),
            contract_address: address.clone(),
            public_key: public_key.to_base64url(),
            created_at: Utc::now(),
            deploy_tx_hash: Some(created.hash),
        })?;

        info!(
            credential_id = %credential.id(),
            contract_address = %address,
            tx_hash = %registered.hash,
            "wallet registered"
        );
        Ok(address)
    }

    /// Resolve a verified credential to its wallet address.
    ///
    /// Assertions are checked against the key recorded at registration.
    pub async fn lookup(&self, credential: &Credential) -> Result<String, WalletError> {
        let record = self.record(credential.id())?;

        let stored = PasskeyPublicKey::from_base64url(&record.public_key).ok_or_else(|| {
            WalletError::Registry(format!(
                "stored key for {} is not a P-256 key",
                record.credential_id
            ))
        })?;
        match (credential.assertion(), credential.public_key()) {
            (Some(proof), _) => verify_assertion_signature(&stored, proof)?,
            (None, Some(key)) if *key != stored => {
                return Err(
                    CeremonyError::invalid("credential key does not match wallet signer").into(),
                );
            }
            _ => {}
        }

        Ok(record.contract_address)
    }

    /// Registry record for a credential id.
    pub fn record(&self, credential_id: &str) -> Result<WalletRecord, WalletError> {
        self.registry
            .lookup(credential_id)?
            .ok_or_else(|| WalletError::WalletNotFound(credential_id.to_string()))
    }

    pub fn signers(&self, contract_address: &str) -> Result<Vec<WalletSigner>, WalletError> {
        Ok(self.registry.signers(contract_address)?)
    }
}
