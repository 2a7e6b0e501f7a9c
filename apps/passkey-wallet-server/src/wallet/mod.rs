// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet orchestration.
//!
//! [`WalletServices`] wires the ceremony coordinator, the resolver and the
//! submission pipeline to one network backend:
//!
//! ```text
//! register: challenge -> ceremony -> verify -> deploy -> record
//! login:    challenge -> ceremony -> verify -> lookup (never deploys)
//! sign:     auth entry payload -> assertion -> signed envelope
//! submit:   signed envelope -> send -> poll to finality
//! ```

pub mod client;
pub mod locks;
pub mod resolver;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use utoipa::ToSchema;

use crate::ceremony::{
    AuthenticationOptions, CeremonyCoordinator, PlatformAuthenticator, RegistrationOptions,
    RelyingPartyConfig,
};
use crate::challenge::ChallengeGenerator;
use crate::config::{ChainParams, ConfigIssue, ConfigurationError, ADMIN_SECRET_SEED_ENV};
use crate::encoding::parse_contract_strkey;
use crate::error::WalletError;
use crate::network::NetworkClient;
use crate::storage::{WalletRecord, WalletRegistry, WalletSigner};
use crate::transaction::{
    AdminSigner, Envelope, PasskeySigner, PendingTransaction, PollPolicy, SubmissionPipeline,
    TxOutcome,
};

pub use client::{MockWallet, PasskeyWallet, WalletClient};
pub use locks::ResolutionLocks;
pub use resolver::{derive_contract_address, wallet_salt, DeployParams, WalletResolver};

/// A credential and the wallet it controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// base64url credential id
    pub key_id: String,
    /// `C…` contract strkey
    pub contract_address: String,
}

/// Settings that shape ceremonies and polling.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub relying_party: RelyingPartyConfig,
    pub ceremony_timeout: Duration,
    pub poll: PollPolicy,
}

pub struct WalletServices<N> {
    challenges: ChallengeGenerator,
    coordinator: CeremonyCoordinator,
    resolver: WalletResolver<N>,
    admin: AdminSigner,
    network: Arc<N>,
    chain: ChainParams,
    poll: PollPolicy,
}

impl<N: NetworkClient> WalletServices<N> {
    pub fn new(
        network: Arc<N>,
        registry: Arc<dyn WalletRegistry>,
        chain: ChainParams,
        settings: ServiceSettings,
    ) -> Result<Self, WalletError> {
        let admin = AdminSigner::from_seed(&chain.admin_seed).map_err(|e| {
            ConfigurationError {
                issues: vec![ConfigIssue::Invalid {
                    var: ADMIN_SECRET_SEED_ENV,
                    reason: e.to_string(),
                }],
            }
        })?;
        let resolver = WalletResolver::new(
            network.clone(),
            registry,
            DeployParams {
                network_passphrase: chain.network_passphrase.clone(),
                wallet_wasm_hash: chain.wallet_wasm_hash,
                factory_address: chain.factory_address.clone(),
                poll: settings.poll,
            },
        );
        info!(admin = %admin.account(), factory = %chain.factory_address, "wallet services ready");

        Ok(Self {
            challenges: ChallengeGenerator::new(),
            coordinator: CeremonyCoordinator::new(settings.relying_party, settings.ceremony_timeout),
            resolver,
            admin,
            network,
            chain,
            poll: settings.poll,
        })
    }

    pub fn coordinator(&self) -> &CeremonyCoordinator {
        &self.coordinator
    }

    pub fn resolver(&self) -> &WalletResolver<N> {
        &self.resolver
    }

    pub fn chain(&self) -> &ChainParams {
        &self.chain
    }

    fn pipeline(&self) -> SubmissionPipeline<'_, N> {
        SubmissionPipeline::new(self.network.as_ref(), &self.chain.network_passphrase, self.poll)
    }

    /// Options for a new passkey, bound to a fresh challenge.
    pub fn begin_registration(&self, username: &str) -> Result<RegistrationOptions, WalletError> {
        let challenge = self.challenges.generate()?;
        Ok(self.coordinator.begin_registration(username, challenge))
    }

    /// Options for signing in with an existing passkey.
    pub fn begin_authentication(&self) -> Result<AuthenticationOptions, WalletError> {
        let challenge = self.challenges.generate()?;
        Ok(self.coordinator.begin_authentication(challenge))
    }

    /// Run the registration ceremony, then deploy the credential's wallet.
    pub async fn complete_registration<A: PlatformAuthenticator>(
        &self,
        authenticator: &A,
        options: &RegistrationOptions,
        cancel: &CancellationToken,
    ) -> Result<WalletInfo, WalletError> {
        let credential = self
            .coordinator
            .register(authenticator, options, cancel)
            .await?;
        let contract_address = self.resolver.deploy(&self.admin, &credential).await?;

        Ok(WalletInfo {
            key_id: credential.id().to_string(),
            contract_address,
        })
    }

    /// Run the authentication ceremony and resolve the existing wallet.
    pub async fn complete_authentication<A: PlatformAuthenticator>(
        &self,
        authenticator: &A,
        options: &AuthenticationOptions,
        cancel: &CancellationToken,
    ) -> Result<WalletInfo, WalletError> {
        let credential = self
            .coordinator
            .authenticate(authenticator, options, cancel)
            .await?;
        let contract_address = self.resolver.lookup(&credential).await?;

        Ok(WalletInfo {
            key_id: credential.id().to_string(),
            contract_address,
        })
    }

    /// Sign the authorization entries of `key_id`'s wallet in an unsigned
    /// envelope.
    pub async fn sign<A: PlatformAuthenticator>(
        &self,
        authenticator: &A,
        envelope: Envelope,
        key_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Envelope, WalletError> {
        let record = self.resolver.record(key_id)?;
        let contract = parse_contract_strkey(&record.contract_address).ok_or_else(|| {
            WalletError::Registry(format!(
                "stored address {} is not a contract",
                record.contract_address
            ))
        })?;
        let signer = PasskeySigner::new(&self.coordinator, authenticator, key_id, contract);
        let mut tx = PendingTransaction::from_unsigned(envelope);
        self.pipeline().sign(&mut tx, &signer, cancel).await?;
        Ok(tx.envelope().clone())
    }

    /// Submit a signed envelope and wait for a successful outcome.
    pub async fn submit_envelope(&self, envelope: Envelope) -> Result<TxOutcome, WalletError> {
        Ok(self
            .pipeline()
            .submit_envelope(envelope)
            .await?
            .into_success()?)
    }

    pub fn lookup_by_id(&self, credential_id: &str) -> Result<WalletRecord, WalletError> {
        self.resolver.record(credential_id)
    }

    pub fn signers(&self, contract_address: &str) -> Result<Vec<WalletSigner>, WalletError> {
        self.resolver.signers(contract_address)
    }
}
