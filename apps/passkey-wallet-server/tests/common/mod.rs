// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures: a scripted network, a software passkey and a
//! throwaway registry.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ciborium::Value;
use p256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};
use serde_json::json;

use passkey_wallet_server::ceremony::{
    AuthenticationOptions, AuthenticationResponse, CeremonyError, PlatformAuthenticator,
    RegistrationOptions, RegistrationResponse, RelyingPartyConfig,
};
use passkey_wallet_server::ceremony::credential::{AssertionPayload, AttestationPayload};
use passkey_wallet_server::config::ChainParams;
use passkey_wallet_server::encoding::{b64url_encode, sha256};
use passkey_wallet_server::network::{
    AccountState, MockNetwork, NetworkClient, NetworkError, SendResult, SendStatus,
    SimulationResult, TransactionResult, TransactionStatus,
};
use passkey_wallet_server::storage::{RedbWalletRegistry, WalletRegistry};
use passkey_wallet_server::transaction::{Envelope, PollPolicy};
use passkey_wallet_server::wallet::{ServiceSettings, WalletServices};

pub const RP_ID: &str = "wallet.test";
pub const RP_ORIGIN: &str = "https://wallet.test";

pub fn relying_party() -> RelyingPartyConfig {
    RelyingPartyConfig {
        name: "Stellar Passkey Wallet".into(),
        id: RP_ID.into(),
        origin: RP_ORIGIN.into(),
    }
}

pub fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts,
    }
}

pub fn settings(poll: PollPolicy) -> ServiceSettings {
    ServiceSettings {
        relying_party: relying_party(),
        ceremony_timeout: Duration::from_secs(5),
        poll,
    }
}

pub fn temp_registry() -> (tempfile::TempDir, Arc<dyn WalletRegistry>) {
    let dir = tempfile::tempdir().unwrap();
    let registry = RedbWalletRegistry::open(&dir.path().join("wallets.redb")).unwrap();
    (dir, Arc::new(registry))
}

pub fn services(
    network: Arc<ScriptedNetwork>,
    registry: Arc<dyn WalletRegistry>,
) -> WalletServices<ScriptedNetwork> {
    WalletServices::new(network, registry, ChainParams::mock(), settings(fast_poll(5))).unwrap()
}

/// Network double with scripted send and status answers.
///
/// Status answers are consumed in order; the last one repeats.
pub struct ScriptedNetwork {
    send_status: Mutex<SendStatus>,
    statuses: Mutex<VecDeque<TransactionStatus>>,
    unreachable: Mutex<bool>,
    status_failures: AtomicUsize,
    send_delay: Duration,
    pub sends: AtomicUsize,
    pub status_checks: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new(statuses: &[TransactionStatus]) -> Self {
        Self {
            send_status: Mutex::new(SendStatus::Pending),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            unreachable: Mutex::new(false),
            status_failures: AtomicUsize::new(0),
            send_delay: Duration::ZERO,
            sends: AtomicUsize::new(0),
            status_checks: AtomicUsize::new(0),
        }
    }

    /// Every transaction succeeds on the first status check.
    pub fn succeeding() -> Self {
        Self::new(&[TransactionStatus::Success])
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn answer_send_with(&self, status: SendStatus) {
        *self.send_status.lock().unwrap() = status;
    }

    pub fn go_offline(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    /// The next `count` status checks fail with a transport error.
    pub fn drop_status_checks(&self, count: usize) {
        self.status_failures.store(count, Ordering::SeqCst);
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }

    fn reachable(&self) -> Result<(), NetworkError> {
        if *self.unreachable.lock().unwrap() {
            Err(NetworkError::Unreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl NetworkClient for ScriptedNetwork {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, NetworkError> {
        self.reachable()?;
        Ok(AccountState {
            account_id: public_key.to_string(),
            sequence: 41,
        })
    }

    async fn prepare_transaction(&self, envelope: &Envelope) -> Result<Envelope, NetworkError> {
        self.reachable()?;
        Ok(envelope.clone())
    }

    async fn simulate_transaction(
        &self,
        _envelope: &Envelope,
    ) -> Result<SimulationResult, NetworkError> {
        self.reachable()?;
        Ok(SimulationResult::default())
    }

    async fn send_transaction(&self, envelope: &Envelope) -> Result<SendResult, NetworkError> {
        self.reachable()?;
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        let status = *self.send_status.lock().unwrap();
        Ok(SendResult {
            status,
            hash: MockNetwork::hash_of(envelope),
            error: (status == SendStatus::Error).then(|| "txBadSeq".to_string()),
        })
    }

    async fn get_transaction(&self, _hash: &str) -> Result<TransactionResult, NetworkError> {
        self.reachable()?;
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        let dropped = self
            .status_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(NetworkError::Unreachable("connection reset".into()));
        }
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().copied().unwrap_or(TransactionStatus::NotFound)
            }
        };
        Ok(TransactionResult {
            status,
            ledger: status.is_terminal().then_some(512),
            result: None,
        })
    }
}

/// How the software authenticator answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Approve,
    Dismiss,
}

/// A P-256 passkey held in memory. Produces `none` attestations and real
/// assertion signatures.
pub struct SoftwarePasskey {
    key: SigningKey,
    credential_id: Vec<u8>,
    prompt: Prompt,
    counter: AtomicU32,
}

impl SoftwarePasskey {
    pub fn new(seed: u8, credential_id: &[u8]) -> Self {
        Self {
            key: SigningKey::from_slice(&[seed; 32]).unwrap(),
            credential_id: credential_id.to_vec(),
            prompt: Prompt::Approve,
            counter: AtomicU32::new(0),
        }
    }

    pub fn dismissing(mut self) -> Self {
        self.prompt = Prompt::Dismiss;
        self
    }

    pub fn credential_id(&self) -> String {
        b64url_encode(&self.credential_id)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }

    fn next_count(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn client_data(kind: &str, challenge: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": kind,
            "challenge": challenge,
            "origin": RP_ORIGIN,
            "crossOrigin": false
        }))
        .unwrap()
    }

    fn auth_data(&self, rp_id: &str, flags: u8) -> Vec<u8> {
        let mut data = sha256(rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&self.next_count().to_be_bytes());
        data
    }

    fn cose_key(&self) -> Vec<u8> {
        let point = self.key.verifying_key().to_encoded_point(false);
        let value = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-7).into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (
                Value::Integer((-2).into()),
                Value::Bytes(point.x().unwrap().to_vec()),
            ),
            (
                Value::Integer((-3).into()),
                Value::Bytes(point.y().unwrap().to_vec()),
            ),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&value, &mut out).unwrap();
        out
    }

    pub fn registration(&self, options: &RegistrationOptions) -> RegistrationResponse {
        // UP | UV | AT
        let mut auth_data = self.auth_data(&options.rp.id, 0x45);
        auth_data.extend_from_slice(&[0u8; 16]);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_key());

        let attestation = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(Vec::new())),
            (Value::Text("authData".into()), Value::Bytes(auth_data)),
        ]);
        let mut attestation_object = Vec::new();
        ciborium::ser::into_writer(&attestation, &mut attestation_object).unwrap();

        RegistrationResponse {
            id: self.credential_id(),
            raw_id: self.credential_id(),
            response: AttestationPayload {
                client_data_json: b64url_encode(&Self::client_data(
                    "webauthn.create",
                    &options.challenge,
                )),
                attestation_object: b64url_encode(&attestation_object),
                transports: vec!["internal".into()],
            },
            kind: "public-key".into(),
        }
    }

    pub fn assertion(&self, options: &AuthenticationOptions) -> AuthenticationResponse {
        // UP | UV
        let authenticator_data = self.auth_data(&options.rp_id, 0x05);
        let client_data_json = Self::client_data("webauthn.get", &options.challenge);

        let mut message = authenticator_data.clone();
        message.extend_from_slice(&sha256(&client_data_json));
        let signature: Signature = self.key.sign(&message);

        AuthenticationResponse {
            id: self.credential_id(),
            raw_id: self.credential_id(),
            response: AssertionPayload {
                client_data_json: b64url_encode(&client_data_json),
                authenticator_data: b64url_encode(&authenticator_data),
                signature: b64url_encode(signature.to_der().as_bytes()),
                user_handle: None,
            },
            kind: "public-key".into(),
        }
    }
}

impl PlatformAuthenticator for SoftwarePasskey {
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, CeremonyError> {
        match self.prompt {
            Prompt::Approve => Ok(self.registration(options)),
            Prompt::Dismiss => Err(CeremonyError::cancelled("user dismissed the prompt")),
        }
    }

    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationResponse, CeremonyError> {
        match self.prompt {
            Prompt::Approve => Ok(self.assertion(options)),
            Prompt::Dismiss => Err(CeremonyError::cancelled("user dismissed the prompt")),
        }
    }
}

