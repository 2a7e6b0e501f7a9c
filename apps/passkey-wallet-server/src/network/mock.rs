// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local development network.
//!
//! Answers every call after an artificial delay with deterministic values:
//! accounts sit at sequence 1000, submissions are accepted as `PENDING`
//! and every lookup reports `SUCCESS`.

use std::time::Duration;

use tracing::debug;

use super::{
    AccountState, NetworkClient, NetworkError, SendResult, SendStatus, SimulationResult,
    TransactionResult, TransactionStatus,
};
use crate::encoding::sha256;
use crate::transaction::Envelope;

pub const MOCK_SEQUENCE: i64 = 1000;
pub const MOCK_LEDGER: u32 = 100;

#[derive(Debug, Clone)]
pub struct MockNetwork {
    latency: Duration,
}

impl MockNetwork {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Hash the mock assigns to an envelope.
    pub fn hash_of(envelope: &Envelope) -> String {
        hex::encode(sha256(envelope.as_str().as_bytes()))
    }
}

impl NetworkClient for MockNetwork {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, NetworkError> {
        debug!(account = public_key, "mock getLedgerEntries");
        self.delay().await;
        Ok(AccountState {
            account_id: public_key.to_string(),
            sequence: MOCK_SEQUENCE,
        })
    }

    async fn prepare_transaction(&self, envelope: &Envelope) -> Result<Envelope, NetworkError> {
        debug!("mock prepareTransaction");
        self.delay().await;
        Ok(envelope.clone())
    }

    async fn simulate_transaction(
        &self,
        _envelope: &Envelope,
    ) -> Result<SimulationResult, NetworkError> {
        debug!("mock simulateTransaction");
        self.delay().await;
        Ok(SimulationResult {
            latest_ledger: MOCK_LEDGER,
            ..SimulationResult::default()
        })
    }

    async fn send_transaction(&self, envelope: &Envelope) -> Result<SendResult, NetworkError> {
        let hash = Self::hash_of(envelope);
        debug!(tx_hash = %hash, "mock sendTransaction");
        self.delay().await;
        Ok(SendResult {
            status: SendStatus::Pending,
            hash,
            error: None,
        })
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionResult, NetworkError> {
        debug!(tx_hash = hash, "mock getTransaction");
        self.delay().await;
        Ok(TransactionResult {
            status: TransactionStatus::Success,
            ledger: Some(MOCK_LEDGER),
            result: None,
        })
    }
}
