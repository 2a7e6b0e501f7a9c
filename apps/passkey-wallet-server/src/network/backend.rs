// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The network backend selected once at startup.

use std::time::Duration;

use tracing::info;

use super::{
    AccountState, MockNetwork, NetworkClient, NetworkError, RpcClient, SendResult,
    SimulationResult, TransactionResult,
};
use crate::config::Selection;
use crate::transaction::Envelope;

/// Real RPC or local mock. Never re-selected while the process runs.
pub enum Backend {
    Real(RpcClient),
    Mock(MockNetwork),
}

impl Backend {
    /// Instantiate the backend for a startup selection.
    pub fn connect(selection: &Selection, mock_latency: Duration) -> Result<Self, NetworkError> {
        match selection {
            Selection::Real(config) => {
                let client = RpcClient::new(config.endpoint.clone())?;
                info!(endpoint = %client.endpoint(), "using Soroban RPC backend");
                Ok(Backend::Real(client))
            }
            Selection::Mock(_) => {
                let mock = MockNetwork::new(mock_latency);
                info!(latency_ms = mock.latency().as_millis() as u64, "using mock network backend");
                Ok(Backend::Mock(mock))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Real(_) => "real",
            Backend::Mock(_) => "mock",
        }
    }
}

impl NetworkClient for Backend {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, NetworkError> {
        match self {
            Backend::Real(client) => client.get_account(public_key).await,
            Backend::Mock(mock) => mock.get_account(public_key).await,
        }
    }

    async fn prepare_transaction(&self, envelope: &Envelope) -> Result<Envelope, NetworkError> {
        match self {
            Backend::Real(client) => client.prepare_transaction(envelope).await,
            Backend::Mock(mock) => mock.prepare_transaction(envelope).await,
        }
    }

    async fn simulate_transaction(
        &self,
        envelope: &Envelope,
    ) -> Result<SimulationResult, NetworkError> {
        match self {
            Backend::Real(client) => client.simulate_transaction(envelope).await,
            Backend::Mock(mock) => mock.simulate_transaction(envelope).await,
        }
    }

    async fn send_transaction(&self, envelope: &Envelope) -> Result<SendResult, NetworkError> {
        match self {
            Backend::Real(client) => client.send_transaction(envelope).await,
            Backend::Mock(mock) => mock.send_transaction(envelope).await,
        }
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionResult, NetworkError> {
        match self {
            Backend::Real(client) => client.get_transaction(hash).await,
            Backend::Mock(mock) => mock.get_transaction(hash).await,
        }
    }
}
