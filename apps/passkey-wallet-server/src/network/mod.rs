// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network access.
//!
//! [`NetworkClient`] is the whole RPC surface the service consumes. It is
//! implemented by the JSON-RPC [`RpcClient`], by [`MockNetwork`] for local
//! development, and by [`Backend`], the variant chosen once at startup.

mod backend;
mod mock;
mod rpc;

use std::future::Future;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::transaction::Envelope;

pub use backend::Backend;
pub use mock::MockNetwork;
pub use rpc::RpcClient;

/// On-chain state of a source account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    /// Current sequence number; the next transaction uses `sequence + 1`
    pub sequence: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulationResult {
    pub min_resource_fee: u64,
    /// base64 `SorobanTransactionData`
    pub transaction_data: Option<String>,
    /// base64 `SorobanAuthorizationEntry` values the call requires
    pub auth: Vec<String>,
    pub latest_ledger: u32,
    /// Set when the network refused the transaction
    pub error: Option<String>,
}

/// Immediate answer to `sendTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub status: SendStatus,
    pub hash: String,
    pub error: Option<String>,
}

/// Status reported by `getTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    NotFound,
    Success,
    Failed,
    Error,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    /// Only `SUCCESS`, `FAILED` and `ERROR` end polling.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Success | TransactionStatus::Failed | TransactionStatus::Error
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub ledger: Option<u32>,
    /// Opaque result payload for terminal transactions
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
    #[error("network busy, try again later")]
    Busy,
    #[error("network rejected transaction: {0}")]
    Rejected(String),
    #[error("account {0} does not exist on the network")]
    AccountNotFound(String),
}

/// The network RPC operations the service depends on.
pub trait NetworkClient: Send + Sync {
    fn get_account(
        &self,
        public_key: &str,
    ) -> impl Future<Output = Result<AccountState, NetworkError>> + Send;

    /// Simulate and attach resource fees. Fails with
    /// [`NetworkError::Rejected`] when simulation reports an error.
    fn prepare_transaction(
        &self,
        envelope: &Envelope,
    ) -> impl Future<Output = Result<Envelope, NetworkError>> + Send;

    fn simulate_transaction(
        &self,
        envelope: &Envelope,
    ) -> impl Future<Output = Result<SimulationResult, NetworkError>> + Send;

    fn send_transaction(
        &self,
        envelope: &Envelope,
    ) -> impl Future<Output = Result<SendResult, NetworkError>> + Send;

    fn get_transaction(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<TransactionResult, NetworkError>> + Send;
}
