// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::ceremony::{BridgeError, CeremonyError, CeremonyFailure};
use crate::challenge::RandomSourceUnavailable;
use crate::config::ConfigurationError;
use crate::network::NetworkError;
use crate::storage::RegistryError;
use crate::transaction::{SubmissionError, TransactionError};

/// Every failure the wallet core reports. Each kind is distinct so callers
/// can tell "cancelled" from "network unreachable" from "already exists".
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("no wallet registered for credential {0}")]
    WalletNotFound(String),

    #[error("credential {0} already has a wallet")]
    DuplicateWallet(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("transaction {hash} not final after {attempts} status checks")]
    Timeout { hash: String, attempts: u32 },

    #[error("wallet registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    RandomSource(#[from] RandomSourceUnavailable),
}

impl WalletError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::Ceremony(_) => "ceremony",
            WalletError::Configuration(_) => "configuration",
            WalletError::WalletNotFound(_) => "wallet_not_found",
            WalletError::DuplicateWallet(_) => "duplicate_wallet",
            WalletError::Network(_) => "network",
            WalletError::Transaction(_) => "transaction",
            WalletError::Timeout { .. } => "timeout",
            WalletError::Registry(_) => "registry",
            WalletError::RandomSource(_) => "random_source",
        }
    }
}

impl From<SubmissionError> for WalletError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Ceremony(e) => WalletError::Ceremony(e),
            SubmissionError::Network(e) => WalletError::Network(e),
            SubmissionError::Transaction(e) => WalletError::Transaction(e),
            SubmissionError::Timeout { hash, attempts } => WalletError::Timeout { hash, attempts },
        }
    }
}

impl From<RegistryError> for WalletError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::AlreadyRegistered(id) => WalletError::DuplicateWallet(id),
            other => WalletError::Registry(other.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        let status = match &e {
            WalletError::Ceremony(c) if c.reason == CeremonyFailure::TimedOut => {
                StatusCode::REQUEST_TIMEOUT
            }
            WalletError::Ceremony(_) => StatusCode::BAD_REQUEST,
            WalletError::WalletNotFound(_) => StatusCode::NOT_FOUND,
            WalletError::DuplicateWallet(_) => StatusCode::CONFLICT,
            WalletError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            WalletError::Transaction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WalletError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            WalletError::Configuration(_)
            | WalletError::Registry(_)
            | WalletError::RandomSource(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(kind = e.kind(), error = %e, "request failed");
        }
        Self::new(status, e.to_string())
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::UnknownCeremony(_) => Self::not_found(e.to_string()),
            BridgeError::Abandoned(_) => Self::internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
