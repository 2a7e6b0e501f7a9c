// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ceremony failure type.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Why a ceremony did not produce a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyFailure {
    /// The user dismissed the authenticator prompt
    Cancelled,
    /// The ceremony timeout elapsed
    TimedOut,
    /// No suitable authenticator, or an unsupported key type
    Unsupported,
    /// The authenticator response failed verification
    InvalidResponse,
}

impl fmt::Display for CeremonyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CeremonyFailure::Cancelled => "cancelled",
            CeremonyFailure::TimedOut => "timed_out",
            CeremonyFailure::Unsupported => "unsupported",
            CeremonyFailure::InvalidResponse => "invalid_response",
        };
        f.write_str(code)
    }
}

/// A registration or authentication ceremony failed. Never retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ceremony failed ({reason}): {detail}")]
pub struct CeremonyError {
    pub reason: CeremonyFailure,
    pub detail: String,
}

impl CeremonyError {
    pub fn new(reason: CeremonyFailure, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self::new(CeremonyFailure::Cancelled, detail)
    }

    pub fn timed_out(detail: impl Into<String>) -> Self {
        Self::new(CeremonyFailure::TimedOut, detail)
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::new(CeremonyFailure::Unsupported, detail)
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::new(CeremonyFailure::InvalidResponse, detail)
    }
}
