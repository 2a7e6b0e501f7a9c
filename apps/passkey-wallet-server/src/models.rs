// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::ceremony::{
    AuthenticationOptions, AuthenticationResponse, CeremonyFailure, RegistrationOptions,
    RegistrationResponse,
};
use crate::storage::WalletSigner;
use crate::transaction::TxStatus;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterBeginRequest {
    /// Name shown by the authenticator
    pub username: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStarted {
    pub ceremony_id: Uuid,
    /// Pass to `navigator.credentials.create({ publicKey: options })`
    pub options: RegistrationOptions,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationStarted {
    pub ceremony_id: Uuid,
    /// Pass to `navigator.credentials.get({ publicKey: options })`
    pub options: AuthenticationOptions,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFinishRequest {
    pub ceremony_id: Uuid,
    pub credential: RegistrationResponse,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginFinishRequest {
    pub ceremony_id: Uuid,
    pub credential: AuthenticationResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyCancelled {
    pub ceremony_id: Uuid,
    /// How the ceremony ended, normally `cancelled`
    pub reason: Option<CeremonyFailure>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionRequest {
    /// Signed transaction envelope
    pub transaction_envelope: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionResponse {
    pub transaction_hash: String,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WalletLookupQuery {
    /// base64url credential id
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletLookupResponse {
    pub contract_address: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignersRequest {
    pub contract_address: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignersResponse {
    pub signers: Vec<WalletSigner>,
}
