// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    encoding::is_contract_address,
    error::ApiError,
    models::{SignersRequest, SignersResponse, WalletLookupQuery, WalletLookupResponse},
    state::AppState,
};

/// Resolve a credential id to its wallet.
#[utoipa::path(
    get,
    path = "/v1/wallet",
    tag = "Wallet",
    params(WalletLookupQuery),
    responses(
        (status = 200, description = "Wallet found", body = WalletLookupResponse),
        (status = 400, description = "Missing credentialId"),
        (status = 404, description = "No wallet for credential")
    )
)]
pub async fn lookup_wallet(
    State(state): State<AppState>,
    Query(query): Query<WalletLookupQuery>,
) -> Result<Json<WalletLookupResponse>, ApiError> {
    let credential_id = query
        .credential_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("credentialId is required"))?;

    let record = state.services.lookup_by_id(&credential_id)?;
    Ok(Json(WalletLookupResponse {
        contract_address: record.contract_address,
    }))
}

/// List the signers registered on a wallet contract.
#[utoipa::path(
    post,
    path = "/v1/wallet/signers",
    tag = "Wallet",
    request_body = SignersRequest,
    responses(
        (status = 200, description = "Signers listed", body = SignersResponse),
        (status = 400, description = "Invalid contract address")
    )
)]
pub async fn list_signers(
    State(state): State<AppState>,
    Json(req): Json<SignersRequest>,
) -> Result<Json<SignersResponse>, ApiError> {
    if !is_contract_address(&req.contract_address) {
        return Err(ApiError::bad_request("contractAddress must be a contract strkey"));
    }
    let signers = state.services.signers(&req.contract_address)?;
    Ok(Json(SignersResponse { signers }))
}
