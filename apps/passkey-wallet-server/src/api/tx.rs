// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::info;

use crate::{
    error::ApiError,
    models::{SubmitTransactionRequest, SubmitTransactionResponse},
    state::AppState,
    transaction::Envelope,
};

/// Submit a signed transaction and wait for finality.
#[utoipa::path(
    post,
    path = "/v1/tx",
    tag = "Transactions",
    request_body = SubmitTransactionRequest,
    responses(
        (status = 200, description = "Transaction succeeded", body = SubmitTransactionResponse),
        (status = 400, description = "Missing envelope"),
        (status = 422, description = "Transaction rejected or failed"),
        (status = 503, description = "Network unreachable"),
        (status = 504, description = "Transaction not final in time")
    )
)]
pub async fn submit_transaction(
    State(state): State<AppState>,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<Json<SubmitTransactionResponse>, ApiError> {
    let envelope = Envelope::new(req.transaction_envelope);
    if envelope.is_empty() {
        return Err(ApiError::bad_request("transactionEnvelope is required"));
    }

    let outcome = state.services.submit_envelope(envelope).await?;
    info!(tx_hash = %outcome.hash, "transaction confirmed");

    Ok(Json(SubmitTransactionResponse {
        transaction_hash: outcome.hash,
        status: outcome.status,
        ledger: outcome.ledger,
    }))
}
