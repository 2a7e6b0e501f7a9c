// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passkey ceremony endpoints.
//!
//! `begin` issues options and parks a task on the ceremony bridge; the
//! browser runs the ceremony and posts the result to `finish`, or reports
//! a dismissal to `cancel`. Ceremonies nobody finishes resolve as timed
//! out after the ceremony timeout.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    ceremony::{CeremonyResponse, CeremonyTicket},
    error::{ApiError, WalletError},
    models::{
        AuthenticationStarted, CeremonyCancelled, LoginFinishRequest, RegisterBeginRequest,
        RegisterFinishRequest, RegistrationStarted,
    },
    state::{AppState, CeremonyOutcome},
    wallet::WalletInfo,
};

/// Longest accepted username.
const MAX_USERNAME_LEN: usize = 64;

fn report(ticket_id: Uuid, outcome: &CeremonyOutcome) {
    match outcome {
        Ok(info) => info!(
            ceremony_id = %ticket_id,
            credential_id = %info.key_id,
            contract_address = %info.contract_address,
            "ceremony completed"
        ),
        Err(e) => warn!(ceremony_id = %ticket_id, kind = e.kind(), error = %e, "ceremony failed"),
    }
}

/// Start a registration ceremony.
#[utoipa::path(
    post,
    path = "/v1/auth/register/begin",
    tag = "Auth",
    request_body = RegisterBeginRequest,
    responses(
        (status = 200, description = "Registration options issued", body = RegistrationStarted),
        (status = 400, description = "Invalid username")
    )
)]
pub async fn register_begin(
    State(state): State<AppState>,
    Json(req): Json<RegisterBeginRequest>,
) -> Result<Json<RegistrationStarted>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters"
        )));
    }

    let options = state.services.begin_registration(username)?;
    let CeremonyTicket {
        id,
        authenticator,
        outcome,
    } = state.bridge.open();

    let services = state.services.clone();
    let bridge = state.bridge.clone();
    let cancel = state.shutdown.child_token();
    let task_options = options.clone();
    tokio::spawn(async move {
        let result = services
            .complete_registration(&authenticator, &task_options, &cancel)
            .await;
        report(id, &result);
        let _ = outcome.send(result);
        bridge.close(id);
    });

    info!(ceremony_id = %id, username, "registration ceremony started");
    Ok(Json(RegistrationStarted {
        ceremony_id: id,
        options,
    }))
}

/// Complete a registration ceremony: verify the attestation and deploy the
/// wallet.
#[utoipa::path(
    post,
    path = "/v1/auth/register/finish",
    tag = "Auth",
    request_body = RegisterFinishRequest,
    responses(
        (status = 201, description = "Wallet deployed", body = WalletInfo),
        (status = 400, description = "Ceremony failed or response invalid"),
        (status = 404, description = "Unknown ceremony"),
        (status = 409, description = "Credential already has a wallet"),
        (status = 503, description = "Network unreachable"),
        (status = 504, description = "Deployment not final in time")
    )
)]
pub async fn register_finish(
    State(state): State<AppState>,
    Json(req): Json<RegisterFinishRequest>,
) -> Result<(StatusCode, Json<WalletInfo>), ApiError> {
    let outcome = state
        .bridge
        .finish(
            req.ceremony_id,
            CeremonyResponse::Registration(req.credential),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome?)))
}

/// Start an authentication ceremony.
#[utoipa::path(
    post,
    path = "/v1/auth/login/begin",
    tag = "Auth",
    responses(
        (status = 200, description = "Authentication options issued", body = AuthenticationStarted)
    )
)]
pub async fn login_begin(
    State(state): State<AppState>,
) -> Result<Json<AuthenticationStarted>, ApiError> {
    let options = state.services.begin_authentication()?;
    let CeremonyTicket {
        id,
        authenticator,
        outcome,
    } = state.bridge.open();

    let services = state.services.clone();
    let bridge = state.bridge.clone();
    let cancel = state.shutdown.child_token();
    let task_options = options.clone();
    tokio::spawn(async move {
        let result = services
            .complete_authentication(&authenticator, &task_options, &cancel)
            .await;
        report(id, &result);
        let _ = outcome.send(result);
        bridge.close(id);
    });

    info!(ceremony_id = %id, "authentication ceremony started");
    Ok(Json(AuthenticationStarted {
        ceremony_id: id,
        options,
    }))
}

/// Complete an authentication ceremony and resolve the wallet.
#[utoipa::path(
    post,
    path = "/v1/auth/login/finish",
    tag = "Auth",
    request_body = LoginFinishRequest,
    responses(
        (status = 200, description = "Wallet resolved", body = WalletInfo),
        (status = 400, description = "Ceremony failed or response invalid"),
        (status = 404, description = "Unknown ceremony or no wallet for credential")
    )
)]
pub async fn login_finish(
    State(state): State<AppState>,
    Json(req): Json<LoginFinishRequest>,
) -> Result<Json<WalletInfo>, ApiError> {
    let outcome = state
        .bridge
        .finish(
            req.ceremony_id,
            CeremonyResponse::Authentication(req.credential),
        )
        .await?;
    Ok(Json(outcome?))
}

/// Report that the user dismissed the authenticator prompt.
#[utoipa::path(
    post,
    path = "/v1/auth/ceremony/{ceremony_id}/cancel",
    tag = "Auth",
    params(
        ("ceremony_id" = Uuid, Path, description = "Ceremony ID")
    ),
    responses(
        (status = 200, description = "Ceremony cancelled", body = CeremonyCancelled),
        (status = 404, description = "Unknown ceremony")
    )
)]
pub async fn cancel_ceremony(
    State(state): State<AppState>,
    Path(ceremony_id): Path<Uuid>,
) -> Result<Json<CeremonyCancelled>, ApiError> {
    let outcome = state.bridge.cancel(ceremony_id).await?;
    let reason = match outcome {
        Err(WalletError::Ceremony(e)) => Some(e.reason),
        _ => None,
    };
    Ok(Json(CeremonyCancelled {
        ceremony_id,
        reason,
    }))
}
