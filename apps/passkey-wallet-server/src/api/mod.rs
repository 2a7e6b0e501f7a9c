// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    ceremony::{
        options::{
            AllowCredential, AuthenticatorSelection, PubKeyCredParam, RelyingParty, UserEntity,
        },
        credential::{AssertionPayload, AttestationPayload},
        AuthenticationOptions, AuthenticationResponse, CeremonyFailure, RegistrationOptions,
        RegistrationResponse,
    },
    models::{
        AuthenticationStarted, CeremonyCancelled, LoginFinishRequest, RegisterBeginRequest,
        RegisterFinishRequest, RegistrationStarted, SignersRequest, SignersResponse,
        SubmitTransactionRequest, SubmitTransactionResponse, WalletLookupResponse,
    },
    state::AppState,
    storage::{WalletRecord, WalletSigner},
    transaction::TxStatus,
    wallet::WalletInfo,
};

pub mod auth;
pub mod health;
pub mod tx;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register/begin", post(auth::register_begin))
        .route("/auth/register/finish", post(auth::register_finish))
        .route("/auth/login/begin", post(auth::login_begin))
        .route("/auth/login/finish", post(auth::login_finish))
        .route(
            "/auth/ceremony/{ceremony_id}/cancel",
            post(auth::cancel_ceremony),
        )
        .route("/tx", post(tx::submit_transaction))
        .route("/wallet", get(wallet::lookup_wallet))
        .route("/wallet/signers", post(wallet::list_signers))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register_begin,
        auth::register_finish,
        auth::login_begin,
        auth::login_finish,
        auth::cancel_ceremony,
        tx::submit_transaction,
        wallet::lookup_wallet,
        wallet::list_signers
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            RegisterBeginRequest,
            RegistrationStarted,
            AuthenticationStarted,
            RegisterFinishRequest,
            LoginFinishRequest,
            CeremonyCancelled,
            CeremonyFailure,
            RegistrationOptions,
            AuthenticationOptions,
            RelyingParty,
            UserEntity,
            PubKeyCredParam,
            AuthenticatorSelection,
            AllowCredential,
            RegistrationResponse,
            AttestationPayload,
            AuthenticationResponse,
            AssertionPayload,
            WalletInfo,
            SubmitTransactionRequest,
            SubmitTransactionResponse,
            TxStatus,
            WalletLookupResponse,
            SignersRequest,
            SignersResponse,
            WalletRecord,
            WalletSigner
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Passkey registration and sign-in ceremonies"),
        (name = "Transactions", description = "Signed transaction submission"),
        (name = "Wallet", description = "Wallet lookup and signers")
    )
)]
pub struct ApiDoc;
