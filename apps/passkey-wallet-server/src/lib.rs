// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passkey Wallet Server - Stellar contract wallets bound to device passkeys
//!
//! Every wallet is a smart contract whose signer is a WebAuthn passkey held
//! by the user's device. The server runs the passkey ceremonies, deploys one
//! contract per credential and drives signed transactions to finality.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `ceremony` - WebAuthn registration and authentication ceremonies
//! - `network` - Soroban RPC client and the local mock backend
//! - `transaction` - envelopes, signers and the submission pipeline
//! - `wallet` - wallet deployment, lookup and the wallet client seam
//! - `storage` - credential to wallet registry (redb)

pub mod api;
pub mod ceremony;
pub mod challenge;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod models;
pub mod network;
pub mod state;
pub mod storage;
pub mod transaction;
pub mod wallet;
