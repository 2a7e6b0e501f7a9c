// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passkey (WebAuthn) ceremonies.
//!
//! - `options` - option structures handed to the browser
//! - `coordinator` - builds options, runs and verifies ceremonies
//! - `authenticator` - platform authenticator trait and the HTTP bridge
//! - `verify` - client data, authenticator data and signature checks

pub mod authenticator;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod options;
pub mod verify;

pub use authenticator::{
    BridgeError, BridgedAuthenticator, CeremonyBridge, CeremonyTicket, PlatformAuthenticator,
};
pub use coordinator::{CeremonyCoordinator, RelyingPartyConfig};
pub use credential::{
    AssertionProof, AuthenticationResponse, CeremonyResponse, Credential, CredentialProof,
    PasskeyPublicKey, RegistrationResponse,
};
pub use error::{CeremonyError, CeremonyFailure};
pub use options::{AuthenticationOptions, RegistrationOptions};
