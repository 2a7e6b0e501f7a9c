// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WebAuthn ceremony option structures.
//!
//! These serialize to the JSON shape browsers expect for
//! `navigator.credentials.create()` / `get()` (camelCase, base64url
//! challenges and ids).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::encoding::b64url_encode;

/// COSE algorithm identifier for ES256 (ECDSA P-256 with SHA-256).
pub const COSE_ALG_ES256: i64 = -7;

/// Algorithms accepted for new credentials. Only ES256 keys can be
/// verified by the wallet contract.
pub const ALLOWED_ALGORITHMS: &[i64] = &[COSE_ALG_ES256];

/// Relying party identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelyingParty {
    /// Human-readable relying party name
    pub name: String,
    /// Relying party id (effective domain of the origin)
    pub id: String,
}

/// User identity for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// An allowed public-key algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PubKeyCredParam {
    /// COSE algorithm identifier
    pub alg: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Authenticator constraints for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: String,
    pub require_resident_key: bool,
    pub resident_key: String,
    pub user_verification: String,
}

impl AuthenticatorSelection {
    /// Platform-bound, resident, user-verified key.
    pub fn platform_resident_verified() -> Self {
        Self {
            authenticator_attachment: "platform".to_string(),
            require_resident_key: true,
            resident_key: "required".to_string(),
            user_verification: "required".to_string(),
        }
    }
}

/// Credential descriptor restricting which key may answer an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllowCredential {
    /// base64url credential id
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Options for a registration (credential creation) ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    /// base64url challenge
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Ceremony timeout in milliseconds
    pub timeout: u64,
    pub attestation: String,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Options for an authentication (assertion) ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    /// base64url challenge
    pub challenge: String,
    /// Ceremony timeout in milliseconds
    pub timeout: u64,
    pub rp_id: String,
    pub user_verification: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<AllowCredential>,
}

impl AuthenticationOptions {
    /// Restrict the assertion to a single credential (used when signing).
    pub fn allow_only(mut self, credential_id: &str) -> Self {
        self.allow_credentials = vec![AllowCredential {
            id: credential_id.to_string(),
            kind: "public-key".to_string(),
        }];
        self
    }
}

/// Common accessors the coordinator needs from either option type.
pub trait CeremonyOptions {
    fn challenge(&self) -> &str;
    fn timeout(&self) -> Duration;
}

impl CeremonyOptions for RegistrationOptions {
    fn challenge(&self) -> &str {
        &self.challenge
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl CeremonyOptions for AuthenticationOptions {
    fn challenge(&self) -> &str {
        &self.challenge
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Encode a username as the opaque user handle.
pub(crate) fn user_handle(username: &str) -> String {
    b64url_encode(username.as_bytes())
}

pub(crate) fn allowed_params() -> Vec<PubKeyCredParam> {
    ALLOWED_ALGORITHMS
        .iter()
        .map(|alg| PubKeyCredParam {
            alg: *alg,
            kind: "public-key".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_options_serialize_as_webauthn_json() {
        let options = RegistrationOptions {
            challenge: "abc".into(),
            rp: RelyingParty {
                name: "Wallet".into(),
                id: "example.com".into(),
            },
            user: UserEntity {
                id: user_handle("alice"),
                name: "alice".into(),
                display_name: "alice".into(),
            },
            pub_key_cred_params: allowed_params(),
            timeout: 60_000,
            attestation: "direct".into(),
            authenticator_selection: AuthenticatorSelection::platform_resident_verified(),
        };

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(json["pubKeyCredParams"][0]["type"], "public-key");
        assert_eq!(json["user"]["displayName"], "alice");
        assert_eq!(
            json["authenticatorSelection"]["authenticatorAttachment"],
            "platform"
        );
        assert_eq!(json["authenticatorSelection"]["requireResidentKey"], true);
    }

    #[test]
    fn allow_list_is_omitted_when_empty() {
        let options = AuthenticationOptions {
            challenge: "abc".into(),
            timeout: 1000,
            rp_id: "example.com".into(),
            user_verification: "required".into(),
            allow_credentials: Vec::new(),
        };
        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("allowCredentials").is_none());

        let restricted = options.allow_only("key-1");
        let json = serde_json::to_value(&restricted).unwrap();
        assert_eq!(json["allowCredentials"][0]["id"], "key-1");
    }
}
