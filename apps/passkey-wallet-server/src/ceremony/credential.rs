// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticator responses and the verified credential they produce.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::encoding::{b64url_decode, b64url_encode};

/// Length of an uncompressed SEC1 P-256 public key (`0x04 || x || y`).
pub const PASSKEY_PUBLIC_KEY_LEN: usize = 65;

/// Uncompressed P-256 public key of a passkey.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasskeyPublicKey([u8; PASSKEY_PUBLIC_KEY_LEN]);

impl PasskeyPublicKey {
    /// Accepts only a valid point on P-256 in uncompressed form.
    pub fn from_sec1(bytes: &[u8]) -> Option<Self> {
        let array: [u8; PASSKEY_PUBLIC_KEY_LEN] = bytes.try_into().ok()?;
        if array[0] != 0x04 {
            return None;
        }
        p256::PublicKey::from_sec1_bytes(&array).ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; PASSKEY_PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        b64url_encode(&self.0)
    }

    pub fn from_base64url(value: &str) -> Option<Self> {
        Self::from_sec1(&b64url_decode(value).ok()?)
    }
}

impl std::fmt::Debug for PasskeyPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasskeyPublicKey({})", self.to_base64url())
    }
}

/// Raw attestation payload returned by `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    /// base64url `clientDataJSON`
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// base64url CBOR attestation object
    pub attestation_object: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

/// Registration response (browser JSON form).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    /// base64url credential id
    pub id: String,
    pub raw_id: String,
    pub response: AttestationPayload,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Raw assertion payload returned by `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    /// base64url DER-encoded ECDSA signature
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// Authentication response (browser JSON form).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AssertionPayload,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Either kind of authenticator response.
#[derive(Debug, Clone)]
pub enum CeremonyResponse {
    Registration(RegistrationResponse),
    Authentication(AuthenticationResponse),
}

/// Decoded proof of an assertion ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionProof {
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    /// DER-encoded ECDSA signature
    pub signature: Vec<u8>,
}

/// Which ceremony produced a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialProof {
    /// Registration: carries the newly created public key
    Attestation { public_key: PasskeyPublicKey },
    /// Authentication: carries the signed assertion
    Assertion(AssertionProof),
}

/// A verified credential. Immutable once produced; never holds private
/// key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    id: String,
    proof: CredentialProof,
}

impl Credential {
    pub(crate) fn new(id: String, proof: CredentialProof) -> Self {
        Self { id, proof }
    }

    /// base64url credential id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn proof(&self) -> &CredentialProof {
        &self.proof
    }

    /// Public key material, present only for registration credentials.
    pub fn public_key(&self) -> Option<&PasskeyPublicKey> {
        match &self.proof {
            CredentialProof::Attestation { public_key } => Some(public_key),
            CredentialProof::Assertion(_) => None,
        }
    }

    pub fn assertion(&self) -> Option<&AssertionProof> {
        match &self.proof {
            CredentialProof::Assertion(proof) => Some(proof),
            CredentialProof::Attestation { .. } => None,
        }
    }
}
