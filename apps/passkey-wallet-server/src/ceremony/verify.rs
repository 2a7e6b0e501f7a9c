// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification of WebAuthn authenticator responses.
//!
//! ## Registration
//!
//! 1. `clientDataJSON` must be `webauthn.create` for the issued challenge
//!    and the configured origin.
//! 2. The CBOR attestation object is decoded and its `authData` parsed:
//!    rpIdHash, flags (UP, UV, AT), then the attested credential data.
//! 3. The COSE key must be EC2 / ES256 / P-256; it is converted to the
//!    65-byte uncompressed SEC1 form used by the wallet contract.
//!
//! Attestation statements (`attStmt`) are not validated.
//!
//! ## Authentication
//!
//! Same client-data and authenticator-data checks with `webauthn.get`.
//! The assertion signature covers `authData || SHA-256(clientDataJSON)`
//! and is verified against the key recorded at registration.

use ciborium::Value;
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use serde::Deserialize;

use super::credential::{
    AssertionProof, AuthenticationResponse, Credential, CredentialProof, PasskeyPublicKey,
    RegistrationResponse,
};
use super::error::CeremonyError;
use crate::encoding::{b64url_decode, b64url_encode, sha256};

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_ATTESTED_DATA: u8 = 0x40;

/// rpIdHash (32) + flags (1) + signCount (4)
const AUTH_DATA_MIN_LEN: usize = 37;

const COSE_KTY: i64 = 1;
const COSE_ALG: i64 = 3;
const COSE_CRV: i64 = -1;
const COSE_X: i64 = -2;
const COSE_Y: i64 = -3;
const COSE_KTY_EC2: i64 = 2;
const COSE_CRV_P256: i64 = 1;

pub const CLIENT_DATA_CREATE: &str = "webauthn.create";
pub const CLIENT_DATA_GET: &str = "webauthn.get";

/// What a response must match.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedCeremony<'a> {
    pub challenge: &'a str,
    pub origin: &'a str,
    pub rp_id: &'a str,
}

#[derive(Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>, CeremonyError> {
    b64url_decode(value).map_err(|_| CeremonyError::invalid(format!("{field} is not base64url")))
}

fn verify_client_data(
    raw: &[u8],
    kind: &str,
    expected: &ExpectedCeremony<'_>,
) -> Result<(), CeremonyError> {
    let client: ClientData = serde_json::from_slice(raw)
        .map_err(|e| CeremonyError::invalid(format!("clientDataJSON: {e}")))?;

    if client.kind != kind {
        return Err(CeremonyError::invalid(format!(
            "expected client data type {kind}, got {}",
            client.kind
        )));
    }

    let received = decode_field(&client.challenge, "client challenge")?;
    let issued = decode_field(expected.challenge, "issued challenge")?;
    if received != issued {
        return Err(CeremonyError::invalid("challenge mismatch"));
    }

    if client.origin != expected.origin {
        return Err(CeremonyError::invalid(format!(
            "unexpected origin {}",
            client.origin
        )));
    }

    Ok(())
}

/// Credential data attested at registration.
#[derive(Debug, Clone)]
pub struct AttestedCredential {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub public_key: PasskeyPublicKey,
}

/// Parsed `authenticatorData`.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested: Option<AttestedCredential>,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, CeremonyError> {
        if bytes.len() < AUTH_DATA_MIN_LEN {
            return Err(CeremonyError::invalid("authenticator data too short"));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = bytes[32];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let attested = if flags & FLAG_ATTESTED_DATA != 0 {
            Some(parse_attested_credential(&bytes[AUTH_DATA_MIN_LEN..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested,
        })
    }

    fn check(&self, rp_id: &str) -> Result<(), CeremonyError> {
        if self.rp_id_hash != sha256(rp_id.as_bytes()) {
            return Err(CeremonyError::invalid("rpIdHash does not match relying party"));
        }
        if self.flags & FLAG_USER_PRESENT == 0 {
            return Err(CeremonyError::invalid("user presence flag not set"));
        }
        if self.flags & FLAG_USER_VERIFIED == 0 {
            return Err(CeremonyError::invalid("user verification flag not set"));
        }
        Ok(())
    }
}

fn parse_attested_credential(bytes: &[u8]) -> Result<AttestedCredential, CeremonyError> {
    // aaguid (16) + credentialIdLength (2)
    if bytes.len() < 18 {
        return Err(CeremonyError::invalid("attested credential data too short"));
    }

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&bytes[..16]);
    let id_len = u16::from_be_bytes([bytes[16], bytes[17]]) as usize;
    let id_end = 18 + id_len;
    if bytes.len() <= id_end {
        return Err(CeremonyError::invalid("credential id overruns authenticator data"));
    }

    let credential_id = bytes[18..id_end].to_vec();
    let cose: Value = ciborium::de::from_reader(&bytes[id_end..])
        .map_err(|e| CeremonyError::invalid(format!("credential public key: {e}")))?;

    Ok(AttestedCredential {
        aaguid,
        credential_id,
        public_key: cose_key_to_sec1(&cose)?,
    })
}

fn map_entry<'v>(map: &'v [(Value, Value)], label: i64) -> Option<&'v Value> {
    map.iter()
        .find(|(key, _)| {
            key.as_integer()
                .map(|k| i128::from(k) == i128::from(label))
                .unwrap_or(false)
        })
        .map(|(_, value)| value)
}

fn int_entry(map: &[(Value, Value)], label: i64) -> Option<i128> {
    map_entry(map, label)
        .and_then(Value::as_integer)
        .map(i128::from)
}

/// Convert a COSE_Key to an uncompressed SEC1 P-256 key.
fn cose_key_to_sec1(cose: &Value) -> Result<PasskeyPublicKey, CeremonyError> {
    let map = cose
        .as_map()
        .ok_or_else(|| CeremonyError::invalid("COSE key is not a map"))?;

    if int_entry(map, COSE_KTY) != Some(COSE_KTY_EC2 as i128) {
        return Err(CeremonyError::unsupported("only EC2 credential keys are supported"));
    }
    if int_entry(map, COSE_ALG) != Some(super::options::COSE_ALG_ES256 as i128) {
        return Err(CeremonyError::unsupported("only ES256 credential keys are supported"));
    }
    if int_entry(map, COSE_CRV) != Some(COSE_CRV_P256 as i128) {
        return Err(CeremonyError::unsupported("only P-256 credential keys are supported"));
    }

    let coordinate = |label: i64, name: &str| -> Result<&Vec<u8>, CeremonyError> {
        map_entry(map, label)
            .and_then(Value::as_bytes)
            .filter(|bytes| bytes.len() == 32)
            .ok_or_else(|| CeremonyError::invalid(format!("COSE key {name} coordinate missing")))
    };
    let x = coordinate(COSE_X, "x")?;
    let y = coordinate(COSE_Y, "y")?;

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    PasskeyPublicKey::from_sec1(&sec1)
        .ok_or_else(|| CeremonyError::invalid("credential public key is not on P-256"))
}

/// Extract `authData` from a CBOR attestation object.
pub fn attestation_auth_data(attestation_object: &[u8]) -> Result<Vec<u8>, CeremonyError> {
    let value: Value = ciborium::de::from_reader(attestation_object)
        .map_err(|e| CeremonyError::invalid(format!("attestation object: {e}")))?;

    value
        .as_map()
        .and_then(|map| {
            map.iter()
                .find(|(key, _)| key.as_text() == Some("authData"))
                .and_then(|(_, value)| value.as_bytes())
        })
        .cloned()
        .ok_or_else(|| CeremonyError::invalid("attestation object has no authData"))
}

/// Verify a registration response and extract its credential.
pub fn verify_registration(
    response: &RegistrationResponse,
    expected: &ExpectedCeremony<'_>,
) -> Result<Credential, CeremonyError> {
    let client_data = decode_field(&response.response.client_data_json, "clientDataJSON")?;
    verify_client_data(&client_data, CLIENT_DATA_CREATE, expected)?;

    let attestation = decode_field(&response.response.attestation_object, "attestationObject")?;
    let auth_data = AuthenticatorData::parse(&attestation_auth_data(&attestation)?)?;
    auth_data.check(expected.rp_id)?;

    let attested = auth_data
        .attested
        .ok_or_else(|| CeremonyError::invalid("registration carries no attested credential"))?;

    if decode_field(&response.id, "credential id")? != attested.credential_id {
        return Err(CeremonyError::invalid("credential id does not match attested data"));
    }

    Ok(Credential::new(
        b64url_encode(&attested.credential_id),
        CredentialProof::Attestation {
            public_key: attested.public_key,
        },
    ))
}

/// Verify the ceremony-level parts of an authentication response.
///
/// The signature itself is checked by [`verify_assertion_signature`] once
/// the registered key is known.
pub fn verify_authentication(
    response: &AuthenticationResponse,
    expected: &ExpectedCeremony<'_>,
) -> Result<Credential, CeremonyError> {
    let client_data_json = decode_field(&response.response.client_data_json, "clientDataJSON")?;
    verify_client_data(&client_data_json, CLIENT_DATA_GET, expected)?;

    let authenticator_data =
        decode_field(&response.response.authenticator_data, "authenticatorData")?;
    AuthenticatorData::parse(&authenticator_data)?.check(expected.rp_id)?;

    let signature = decode_field(&response.response.signature, "signature")?;
    let id = b64url_encode(&decode_field(&response.id, "credential id")?);

    Ok(Credential::new(
        id,
        CredentialProof::Assertion(AssertionProof {
            authenticator_data,
            client_data_json,
            signature,
        }),
    ))
}

/// Verify an assertion signature against a registered key.
pub fn verify_assertion_signature(
    public_key: &PasskeyPublicKey,
    proof: &AssertionProof,
) -> Result<(), CeremonyError> {
    let key = VerifyingKey::from_sec1_bytes(public_key.as_bytes())
        .map_err(|_| CeremonyError::invalid("registered key is not a valid P-256 key"))?;
    let signature = Signature::from_der(&proof.signature)
        .map_err(|_| CeremonyError::invalid("assertion signature is not DER encoded"))?;

    let mut message = Vec::with_capacity(proof.authenticator_data.len() + 32);
    message.extend_from_slice(&proof.authenticator_data);
    message.extend_from_slice(&sha256(&proof.client_data_json));

    key.verify(&message, &signature)
        .map_err(|_| CeremonyError::invalid("assertion signature does not verify"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::error::CeremonyFailure;

    fn cose_key(kty: i64, alg: i64, x: &[u8], y: &[u8]) -> Vec<u8> {
        let value = Value::Map(vec![
            (Value::Integer(COSE_KTY.into()), Value::Integer(kty.into())),
            (Value::Integer(COSE_ALG.into()), Value::Integer(alg.into())),
            (Value::Integer(COSE_CRV.into()), Value::Integer(COSE_CRV_P256.into())),
            (Value::Integer(COSE_X.into()), Value::Bytes(x.to_vec())),
            (Value::Integer(COSE_Y.into()), Value::Bytes(y.to_vec())),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&value, &mut out).unwrap();
        out
    }

    fn test_point() -> (Vec<u8>, Vec<u8>) {
        let key = p256::ecdsa::SigningKey::from_slice(&[0x11; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        (point.x().unwrap().to_vec(), point.y().unwrap().to_vec())
    }

    fn auth_data_with(flags: u8, attested: Option<&[u8]>) -> Vec<u8> {
        let mut data = sha256(b"example.com").to_vec();
        data.push(flags);
        data.extend_from_slice(&7u32.to_be_bytes());
        if let Some(tail) = attested {
            data.extend_from_slice(tail);
        }
        data
    }

    fn attested_tail(credential_id: &[u8], cose: &[u8]) -> Vec<u8> {
        let mut tail = vec![0u8; 16];
        tail.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        tail.extend_from_slice(credential_id);
        tail.extend_from_slice(cose);
        tail
    }

    #[test]
    fn parses_attested_p256_key() {
        let (x, y) = test_point();
        let tail = attested_tail(b"cred-1", &cose_key(COSE_KTY_EC2, -7, &x, &y));
        let data = auth_data_with(0x45, Some(&tail));

        let parsed = AuthenticatorData::parse(&data).unwrap();
        assert_eq!(parsed.sign_count, 7);
        let attested = parsed.attested.unwrap();
        assert_eq!(attested.credential_id, b"cred-1");
        let key = attested.public_key.as_bytes();
        assert_eq!(key[0], 0x04);
        assert_eq!(&key[1..33], x.as_slice());
        assert_eq!(&key[33..], y.as_slice());
    }

    #[test]
    fn rejects_non_es256_keys_as_unsupported() {
        let (x, y) = test_point();
        // RS256 (-257)
        let tail = attested_tail(b"cred-1", &cose_key(COSE_KTY_EC2, -257, &x, &y));
        let err = AuthenticatorData::parse(&auth_data_with(0x45, Some(&tail))).unwrap_err();
        assert_eq!(err.reason, CeremonyFailure::Unsupported);
    }

    #[test]
    fn rejects_missing_user_verification() {
        let data = AuthenticatorData::parse(&auth_data_with(0x01, None)).unwrap();
        let err = data.check("example.com").unwrap_err();
        assert!(err.detail.contains("verification"));
    }

    #[test]
    fn rejects_foreign_relying_party() {
        let data = AuthenticatorData::parse(&auth_data_with(0x05, None)).unwrap();
        assert!(data.check("evil.example").is_err());
        assert!(data.check("example.com").is_ok());
    }

    #[test]
    fn truncated_auth_data_is_invalid() {
        let err = AuthenticatorData::parse(&[0u8; 10]).unwrap_err();
        assert_eq!(err.reason, CeremonyFailure::InvalidResponse);
    }

    #[test]
    fn client_data_checks_type_challenge_and_origin() {
        let expected = ExpectedCeremony {
            challenge: "AAEC",
            origin: "https://wallet.example",
            rp_id: "wallet.example",
        };
        let good = br#"{"type":"webauthn.get","challenge":"AAEC","origin":"https://wallet.example"}"#;
        assert!(verify_client_data(good, CLIENT_DATA_GET, &expected).is_ok());
        assert!(verify_client_data(good, CLIENT_DATA_CREATE, &expected).is_err());

        let other_challenge =
            br#"{"type":"webauthn.get","challenge":"AAED","origin":"https://wallet.example"}"#;
        assert!(verify_client_data(other_challenge, CLIENT_DATA_GET, &expected).is_err());

        let other_origin =
            br#"{"type":"webauthn.get","challenge":"AAEC","origin":"https://evil.example"}"#;
        assert!(verify_client_data(other_origin, CLIENT_DATA_GET, &expected).is_err());
    }

    #[test]
    fn assertion_signature_roundtrip() {
        use p256::ecdsa::signature::Signer;

        let signing = p256::ecdsa::SigningKey::from_slice(&[0x22; 32]).unwrap();
        let point = signing.verifying_key().to_encoded_point(false);
        let public_key = PasskeyPublicKey::from_sec1(point.as_bytes()).unwrap();

        let authenticator_data = auth_data_with(0x05, None);
        let client_data_json = b"{}".to_vec();
        let mut message = authenticator_data.clone();
        message.extend_from_slice(&sha256(&client_data_json));
        let signature: Signature = signing.sign(&message);

        let proof = AssertionProof {
            authenticator_data,
            client_data_json,
            signature: signature.to_der().as_bytes().to_vec(),
        };
        assert!(verify_assertion_signature(&public_key, &proof).is_ok());

        let mut tampered = proof.clone();
        tampered.client_data_json = b"{\"x\":1}".to_vec();
        assert!(verify_assertion_signature(&public_key, &tampered).is_err());
    }
}
