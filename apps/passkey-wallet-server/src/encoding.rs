// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared text encodings: base64url (WebAuthn) and Stellar strkeys.

use base64ct::{Base64UrlUnpadded, Encoding};
use sha2::{Digest, Sha256};

/// Length of a Stellar strkey (`G…` accounts, `C…` contracts).
pub const STRKEY_LEN: usize = 56;

/// Encode bytes as unpadded base64url.
pub fn b64url_encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

/// Decode unpadded base64url. Trailing `=` padding is tolerated.
pub fn b64url_decode(value: &str) -> Result<Vec<u8>, base64ct::Error> {
    Base64UrlUnpadded::decode_vec(value.trim_end_matches('='))
}

/// SHA-256 helper returning a fixed array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Encode a 32-byte contract id as a `C…` strkey.
pub fn contract_strkey(id: [u8; 32]) -> String {
    stellar_strkey::Contract(id).to_string()
}

/// Decode a `C…` contract strkey.
pub fn parse_contract_strkey(value: &str) -> Option<[u8; 32]> {
    stellar_strkey::Contract::from_string(value).ok().map(|c| c.0)
}

/// Encode an Ed25519 public key as a `G…` account strkey.
pub fn account_strkey(public_key: [u8; 32]) -> String {
    stellar_strkey::ed25519::PublicKey(public_key).to_string()
}

/// Decode a `G…` account strkey.
pub fn parse_account_strkey(value: &str) -> Option<[u8; 32]> {
    stellar_strkey::ed25519::PublicKey::from_string(value)
        .ok()
        .map(|k| k.0)
}

/// True when `value` has the fixed contract address format.
pub fn is_contract_address(value: &str) -> bool {
    value.len() == STRKEY_LEN && value.starts_with('C') && parse_contract_strkey(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_roundtrip_tolerates_padding() {
        let encoded = b64url_encode(b"passkey");
        assert!(!encoded.contains('='));
        assert_eq!(b64url_decode(&encoded).unwrap(), b"passkey");
        assert_eq!(b64url_decode("cGFzc2tleQ==").unwrap(), b"passkey");
    }

    #[test]
    fn contract_strkey_has_fixed_format() {
        let address = contract_strkey([7u8; 32]);
        assert_eq!(address.len(), STRKEY_LEN);
        assert!(address.starts_with('C'));
        assert!(is_contract_address(&address));
        assert_eq!(parse_contract_strkey(&address), Some([7u8; 32]));
    }

    #[test]
    fn account_strkey_is_not_a_contract() {
        let account = account_strkey([9u8; 32]);
        assert!(account.starts_with('G'));
        assert!(!is_contract_address(&account));
        assert_eq!(parse_account_strkey(&account), Some([9u8; 32]));
    }
}
