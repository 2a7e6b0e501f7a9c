// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ceremony challenge generation.
//!
//! Challenges are 32 bytes drawn from the operating system CSPRNG via
//! `ring::rand::SystemRandom`. There is no fallback source: if the system
//! generator fails, challenge generation fails.

use std::fmt;

use ring::rand::{SecureRandom, SystemRandom};

use crate::encoding::{b64url_decode, b64url_encode};

/// Challenge length in bytes.
pub const CHALLENGE_LEN: usize = 32;

/// Opaque single-use ceremony challenge.
///
/// Deliberately not `Clone`: a challenge is consumed by exactly one ceremony.
#[derive(PartialEq, Eq, Hash)]
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    /// Build a challenge from raw bytes (used for signing payloads).
    pub fn from_bytes(bytes: [u8; CHALLENGE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }

    /// Base64url form, as embedded in ceremony options and `clientDataJSON`.
    pub fn to_base64url(&self) -> String {
        b64url_encode(&self.0)
    }

    /// Parse a base64url challenge of the expected length.
    pub fn from_base64url(value: &str) -> Option<Self> {
        let bytes = b64url_decode(value).ok()?;
        let array: [u8; CHALLENGE_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Challenge({})", self.to_base64url())
    }
}

/// The system random source could not produce bytes.
#[derive(Debug, thiserror::Error)]
#[error("secure random source unavailable")]
pub struct RandomSourceUnavailable;

/// Produces fresh unpredictable challenges.
#[derive(Clone)]
pub struct ChallengeGenerator {
    rng: SystemRandom,
}

impl ChallengeGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate a fresh challenge.
    pub fn generate(&self) -> Result<Challenge, RandomSourceUnavailable> {
        let mut bytes = [0u8; CHALLENGE_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| RandomSourceUnavailable)?;
        Ok(Challenge(bytes))
    }
}

impl Default for ChallengeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ten_thousand_challenges_are_unique() {
        let generator = ChallengeGenerator::new();
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            let challenge = generator.generate().unwrap();
            assert!(seen.insert(*challenge.as_bytes()), "duplicate challenge");
        }
    }

    #[test]
    fn challenge_is_fixed_length_base64url() {
        let challenge = ChallengeGenerator::new().generate().unwrap();
        let encoded = challenge.to_base64url();
        // 32 bytes -> 43 unpadded base64url chars
        assert_eq!(encoded.len(), 43);
        assert_eq!(Challenge::from_base64url(&encoded), Some(challenge));
    }

    #[test]
    fn short_challenge_is_rejected() {
        assert!(Challenge::from_base64url("c2hvcnQ").is_none());
    }
}
