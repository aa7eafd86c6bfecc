// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salted password hashing.
//!
//! Digests are PBKDF2-HMAC-SHA256 with a 32-byte output. The salt is 16
//! random bytes stored as 32 hex characters, and the UTF-8 bytes of that hex
//! string are what feed the KDF. Both digest and salt are stored hex-encoded
//! on the user record.

use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Derived key length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Random salt length in bytes (before hex encoding).
pub const SALT_LEN: usize = 16;

/// Lowest iteration count accepted from configuration.
pub const MIN_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    pub iterations: NonZeroU32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
        }
    }
}

/// Hex-encoded digest and the salt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashResult {
    pub digest: String,
    pub salt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("system random number generator failed")]
    Rng,
}

pub struct CredentialHasher {
    config: HasherConfig,
    rng: SystemRandom,
}

impl CredentialHasher {
    pub fn new(config: HasherConfig) -> Self {
        Self {
            config,
            rng: SystemRandom::new(),
        }
    }

    /// Hash `password` under a freshly generated salt.
    pub fn hash(&self, password: &str) -> Result<HashResult, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt_bytes)
            .map_err(|_| PasswordError::Rng)?;
        let salt = hex::encode(salt_bytes);

        Ok(HashResult {
            digest: self.derive(password, &salt),
            salt,
        })
    }

    /// Hash `password` under a caller-supplied salt.
    pub fn derive(&self, password: &str, salt: &str) -> String {
        let mut out = [0u8; DIGEST_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.config.iterations,
            salt.as_bytes(),
            password.as_bytes(),
            &mut out,
        );
        hex::encode(out)
    }

    /// Check `password` against a stored digest.
    ///
    /// The comparison is constant-time. A digest that is not valid hex, or
    /// not [`DIGEST_LEN`] bytes long, never matches.
    pub fn verify(&self, password: &str, digest: &str, salt: &str) -> bool {
        let Ok(expected) = hex::decode(digest) else {
            return false;
        };
        if expected.len() != DIGEST_LEN {
            return false;
        }

        pbkdf2::verify(
            ALGORITHM,
            self.config.iterations,
            salt.as_bytes(),
            password.as_bytes(),
            &expected,
        )
        .is_ok()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(HasherConfig::default())
    }
}
