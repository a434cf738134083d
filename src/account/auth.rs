//! Credential sealing and verification

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// How a password is written into the account record.
///
/// Persisted on each account, so verification never has to guess from the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    /// Stored as typed
    #[default]
    Plaintext,
    /// Argon2id PHC string
    Argon2,
}

impl CredentialScheme {
    pub fn from_hashing(enabled: bool) -> Self {
        if enabled {
            CredentialScheme::Argon2
        } else {
            CredentialScheme::Plaintext
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, CredentialScheme::Plaintext)
    }

    /// Turn a password into the value stored on the account.
    pub fn seal(&self, password: &str) -> Result<String, AuthError> {
        match self {
            CredentialScheme::Plaintext => Ok(password.to_string()),
            CredentialScheme::Argon2 => hash_password(password),
        }
    }

    /// Check a candidate password against a credential sealed with this scheme.
    pub fn verify(&self, candidate: &str, stored: &str) -> bool {
        match self {
            CredentialScheme::Plaintext => candidate == stored,
            CredentialScheme::Argon2 => verify_password(candidate, stored),
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against an Argon2 PHC string. Anything unparsable never matches.
pub fn verify_password(candidate: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
