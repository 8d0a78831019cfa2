//! Password credentials.
//!
//! New credentials are stored as a hex SHA-256 digest of `salt || password`
//! with a random 16-byte salt. Records imported from older data may still hold
//! a plaintext password; those verify once and are then replaced by a salted
//! hash (see [`Verification::Upgraded`]).

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Credential {
    Hashed { hash: String, salt: String },
    Legacy { password: String },
}

/// Outcome of checking a password against a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Rejected,
    Accepted,
    /// Accepted against a legacy credential; the caller must persist the
    /// replacement so the plaintext is dropped.
    Upgraded(Credential),
}

impl Credential {
    /// Hashes a password with a fresh random salt.
    pub fn from_password(password: &str) -> Self {
        let salt = generate_salt();
        let hash = hash_with_salt(password, &salt);
        Credential::Hashed { hash, salt }
    }

    pub fn verify(&self, password: &str) -> Verification {
        match self {
            Credential::Hashed { hash, salt } => {
                if hash_with_salt(password, salt) == *hash {
                    Verification::Accepted
                } else {
                    Verification::Rejected
                }
            }
            Credential::Legacy { password: stored } => {
                if stored == password {
                    Verification::Upgraded(Credential::from_password(password))
                } else {
                    Verification::Rejected
                }
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Credential::Legacy { .. })
    }
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Result of a password strength check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    /// Number of criteria met (length, upper, lower, digit, symbol).
    pub score: u8,
    pub is_valid: bool,
}

/// A password is accepted when it is long enough and meets at least three of
/// the five criteria.
pub fn check_password_strength(password: &str) -> PasswordStrength {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let criteria = [
        long_enough,
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ];
    let score = criteria.iter().filter(|met| **met).count() as u8;

    PasswordStrength {
        score,
        is_valid: long_enough && score >= 3,
    }
}
