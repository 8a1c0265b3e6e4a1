//! Password hashing and generation.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{AuthError, PasswordPolicy};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{};:,.?";

/// bcrypt-backed password hasher. Each hash gets its own random salt.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.is_empty() {
            return Err(AuthError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        bcrypt::non_truncating_hash(plaintext, self.cost).map_err(|e| match e {
            bcrypt::BcryptError::Truncation(_) => AuthError::InvalidInput(
                "password is too long for bcrypt (72 bytes at most)".to_string(),
            ),
            other => AuthError::Internal(other.to_string()),
        })
    }

    /// Check a password against a stored hash. Malformed hashes and inputs
    /// bcrypt would truncate never match.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        bcrypt::non_truncating_verify(plaintext, hash).unwrap_or(false)
    }
}

/// Random password generator using the thread-local CSPRNG.
#[derive(Debug, Clone)]
pub struct PasswordGenerator {
    policy: PasswordPolicy,
}

impl PasswordGenerator {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    fn classes(&self) -> Vec<&'static [u8]> {
        let mut classes = vec![LOWERCASE, DIGITS];
        if self.policy.include_uppercase {
            classes.push(UPPERCASE);
        }
        if self.policy.include_special {
            classes.push(SPECIAL);
        }
        classes
    }

    /// Generate a password containing at least one character of every
    /// enabled class.
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        let classes = self.classes();
        let alphabet: Vec<u8> = classes.concat();
        let length = self.policy.length.max(classes.len());

        let mut chars: Vec<u8> = classes
            .iter()
            .map(|class| class[rng.random_range(0..class.len())])
            .collect();
        while chars.len() < length {
            chars.push(alphabet[rng.random_range(0..alphabet.len())]);
        }
        chars.shuffle(&mut rng);

        chars.into_iter().map(char::from).collect()
    }
}
