//! Salted password credentials for rooms.
//!
//! A room password is never stored.  At creation the server draws a random
//! 16-byte salt, runs the password and salt through Argon2id, and keeps only
//! the salt and the 32-byte digest.  Verification repeats the derivation with
//! the stored salt and compares digests in constant time, so the comparison
//! leaks nothing about how many leading bytes matched.
//!
//! Argon2 is deliberately slow.  Async callers should run [`PasswordCredential::derive`]
//! and [`PasswordCredential::verify`] on a blocking thread.

use std::fmt;

use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Digest length in bytes.
pub const HASH_LEN: usize = 32;

/// Errors raised while deriving a credential.
#[derive(Debug, Error, PartialEq)]
pub enum CredentialError {
    /// The key-derivation function rejected its input.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Salt and digest of a room password.
#[derive(Clone)]
pub struct PasswordCredential {
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

impl PasswordCredential {
    /// Derives a credential for `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Hashing`] if Argon2 rejects the input.
    pub fn derive(password: &str) -> Result<Self, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let hash = hash_with_salt(password, &salt)?;
        Ok(Self { salt, hash })
    }

    /// Returns `true` if `password` matches this credential.
    pub fn verify(&self, password: &str) -> bool {
        match hash_with_salt(password, &self.salt) {
            Ok(candidate) => candidate.ct_eq(&self.hash).into(),
            Err(_) => false,
        }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }
}

// Never print the digest, not even in debug logs.
impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("hash", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn hash_with_salt(password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], CredentialError> {
    let mut out = [0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_the_original_password() {
        // Arrange
        let credential = PasswordCredential::derive("hunter2").unwrap();

        // Act / Assert
        assert!(credential.verify("hunter2"));
    }

    #[test]
    fn test_verify_rejects_a_different_password() {
        let credential = PasswordCredential::derive("hunter2").unwrap();
        assert!(!credential.verify("hunter3"));
        assert!(!credential.verify(""));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = PasswordCredential::derive("x").unwrap();
        let b = PasswordCredential::derive("x").unwrap();
        assert_ne!(a.salt(), b.salt());
        assert!(a.verify("x") && b.verify("x"));
    }

    #[test]
    fn test_empty_password_is_a_valid_credential() {
        let credential = PasswordCredential::derive("").unwrap();
        assert!(credential.verify(""));
        assert!(!credential.verify(" "));
    }

    #[test]
    fn test_debug_output_does_not_contain_digest_bytes() {
        let credential = PasswordCredential::derive("secret").unwrap();
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("secret"));
    }
}
