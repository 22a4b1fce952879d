//! Credential hashing using Argon2id
//!
//! The coordinator only ever sees the [`CredentialHasher`] trait; the hash
//! string is opaque to it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::HashError;

/// Hashes plaintext credentials and checks them against stored hashes.
pub trait CredentialHasher: Send + Sync + 'static {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// `false` for a mismatch and for an unparseable stored hash alike.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Argon2id with the crate's default parameters, PHC string output.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed_hash) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("p1").expect("Hash should succeed");

        // PHC format
        assert!(hash.starts_with("$argon2"));

        assert!(hasher.verify("p1", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = Argon2Hasher;
        let hash1 = hasher.hash("Password1").unwrap();
        let hash2 = hasher.hash("Password1").unwrap();

        // different salts
        assert_ne!(hash1, hash2);
        assert!(hasher.verify("Password1", &hash1));
        assert!(hasher.verify("Password1", &hash2));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!Argon2Hasher.verify("p1", "not-a-phc-string"));
        assert!(!Argon2Hasher.verify("p1", ""));
    }
}
