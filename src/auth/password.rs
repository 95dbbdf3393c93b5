//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with a configurable work factor. Digests are
//! PHC strings that carry their own salt and parameters, so raising the work
//! factor only affects newly hashed passwords.
//!
//! bcrypt digests (`$2a$`/`$2b$`) are not read. They verify as false, so
//! accounts carrying one must reset their password before they can log in.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::warn;

use crate::config::HashingConfig;
use crate::types::{AuthError, Result};

/// Validate a work factor and turn it into Argon2 parameters
pub fn argon2_params(config: &HashingConfig) -> Result<Params> {
    Params::new(config.memory_kib, config.time_cost, config.parallelism, None)
        .map_err(|e| AuthError::Config(format!("Invalid password hashing parameters: {e}")))
}

/// One-way salted password hashing
#[derive(Clone)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
    /// Digest verified against when there is no real one, so that a missing
    /// account or corrupt digest costs the same as a wrong password
    dummy_digest: String,
}

impl CredentialStore {
    pub fn new(config: &HashingConfig) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params(config)?);

        let dummy_salt = SaltString::generate(&mut OsRng);
        let dummy_digest = argon2
            .hash_password(b"no-such-account", &dummy_salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Config(format!("Failed to initialize password hashing: {e}")))?;

        Ok(Self {
            argon2,
            dummy_digest,
        })
    }

    /// Hash a password
    ///
    /// Returns the PHC-formatted hash string that includes the salt and parameters.
    pub fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {e}")))
    }

    /// Verify a password against a stored digest.
    ///
    /// A malformed digest is treated as a mismatch after doing the same
    /// amount of work as a real verification.
    pub fn verify(&self, plain: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Stored password digest is malformed: {e}");
                self.burn(plain);
                false
            }
        }
    }

    /// Spend one verification's worth of work and discard the outcome
    pub fn burn(&self, plain: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_digest) {
            let _ = self.argon2.verify_password(plain.as_bytes(), &parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> CredentialStore {
        CredentialStore::new(&HashingConfig {
            time_cost: 1,
            memory_kib: 8,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let store = cheap();
        let password = "correct-horse-battery-staple";
        let hash = store.hash(password).unwrap();

        // Hash should be in PHC format
        assert!(hash.starts_with("$argon2id$"));

        assert!(store.verify(password, &hash));
        assert!(!store.verify("wrong-password", &hash));
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let store = cheap();
        let password = "Kiln&Loom42";
        let hash = store.hash(password).unwrap();

        for (i, original) in password.char_indices() {
            let replacement = if original == 'x' { 'y' } else { 'x' };
            let mut mutated = password.to_string();
            mutated.replace_range(i..i + original.len_utf8(), &replacement.to_string());
            assert!(!store.verify(&mutated, &hash), "mutation at {i} verified");
        }

        assert!(!store.verify(&format!("{password}!"), &hash));
        assert!(!store.verify(&password[..password.len() - 1], &hash));
    }

    #[test]
    fn test_different_salts() {
        let store = cheap();
        let password = "same-password";
        let hash1 = store.hash(password).unwrap();
        let hash2 = store.hash(password).unwrap();

        // Same password should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        assert!(store.verify(password, &hash1));
        assert!(store.verify(password, &hash2));
    }

    #[test]
    fn test_invalid_hash_format() {
        let store = cheap();
        assert!(!store.verify("password", "not-a-valid-hash"));
        assert!(!store.verify("password", ""));
    }

    #[test]
    fn test_bcrypt_digest_never_verifies() {
        let store = cheap();
        let bcrypt = "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";
        assert!(!store.verify("rasmuslerdorf", bcrypt));
        assert!(!store.verify("", bcrypt));
    }

    #[test]
    fn test_work_factor_embedded_in_digest() {
        let store = CredentialStore::new(&HashingConfig {
            time_cost: 2,
            memory_kib: 16,
            parallelism: 1,
        })
        .unwrap();
        let hash = store.hash("pw").unwrap();
        assert!(hash.contains("m=16,t=2,p=1"));

        // Digests made with other parameters still verify
        assert!(cheap().verify("pw", &hash));
    }

    #[test]
    fn test_invalid_params_are_config_errors() {
        let zero_time = HashingConfig {
            time_cost: 0,
            memory_kib: 19456,
            parallelism: 1,
        };
        assert!(matches!(
            CredentialStore::new(&zero_time),
            Err(AuthError::Config(_))
        ));
    }
}
