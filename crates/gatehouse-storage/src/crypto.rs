//! Credential derivation for the user directory
//!
//! Two one-way derivations are used:
//! - Argon2id for passwords: slow, salted, PHC string with the salt embedded
//! - SHA-256 for card markers: deterministic, so a reader's UID can be looked up
//!
//! Card markers are lowercase hex digests, the same encoding older snapshots
//! used, so legacy enrollments keep matching.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use gatehouse_core::CardUid;
use gatehouse_core::constants::{
    DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_PARALLELISM,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{StorageError, StorageResult};

/// Argon2id cost configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Time cost (passes over memory)
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

impl HashConfig {
    /// Set the memory cost in KiB
    pub fn memory_kib(mut self, kib: u32) -> Self {
        self.memory_kib = kib;
        self
    }

    /// Set the time cost
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the degree of parallelism
    pub fn parallelism(mut self, lanes: u32) -> Self {
        self.parallelism = lanes;
        self
    }
}

/// Password hasher with a fixed Argon2id cost.
///
/// Cloning is cheap; clones are moved onto the blocking pool for each hash.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Create a hasher, validating the cost parameters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if Argon2 rejects the parameters
    /// (for example less than 8 KiB of memory per lane).
    pub fn new(config: HashConfig) -> StorageResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| StorageError::Validation(format!("Invalid hash parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns the PHC string (`$argon2id$v=19$m=...$salt$hash`).
    pub fn hash_password(&self, password: &str) -> StorageResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StorageError::Credential(format!("Password hashing failed: {}", e)))
    }

    /// Check a password against a stored PHC string.
    ///
    /// The cost parameters are read from the stored hash, so records hashed
    /// under an older configuration still verify. Hashes that do not parse
    /// never match.
    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash_password`](Self::hash_password) on the blocking thread pool.
    pub async fn hash_password_offloaded(&self, password: String) -> StorageResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| StorageError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// [`verify_password`](Self::verify_password) on the blocking thread pool.
    pub async fn verify_password_offloaded(
        &self,
        password: String,
        password_hash: String,
    ) -> StorageResult<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &password_hash))
            .await
            .map_err(|e| StorageError::Internal(format!("Verification task failed: {}", e)))
    }
}

/// Derive the stored marker for a card UID.
pub fn card_marker(uid: &CardUid) -> String {
    digest_hex(uid.as_str())
}

/// Marker stored for users enrolled without a card.
///
/// No reader request can produce it, since [`CardUid`] rejects empty input.
pub fn empty_card_marker() -> String {
    digest_hex("")
}

fn digest_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time marker comparison.
pub fn markers_match(stored: &str, candidate: &str) -> bool {
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(HashConfig::default().memory_kib(1024).iterations(1)).unwrap()
    }

    #[test]
    fn test_hash_config_defaults() {
        let config = HashConfig::default();
        assert_eq!(config.memory_kib, 19_456);
        assert_eq!(config.iterations, 2);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_hash_config_rejects_invalid_cost() {
        let result = CredentialHasher::new(HashConfig::default().memory_kib(1));
        assert!(matches!(result, Err(StorageError::Validation(_))));
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash_password("s3cret!!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("s3cret!!"));
        assert!(hasher.verify_password("s3cret!!", &hash));
        assert!(!hasher.verify_password("wrong", &hash));
    }

    #[test]
    fn test_salt_is_unique_per_hash() {
        let hasher = fast_hasher();
        let first = hasher.hash_password("same").unwrap();
        let second = hasher.hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_uses_cost_from_stored_hash() {
        let old = fast_hasher().hash_password("pw").unwrap();
        let current =
            CredentialHasher::new(HashConfig::default().memory_kib(2048).iterations(2)).unwrap();
        assert!(current.verify_password("pw", &old));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = fast_hasher();
        assert!(!hasher.verify_password("pw", ""));
        // Legacy HMAC-SHA256 hex digest
        assert!(!hasher.verify_password(
            "pw",
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        ));
    }

    #[tokio::test]
    async fn test_offloaded_hashing() {
        let hasher = fast_hasher();
        let hash = hasher
            .hash_password_offloaded("s3cret!!".to_string())
            .await
            .unwrap();
        assert!(
            hasher
                .verify_password_offloaded("s3cret!!".to_string(), hash)
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_card_marker_is_sha256_hex() {
        let uid = CardUid::new("04A1B2C3").unwrap();
        let marker = card_marker(&uid);
        assert_eq!(marker.len(), 64);
        assert!(marker.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(!marker.contains("04A1B2C3"));
        assert_eq!(marker, card_marker(&CardUid::new(" 04A1B2C3 ").unwrap()));
    }

    #[test]
    fn test_empty_card_marker() {
        assert_eq!(
            empty_card_marker(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_markers_match() {
        let marker = card_marker(&CardUid::new("123").unwrap());
        assert!(markers_match(&marker, &marker.clone()));
        assert!(!markers_match(&marker, &empty_card_marker()));
        assert!(!markers_match(&marker, ""));
    }
}
