//! Shared constants for the Gatehouse user directory.
//!
//! Defaults for the snapshot location and credential hashing cost live here so
//! the storage layer and the CLI agree on them.
//!
//! # Usage
//!
//! ```
//! use gatehouse_core::constants::*;
//!
//! assert_eq!(DEFAULT_SNAPSHOT_PATH, "data/users.json");
//! assert_eq!(DEFAULT_HASH_PARALLELISM, 1);
//! ```

// ============================================================================
// Snapshot Storage
// ============================================================================

/// Default location of the user snapshot document.
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/users.json";

/// Suffix of the sibling file a snapshot is staged in before it is renamed
/// over the live document.
pub const SNAPSHOT_STAGING_SUFFIX: &str = "tmp";

/// Identifier assigned to the first record of an empty store.
pub const FIRST_USER_ID: u64 = 1;

// ============================================================================
// Credential Hashing (Argon2id)
// ============================================================================

/// Default Argon2 memory cost in KiB (19 MiB, the argon2 crate default).
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;

/// Default Argon2 time cost (number of passes).
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;

/// Default Argon2 degree of parallelism (lanes).
pub const DEFAULT_HASH_PARALLELISM: u32 = 1;
