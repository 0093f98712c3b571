//! User directory and card verification for the Gatehouse access system.
//!
//! This crate keeps the user directory in a single JSON snapshot and layers
//! credential handling and reader-side card matching on top of it.
//!
//! # Architecture
//!
//! - [`SnapshotStore`] - Durable home of the record sequence, with
//!   [`JsonFileStore`] for disk and [`MemorySnapshotStore`] for tests
//! - [`IdentityService`] - CRUD, uniqueness, login and safe projection
//! - [`CardVerifier`] - Resolves a reader's card UID to an `OK`/`DENIED`/`ERROR` verdict
//! - [`crypto`] - Argon2id password hashing and SHA-256 card markers
//!
//! # Core Concepts
//!
//! ## Canonical Schema
//!
//! Snapshots written by older deployments may carry Spanish or alternate
//! field names (`usuario`, `correo`, `contrasena`, `IDcard`, ...). They are
//! normalized once, on load, into [`UserRecord`]; the canonical name wins
//! when both are present. Every write uses canonical camelCase names only.
//!
//! ## Safe Projection
//!
//! Callers receive [`SafeUser`], which is [`UserRecord`] without its password
//! hash. Full records are only read inside this crate, by login and the card
//! verifier.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use gatehouse_storage::{CardVerifier, CredentialHasher, HashConfig, IdentityService, NewUser};
//! use gatehouse_storage::store::{JsonFileStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::open(StoreConfig::new("data/users.json")).await?;
//! let hasher = CredentialHasher::new(HashConfig::default())?;
//! let directory = Arc::new(IdentityService::new(store, hasher));
//!
//! directory
//!     .create(
//!         NewUser::new("alice", "a@x.com", "s3cret!!", "555", "ops")
//!             .with_card_uid("04A1B2C3"),
//!     )
//!     .await?;
//!
//! let verifier = CardVerifier::new(Arc::clone(&directory));
//! let verdict = verifier.verify_card("04A1B2C3").await?;
//! assert!(verdict.is_grant());
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! - Passwords are stored as Argon2id PHC strings with a per-record salt.
//! - Raw card UIDs are never stored or logged; only their SHA-256 marker is.
//! - Marker comparison uses constant-time equality via the `subtle` crate.
//! - Login failures are indistinguishable, and an unknown identifier still
//!   costs one hash.

pub mod crypto;
pub mod error;
pub mod identity;
pub mod messages;
pub mod models;
pub mod store;
pub mod verifier;

pub use crypto::{CredentialHasher, HashConfig};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use identity::IdentityService;
pub use messages::Messages;
pub use models::{LoginSuccess, NewUser, SafeUser, UserPatch, UserRecord};
pub use store::{JsonFileStore, MemorySnapshotStore, SnapshotStore, StoreConfig};
pub use verifier::{CardVerdict, CardVerifier};
