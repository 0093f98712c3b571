use std::sync::Arc;

use gatehouse_core::CardUid;
use serde::Serialize;
use tracing::{error, info};

use crate::crypto::{card_marker, markers_match};
use crate::error::{StorageError, StorageResult};
use crate::identity::IdentityService;
use crate::messages::Messages;
use crate::store::SnapshotStore;

/// Outcome of a card reader request
///
/// Serializes to the reader wire shape:
/// `{"status":"OK","user":"alice"}`, `{"status":"DENIED"}` or
/// `{"status":"ERROR","message":"internal"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum CardVerdict {
    /// Card is enrolled to an active user; carries the display name
    #[serde(rename = "OK")]
    Match { user: String },

    /// No active user holds this card
    #[serde(rename = "DENIED")]
    Denied,

    /// The directory could not be read
    #[serde(rename = "ERROR")]
    Error { message: &'static str },
}

impl CardVerdict {
    fn store_failure() -> Self {
        CardVerdict::Error {
            message: Messages::INTERNAL_ERROR,
        }
    }

    /// Returns true if the gate should open
    pub fn is_grant(&self) -> bool {
        matches!(self, CardVerdict::Match { .. })
    }
}

/// Card-to-identity gateway for access readers
///
/// # Verification Flow
///
/// 1. **Input**: Trim the raw UID; reject it if empty → `Validation`
/// 2. **Marker**: Derive the comparison marker with the enrollment hash
/// 3. **Lookup**: Read full records; a read failure → `ERROR`
/// 4. **Match**: Constant-time compare against every stored marker,
///    keeping the first active holder
/// 5. **Active**: No active holder (unenrolled, or only inactive) → `DENIED`
/// 6. **Grant**: Return the holder's display name → `OK`
///
/// Password hashes and raw UIDs never leave this type, and the raw UID is
/// never logged.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use gatehouse_storage::{CardVerifier, CredentialHasher, HashConfig, IdentityService};
/// use gatehouse_storage::store::{JsonFileStore, StoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = JsonFileStore::open(StoreConfig::default()).await?;
/// let hasher = CredentialHasher::new(HashConfig::default())?;
/// let directory = Arc::new(IdentityService::new(store, hasher));
/// let verifier = CardVerifier::new(directory);
///
/// let verdict = verifier.verify_card("04A1B2C3").await?;
/// println!("{}", serde_json::to_string(&verdict)?);
/// # Ok(())
/// # }
/// ```
pub struct CardVerifier<S> {
    directory: Arc<IdentityService<S>>,
}

impl<S> Clone for CardVerifier<S> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<S: SnapshotStore> CardVerifier<S> {
    /// Create a verifier over a shared directory
    pub fn new(directory: Arc<IdentityService<S>>) -> Self {
        Self { directory }
    }

    /// Resolve a raw card UID to a verdict
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` only for an empty UID. Any other
    /// UID gets a verdict; store failures are reported as
    /// [`CardVerdict::Error`], not as errors.
    pub async fn verify_card(&self, raw_uid: &str) -> StorageResult<CardVerdict> {
        // Step 1: Normalize input
        if raw_uid.trim().is_empty() {
            return Err(StorageError::Validation(
                Messages::CARD_UID_REQUIRED.to_string(),
            ));
        }
        let uid = CardUid::new(raw_uid)?;

        // Step 2: Derive marker
        let marker = card_marker(&uid);

        // Step 3: Full-record read
        let records = match self.directory.list_records().await {
            Ok(records) => records,
            Err(e) => {
                error!("Card verification failed to read the directory: {}", e);
                return Ok(CardVerdict::store_failure());
            }
        };

        // Step 4: Compare every marker so timing does not depend on position.
        // A card may be enrolled on several records; only active holders count.
        let mut matched = None;
        let mut inactive_holders = 0usize;
        for record in &records {
            if markers_match(&record.id_card_marker, &marker) {
                if !record.active {
                    inactive_holders += 1;
                } else if matched.is_none() {
                    matched = Some(record);
                }
            }
        }

        // Step 5: No active holder stays outside
        let Some(record) = matched else {
            if inactive_holders > 0 {
                info!("Card denied: enrolled only on inactive users");
            } else {
                info!("Card denied: not enrolled");
            }
            return Ok(CardVerdict::Denied);
        };

        // Step 6: Grant
        info!("Card granted to user {}", record.id);
        Ok(CardVerdict::Match {
            user: record.display_name().to_string(),
        })
    }
}
