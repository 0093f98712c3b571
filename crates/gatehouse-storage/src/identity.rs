use chrono::Utc;
use gatehouse_core::constants::FIRST_USER_ID;
use gatehouse_core::{CardUid, UserId};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::crypto::{CredentialHasher, card_marker, empty_card_marker};
use crate::error::{StorageError, StorageResult};
use crate::messages::Messages;
use crate::models::{LoginSuccess, NewUser, SafeUser, UserPatch, UserRecord};
use crate::store::SnapshotStore;

/// User directory: CRUD, uniqueness, credentials and safe projection
///
/// Every operation reloads the snapshot before acting. Mutations run a full
/// load-modify-persist cycle under one service-wide lock, so concurrent
/// callers sharing a service never lose each other's updates. Separate
/// processes writing the same snapshot are not coordinated.
///
/// Records handed out are always detached copies; callers outside the crate
/// only ever receive [`SafeUser`] projections.
///
/// # Examples
///
/// ```no_run
/// use gatehouse_storage::{CredentialHasher, HashConfig, IdentityService, NewUser};
/// use gatehouse_storage::store::{JsonFileStore, StoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = JsonFileStore::open(StoreConfig::new("data/users.json")).await?;
/// let hasher = CredentialHasher::new(HashConfig::default())?;
/// let directory = IdentityService::new(store, hasher);
///
/// let alice = directory
///     .create(NewUser::new("alice", "a@x.com", "s3cret!!", "555", "ops"))
///     .await?;
/// let session = directory.login("alice", "s3cret!!").await?;
/// assert_eq!(session.user.id, alice.id);
/// # Ok(())
/// # }
/// ```
pub struct IdentityService<S> {
    store: S,
    hasher: CredentialHasher,
    write_lock: Mutex<()>,
}

impl<S: SnapshotStore> IdentityService<S> {
    /// Create a directory over a ready store
    pub fn new(store: S, hasher: CredentialHasher) -> Self {
        Self {
            store,
            hasher,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying snapshot store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a user
    ///
    /// # Errors
    ///
    /// - `MissingFields` listing every absent required field
    /// - `Conflict` if the username, then the email, is already taken
    /// - `Internal` if the store already holds the largest possible id
    pub async fn create(&self, input: NewUser) -> StorageResult<SafeUser> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(StorageError::MissingFields { fields: missing });
        }

        let id_card_marker = match input.card_uid.as_deref() {
            Some(raw) if !raw.trim().is_empty() => card_marker(&CardUid::new(raw)?),
            _ => empty_card_marker(),
        };
        let password_hash = self.hasher.hash_password_offloaded(input.password).await?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load().await?;

        ensure_unique(&records, None, Some(&input.username), Some(&input.email))?;

        let id = match records.iter().map(|r| r.id).max() {
            Some(max) => max
                .next()
                .ok_or_else(|| StorageError::Internal("user id space exhausted".to_string()))?,
            None => UserId::new(FIRST_USER_ID),
        };

        let record = UserRecord {
            id,
            username: input.username,
            email: input.email,
            password_hash,
            phone: input.phone,
            department: input.department,
            role: input.role.unwrap_or_default(),
            id_card_marker,
            active: input.active.unwrap_or(true),
            created_at: Utc::now(),
        };
        let safe = record.to_safe();

        records.push(record);
        self.store.persist(&records).await?;

        info!("Created user {} ({})", safe.id, safe.username);
        Ok(safe)
    }

    /// Authenticate by username or email
    ///
    /// Unknown identifiers, wrong passwords and inactive accounts all fail
    /// with the same `Authentication` error. An unknown identifier still
    /// costs one hash so timing does not reveal whether it exists.
    pub async fn login(&self, identifier: &str, password: &str) -> StorageResult<LoginSuccess> {
        let records = self.store.load().await?;

        let Some(record) = records.into_iter().find(|r| r.matches_identifier(identifier)) else {
            self.hasher
                .hash_password_offloaded(password.to_string())
                .await?;
            debug!("Login rejected: unknown identifier");
            return Err(StorageError::Authentication);
        };

        let verified = self
            .hasher
            .verify_password_offloaded(password.to_string(), record.password_hash.clone())
            .await?;

        if !verified {
            debug!("Login rejected for user {}: bad password", record.id);
            return Err(StorageError::Authentication);
        }

        if !record.active {
            debug!("Login rejected for user {}: inactive", record.id);
            return Err(StorageError::Authentication);
        }

        info!("User {} logged in", record.id);
        Ok(LoginSuccess::new(record.to_safe()))
    }

    /// Every user, as safe projections, in stored order
    pub async fn list(&self) -> StorageResult<Vec<SafeUser>> {
        let records = self.store.load().await?;
        Ok(records.iter().map(UserRecord::to_safe).collect())
    }

    /// Every user with all fields, including password hashes
    ///
    /// Only for in-crate consumers such as the card verifier.
    pub(crate) async fn list_records(&self) -> StorageResult<Vec<UserRecord>> {
        self.store.load().await
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: UserId) -> StorageResult<SafeUser> {
        let records = self.store.load().await?;
        records
            .iter()
            .find(|r| r.id == id)
            .map(UserRecord::to_safe)
            .ok_or_else(|| StorageError::user_not_found(id))
    }

    /// Apply a patch to a user
    ///
    /// `id` is never changed. A new password is hashed and a new card UID is
    /// turned into its marker before anything is stored; an empty card UID
    /// clears the enrollment.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `NotFound` if `id` is absent
    /// - `Validation` if the patch is empty or blanks the username or email
    /// - `Conflict` if the new username or email belongs to another user
    pub async fn update(&self, id: UserId, patch: UserPatch) -> StorageResult<SafeUser> {
        // Unknown ids fail before any hashing work is spent on them
        if !self.store.load().await?.iter().any(|r| r.id == id) {
            return Err(StorageError::user_not_found(id));
        }

        if patch.is_empty() {
            return Err(StorageError::Validation(Messages::NO_VALID_FIELDS.to_string()));
        }
        for (field, value) in [("username", &patch.username), ("email", &patch.email)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(StorageError::Validation(format!("{field} must not be empty")));
            }
        }

        let id_card_marker = match patch.card_uid.as_deref() {
            Some(raw) if raw.trim().is_empty() => Some(empty_card_marker()),
            Some(raw) => Some(card_marker(&CardUid::new(raw)?)),
            None => None,
        };
        let password_hash = match patch.password {
            Some(password) => Some(self.hasher.hash_password_offloaded(password).await?),
            None => None,
        };

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load().await?;

        // The record may have been deleted while the password was hashing
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StorageError::user_not_found(id))?;

        ensure_unique(
            &records,
            Some(id),
            patch.username.as_deref(),
            patch.email.as_deref(),
        )?;

        let record = &mut records[index];
        if let Some(hash) = password_hash {
            record.password_hash = hash;
        }
        if let Some(email) = patch.email {
            record.email = email;
        }
        if let Some(phone) = patch.phone {
            record.phone = phone;
        }
        if let Some(department) = patch.department {
            record.department = department;
        }
        if let Some(username) = patch.username {
            record.username = username;
        }
        if let Some(marker) = id_card_marker {
            record.id_card_marker = marker;
        }
        if let Some(role) = patch.role {
            record.role = role;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        let safe = record.to_safe();

        self.store.persist(&records).await?;

        info!("Updated user {}", id);
        Ok(safe)
    }

    /// Remove a user, returning what was removed
    pub async fn delete(&self, id: UserId) -> StorageResult<SafeUser> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load().await?;

        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StorageError::user_not_found(id))?;

        let removed = records.remove(index);
        self.store.persist(&records).await?;

        info!("Deleted user {} ({})", removed.id, removed.username);
        Ok(removed.to_safe())
    }
}

/// Check username then email against every record except `exclude`.
fn ensure_unique(
    records: &[UserRecord],
    exclude: Option<UserId>,
    username: Option<&str>,
    email: Option<&str>,
) -> StorageResult<()> {
    let others = || records.iter().filter(move |r| Some(r.id) != exclude);

    if let Some(username) = username
        && others().any(|r| r.username == username)
    {
        return Err(StorageError::Conflict {
            field: "username",
            value: username.to_string(),
        });
    }

    if let Some(email) = email
        && others().any(|r| r.email == email)
    {
        return Err(StorageError::Conflict {
            field: "email",
            value: email.to_string(),
        });
    }

    Ok(())
}
