use chrono::{DateTime, Utc};
use gatehouse_core::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::legacy::{RawNewUser, RawUserPatch, RawUserRecord};
use crate::messages::Messages;

/// User record as held in the snapshot
///
/// This is the full (unsafe) view: it carries the password hash and must
/// only travel between the record store, the identity service and the card
/// verifier. Anything handed to an external caller goes through
/// [`UserRecord::to_safe`].
///
/// # Fields
///
/// * `id` - Numeric identifier, `max(existing) + 1` on creation, immutable
/// * `username` - Unique login name
/// * `email` - Unique email address, also accepted as a login identifier
/// * `password_hash` - Argon2id PHC string, never the raw password
/// * `phone` - Contact phone
/// * `department` - Organisational unit
/// * `role` - Directory role (default standard-user)
/// * `id_card_marker` - SHA-256 hex of the enrolled card UID
/// * `active` - Whether the account may log in and pass the gate
/// * `created_at` - Creation timestamp, set once
///
/// # Snapshot Format
///
/// Serialized with camelCase names (`passwordHash`, `idCardMarker`,
/// `createdAt`, ...). Deserialization always runs through
/// [`RawUserRecord`], which folds the legacy field names into this shape.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawUserRecord")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub department: String,
    pub role: Role,
    pub id_card_marker: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Project the record onto its externally safe view.
    ///
    /// This is the only place the password hash is dropped; every operation
    /// that returns a user to a caller goes through it.
    pub fn to_safe(&self) -> SafeUser {
        SafeUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            department: self.department.clone(),
            role: self.role,
            id_card_marker: self.id_card_marker.clone(),
            active: self.active,
            created_at: self.created_at,
        }
    }

    /// Returns `true` if `identifier` is this user's username or email.
    ///
    /// Matching is exact; callers normalize case before it reaches the store.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.username == identifier || self.email == identifier
    }

    /// Name shown on a reader when this user's card is accepted.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Safe projection of a [`UserRecord`]: every field except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub role: Role,
    pub id_card_marker: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for SafeUser {
    fn from(record: &UserRecord) -> Self {
        record.to_safe()
    }
}

/// Input for creating a user
///
/// Accepts either naming scheme when deserialized; see [`RawNewUser`].
/// Required text fields that are empty after trimming count as missing.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "RawNewUser")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub department: String,
    pub role: Option<Role>,
    /// Raw card UID to enroll; only its marker is stored
    pub card_uid: Option<String>,
    pub active: Option<bool>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        phone: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            phone: phone.into(),
            department: department.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_card_uid(mut self, uid: impl Into<String>) -> Self {
        self.card_uid = Some(uid.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Names of the required fields that are absent, in reporting order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("phone", &self.phone),
            ("department", &self.department),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("department", &self.department)
            .field("role", &self.role)
            .field("card_uid", &self.card_uid.as_ref().map(|_| "<redacted>"))
            .field("active", &self.active)
            .finish()
    }
}

/// Partial update of a user
///
/// Only allow-listed fields exist on this type, so anything else in an
/// incoming document (including `id`) is dropped while deserializing.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "RawUserPatch")]
pub struct UserPatch {
    /// New raw password; re-hashed before it reaches the store
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub username: Option<String>,
    /// New raw card UID; an empty string clears the enrollment
    pub card_uid: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn card_uid(mut self, uid: impl Into<String>) -> Self {
        self.card_uid = Some(uid.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.password.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.department.is_none()
            && self.username.is_none()
            && self.card_uid.is_none()
            && self.role.is_none()
            && self.active.is_none()
    }
}

impl fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPatch")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("department", &self.department)
            .field("username", &self.username)
            .field("card_uid", &self.card_uid.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("active", &self.active)
            .finish()
    }
}

/// Successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSuccess {
    pub message: &'static str,
    pub user: SafeUser,
}

impl LoginSuccess {
    pub fn new(user: SafeUser) -> Self {
        Self {
            message: Messages::LOGIN_SUCCESSFUL,
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn create_test_record() -> UserRecord {
        UserRecord {
            id: UserId::new(1),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            phone: "555".to_string(),
            department: "ops".to_string(),
            role: Role::StandardUser,
            id_card_marker: crate::crypto::empty_card_marker(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_safe_projection_excludes_exactly_the_password_hash() {
        let record = create_test_record();

        let full = serde_json::to_value(&record).unwrap();
        let safe = serde_json::to_value(record.to_safe()).unwrap();

        let full_keys: BTreeSet<_> = full.as_object().unwrap().keys().cloned().collect();
        let safe_keys: BTreeSet<_> = safe.as_object().unwrap().keys().cloned().collect();
        let excluded: Vec<_> = full_keys.difference(&safe_keys).cloned().collect();

        assert_eq!(excluded, vec!["passwordHash".to_string()]);
        assert!(safe_keys.is_subset(&full_keys));
        assert!(!safe.to_string().contains(&record.password_hash));
    }

    #[test]
    fn test_snapshot_field_names_are_canonical() {
        let value = serde_json::to_value(create_test_record()).unwrap();
        let keys: BTreeSet<_> = value.as_object().unwrap().keys().cloned().collect();
        let expected: BTreeSet<_> = [
            "id",
            "username",
            "email",
            "passwordHash",
            "phone",
            "department",
            "role",
            "idCardMarker",
            "active",
            "createdAt",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(keys, expected);
        assert_eq!(value["role"], "standard-user");
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let record = create_test_record();
        let debug = format!("{record:?}");
        assert!(!debug.contains(&record.password_hash));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn test_matches_identifier() {
        let record = create_test_record();
        assert!(record.matches_identifier("alice"));
        assert!(record.matches_identifier("a@x.com"));
        assert!(!record.matches_identifier("Alice"));
        assert!(!record.matches_identifier(""));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut record = create_test_record();
        assert_eq!(record.display_name(), "alice");
        record.username.clear();
        assert_eq!(record.display_name(), "a@x.com");
    }

    #[test]
    fn test_new_user_missing_fields() {
        let input = NewUser::new("alice", "", "pw", " ", "ops");
        assert_eq!(input.missing_fields(), vec!["email", "phone"]);

        let complete = NewUser::new("alice", "a@x.com", "pw", "555", "ops");
        assert!(complete.missing_fields().is_empty());

        assert_eq!(
            NewUser::default().missing_fields(),
            vec!["username", "email", "password", "phone", "department"]
        );
    }

    #[test]
    fn test_new_user_debug_redacts_secrets() {
        let input = NewUser::new("alice", "a@x.com", "s3cret!!", "555", "ops")
            .with_card_uid("04A1B2C3");
        let debug = format!("{input:?}");
        assert!(!debug.contains("s3cret!!"));
        assert!(!debug.contains("04A1B2C3"));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch::default().department("eng").is_empty());
        assert!(!UserPatch::default().active(false).is_empty());
    }

    #[test]
    fn test_login_success_message() {
        let success = LoginSuccess::new(create_test_record().to_safe());
        assert_eq!(success.message, "Login successful");
        let json = serde_json::to_value(&success).unwrap();
        assert!(json["user"].get("passwordHash").is_none());
    }
}
