use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Numeric user identifier, assigned by the directory on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        UserId(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier that follows this one, or `None` at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(UserId(id)),
            None => None,
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = Error;

    /// Parse a decimal identifier, as it arrives in a request path.
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| Error::InvalidUserId(s.to_string()))
    }
}

/// Directory role of a user.
///
/// Serialized with the canonical names `admin`, `gatekeeper` and
/// `standard-user`. Parsing also accepts the legacy names found in older
/// snapshots (`portero`, `usuario`, `user`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Role {
    Admin,
    Gatekeeper,
    #[default]
    StandardUser,
}

impl Role {
    /// Canonical name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Gatekeeper => "gatekeeper",
            Role::StandardUser => "standard-user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "gatekeeper" | "portero" => Ok(Role::Gatekeeper),
            "standard-user" | "standard_user" | "user" | "usuario" => Ok(Role::StandardUser),
            _ => Err(Error::InvalidRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Role> for &'static str {
    fn from(role: Role) -> Self {
        role.as_str()
    }
}

/// Raw identifier read from a physical access card.
///
/// The identifier is trimmed on construction so the reader and the
/// enrollment path derive markers from the same bytes. It is never stored;
/// only its one-way marker is.
///
/// # Security
/// Comparison is constant-time, and `Debug` does not print the identifier.
#[derive(Clone, Eq)]
pub struct CardUid(String);

impl CardUid {
    /// Create a card UID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardUid` if the identifier is empty after
    /// trimming. Any other length is accepted; only the digest is stored.
    pub fn new(raw: &str) -> Result<Self> {
        let uid = raw.trim();

        if uid.is_empty() {
            return Err(Error::InvalidCardUid("card UID is required".to_string()));
        }

        Ok(CardUid(uid.to_string()))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CardUid(<{} bytes>)", self.0.len())
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardUid::new(s)
    }
}

impl PartialEq for CardUid {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}
