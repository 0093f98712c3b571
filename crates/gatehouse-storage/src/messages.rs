//! Caller-facing messages for directory and gate operations
//!
//! All human-readable strings returned to callers live here so wording stays
//! consistent between the identity service, the card verifier and any
//! transport built on top of them.
//!
//! # Usage
//!
//! ```
//! use gatehouse_storage::messages::Messages;
//!
//! let message = Messages::LOGIN_SUCCESSFUL;
//! println!("{}", message); // "Login successful"
//! ```

/// Messages returned by the user directory.
///
/// # Anti-enumeration
///
/// [`Messages::INVALID_CREDENTIALS`] is the only text a failed login may
/// produce. It must not change depending on whether the identifier exists.
pub struct Messages;

impl Messages {
    /// Login succeeded.
    pub const LOGIN_SUCCESSFUL: &'static str = "Login successful";

    /// Login failed, for any reason.
    pub const INVALID_CREDENTIALS: &'static str = "Incorrect username or password";

    /// An update patch carried nothing from the allow-list.
    pub const NO_VALID_FIELDS: &'static str = "No valid fields provided";

    /// A card verification request carried no identifier.
    pub const CARD_UID_REQUIRED: &'static str = "uid required";

    /// Generic text for store failures shown to external callers.
    ///
    /// Details go to the server log, never to the caller.
    pub const INTERNAL_ERROR: &'static str = "internal";
}
