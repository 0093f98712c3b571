//! Domain types shared by the Gatehouse crates: user ids, roles and raw card
//! identifiers, plus the defaults both the storage layer and the CLI use.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CardUid, Role, UserId};
