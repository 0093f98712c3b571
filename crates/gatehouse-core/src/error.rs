use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid card UID: {0}")]
    InvalidCardUid(String),

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),
}

pub type Result<T> = std::result::Result<T, Error>;
