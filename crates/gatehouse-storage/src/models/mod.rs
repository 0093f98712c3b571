mod legacy;
pub mod user;

pub use legacy::MalformedRecord;
pub use user::{LoginSuccess, NewUser, SafeUser, UserPatch, UserRecord};
