//! BannedUser helpers
//!
//! Builds the BannedUser marker resource for a UserSignup and checks whether
//! a user with the same email hash has been banned before.

#![deny(missing_docs)]

mod banned;
mod error;

pub use banned::{is_already_banned, new_banned_user, BannedUserLister, KubeBannedUserLister};
pub use error::BannedUserError;

/// Result type alias for banned-user operations
pub type Result<T> = std::result::Result<T, BannedUserError>;
