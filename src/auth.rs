//! Auth-domain types: redacted token secrets, session credentials, and refresh wire payloads.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
