//! Test user records shared by the testusers crates.
#![allow(missing_docs)]

pub mod error;
pub mod user;

pub use error::{ModelError, Result as ModelResult};
pub use user::TestUser;

/// Domain used to build an email address for users that do not configure one.
pub const DEFAULT_EMAIL_DOMAIN: &str = "example.com";

/// Role every Drupal account carries implicitly; it is never assigned explicitly.
pub const AUTHENTICATED_ROLE: &str = "Authenticated";
