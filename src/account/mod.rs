//! Local account system
//!
//! This module implements the browser-style account model with:
//! - A persisted, insertion-ordered list of accounts
//! - A single persisted session (the logged-in identity)
//! - Register / login / logout / profile update
//! - Optional Argon2 credential hashing

pub mod auth;
pub mod latency;
pub mod store;
pub mod types;

pub use auth::CredentialScheme;
pub use latency::LatencyPolicy;
pub use store::{AuthStore, StoreOptions};
pub use types::{Account, AccountId, ProfileUpdate, Session};
