//! Headless view-models for the auth-gated parts of the UI.
//! They own no state beyond form input; the session comes from [`crate::account::AuthStore`].

pub mod login;
pub mod nav;

pub use login::{Field, LoginForm, Outcome, Tab};
pub use nav::{nav_items, NavId, NavItem};
