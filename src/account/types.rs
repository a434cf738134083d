//! Account and session records as they are persisted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::CredentialScheme;

/// Account identifier - decimal millisecond timestamp assigned at registration
pub type AccountId = String;

/// A registered identity, credentials included
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// Plaintext, or an Argon2 PHC string when hashing is enabled
    pub password: String,
    /// How `password` was sealed. Absent on disk means plaintext.
    #[serde(default, skip_serializing_if = "CredentialScheme::is_plaintext")]
    pub credential_scheme: CredentialScheme,
    pub avatar: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// The logged-in identity: an account without its credential
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<&Account> for Session {
    fn from(account: &Account) -> Self {
        Session {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            avatar: account.avatar.clone(),
            joined_at: account.joined_at,
        }
    }
}

/// Partial profile edit. `None` leaves a field untouched.
///
/// `avatar` is doubly optional so an update can clear it (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.avatar.is_none()
    }

    pub fn apply_to_session(&self, session: &mut Session) {
        if let Some(username) = &self.username {
            session.username = username.clone();
        }
        if let Some(email) = &self.email {
            session.email = email.clone();
        }
        if let Some(avatar) = &self.avatar {
            session.avatar = avatar.clone();
        }
    }

    pub fn apply_to_account(&self, account: &mut Account) {
        if let Some(username) = &self.username {
            account.username = username.clone();
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(avatar) = &self.avatar {
            account.avatar = avatar.clone();
        }
    }
}
