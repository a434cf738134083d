//! Account storage and session management

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, warn};

use super::auth::CredentialScheme;
use super::latency::LatencyPolicy;
use super::types::{Account, ProfileUpdate, Session};
use crate::config::AppConfig;
use crate::error::AuthError;
use crate::storage::{get_json, put_json, KeyValueStore};

pub const ACCOUNTS_SLOT: &str = "users";
pub const SESSION_SLOT: &str = "auth";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub latency: LatencyPolicy,
    pub min_password_len: usize,
    pub scheme: CredentialScheme,
    /// Namespace for the slot keys, e.g. `animeplay_` gives `animeplay_users`
    pub key_prefix: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            latency: LatencyPolicy::None,
            min_password_len: 6,
            scheme: CredentialScheme::Plaintext,
            key_prefix: "animeplay_".to_string(),
        }
    }
}

impl From<&AppConfig> for StoreOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            latency: config.auth.latency(),
            min_password_len: config.auth.min_password_len,
            scheme: CredentialScheme::from_hashing(config.auth.hash_passwords),
            key_prefix: config.storage.key_prefix.clone(),
        }
    }
}

/// Owner of the persisted account list and the current session
pub struct AuthStore<S: KeyValueStore> {
    storage: S,
    options: StoreOptions,
    session: Option<Session>,
    accounts_key: String,
    session_key: String,
    clock: fn() -> DateTime<Utc>,
    last_id: i64,
}

impl<S: KeyValueStore> AuthStore<S> {
    /// Store with default options (no latency, plaintext credentials)
    pub fn new(storage: S) -> Self {
        Self::with_options(storage, StoreOptions::default())
    }

    /// Create the store and restore whatever session was last persisted
    pub fn with_options(storage: S, options: StoreOptions) -> Self {
        let accounts_key = format!("{}{}", options.key_prefix, ACCOUNTS_SLOT);
        let session_key = format!("{}{}", options.key_prefix, SESSION_SLOT);

        let session = match get_json::<_, Session>(&storage, &session_key) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable session: {}", e);
                None
            }
        };
        if let Some(s) = &session {
            debug!("Restored session for {}", s.username);
        }

        Self {
            storage,
            options,
            session,
            accounts_key,
            session_key,
            clock: Utc::now,
            last_id: 0,
        }
    }

    /// Replace the wall clock used for ids and `joinedAt`
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// All registered accounts in registration order
    pub fn accounts(&self) -> Vec<Account> {
        match get_json::<_, Vec<Account>>(&self.storage, &self.accounts_key) {
            Ok(accounts) => accounts.unwrap_or_default(),
            Err(e) => {
                warn!("Treating unreadable account list as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Create an account and log it in
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.options.latency.wait().await;

        let mut accounts = self.accounts();
        if accounts.iter().any(|a| a.email == email) {
            return Err(AuthError::EmailTaken);
        }
        if accounts.iter().any(|a| a.username == username) {
            return Err(AuthError::UsernameTaken);
        }
        if password.chars().count() < self.options.min_password_len {
            return Err(AuthError::PasswordTooShort {
                min: self.options.min_password_len,
            });
        }

        let now = (self.clock)().trunc_subsecs(3);
        let account = Account {
            id: self.next_id(now, &accounts),
            username: username.to_string(),
            email: email.to_string(),
            password: self.options.scheme.seal(password)?,
            credential_scheme: self.options.scheme,
            avatar: None,
            joined_at: now,
        };
        let session = Session::from(&account);

        // Account list first, session last: a failed session write leaves no orphan account
        let previous = self.snapshot_accounts();
        accounts.push(account);
        put_json(&self.storage, &self.accounts_key, &accounts)?;
        if let Err(e) = put_json(&self.storage, &self.session_key, &session) {
            self.restore_accounts(previous);
            return Err(e.into());
        }

        info!("Registered account {} ({})", session.username, session.id);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Authenticate by email and password
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.options.latency.wait().await;

        let accounts = self.accounts();
        let found = accounts
            .iter()
            .find(|a| a.email == email && a.credential_scheme.verify(password, &a.password))
            .ok_or(AuthError::InvalidCredentials)?;

        let session = Session::from(found);
        put_json(&self.storage, &self.session_key, &session)?;

        info!("Logged in {}", session.username);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Forget the current session. Never fails.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.remove(&self.session_key) {
            warn!("Failed to clear persisted session: {}", e);
        }
        if let Some(s) = self.session.take() {
            info!("Logged out {}", s.username);
        }
    }

    /// Merge `update` into the session and the matching account.
    ///
    /// Uniqueness of username/email is not re-checked here.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<Session, AuthError> {
        let mut session = self.session.clone().ok_or(AuthError::NotAuthenticated)?;
        update.apply_to_session(&mut session);

        // Same order as register: accounts, then session, rolling accounts back on failure
        let mut accounts = self.accounts();
        let previous = match accounts.iter_mut().find(|a| a.id == session.id) {
            Some(account) => {
                update.apply_to_account(account);
                let previous = self.snapshot_accounts();
                put_json(&self.storage, &self.accounts_key, &accounts)?;
                previous
            }
            None => {
                warn!("Session {} has no matching account record", session.id);
                None
            }
        };
        if let Err(e) = put_json(&self.storage, &self.session_key, &session) {
            self.restore_accounts(previous);
            return Err(e.into());
        }

        debug!("Updated profile of {}", session.id);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Raw account slot, `None` when it cannot be read back for a rollback
    fn snapshot_accounts(&self) -> Option<Option<String>> {
        self.storage.get(&self.accounts_key).ok()
    }

    fn restore_accounts(&self, previous: Option<Option<String>>) {
        let result = match previous {
            Some(Some(raw)) => self.storage.set(&self.accounts_key, &raw),
            Some(None) => self.storage.remove(&self.accounts_key),
            None => return,
        };
        if let Err(e) = result {
            warn!("Failed to roll back account list: {}", e);
        }
    }

    /// Millisecond timestamp id, bumped past anything already issued or stored
    fn next_id(&mut self, now: DateTime<Utc>, accounts: &[Account]) -> String {
        let mut candidate = now.timestamp_millis().max(self.last_id + 1);
        while accounts.iter().any(|a| a.id == candidate.to_string()) {
            candidate += 1;
        }
        self.last_id = candidate;
        candidate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::auth::hash_password;
    use crate::error::StorageError;
    use crate::storage::{FileStorage, MemoryStorage};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn store() -> AuthStore<MemoryStorage> {
        AuthStore::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let mut store = store();
        let session = store.register("ann", "ann@x.com", "secret1").await.unwrap();

        assert_eq!(session.username, "ann");
        assert_eq!(session.email, "ann@x.com");
        assert_eq!(session.avatar, None);
        assert_eq!(store.current_session(), Some(&session));

        let accounts = store.accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, session.id);
        assert_eq!(accounts[0].password, "secret1");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let err = store.register("bob", "ann@x.com", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(err.to_string(), "Email sudah terdaftar.");
        assert_eq!(store.accounts().len(), 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let err = store.register("ann", "other@x.com", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(store.accounts().len(), 1);
    }

    #[tokio::test]
    async fn test_register_checks_email_before_username_and_length() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let err = store.register("ann", "ann@x.com", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));

        let err = store.register("ann", "new@x.com", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let mut store = store();
        let err = store.register("ann", "ann@x.com", "12345").await.unwrap_err();

        assert!(matches!(err, AuthError::PasswordTooShort { min: 6 }));
        assert!(store.accounts().is_empty());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_counts_characters_not_bytes() {
        let mut store = store();
        // 5 characters, 10 bytes
        let err = store.register("ann", "ann@x.com", "ééééé").await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordTooShort { .. }));
        store.register("ann", "ann@x.com", "éééééé").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_scenario() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        store.logout();

        let err = store.login("ann@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Email atau password salah.");
        assert!(!store.is_authenticated());

        let session = store.login("ann@x.com", "secret1").await.unwrap();
        assert_eq!(session.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_login_unknown_email_same_message() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let unknown = store.login("nobody@x.com", "secret1").await.unwrap_err();
        let wrong = store.login("ann@x.com", "secret2").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let mut store = store();
        let session = store.register("ann", "ann@x.com", "secret1").await.unwrap();

        store.login("ann@x.com", "nope").await.unwrap_err();
        assert_eq!(store.current_session(), Some(&session));
    }

    #[tokio::test]
    async fn test_register_logout_login_round_trip() {
        let mut store = store();
        let registered = store.register("ann", "ann@x.com", "secret1").await.unwrap();
        store.logout();
        let logged_in = store.login("ann@x.com", "secret1").await.unwrap();

        assert_eq!(registered, logged_in);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut store = AuthStore::new(storage.clone());
        store.logout();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        store.logout();
        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(storage.get("animeplay_auth").unwrap(), None);
        // Accounts survive logout
        assert_eq!(store.accounts().len(), 1);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let storage = MemoryStorage::new();
        let session = {
            let mut store = AuthStore::new(storage.clone());
            store.register("ann", "ann@x.com", "secret1").await.unwrap()
        };

        let restarted = AuthStore::new(storage.clone());
        assert_eq!(restarted.current_session(), Some(&session));

        let mut store = restarted;
        store.logout();
        assert!(AuthStore::new(storage).current_session().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_merges() {
        let mut store = store();
        let before = store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let after = store
            .update_profile(ProfileUpdate::new().avatar(Some("cat.png".to_string())))
            .unwrap();
        assert_eq!(after.avatar.as_deref(), Some("cat.png"));
        assert_eq!(after.username, before.username);
        assert_eq!(after.email, before.email);
        assert_eq!(after.joined_at, before.joined_at);

        let account = &store.accounts()[0];
        assert_eq!(account.avatar.as_deref(), Some("cat.png"));
        assert_eq!(account.password, "secret1");
        assert_eq!(store.current_session(), Some(&after));
    }

    #[tokio::test]
    async fn test_update_profile_skips_uniqueness() {
        let mut store = store();
        store.register("bob", "bob@x.com", "secret1").await.unwrap();
        store.logout();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        let session = store.update_profile(ProfileUpdate::new().username("bob")).unwrap();
        assert_eq!(session.username, "bob");
        let bobs = store.accounts().iter().filter(|a| a.username == "bob").count();
        assert_eq!(bobs, 2);
    }

    #[tokio::test]
    async fn test_update_profile_changes_login_email() {
        let mut store = store();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        store.update_profile(ProfileUpdate::new().email("ann@y.com")).unwrap();
        store.logout();

        assert!(store.login("ann@x.com", "secret1").await.is_err());
        assert_eq!(store.login("ann@y.com", "secret1").await.unwrap().username, "ann");
    }

    #[test]
    fn test_update_profile_requires_session() {
        let mut store = store();
        let err = store.update_profile(ProfileUpdate::new().username("x")).unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_update_profile_without_account_record() {
        let storage = MemoryStorage::new();
        let mut store = AuthStore::new(storage.clone());
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        storage.remove("animeplay_users").unwrap();

        let session = store.update_profile(ProfileUpdate::new().username("anna")).unwrap();
        assert_eq!(session.username, "anna");
        assert!(store.accounts().is_empty());
    }

    #[tokio::test]
    async fn test_ids_unique_with_stalled_clock() {
        let mut store = store().with_clock(fixed_clock);
        let a = store.register("a", "a@x.com", "secret1").await.unwrap();
        let b = store.register("b", "b@x.com", "secret1").await.unwrap();

        assert_eq!(a.id, "1700000000000");
        assert_eq!(b.id, "1700000000001");
    }

    #[tokio::test]
    async fn test_ids_skip_persisted_ids_after_restart() {
        let storage = MemoryStorage::new();
        AuthStore::new(storage.clone())
            .with_clock(fixed_clock)
            .register("a", "a@x.com", "secret1")
            .await
            .unwrap();

        let mut restarted = AuthStore::new(storage).with_clock(fixed_clock);
        let b = restarted.register("b", "b@x.com", "secret1").await.unwrap();
        assert_eq!(b.id, "1700000000001");
    }

    #[tokio::test]
    async fn test_corrupted_slots_read_as_empty() {
        let storage = MemoryStorage::new();
        storage.set("animeplay_users", "not json").unwrap();
        storage.set("animeplay_auth", "[1, 2").unwrap();

        let mut store = AuthStore::new(storage);
        assert!(!store.is_authenticated());
        assert!(store.accounts().is_empty());

        // Registration overwrites the broken list
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        assert_eq!(store.accounts().len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_restart() {
        let dir = tempfile::tempdir().unwrap();
        let registered = {
            let mut store = AuthStore::new(FileStorage::new(dir.path()).unwrap());
            store.register("ann", "ann@x.com", "secret1").await.unwrap()
        };
        assert!(dir.path().join("animeplay_users.json").exists());

        let mut store = AuthStore::new(FileStorage::new(dir.path()).unwrap());
        assert_eq!(store.current_session(), Some(&registered));

        store.logout();
        assert!(!dir.path().join("animeplay_auth.json").exists());
        assert_eq!(store.login("ann@x.com", "secret1").await.unwrap(), registered);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let storage = MemoryStorage::new();
        let options = StoreOptions {
            key_prefix: "other_".to_string(),
            ..StoreOptions::default()
        };
        let mut store = AuthStore::with_options(storage.clone(), options);
        store.register("ann", "ann@x.com", "secret1").await.unwrap();

        assert!(storage.get("other_users").unwrap().is_some());
        assert!(storage.get("other_auth").unwrap().is_some());
        assert!(storage.get("animeplay_users").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hashed_credentials() {
        let options = StoreOptions {
            scheme: CredentialScheme::Argon2,
            ..StoreOptions::default()
        };
        let mut store = AuthStore::with_options(MemoryStorage::new(), options);
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        assert!(store.accounts()[0].password.starts_with("$argon2"));

        store.logout();
        assert!(store.login("ann@x.com", "secret2").await.is_err());
        assert_eq!(store.login("ann@x.com", "secret1").await.unwrap().username, "ann");
    }

    #[tokio::test]
    async fn test_plaintext_password_shaped_like_a_hash() {
        let literal = hash_password("other").unwrap();
        let mut store = store();
        store.register("ann", "ann@x.com", &literal).await.unwrap();
        store.logout();

        assert!(store.login("ann@x.com", "other").await.is_err());
        assert_eq!(store.login("ann@x.com", &literal).await.unwrap().username, "ann");
    }

    #[tokio::test]
    async fn test_hashed_accounts_verify_after_hashing_is_turned_off() {
        let storage = MemoryStorage::new();
        let options = StoreOptions {
            scheme: CredentialScheme::Argon2,
            ..StoreOptions::default()
        };
        let mut hashed = AuthStore::with_options(storage.clone(), options);
        let stored = hashed.register("ann", "ann@x.com", "secret1").await.unwrap();
        hashed.logout();

        let mut plain = AuthStore::new(storage);
        let password_hash = plain.accounts()[0].password.clone();
        assert!(plain.login("ann@x.com", &password_hash).await.is_err());
        assert_eq!(plain.login("ann@x.com", "secret1").await.unwrap(), stored);
    }

    /// Memory storage whose writes to one key can be made to fail
    #[derive(Clone, Default)]
    struct FailingStorage {
        inner: MemoryStorage,
        broken_key: Arc<Mutex<Option<String>>>,
    }

    impl FailingStorage {
        fn break_key(&self, key: &str) {
            *self.broken_key.lock().unwrap() = Some(key.to_string());
        }

        fn check(&self, key: &str) -> Result<(), StorageError> {
            if self.broken_key.lock().unwrap().as_deref() == Some(key) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FailingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    fn persisted_session(storage: &FailingStorage) -> Option<Session> {
        get_json(storage, "animeplay_auth").unwrap()
    }

    #[tokio::test]
    async fn test_register_failed_session_write_leaves_no_account() {
        let storage = FailingStorage::default();
        let mut store = AuthStore::new(storage.clone());
        store.register("bob", "bob@x.com", "secret1").await.unwrap();
        store.logout();

        storage.break_key("animeplay_auth");
        let err = store.register("ann", "ann@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));

        let usernames: Vec<_> = store.accounts().into_iter().map(|a| a.username).collect();
        assert_eq!(usernames, ["bob"]);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_first_register_failure_removes_account_slot() {
        let storage = FailingStorage::default();
        storage.break_key("animeplay_auth");
        let mut store = AuthStore::new(storage.clone());

        store.register("ann", "ann@x.com", "secret1").await.unwrap_err();
        assert_eq!(storage.get("animeplay_users").unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_profile_failed_account_write_changes_nothing() {
        let storage = FailingStorage::default();
        let mut store = AuthStore::new(storage.clone());
        let before = store.register("ann", "ann@x.com", "secret1").await.unwrap();

        storage.break_key("animeplay_users");
        let err = store.update_profile(ProfileUpdate::new().username("anna")).unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));

        assert_eq!(store.current_session(), Some(&before));
        assert_eq!(persisted_session(&storage), Some(before));
        assert_eq!(store.accounts()[0].username, "ann");
    }

    #[tokio::test]
    async fn test_update_profile_failed_session_write_rolls_back_account() {
        let storage = FailingStorage::default();
        let mut store = AuthStore::new(storage.clone());
        let before = store.register("ann", "ann@x.com", "secret1").await.unwrap();

        storage.break_key("animeplay_auth");
        store.update_profile(ProfileUpdate::new().username("anna")).unwrap_err();

        assert_eq!(store.current_session(), Some(&before));
        assert_eq!(persisted_session(&storage), Some(before));
        assert_eq!(store.accounts()[0].username, "ann");
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_applies_to_register_and_login() {
        let options = StoreOptions {
            latency: LatencyPolicy::Fixed(Duration::from_millis(600)),
            ..StoreOptions::default()
        };
        let mut store = AuthStore::with_options(MemoryStorage::new(), options);

        let start = tokio::time::Instant::now();
        store.register("ann", "ann@x.com", "secret1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(600));

        let start = tokio::time::Instant::now();
        store.login("ann@x.com", "bad").await.unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(600));

        let start = tokio::time::Instant::now();
        store.logout();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
