//! Login / register form state

use tracing::debug;

use crate::account::AuthStore;
use crate::error::AuthError;
use crate::storage::KeyValueStore;

pub const DEFAULT_LANDING: &str = "/";

pub const MSG_LOGIN_REQUIRED: &str = "Email dan password wajib diisi.";
pub const MSG_REGISTER_REQUIRED: &str = "Semua field wajib diisi.";
pub const MSG_PASSWORD_MISMATCH: &str = "Password tidak cocok.";
pub const MSG_REGISTERED: &str = "Akun berhasil dibuat! Kamu sudah login.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Email,
    Password,
    ConfirmPassword,
}

/// Result of a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Authenticated, go to this path
    Redirect(String),
    /// Rejected, see `display_error`
    Stay,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    tab: Tab,
    username: String,
    email: String,
    password: String,
    confirm_password: String,
    show_password: bool,
    show_confirm_password: bool,
    local_error: Option<String>,
    store_error: Option<AuthError>,
    success: Option<String>,
    from: Option<String>,
}

impl LoginForm {
    /// `from` is the page the user was trying to reach before being sent here.
    pub fn new(from: Option<&str>) -> Self {
        Self {
            from: from.filter(|p| !p.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }

    pub fn redirect_target(&self) -> &str {
        self.from.as_deref().unwrap_or(DEFAULT_LANDING)
    }

    /// Someone already logged in never sees the form.
    pub fn initial_redirect<S: KeyValueStore>(&self, store: &AuthStore<S>) -> Option<String> {
        store
            .is_authenticated()
            .then(|| self.redirect_target().to_string())
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.clear_messages();
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::ConfirmPassword => self.confirm_password = value,
        }
        self.local_error = None;
        self.store_error = None;
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::ConfirmPassword => &self.confirm_password,
        }
    }

    pub fn toggle_password_visibility(&mut self) {
        self.show_password = !self.show_password;
    }

    pub fn toggle_confirm_visibility(&mut self) {
        self.show_confirm_password = !self.show_confirm_password;
    }

    /// Whether a password field renders masked. Other fields are never masked.
    pub fn is_masked(&self, field: Field) -> bool {
        match field {
            Field::Password => !self.show_password,
            Field::ConfirmPassword => !self.show_confirm_password,
            _ => false,
        }
    }

    /// Local validation errors win over errors reported by the store.
    pub fn display_error(&self) -> Option<String> {
        self.local_error
            .clone()
            .or_else(|| self.store_error.as_ref().map(|e| e.to_string()))
    }

    /// Last error reported by the store, if it has not been cleared by an edit
    pub fn store_error(&self) -> Option<&AuthError> {
        self.store_error.as_ref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    pub async fn submit<S: KeyValueStore>(&mut self, store: &mut AuthStore<S>) -> Outcome {
        match self.tab {
            Tab::Login => self.submit_login(store).await,
            Tab::Register => self.submit_register(store).await,
        }
    }

    async fn submit_login<S: KeyValueStore>(&mut self, store: &mut AuthStore<S>) -> Outcome {
        self.local_error = None;
        if self.email.is_empty() || self.password.is_empty() {
            self.local_error = Some(MSG_LOGIN_REQUIRED.to_string());
            return Outcome::Stay;
        }

        self.store_error = None;
        match store.login(&self.email, &self.password).await {
            Ok(_) => Outcome::Redirect(self.redirect_target().to_string()),
            Err(e) => {
                debug!("Login rejected: {}", e);
                self.store_error = Some(e);
                Outcome::Stay
            }
        }
    }

    async fn submit_register<S: KeyValueStore>(&mut self, store: &mut AuthStore<S>) -> Outcome {
        self.local_error = None;
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            self.local_error = Some(MSG_REGISTER_REQUIRED.to_string());
            return Outcome::Stay;
        }
        if self.password != self.confirm_password {
            self.local_error = Some(MSG_PASSWORD_MISMATCH.to_string());
            return Outcome::Stay;
        }

        self.store_error = None;
        match store
            .register(&self.username, &self.email, &self.password)
            .await
        {
            Ok(_) => {
                self.success = Some(MSG_REGISTERED.to_string());
                Outcome::Redirect(self.redirect_target().to_string())
            }
            Err(e) => {
                debug!("Registration rejected: {}", e);
                self.store_error = Some(e);
                Outcome::Stay
            }
        }
    }

    fn clear_messages(&mut self) {
        self.local_error = None;
        self.store_error = None;
        self.success = None;
    }
}
