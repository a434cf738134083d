use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Corrupted data in slot '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// Failures reading the TOML config. A missing file is not an error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error reading config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Error parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures of the account/session store.
///
/// The `Display` text of the validation variants is the message shown to the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email sudah terdaftar.")]
    EmailTaken,
    #[error("Username sudah digunakan.")]
    UsernameTaken,
    #[error("Password minimal {min} karakter.")]
    PasswordTooShort { min: usize },
    #[error("Email atau password salah.")]
    InvalidCredentials,
    #[error("Kamu belum masuk.")]
    NotAuthenticated,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// True for the failures caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthError::EmailTaken
                | AuthError::UsernameTaken
                | AuthError::PasswordTooShort { .. }
                | AuthError::InvalidCredentials
                | AuthError::NotAuthenticated
        )
    }
}
