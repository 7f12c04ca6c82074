//! Connection settings for the document store.
//!
//! Settings are resolved once at process start and handed to the
//! [`Inserter`](crate::services::inserter::Inserter) constructor.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the connection URI.
pub const CONNECTION_URI_VAR: &str = "MONGO_DB_URL";

/// Environment variable holding an optional CA bundle path.
pub const TLS_CA_FILE_VAR: &str = "MONGO_TLS_CA_FILE";

/// Upper bound on finding a reachable node before an operation fails.
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_millis(15_000);

const URI_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Validated settings for opening a secure store connection.
#[derive(Clone)]
pub struct MongoSettings {
    uri: String,
    server_selection_timeout: Duration,
    tls_ca_file: Option<PathBuf>,
}

impl MongoSettings {
    /// Validate a connection URI. Blank values are rejected as missing.
    pub fn new(uri: impl Into<String>) -> Result<Self, ConfigError> {
        let uri = uri.into();
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingVariable(CONNECTION_URI_VAR.to_string()));
        }
        if !URI_SCHEMES.iter().any(|scheme| trimmed.starts_with(scheme)) {
            return Err(ConfigError::InvalidConnectionString(format!(
                "expected a {} or {} URI",
                URI_SCHEMES[0], URI_SCHEMES[1]
            )));
        }

        Ok(Self {
            uri: trimmed.to_string(),
            server_selection_timeout: SERVER_SELECTION_TIMEOUT,
            tls_ca_file: None,
        })
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let uri = lookup(CONNECTION_URI_VAR)
            .ok_or_else(|| ConfigError::MissingVariable(CONNECTION_URI_VAR.to_string()))?;
        let settings = Self::new(uri)?;

        Ok(match lookup(TLS_CA_FILE_VAR).filter(|path| !path.trim().is_empty()) {
            Some(path) => settings.with_tls_ca_file(path),
            None => settings,
        })
    }

    pub fn with_tls_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca_file = Some(path.into());
        self
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn server_selection_timeout(&self) -> Duration {
        self.server_selection_timeout
    }

    pub fn tls_ca_file(&self) -> Option<&PathBuf> {
        self.tls_ca_file.as_ref()
    }
}

// The URI may embed credentials.
impl std::fmt::Debug for MongoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoSettings")
            .field("uri", &"<redacted>")
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("tls_ca_file", &self.tls_ca_file)
            .finish()
    }
}
