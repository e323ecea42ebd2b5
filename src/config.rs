//! Connection configuration for the external lake service.
//!
//! The connection string is an explicit parameter handed to whatever
//! constructs a service client, never process-wide implicit state. It can be
//! supplied directly, read from the `STORAGE_CONNECTION_STRING` environment
//! variable, or loaded from a small JSON file; the environment wins when both
//! are present.

use std::fmt;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable holding the service connection string.
pub const CONNECTION_STRING_VAR: &str = "STORAGE_CONNECTION_STRING";

/// Configuration for connecting to a lake service.
#[derive(Clone)]
pub struct LakeConfig {
    connection_string: SecretString,
}

#[derive(Deserialize)]
struct ConfigFile {
    connection_string: String,
}

impl LakeConfig {
    /// Build a config from a connection string supplied by the caller.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: SecretString::from(connection_string.into()),
        }
    }

    /// Read the connection string from [`CONNECTION_STRING_VAR`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(CONNECTION_STRING_VAR)
    }

    /// Read the connection string from a named environment variable.
    pub fn from_env_var(name: &str) -> Result<Self> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(Self::new(value)),
            _ => Err(Error::Config(format!(
                "environment variable {name} is not set"
            ))),
        }
    }

    /// Load the connection string from a JSON config file.
    ///
    /// Expected shape: `{ "connection_string": "..." }`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))?;

        if file.connection_string.is_empty() {
            return Err(Error::Config(format!(
                "config file {} has an empty connection_string",
                path.display()
            )));
        }

        Ok(Self::new(file.connection_string))
    }

    /// Load from the environment, falling back to an optional config file.
    pub fn load(fallback_file: Option<&Path>) -> Result<Self> {
        match Self::from_env() {
            Ok(config) => Ok(config),
            Err(_) => match fallback_file {
                Some(path) => Self::from_file(path),
                None => Err(Error::Config(format!(
                    "no connection string: {CONNECTION_STRING_VAR} is unset and no config file was given"
                ))),
            },
        }
    }

    /// The raw connection string.
    pub fn connection_string(&self) -> &SecretString {
        &self.connection_string
    }

    /// Parse the connection string into its key/value fields.
    pub fn parsed(&self) -> Result<ConnectionString> {
        ConnectionString::parse(self.connection_string.expose_secret())
    }
}

impl fmt::Debug for LakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LakeConfig")
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

/// A parsed `Key=Value;Key=Value` connection string.
///
/// Parsing only; no authentication semantics. Values may themselves contain
/// `=` (base64 account keys do), so each segment splits on the first `=`.
#[derive(Clone)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = Vec::new();

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                // Segment content is not echoed: it may be secret material.
                return Err(Error::Config(
                    "malformed connection string segment (missing '=')".to_string(),
                ));
            };
            pairs.push((key.to_string(), value.to_string()));
        }

        if pairs.is_empty() {
            return Err(Error::Config("empty connection string".to_string()));
        }

        Ok(Self { pairs })
    }

    /// Look up a field by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The field keys, in the order they appeared.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys only; values may be secret material.
        f.debug_struct("ConnectionString")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}
