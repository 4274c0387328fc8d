//! Typed request and response bodies for the request layer.
//!
//! Field names follow what the browser extension sends and reads
//! (`dbPath`, `uuid`), every response is wrapped in an [`Envelope`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::config::{expand_home, ServiceConfig};
use keebridge_common::{EntrySummary, Error, Result};

/// Success/error wrapper shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed response carrying an error message.
    pub fn failure(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Body of `/unlock`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub password: Zeroizing<String>,
    #[serde(default)]
    pub keyfile: Option<String>,
}

impl UnlockRequest {
    /// Reject requests that cannot possibly open a vault.
    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() && self.keyfile_path().is_none() {
            return Err(Error::InvalidInput(
                "A password or key file is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Vault path to open, falling back to the configured default.
    pub fn vault_path(&self, config: &ServiceConfig) -> PathBuf {
        match self.db_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => expand_home(path),
            _ => config.default_vault_path.clone(),
        }
    }

    /// Key file path; an empty string means none.
    pub fn keyfile_path(&self) -> Option<PathBuf> {
        self.keyfile
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(expand_home)
    }
}

impl fmt::Debug for UnlockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockRequest")
            .field("db_path", &self.db_path)
            .field("password", &"[REDACTED]")
            .field("keyfile", &self.keyfile)
            .finish()
    }
}

/// Data returned by `/unlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub message: String,
    pub db_path: String,
}

/// Body of `/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub url: String,
}

impl SearchRequest {
    /// Reject blank URLs.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidInput("url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Data returned by `/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub entries: Vec<EntrySummary>,
}

/// Body of `/get-credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub uuid: String,
}

/// Data for endpoints that only report what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
