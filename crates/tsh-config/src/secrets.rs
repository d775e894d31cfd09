//! Credential resolution and request signing.
//!
//! # Contract
//! - Settings store only **env var NAMES** under `credentials.*_env`.
//! - The binary calls [`resolve_credentials`] once at startup and hands the
//!   resulting [`Credentials`] to the adapters that need them.
//! - `Debug` on [`Credentials`] redacts every value. Errors name the env var,
//!   never its value.
//! - The signing key never leaves this module: callers get signatures from
//!   [`Credentials::sign`].

use std::fmt;

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::VenueMode;

type HmacSha256 = Hmac<Sha256>;

/// The signing key was refused by the MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningError(String);

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request signing failed: {}", self.0)
    }
}

impl std::error::Error for SigningError {}

/// Env var names as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialEnvNames {
    pub access_key_env: String,
    pub secret_env: String,
    pub passphrase_env: String,
    pub svc_account_id_env: String,
}

#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub passphrase: String,
    pub svc_account_id: String,
    signing_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"<REDACTED>")
            .field("passphrase", &"<REDACTED>")
            .field("svc_account_id", &"<REDACTED>")
            .field("signing_key", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        signing_key: impl Into<String>,
        passphrase: impl Into<String>,
        svc_account_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            passphrase: passphrase.into(),
            svc_account_id: svc_account_id.into(),
            signing_key: signing_key.into(),
        }
    }

    /// Placeholder set for paper mode, where nothing is signed for real.
    pub fn paper() -> Self {
        Self::new("paper", "paper", "paper", "paper")
    }

    /// base64(HMAC-SHA256(signing_key, payload)).
    pub fn sign(&self, payload: &str) -> Result<String, SigningError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.as_bytes())
            .map_err(|e| SigningError(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn required(var_name: &str, what: &str, mode: VenueMode) -> Result<String> {
    match resolve_env(var_name) {
        Some(v) => Ok(v),
        None => bail!(
            "SECRETS_MISSING mode={}: required env var '{}' ({}) is not set or empty",
            mode.as_str(),
            var_name,
            what,
        ),
    }
}

/// Resolve all credentials for `mode`.
///
/// | Mode  | Required                                              |
/// |-------|-------------------------------------------------------|
/// | prime | access key, signing key, passphrase, service account  |
/// | paper | nothing; placeholders are returned                    |
pub fn resolve_credentials(names: &CredentialEnvNames, mode: VenueMode) -> Result<Credentials> {
    match mode {
        VenueMode::Paper => Ok(Credentials::paper()),
        VenueMode::Prime => Ok(Credentials {
            access_key: required(&names.access_key_env, "access key", mode)?,
            signing_key: required(&names.secret_env, "signing key", mode)?,
            passphrase: required(&names.passphrase_env, "passphrase", mode)?,
            svc_account_id: required(&names.svc_account_id_env, "service account id", mode)?,
        }),
    }
}
