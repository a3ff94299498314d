//! Credentials file.
//!
//! The file is a flat JSON object:
//!
//! ```json
//! {
//!   "ODIS_LOGIN": "user",
//!   "ODIS_PASSWORD": "secret",
//!   "TOTP_SECURE": "JBSWY3DPEHPK3PXP"
//! }
//! ```
//!
//! `TOTP_SECURE` may also be a complete `otpauth://totp/...` URI.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{totp::Totp, OtpError};

pub const CONFIG_FILENAME: &str = "ODISAuth_config.json";

pub const LOGIN_KEY: &str = "ODIS_LOGIN";
pub const PASSWORD_KEY: &str = "ODIS_PASSWORD";
pub const TOTP_KEY: &str = "TOTP_SECURE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("file {} wasnt found in the current path", .0.display())]
    NotFound(PathBuf),

    #[error("could not read {}: {1}", .0.display())]
    Read(PathBuf, #[source] io::Error),

    #[error("could not parse {}: {1}", .0.display())]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("{}", unfilled_message(.0))]
    Unfilled(Vec<&'static str>),

    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(#[from] OtpError),
}

fn unfilled_message(keys: &[&str]) -> String {
    match keys {
        [key] => format!("param {key} is unfilled"),
        keys => {
            let quoted: Vec<String> = keys.iter().map(|key| format!("'{key}'")).collect();
            format!("params [{}] are unfilled", quoted.join(", "))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "ODIS_LOGIN")]
    login: Option<String>,
    #[serde(rename = "ODIS_PASSWORD")]
    password: Option<String>,
    #[serde(rename = "TOTP_SECURE")]
    totp_secure: Option<String>,
}

/// ODIS login, password and the TOTP generator built from the shared secret.
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: String,
    totp: Totp,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>, totp: Totp) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            totp,
        }
    }

    /// Reads and validates the credentials file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read(path.to_path_buf(), e),
        })?;

        let credentials = Self::from_json(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, source) => ConfigError::Parse(path.to_path_buf(), source),
                other => other,
            })?;

        tracing::debug!(path = %path.display(), "credentials loaded");

        Ok(credentials)
    }

    /// Parses credentials from the JSON text of a config file.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from(CONFIG_FILENAME), e))?;

        let missing: Vec<&'static str> = [
            (LOGIN_KEY, raw.login.is_none()),
            (PASSWORD_KEY, raw.password.is_none()),
            (TOTP_KEY, raw.totp_secure.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect();

        match (raw.login, raw.password, raw.totp_secure) {
            (Some(login), Some(password), Some(secret)) => {
                let totp = Totp::from_secret_or_uri(&secret)?;

                Ok(Self {
                    login,
                    password,
                    totp,
                })
            }
            _ => Err(ConfigError::Unfilled(missing)),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn totp(&self) -> &Totp {
        &self.totp
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .field("totp", &self.totp)
            .finish()
    }
}
