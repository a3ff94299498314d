//! Top-level error for a login run.
//!
//! Every stage has its own error enum; `Error` only wraps them so `main` can
//! report the failing stage as a single log line. Messages never carry the
//! password or the TOTP secret.

use crate::{
    config::ConfigError, lock::LockError, login::LoginError, platform::PlatformError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("admin rights required")]
    NotElevated,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Login(#[from] LoginError),
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
