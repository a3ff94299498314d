//! One complete run: lock, privileges, credentials, login.

use std::path::PathBuf;

use crate::{
    clock::{Clock, SystemClock},
    config::{Credentials, CONFIG_FILENAME},
    lock::{InstanceLock, MUTEX_NAME},
    login::Authenticator,
    platform::{self, SystemDesktop},
    ui::{Desktop, Timings},
    Error, Result,
};

#[derive(Debug, Clone)]
pub struct Options {
    pub config_path: PathBuf,
    pub mutex_name: String,
    pub require_admin: bool,
    pub timings: Timings,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_FILENAME),
            mutex_name: MUTEX_NAME.to_string(),
            require_admin: true,
            timings: Timings::default(),
        }
    }
}

/// Runs the login against the real desktop.
pub fn run(options: &Options) -> Result<()> {
    run_with(options, platform::is_elevated(), SystemDesktop::new, SystemClock)
}

/// The desktop is only created once the credentials are known to be usable.
pub fn run_with<D, C, F, E>(
    options: &Options,
    elevated: bool,
    desktop: F,
    clock: C,
) -> Result<()>
where
    D: Desktop,
    C: Clock,
    F: FnOnce() -> std::result::Result<D, E>,
    Error: From<E>,
{
    let _lock = InstanceLock::acquire(&options.mutex_name)?;

    if options.require_admin && !elevated {
        return Err(Error::NotElevated);
    }

    let credentials = Credentials::load(&options.config_path)?;

    Authenticator::new(desktop()?, clock)
        .with_timings(options.timings)
        .run(&credentials)?;

    tracing::info!("login completed");

    Ok(())
}
