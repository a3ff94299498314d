//! Clap config
use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser};
use odisauth::{
    app::Options,
    config::CONFIG_FILENAME,
    lock::MUTEX_NAME,
    logging::LOG_FILENAME,
    ui::Timings,
};

/// Logs into a running Offboard Diagnostic Information System with the
/// credentials and TOTP secret from the config file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Credentials file with ODIS_LOGIN, ODIS_PASSWORD and TOTP_SECURE
    #[arg(long, value_name = "PATH", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// File the errors are appended to
    #[arg(long, value_name = "PATH", default_value = LOG_FILENAME)]
    pub log_file: PathBuf,

    /// Seconds to wait for the ODIS window and each of its controls
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub find_timeout: u64,

    /// Seconds to let the screen settle after every click
    #[arg(long, value_name = "SECS", default_value_t = 1)]
    pub click_wait: u64,

    /// Run without administrator rights
    #[arg(long)]
    pub skip_admin_check: bool,

    /// Name of the single-instance mutex
    #[arg(long, value_name = "NAME", default_value = MUTEX_NAME)]
    pub mutex_name: String,

    /// Log more than errors (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn options(&self) -> Options {
        Options {
            config_path: self.config.clone(),
            mutex_name: self.mutex_name.clone(),
            require_admin: !self.skip_admin_check,
            timings: Timings {
                find_timeout: Duration::from_secs(self.find_timeout),
                after_click_wait: Duration::from_secs(self.click_wait),
                ..Timings::default()
            },
        }
    }
}
