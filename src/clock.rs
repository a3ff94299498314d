use std::{
    thread,
    time::{Duration, SystemTime},
};

use crate::{totp::Totp, OtpCode, OtpError};

/// Codes with less than this many seconds left are not submitted
pub const MIN_REMAINING_SECONDS: u64 = 5;

/// Source of wall-clock time and blocking waits.
pub trait Clock {
    /// Time elapsed since the UNIX epoch
    fn since_epoch(&self) -> Duration;

    /// Whole seconds since the UNIX epoch
    fn now(&self) -> u64 {
        self.since_epoch().as_secs()
    }

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn since_epoch(&self) -> Duration {
        // A clock set before 1970 yields the epoch itself
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Generates a code that stays valid for at least `min_remaining` seconds.
///
/// When the current period is about to roll over this waits for the next one
/// plus a second of slack and generates from the new time.
pub fn fresh_code<C: Clock + ?Sized>(
    totp: &Totp,
    clock: &C,
    min_remaining: u64,
) -> Result<OtpCode, OtpError> {
    let now = clock.now();
    let remaining = totp.remaining_seconds(now);

    if remaining < min_remaining {
        tracing::debug!(remaining, "TOTP period about to rotate, waiting for the next one");
        clock.sleep(Duration::from_secs(remaining + 1));
    }

    totp.generate(clock.now())
}
