//! Operating system integration.
//!
//! Everything that touches Win32 lives under this module so the rest of the
//! crate stays free of `unsafe`. Other platforms get inert stand-ins: the
//! process is never elevated and no ODIS window is ever found.

#[cfg(windows)]
mod uia;

#[cfg(windows)]
pub use uia::{is_elevated, suppress_error_dialogs, UiaDesktop as SystemDesktop};

#[cfg(not(windows))]
pub use fallback::{is_elevated, suppress_error_dialogs, SystemDesktop};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("UI Automation is unavailable: {0}")]
    Automation(String),
}

#[cfg(not(windows))]
mod fallback {
    use super::PlatformError;
    use crate::ui::{Control, Desktop, Locator, UiWindow};

    pub fn is_elevated() -> bool {
        false
    }

    pub fn suppress_error_dialogs() {}

    #[derive(Debug, Default)]
    pub struct SystemDesktop;

    impl SystemDesktop {
        pub fn new() -> Result<Self, PlatformError> {
            Ok(Self)
        }
    }

    #[derive(Debug)]
    pub enum NoWindow {}

    #[derive(Debug)]
    pub enum NoControl {}

    impl Desktop for SystemDesktop {
        type Window = NoWindow;

        fn find_window(&self, title_prefix: &str) -> Option<NoWindow> {
            tracing::debug!(title_prefix, "no UI Automation on this platform");
            None
        }
    }

    impl UiWindow for NoWindow {
        type Control = NoControl;

        fn find(&self, _locator: &Locator) -> Option<NoControl> {
            match *self {}
        }
    }

    impl Control for NoControl {
        fn set_text(&self, _text: &str) -> Result<(), String> {
            match *self {}
        }

        fn click(&self) -> Result<(), String> {
            match *self {}
        }
    }

}
