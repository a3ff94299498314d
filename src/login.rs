//! The ODIS login sequence.
//!
//! Stages run strictly in order and the first failing one ends the run. Each
//! stage maps to its own [`LoginError`] variant so the log tells which screen
//! was not reached.

use crate::{
    clock::{fresh_code, Clock, MIN_REMAINING_SECONDS},
    config::Credentials,
    ui::{Control, Desktop, Finder, LoginScreen, Timings, UiError},
};

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("ODIS is not running")]
    WindowNotFound(#[source] UiError),

    #[error("ODIS login fields are not found")]
    LoginFields(#[source] UiError),

    #[error("TOTP button is not found")]
    TotpButton(#[source] UiError),

    #[error("OTP parameters are not found on the screen")]
    OtpControls(#[source] UiError),

    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(#[from] crate::OtpError),
}

impl LoginError {
    /// The automation failure behind a stage error, if any
    pub fn ui_cause(&self) -> Option<&UiError> {
        match self {
            Self::WindowNotFound(e)
            | Self::LoginFields(e)
            | Self::TotpButton(e)
            | Self::OtpControls(e) => Some(e),
            Self::InvalidSecret(_) => None,
        }
    }
}

pub struct Authenticator<D, C> {
    desktop: D,
    clock: C,
    screen: LoginScreen,
    timings: Timings,
}

impl<D: Desktop, C: Clock> Authenticator<D, C> {
    pub fn new(desktop: D, clock: C) -> Self {
        Self {
            desktop,
            clock,
            screen: LoginScreen::default(),
            timings: Timings::default(),
        }
    }

    pub fn with_screen(mut self, screen: LoginScreen) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Drives the login screen from credentials entry to OTP confirmation.
    pub fn run(&self, credentials: &Credentials) -> Result<(), LoginError> {
        let finder = Finder::new(&self.clock, self.timings);
        let screen = &self.screen;

        let window = finder
            .window(&self.desktop, &screen.window_title_prefix)
            .map_err(LoginError::WindowNotFound)?;
        tracing::info!("ODIS window found");

        finder
            .set_text(&window, &screen.username, credentials.login())
            .and_then(|_| finder.set_text(&window, &screen.password, credentials.password()))
            .and_then(|_| finder.click(&window, &screen.credentials_button))
            .map_err(LoginError::LoginFields)?;
        tracing::info!(login = credentials.login(), "credentials submitted");

        finder
            .click(&window, &screen.totp_button)
            .map_err(LoginError::TotpButton)?;
        tracing::info!("TOTP login selected");

        let otp_field = finder
            .control(&window, &screen.otp)
            .and_then(|field| {
                finder
                    .control(&window, &screen.check_button)
                    .map(|_| field)
            })
            .map_err(LoginError::OtpControls)?;

        let code = fresh_code(credentials.totp(), &self.clock, MIN_REMAINING_SECONDS)?;

        otp_field
            .set_text(&code.to_string())
            .map_err(|reason| UiError::Action {
                action: "set text",
                locator: screen.otp.clone(),
                reason,
            })
            .and_then(|_| finder.click(&window, &screen.check_button))
            .map_err(LoginError::OtpControls)?;
        tracing::info!("one-time password submitted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::{Authenticator, LoginError};
    use crate::{
        clock::tests::FakeClock,
        config::Credentials,
        totp::Totp,
        ui::{
            tests::{Interaction, MockDesktop, MockWindow},
            LoginScreen, Timings, UiError,
        },
    };

    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const TITLE: &str = "Offboard Diagnostic Information System Service";

    #[fixture]
    fn credentials() -> Credentials {
        Credentials::new("mechanic", "hunter2", Totp::new(SECRET.to_string()))
    }

    #[fixture]
    fn screen() -> LoginScreen {
        LoginScreen::default()
    }

    fn full_window(screen: &LoginScreen) -> MockWindow {
        MockWindow::with_controls([
            &screen.username,
            &screen.password,
            &screen.credentials_button,
            &screen.totp_button,
            &screen.otp,
            &screen.check_button,
        ])
    }

    fn timings() -> Timings {
        Timings {
            find_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            after_click_wait: Duration::from_secs(1),
        }
    }

    fn authenticator(window: &MockWindow, now: u64) -> Authenticator<MockDesktop, FakeClock> {
        Authenticator::new(
            MockDesktop::with_window(TITLE, window.clone()),
            FakeClock::at(now),
        )
        .with_timings(timings())
    }

    #[rstest]
    fn fills_the_screen_in_order(credentials: Credentials, screen: LoginScreen) {
        let window = full_window(&screen);
        // two one-second clicks happen before the code is generated
        let now = 1_700_000_010 - 1_700_000_010 % 30 + 1;

        authenticator(&window, now).run(&credentials).unwrap();

        let code = credentials.totp().generate(now + 2).unwrap().to_string();
        assert_eq!(
            vec![
                Interaction::SetText(screen.username.clone(), "mechanic".to_string()),
                Interaction::SetText(screen.password.clone(), "hunter2".to_string()),
                Interaction::Click(screen.credentials_button.clone()),
                Interaction::Click(screen.totp_button.clone()),
                Interaction::SetText(screen.otp.clone(), code),
                Interaction::Click(screen.check_button.clone()),
            ],
            window.interactions()
        );
    }

    #[rstest]
    fn waits_for_a_fresh_code_near_rotation(credentials: Credentials, screen: LoginScreen) {
        let window = full_window(&screen);
        let period_start = 1_700_000_010 - 1_700_000_010 % 30;
        // after the two clicks the clock sits at 28s into the period
        let auth = authenticator(&window, period_start + 26);

        auth.run(&credentials).unwrap();

        let fresh = credentials
            .totp()
            .generate(period_start + 30)
            .unwrap()
            .to_string();
        assert!(window
            .interactions()
            .contains(&Interaction::SetText(screen.otp.clone(), fresh)));
    }

    #[rstest]
    fn window_missing(credentials: Credentials) {
        let auth = Authenticator::new(MockDesktop::default(), FakeClock::at(0))
            .with_timings(timings());

        let err = auth.run(&credentials).unwrap_err();

        assert!(matches!(err, LoginError::WindowNotFound(_)));
        assert_eq!("ODIS is not running", err.to_string());
    }

    #[rstest]
    #[case::username(|s: &LoginScreen| s.username.clone(), "ODIS login fields are not found")]
    #[case::password(|s: &LoginScreen| s.password.clone(), "ODIS login fields are not found")]
    #[case::credentials_button(|s: &LoginScreen| s.credentials_button.clone(), "ODIS login fields are not found")]
    #[case::totp_button(|s: &LoginScreen| s.totp_button.clone(), "TOTP button is not found")]
    #[case::otp(|s: &LoginScreen| s.otp.clone(), "OTP parameters are not found on the screen")]
    #[case::check_button(|s: &LoginScreen| s.check_button.clone(), "OTP parameters are not found on the screen")]
    fn missing_control_stops_the_run(
        credentials: Credentials,
        screen: LoginScreen,
        #[case] missing: fn(&LoginScreen) -> crate::ui::Locator,
        #[case] expected: &str,
    ) {
        let window = full_window(&screen);
        let missing = missing(&screen);
        window.remove(&missing);

        let err = authenticator(&window, 0).run(&credentials).unwrap_err();

        assert_eq!(expected, err.to_string());
        assert_eq!(Some(&UiError::ControlNotFound(missing)), err.ui_cause());
    }

    #[rstest]
    fn nothing_after_the_failing_stage(credentials: Credentials, screen: LoginScreen) {
        let window = full_window(&screen);
        window.remove(&screen.totp_button);

        authenticator(&window, 0).run(&credentials).unwrap_err();

        assert_eq!(
            Some(&Interaction::Click(screen.credentials_button.clone())),
            window.interactions().last()
        );
    }

    #[rstest]
    fn otp_not_typed_when_confirm_button_missing(credentials: Credentials, screen: LoginScreen) {
        let window = full_window(&screen);
        window.remove(&screen.check_button);

        authenticator(&window, 0).run(&credentials).unwrap_err();

        assert!(!window
            .interactions()
            .iter()
            .any(|i| matches!(i, Interaction::SetText(l, _) if *l == screen.otp)));
    }

    #[rstest]
    fn rejected_action_is_a_stage_failure(credentials: Credentials, screen: LoginScreen) {
        let window = full_window(&screen);
        window.fail_actions_on(screen.password.clone());

        let err = authenticator(&window, 0).run(&credentials).unwrap_err();

        assert!(matches!(
            err,
            LoginError::LoginFields(UiError::Action { action: "set text", .. })
        ));
    }
}
