//! Driver contract between the login flow and a desktop automation backend.
//!
//! A [`Desktop`] finds top-level windows, a [`UiWindow`] finds descendant
//! controls by [`Locator`], and a [`Control`] accepts text or a click. The
//! [`Finder`] adds the implicit waits: lookups are polled until the find
//! timeout expires, and every click is followed by a short settle delay.

use std::{fmt, time::Duration};

use crate::clock::Clock;

pub const WINDOW_TITLE_PREFIX: &str = "Offboard Diagnostic Information System";

pub const PROVIDE_CREDENTIALS_BUTTON_TITLE: &str = "ВХОД ПО ЛОГИНУ / ПАРОЛЮ";
pub const USE_TOTP_BUTTON_TITLE: &str = "ВХОД С TOTP";
pub const CHECK_TOTP_BUTTON_TITLE: &str = "ПРОВЕРИТЬ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRole {
    Edit,
    Button,
}

impl fmt::Display for ControlRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit => write!(f, "Edit"),
            Self::Button => write!(f, "Button"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    AutomationId { id: String, role: ControlRole },
    Title { title: String, role: ControlRole },
}

impl Locator {
    pub fn automation_id(id: impl Into<String>, role: ControlRole) -> Self {
        Self::AutomationId {
            id: id.into(),
            role,
        }
    }

    pub fn title(title: impl Into<String>, role: ControlRole) -> Self {
        Self::Title {
            title: title.into(),
            role,
        }
    }

    pub fn role(&self) -> ControlRole {
        match self {
            Self::AutomationId { role, .. } | Self::Title { role, .. } => *role,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutomationId { id, role } => write!(f, "{role} with automation id '{id}'"),
            Self::Title { title, role } => write!(f, "{role} titled '{title}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UiError {
    #[error("no window titled '{0}*'")]
    WindowNotFound(String),

    #[error("{0} not found")]
    ControlNotFound(Locator),

    #[error("{action} on {locator} failed: {reason}")]
    Action {
        action: &'static str,
        locator: Locator,
        reason: String,
    },
}

pub trait Control {
    fn set_text(&self, text: &str) -> Result<(), String>;

    fn click(&self) -> Result<(), String>;
}

pub trait UiWindow {
    type Control: Control;

    fn find(&self, locator: &Locator) -> Option<Self::Control>;
}

pub trait Desktop {
    type Window: UiWindow;

    /// Returns the first top-level window whose title starts with `title_prefix`
    fn find_window(&self, title_prefix: &str) -> Option<Self::Window>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub find_timeout: Duration,
    pub poll_interval: Duration,
    pub after_click_wait: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            find_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            after_click_wait: Duration::from_secs(1),
        }
    }
}

/// Identifiers of the ODIS login screen controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginScreen {
    pub window_title_prefix: String,
    pub username: Locator,
    pub password: Locator,
    pub credentials_button: Locator,
    pub totp_button: Locator,
    pub otp: Locator,
    pub check_button: Locator,
}

impl Default for LoginScreen {
    fn default() -> Self {
        Self {
            window_title_prefix: WINDOW_TITLE_PREFIX.to_string(),
            username: Locator::automation_id("username", ControlRole::Edit),
            password: Locator::automation_id("password", ControlRole::Edit),
            credentials_button: Locator::title(
                PROVIDE_CREDENTIALS_BUTTON_TITLE,
                ControlRole::Button,
            ),
            totp_button: Locator::title(USE_TOTP_BUTTON_TITLE, ControlRole::Button),
            otp: Locator::automation_id("otp", ControlRole::Edit),
            check_button: Locator::title(CHECK_TOTP_BUTTON_TITLE, ControlRole::Button),
        }
    }
}

/// Polling lookups and click settling on top of a [`Clock`].
pub struct Finder<'a, C: ?Sized> {
    clock: &'a C,
    timings: Timings,
}

impl<'a, C: Clock + ?Sized> Finder<'a, C> {
    pub fn new(clock: &'a C, timings: Timings) -> Self {
        Self { clock, timings }
    }

    /// Retries `attempt` until it succeeds or the find timeout has passed on
    /// the clock, time spent inside `attempt` included.
    fn poll<T>(&self, mut attempt: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = self.clock.since_epoch() + self.timings.find_timeout;

        loop {
            if let Some(found) = attempt() {
                return Some(found);
            }

            let now = self.clock.since_epoch();
            if now >= deadline {
                return None;
            }

            self.clock.sleep(self.timings.poll_interval.min(deadline - now));
        }
    }

    pub fn window<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        title_prefix: &str,
    ) -> Result<D::Window, UiError> {
        self.poll(|| desktop.find_window(title_prefix))
            .ok_or_else(|| UiError::WindowNotFound(title_prefix.to_string()))
    }

    pub fn control<W: UiWindow + ?Sized>(
        &self,
        window: &W,
        locator: &Locator,
    ) -> Result<W::Control, UiError> {
        let control = self
            .poll(|| window.find(locator))
            .ok_or_else(|| UiError::ControlNotFound(locator.clone()))?;
        tracing::trace!(%locator, "control found");

        Ok(control)
    }

    pub fn set_text<W: UiWindow + ?Sized>(
        &self,
        window: &W,
        locator: &Locator,
        text: &str,
    ) -> Result<(), UiError> {
        self.control(window, locator)?
            .set_text(text)
            .map_err(|reason| UiError::Action {
                action: "set text",
                locator: locator.clone(),
                reason,
            })
    }

    pub fn click<W: UiWindow + ?Sized>(&self, window: &W, locator: &Locator) -> Result<(), UiError> {
        self.control(window, locator)?
            .click()
            .map_err(|reason| UiError::Action {
                action: "click",
                locator: locator.clone(),
                reason,
            })?;
        tracing::debug!(%locator, "clicked");

        self.clock.sleep(self.timings.after_click_wait);

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
        rc::Rc,
        time::Duration,
    };

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{
        Control, ControlRole, Desktop, Finder, Locator, LoginScreen, Timings, UiError, UiWindow,
    };
    use crate::clock::{tests::FakeClock, Clock};

    /// What the mock window recorded, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Interaction {
        SetText(Locator, String),
        Click(Locator),
    }

    #[derive(Debug, Default)]
    struct MockState {
        /// control -> number of lookups before it shows up
        controls: HashMap<Locator, Cell<u32>>,
        failing: Vec<Locator>,
        log: Vec<Interaction>,
    }

    /// Scripted window shared between the desktop and the test
    #[derive(Debug, Default, Clone)]
    pub struct MockWindow {
        state: Rc<RefCell<MockState>>,
    }

    impl MockWindow {
        pub fn with_controls<'a>(locators: impl IntoIterator<Item = &'a Locator>) -> Self {
            let window = Self::default();
            for locator in locators {
                window.add(locator.clone(), 0);
            }
            window
        }

        /// Registers a control that is only found after `delay` failed lookups
        pub fn add(&self, locator: Locator, delay: u32) {
            self.state
                .borrow_mut()
                .controls
                .insert(locator, Cell::new(delay));
        }

        pub fn remove(&self, locator: &Locator) {
            self.state.borrow_mut().controls.remove(locator);
        }

        pub fn fail_actions_on(&self, locator: Locator) {
            self.state.borrow_mut().failing.push(locator);
        }

        pub fn interactions(&self) -> Vec<Interaction> {
            self.state.borrow().log.clone()
        }
    }

    #[derive(Debug)]
    pub struct MockControl {
        locator: Locator,
        window: MockWindow,
    }

    impl MockControl {
        fn record(&self, interaction: Interaction) -> Result<(), String> {
            let mut state = self.window.state.borrow_mut();
            if state.failing.contains(&self.locator) {
                return Err("element is not enabled".to_string());
            }
            state.log.push(interaction);
            Ok(())
        }
    }

    impl Control for MockControl {
        fn set_text(&self, text: &str) -> Result<(), String> {
            self.record(Interaction::SetText(self.locator.clone(), text.to_string()))
        }

        fn click(&self) -> Result<(), String> {
            self.record(Interaction::Click(self.locator.clone()))
        }
    }

    impl UiWindow for MockWindow {
        type Control = MockControl;

        fn find(&self, locator: &Locator) -> Option<MockControl> {
            let state = self.state.borrow();
            let delay = state.controls.get(locator)?;
            if delay.get() > 0 {
                delay.set(delay.get() - 1);
                return None;
            }

            Some(MockControl {
                locator: locator.clone(),
                window: self.clone(),
            })
        }
    }

    #[derive(Debug, Default)]
    pub struct MockDesktop {
        pub windows: Vec<(String, MockWindow)>,
    }

    impl MockDesktop {
        pub fn with_window(title: &str, window: MockWindow) -> Self {
            Self {
                windows: vec![(title.to_string(), window)],
            }
        }
    }

    impl Desktop for MockDesktop {
        type Window = MockWindow;

        fn find_window(&self, title_prefix: &str) -> Option<MockWindow> {
            self.windows
                .iter()
                .find(|(title, _)| title.starts_with(title_prefix))
                .map(|(_, window)| window.clone())
        }
    }

    fn timings() -> Timings {
        Timings {
            find_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(500),
            after_click_wait: Duration::from_secs(1),
        }
    }

    #[rstest]
    #[case("Offboard Diagnostic Information System Service 23.0.1", true)]
    #[case("Offboard Diagnostic Information System", true)]
    #[case("ODIS Service", false)]
    fn window_matches_title_prefix(#[case] title: &str, #[case] found: bool) {
        let clock = FakeClock::at(0);
        let desktop = MockDesktop::with_window(title, MockWindow::default());
        let finder = Finder::new(&clock, timings());

        let result = finder.window(&desktop, &LoginScreen::default().window_title_prefix);

        assert_eq!(found, result.is_ok());
    }

    #[test]
    fn gives_up_after_find_timeout() {
        let clock = FakeClock::at(0);
        let finder = Finder::new(&clock, timings());

        let err = finder
            .window(&MockDesktop::default(), "Offboard")
            .unwrap_err();

        assert_eq!(UiError::WindowNotFound("Offboard".to_string()), err);
        assert_eq!(Duration::from_secs(2), clock.slept());
    }

    struct SlowWindow<'a> {
        clock: &'a FakeClock,
        lookup_cost: Duration,
        lookups: Cell<u32>,
    }

    impl UiWindow for SlowWindow<'_> {
        type Control = MockControl;

        fn find(&self, _locator: &Locator) -> Option<MockControl> {
            self.clock.advance(self.lookup_cost);
            self.lookups.set(self.lookups.get() + 1);
            None
        }
    }

    #[test]
    fn find_timeout_counts_time_spent_looking() {
        let clock = FakeClock::at(1_000);
        let window = SlowWindow {
            clock: &clock,
            lookup_cost: Duration::from_secs(2),
            lookups: Cell::new(0),
        };
        let finder = Finder::new(
            &clock,
            Timings {
                find_timeout: Duration::from_secs(30),
                ..timings()
            },
        );

        let err = finder
            .control(&window, &Locator::automation_id("otp", ControlRole::Edit))
            .unwrap_err();

        assert!(matches!(err, UiError::ControlNotFound(_)));
        // twelve lookups and sleeps reach 29.5s, the last sleep is cut to the deadline
        assert_eq!(13, window.lookups.get());
        assert_eq!(1_032, clock.now());
    }

    #[test]
    fn polls_until_control_appears() {
        let clock = FakeClock::at(0);
        let locator = Locator::automation_id("otp", ControlRole::Edit);
        let window = MockWindow::default();
        window.add(locator.clone(), 3);
        let finder = Finder::new(&clock, timings());

        finder.set_text(&window, &locator, "123456").unwrap();

        assert_eq!(vec![Duration::from_millis(500); 3], clock.sleeps());
    }

    #[test]
    fn click_waits_for_ui_to_settle() {
        let clock = FakeClock::at(0);
        let locator = Locator::title("ПРОВЕРИТЬ", ControlRole::Button);
        let window = MockWindow::with_controls([&locator]);
        let finder = Finder::new(&clock, timings());

        finder.click(&window, &locator).unwrap();

        assert_eq!(vec![Duration::from_secs(1)], clock.sleeps());
        assert_eq!(
            vec![Interaction::Click(locator)],
            window.interactions()
        );
    }

    #[test]
    fn action_failure_names_the_control() {
        let clock = FakeClock::at(0);
        let locator = Locator::automation_id("username", ControlRole::Edit);
        let window = MockWindow::with_controls([&locator]);
        window.fail_actions_on(locator.clone());
        let finder = Finder::new(&clock, timings());

        let err = finder.set_text(&window, &locator, "user").unwrap_err();

        assert_eq!(
            "set text on Edit with automation id 'username' failed: element is not enabled",
            err.to_string()
        );
    }
}
