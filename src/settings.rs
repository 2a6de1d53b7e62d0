//! The `Settings` configuration handle (spec.md §6, §9 Design Notes:
//! "the `Settings` singleton must become an explicit configuration
//! handle"). Read-mostly; per-unit changes go through a thread-local
//! override stack rather than mutating the shared handle, per the
//! Concurrency & Resource Model (§5).

use std::sync::Mutex;

use crate::error::AssertionMode;

/// `gwen.state.level`: which scopes are discarded on `reset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateLevel {
    Feature,
    Scenario,
    StepDef,
}

/// The shared, process-wide configuration handle. Construct with
/// [`Settings::from_env`] or [`Settings::default`]; mutate per-unit values
/// only through [`Settings::with_override`].
#[derive(Debug)]
pub struct Settings {
    dry_run: Mutex<Option<bool>>,
    parallel: Mutex<Option<bool>>,
    max_threads: Mutex<usize>,
    rampup_interval_seconds: Mutex<u64>,
    assertion_mode: Mutex<AssertionMode>,
    failfast_exit: Mutex<bool>,
    state_level: Mutex<StateLevel>,
    /// Upper bound on `while`/`until` composite iterations (spec.md §4.H:
    /// "upper-bound iterations (configurable, default finite)").
    max_loop_iterations: Mutex<usize>,
    /// Delay between `while`/`until` iterations.
    loop_delay_millis: Mutex<u64>,
    /// The Gherkin dialect features are parsed as, e.g. `"en"`.
    language: Mutex<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: Mutex::new(None),
            parallel: Mutex::new(None),
            max_threads: Mutex::new(num_cpus::get()),
            rampup_interval_seconds: Mutex::new(0),
            assertion_mode: Mutex::new(AssertionMode::Hard),
            failfast_exit: Mutex::new(false),
            state_level: Mutex::new(StateLevel::Scenario),
            max_loop_iterations: Mutex::new(1000),
            loop_delay_millis: Mutex::new(0),
            language: Mutex::new("en".to_string()),
        }
    }
}

/// Per-unit override, pushed onto the thread-local stack by
/// [`Settings::with_override`]. Fields left `None` fall through to the
/// shared handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettingsOverride {
    pub dry_run: Option<bool>,
    pub state_level: Option<StateLevel>,
}

thread_local! {
    static OVERRIDES: std::cell::RefCell<Vec<SettingsOverride>> =
        std::cell::RefCell::new(Vec::new());
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default handle, then applies `GWEN_DRY_RUN`/
    /// `GWEN_PARALLEL` environment defaults, but only for settings that are
    /// otherwise unset — an explicit `false`/`true` already set wins.
    #[must_use]
    pub fn from_env() -> Self {
        let settings = Self::default();
        {
            let mut dry_run = settings.dry_run.lock().unwrap();
            if dry_run.is_none() {
                if let Ok(v) = std::env::var("GWEN_DRY_RUN") {
                    *dry_run = Some(parse_bool(&v));
                }
            }
        }
        {
            let mut parallel = settings.parallel.lock().unwrap();
            if parallel.is_none() {
                if let Ok(v) = std::env::var("GWEN_PARALLEL") {
                    *parallel = Some(parse_bool(&v));
                }
            }
        }
        settings
    }

    /// Runs `f` with `over` pushed onto this thread's override stack,
    /// guaranteeing the stack is popped again even if `f` panics.
    pub fn with_override<T>(&self, over: SettingsOverride, f: impl FnOnce() -> T) -> T {
        OVERRIDES.with(|stack| stack.borrow_mut().push(over));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        OVERRIDES.with(|stack| {
            stack.borrow_mut().pop();
        });
        match result {
            Ok(v) => v,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        Self::overridden(|o| o.dry_run).unwrap_or_else(|| self.dry_run.lock().unwrap().unwrap_or(false))
    }

    #[must_use]
    pub fn parallel(&self) -> bool {
        self.parallel.lock().unwrap().unwrap_or(false)
    }

    pub fn set_parallel(&self, value: bool) {
        *self.parallel.lock().unwrap() = Some(value);
    }

    #[must_use]
    pub fn max_threads(&self) -> usize {
        *self.max_threads.lock().unwrap()
    }

    pub fn set_max_threads(&self, value: usize) {
        *self.max_threads.lock().unwrap() = value;
    }

    #[must_use]
    pub fn rampup_interval_seconds(&self) -> u64 {
        *self.rampup_interval_seconds.lock().unwrap()
    }

    pub fn set_rampup_interval_seconds(&self, value: u64) {
        *self.rampup_interval_seconds.lock().unwrap() = value;
    }

    #[must_use]
    pub fn assertion_mode(&self) -> AssertionMode {
        *self.assertion_mode.lock().unwrap()
    }

    pub fn set_assertion_mode(&self, mode: AssertionMode) {
        *self.assertion_mode.lock().unwrap() = mode;
    }

    #[must_use]
    pub fn failfast_exit(&self) -> bool {
        *self.failfast_exit.lock().unwrap()
    }

    pub fn set_failfast_exit(&self, value: bool) {
        *self.failfast_exit.lock().unwrap() = value;
    }

    #[must_use]
    pub fn state_level(&self) -> StateLevel {
        Self::overridden(|o| o.state_level).unwrap_or_else(|| *self.state_level.lock().unwrap())
    }

    pub fn set_state_level(&self, level: StateLevel) {
        *self.state_level.lock().unwrap() = level;
    }

    #[must_use]
    pub fn max_loop_iterations(&self) -> usize {
        *self.max_loop_iterations.lock().unwrap()
    }

    pub fn set_max_loop_iterations(&self, value: usize) {
        *self.max_loop_iterations.lock().unwrap() = value;
    }

    #[must_use]
    pub fn loop_delay_millis(&self) -> u64 {
        *self.loop_delay_millis.lock().unwrap()
    }

    pub fn set_loop_delay_millis(&self, value: u64) {
        *self.loop_delay_millis.lock().unwrap() = value;
    }

    #[must_use]
    pub fn language(&self) -> String {
        self.language.lock().unwrap().clone()
    }

    pub fn set_language(&self, value: impl Into<String>) {
        *self.language.lock().unwrap() = value.into();
    }

    fn overridden<T>(pick: impl Fn(&SettingsOverride) -> Option<T>) -> Option<T> {
        OVERRIDES.with(|stack| stack.borrow().iter().rev().find_map(|o| pick(o)))
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::new();
        assert!(!s.dry_run());
        assert!(!s.parallel());
        assert_eq!(s.assertion_mode(), AssertionMode::Hard);
        assert_eq!(s.state_level(), StateLevel::Scenario);
        assert!(s.max_threads() >= 1);
    }

    #[test]
    fn with_override_does_not_mutate_shared_handle() {
        let s = Settings::new();
        let inside = s.with_override(SettingsOverride { dry_run: Some(true), ..Default::default() }, || s.dry_run());
        assert!(inside);
        assert!(!s.dry_run(), "override must not leak past with_override");
    }

    #[test]
    fn nested_overrides_use_innermost() {
        let s = Settings::new();
        s.with_override(SettingsOverride { dry_run: Some(true), ..Default::default() }, || {
            s.with_override(SettingsOverride { dry_run: Some(false), ..Default::default() }, || {
                assert!(!s.dry_run());
            });
            assert!(s.dry_run());
        });
    }

    #[test]
    fn state_level_override_round_trips() {
        let s = Settings::new();
        s.with_override(SettingsOverride { state_level: Some(StateLevel::StepDef), ..Default::default() }, || {
            assert_eq!(s.state_level(), StateLevel::StepDef);
        });
        assert_eq!(s.state_level(), StateLevel::Scenario);
    }

    #[test]
    fn loop_bounds_are_configurable() {
        let s = Settings::new();
        assert_eq!(s.max_loop_iterations(), 1000);
        s.set_max_loop_iterations(5);
        assert_eq!(s.max_loop_iterations(), 5);
        s.set_loop_delay_millis(10);
        assert_eq!(s.loop_delay_millis(), 10);
    }

    #[test]
    fn language_defaults_to_english_and_is_settable() {
        let s = Settings::new();
        assert_eq!(s.language(), "en");
        s.set_language("fr");
        assert_eq!(s.language(), "fr");
    }

    #[test]
    fn from_env_applies_dry_run_only_when_unset() {
        std::env::set_var("GWEN_DRY_RUN", "true");
        let s = Settings::from_env();
        assert!(s.dry_run());
        std::env::remove_var("GWEN_DRY_RUN");
    }
}
