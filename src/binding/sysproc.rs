//! `Sysproc` binding: `name/sysproc` holds a shell command whose captured
//! output is the resolved value. Process invocation itself is a
//! collaborator (spec.md §1 Non-goals); this module only wires the key
//! lookup to the [`SysprocRunner`] trait.

use super::SysprocRunner;
use super::key;
use crate::error::{GwenError, Result};
use crate::interpolate::Lookup;
use crate::scope::Scope;

/// The command bound to `name`, if any.
#[must_use]
pub fn command(name: &str, scope: &Scope) -> Option<String> {
    scope.get_property(&key(name, "sysproc"))
}

/// Runs `command` via the collaborator runner, wrapping failures as
/// [`GwenError::SysprocExecution`].
pub fn run(runner: &dyn SysprocRunner, command: &str) -> Result<String> {
    runner.run(command).map_err(|message| GwenError::SysprocExecution { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRunner;
    impl SysprocRunner for EchoRunner {
        fn run(&self, command: &str) -> std::result::Result<String, String> {
            Ok(format!("out: {command}"))
        }
    }

    struct FailingRunner;
    impl SysprocRunner for FailingRunner {
        fn run(&self, _: &str) -> std::result::Result<String, String> {
            Err("exit code 1".into())
        }
    }

    #[test]
    fn reads_key() {
        let mut scope = Scope::new();
        scope.set_property(key("now", "sysproc"), "date +%s");
        assert_eq!(command("now", &scope), Some("date +%s".to_string()));
    }

    #[test]
    fn run_delegates_to_runner() {
        assert_eq!(run(&EchoRunner, "ls").unwrap(), "out: ls");
    }

    #[test]
    fn run_wraps_runner_failure() {
        let err = run(&FailingRunner, "false").unwrap_err();
        assert!(matches!(err, GwenError::SysprocExecution { .. }));
    }
}
