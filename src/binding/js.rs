//! `Js` binding: `name/javascript` holds a JS expression evaluated fresh on
//! every resolve (unless wrapped in a `LoadStrategy=lazy` binding).

use super::JsEngine;
use super::key;
use crate::error::{GwenError, Result};
use crate::interpolate::Lookup;
use crate::scope::Scope;

/// The JS expression bound to `name`, if any.
#[must_use]
pub fn expression(name: &str, scope: &Scope) -> Option<String> {
    scope.get_property(&key(name, "javascript"))
}

/// Evaluates `expr` via the collaborator engine, wrapping failures as
/// [`GwenError::JSExecution`].
pub fn evaluate(engine: &dyn JsEngine, expr: &str) -> Result<String> {
    engine.evaluate(expr).map_err(|message| GwenError::JSExecution { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OkJs;
    impl JsEngine for OkJs {
        fn evaluate(&self, expression: &str) -> std::result::Result<String, String> {
            Ok(format!("={expression}"))
        }
        fn call(&self, _: &str, _: &[String]) -> std::result::Result<String, String> {
            unreachable!()
        }
    }

    struct FailingJs;
    impl JsEngine for FailingJs {
        fn evaluate(&self, _: &str) -> std::result::Result<String, String> {
            Err("boom".into())
        }
        fn call(&self, _: &str, _: &[String]) -> std::result::Result<String, String> {
            unreachable!()
        }
    }

    #[test]
    fn reads_expression_key() {
        let mut scope = Scope::new();
        scope.set_property(key("x", "javascript"), "1+1");
        assert_eq!(expression("x", &scope), Some("1+1".to_string()));
    }

    #[test]
    fn evaluate_delegates_to_engine() {
        assert_eq!(evaluate(&OkJs, "1+1").unwrap(), "=1+1");
    }

    #[test]
    fn evaluate_wraps_engine_failure() {
        let err = evaluate(&FailingJs, "bad(").unwrap_err();
        assert!(matches!(err, GwenError::JSExecution { .. }));
    }
}
