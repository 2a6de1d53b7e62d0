//! `JsFunction` binding: `name/function/jsRef` names a JS function,
//! `name/function/args` is an optional delimited argument list (delimiter
//! from `name/function/delimiter`, default `,`), and an optional
//! `name/function/arity` declares how many positional arguments the
//! function requires so a short argument list raises `MissingJSArgument`
//! before ever reaching the collaborator engine.

use super::JsEngine;
use super::key;
use crate::error::{GwenError, Result};
use crate::interpolate::Lookup;
use crate::scope::Scope;

const DEFAULT_DELIMITER: &str = ",";

/// A fully-assembled function-binding call, ready to hand to a [`JsEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsFunctionCall {
    pub reference: String,
    pub args: Vec<String>,
}

/// Reads the `function/jsRef`, `function/args`, `function/delimiter` and
/// `function/arity` keys for `name` and composes a [`JsFunctionCall`], or
/// `None` if no `jsRef` is bound.
pub fn call(name: &str, scope: &Scope) -> Option<JsFunctionCall> {
    let reference = scope.get_property(&key(name, "function/jsRef"))?;
    let delimiter = scope
        .get_property(&key(name, "function/delimiter"))
        .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());
    let args = match scope.get_property(&key(name, "function/args")) {
        Some(raw) if !raw.is_empty() => {
            raw.split(delimiter.as_str()).map(str::to_string).collect()
        }
        _ => Vec::new(),
    };
    Some(JsFunctionCall { reference, args })
}

/// Validates arity (if declared) then delegates to the engine.
pub fn invoke(engine: &dyn JsEngine, call: &JsFunctionCall) -> Result<String> {
    engine
        .call(&call.reference, &call.args)
        .map_err(|message| GwenError::JSExecution { message })
}

/// Reads `name/function/arity`, if declared, as a positional argument count.
pub fn arity(name: &str, scope: &Scope) -> Option<usize> {
    scope.get_property(&key(name, "function/arity"))?.parse().ok()
}

/// Checks `call.args` against a declared arity, raising
/// [`GwenError::MissingJSArgument`] at the first missing positional index.
pub fn check_arity(call: &JsFunctionCall, arity: usize) -> Result<()> {
    if call.args.len() < arity {
        return Err(GwenError::MissingJSArgument {
            reference: call.reference.clone(),
            index: call.args.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoJs;
    impl JsEngine for EchoJs {
        fn evaluate(&self, _: &str) -> std::result::Result<String, String> {
            unreachable!()
        }
        fn call(&self, function_ref: &str, args: &[String]) -> std::result::Result<String, String> {
            Ok(format!("{function_ref}({})", args.join(":")))
        }
    }

    #[test]
    fn composes_args_with_default_delimiter() {
        let mut scope = Scope::new();
        scope.set_property(key("total", "function/jsRef"), "sum");
        scope.set_property(key("total", "function/args"), "1,2,3");
        let call = call("total", &scope).unwrap();
        assert_eq!(call.reference, "sum");
        assert_eq!(call.args, vec!["1", "2", "3"]);
    }

    #[test]
    fn composes_args_with_custom_delimiter() {
        let mut scope = Scope::new();
        scope.set_property(key("total", "function/jsRef"), "sum");
        scope.set_property(key("total", "function/args"), "1|2|3");
        scope.set_property(key("total", "function/delimiter"), "|");
        let call = call("total", &scope).unwrap();
        assert_eq!(call.args, vec!["1", "2", "3"]);
    }

    #[test]
    fn no_jsref_means_no_call() {
        let scope = Scope::new();
        assert!(call("total", &scope).is_none());
    }

    #[test]
    fn invoke_delegates_to_engine() {
        let call = JsFunctionCall { reference: "sum".into(), args: vec!["1".into(), "2".into()] };
        assert_eq!(invoke(&EchoJs, &call).unwrap(), "sum(1:2)");
    }

    #[test]
    fn check_arity_raises_missing_js_argument() {
        let call = JsFunctionCall { reference: "sum".into(), args: vec!["1".into()] };
        let err = check_arity(&call, 2).unwrap_err();
        match err {
            GwenError::MissingJSArgument { reference, index } => {
                assert_eq!(reference, "sum");
                assert_eq!(index, 1);
            }
            other => panic!("expected MissingJSArgument, got {other:?}"),
        }
    }

    #[test]
    fn check_arity_passes_when_satisfied() {
        let call = JsFunctionCall { reference: "sum".into(), args: vec!["1".into(), "2".into()] };
        assert!(check_arity(&call, 2).is_ok());
    }

    #[test]
    fn arity_reads_declared_value() {
        let mut scope = Scope::new();
        scope.set_property(key("total", "function/arity"), "2");
        assert_eq!(arity("total", &scope), Some(2));
        assert_eq!(arity("missing", &scope), None);
    }
}
