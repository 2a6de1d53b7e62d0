//! Binding resolvers (spec.md §4.E): polymorphic over `{Value, Js,
//! JsFunction, File, Sysproc, LoadStrategy}`. Each binding persists under
//! deterministic `name/…` keys in a [`Scope`]; `resolve()` reads those keys
//! in priority order and delegates to the matching resolver.

pub mod file;
pub mod js;
pub mod jsfunction;
pub mod load_strategy;
pub mod sysproc;
pub mod value;

use crate::error::{GwenError, Result};
use crate::interpolate::Lookup;
use crate::scope::Scope;

/// The closed set of binding kinds a `name` in scope may resolve through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Value,
    Js,
    JsFunction,
    File,
    Sysproc,
}

/// Collaborator: evaluates a JavaScript expression or invokes a named
/// function. Out of scope per spec.md §1 — Gwen depends only on this trait.
pub trait JsEngine: Send + Sync {
    fn evaluate(&self, expression: &str) -> std::result::Result<String, String>;
    fn call(&self, function_ref: &str, args: &[String]) -> std::result::Result<String, String>;
}

/// Collaborator: runs a system process and captures its output. Out of
/// scope per spec.md §1.
pub trait SysprocRunner: Send + Sync {
    fn run(&self, command: &str) -> std::result::Result<String, String>;
}

/// Formats the deterministic scope key a binding kind's attribute lives
/// under, e.g. `key("amount", "javascript") == "amount/javascript"`.
#[must_use]
pub fn key(name: &str, suffix: &str) -> String {
    format!("{name}/{suffix}")
}

/// Resolves bindings against a pair of collaborator back-ends, reading and
/// (for lazy bindings) writing cached results through a [`Scope`].
pub struct BindingResolver<'a> {
    pub js: &'a dyn JsEngine,
    pub sysproc: &'a dyn SysprocRunner,
}

impl<'a> BindingResolver<'a> {
    #[must_use]
    pub fn new(js: &'a dyn JsEngine, sysproc: &'a dyn SysprocRunner) -> Self {
        Self { js, sysproc }
    }

    /// Resolves `name` to its string value. Tries, in order: a direct
    /// `Value` binding, a `Js` expression, a `JsFunction` call, a `File`
    /// read, a `Sysproc` invocation. A `LoadStrategy=lazy` binding caches
    /// its resolved value back onto `name` itself so later lookups become
    /// plain `Value` reads.
    pub fn resolve(&self, name: &str, scope: &mut Scope) -> Result<String> {
        if let Some(v) = value::resolve(name, scope) {
            return Ok(v);
        }

        let lazy = load_strategy::is_lazy(name, scope);
        let resolved = self.resolve_uncached(name, scope)?;
        if lazy {
            scope.set_property(name, resolved.clone());
        }
        Ok(resolved)
    }

    fn resolve_uncached(&self, name: &str, scope: &mut Scope) -> Result<String> {
        if let Some(expr) = js::expression(name, scope) {
            return js::evaluate(self.js, &expr);
        }
        if let Some(call) = jsfunction::call(name, scope) {
            if let Some(arity) = jsfunction::arity(name, scope) {
                jsfunction::check_arity(&call, arity)?;
            }
            return jsfunction::invoke(self.js, &call);
        }
        if let Some(path) = file::path(name, scope) {
            return file::read(&path);
        }
        if let Some(cmd) = sysproc::command(name, scope) {
            return sysproc::run(self.sysproc, &cmd);
        }
        Err(GwenError::UnboundBinding { name: name.to_string() })
    }

    /// A no-op unless `name` is declared `LoadStrategy=lazy` and not yet
    /// cached, in which case it resolves and caches it now.
    pub fn bind_if_lazy(&self, name: &str, scope: &mut Scope) -> Result<()> {
        if !load_strategy::is_lazy(name, scope) {
            return Ok(());
        }
        if value::resolve(name, scope).is_some() {
            return Ok(());
        }
        self.resolve(name, scope)?;
        Ok(())
    }
}
