//! Per-unit evaluation context (spec.md §4.G, §5): owns the [`Scope`],
//! binding resolver, event bus and call-stack state a Step Engine needs
//! while walking one `FeatureUnit`'s `Spec` tree. One context is created per
//! unit (or reset between units in REPL mode, per §3's lifecycle note).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::ast::Attachment;
use crate::binding::BindingResolver;
use crate::events::{CallChainEntry, EventBus};
use crate::scope::Scope;
use crate::settings::{Settings, StateLevel};

/// Global registry of per-StepDef-name locks backing `@Synchronized`
/// (Open Question 1, DESIGN.md): any two units concurrently inside the same
/// named synchronized StepDef serialise on this lock; unrelated StepDefs
/// never contend with each other.
static SYNCHRONIZED_LOCKS: Lazy<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[must_use]
pub fn synchronized_lock(name: &str) -> Arc<Mutex<()>> {
    let mut registry = SYNCHRONIZED_LOCKS.lock().unwrap();
    registry
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

pub struct EvalContext<'a> {
    pub scope: Scope,
    pub resolver: BindingResolver<'a>,
    pub events: &'a EventBus,
    pub settings: &'a Settings,
    call_stack: Vec<String>,
    pending_attachments: Vec<Attachment>,
    pub call_chain: Vec<CallChainEntry>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub fn new(
        resolver: BindingResolver<'a>,
        events: &'a EventBus,
        settings: &'a Settings,
    ) -> Self {
        Self {
            scope: Scope::new(),
            resolver,
            events,
            settings,
            call_stack: Vec::new(),
            pending_attachments: Vec::new(),
            call_chain: Vec::new(),
        }
    }

    /// Pushes `(step_def_name, args_signature)` onto the call stack and
    /// reports whether that exact pair is already active — a call with no
    /// new arguments recursing into itself (spec.md §9, concrete scenario
    /// S5).
    pub fn enter_call(&mut self, step_def_name: &str, args_signature: &str) -> bool {
        let marker = format!("{step_def_name}\u{0}{args_signature}");
        let recursive = self.call_stack.iter().any(|m| m == &marker);
        self.call_stack.push(marker);
        recursive
    }

    pub fn exit_call(&mut self) {
        self.call_stack.pop();
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.pending_attachments.push(attachment);
    }

    pub fn take_attachments(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending_attachments)
    }

    /// Discards state at `level`'s granularity between units (spec.md §3,
    /// §5, `gwen.state.level`): the scope stack is trimmed per
    /// [`Scope::reset`], and the call stack / pending attachments / call
    /// chain are always cleared, since they are per-unit volatile
    /// regardless of `level`.
    pub fn reset(&mut self, level: StateLevel) {
        self.scope.reset(level);
        self.call_stack.clear();
        self.pending_attachments.clear();
        self.call_chain.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{JsEngine, SysprocRunner};

    struct NoopJs;
    impl JsEngine for NoopJs {
        fn evaluate(&self, _: &str) -> Result<String, String> {
            Ok(String::new())
        }
        fn call(&self, _: &str, _: &[String]) -> Result<String, String> {
            Ok(String::new())
        }
    }

    struct NoopSysproc;
    impl SysprocRunner for NoopSysproc {
        fn run(&self, _: &str) -> Result<String, String> {
            Ok(String::new())
        }
    }

    #[test]
    fn same_name_and_args_on_stack_is_recursive() {
        let events = EventBus::new();
        let settings = Settings::new();
        let resolver = BindingResolver::new(&NoopJs, &NoopSysproc);
        let mut ctx = EvalContext::new(resolver, &events, &settings);

        assert!(!ctx.enter_call("greet", "alice"));
        assert!(ctx.enter_call("greet", "alice"), "same name+args must be flagged recursive");
        ctx.exit_call();
        ctx.exit_call();
        assert!(!ctx.enter_call("greet", "alice"), "after unwind, a fresh call is not recursive");
    }

    #[test]
    fn same_name_different_args_is_not_recursive() {
        let events = EventBus::new();
        let settings = Settings::new();
        let resolver = BindingResolver::new(&NoopJs, &NoopSysproc);
        let mut ctx = EvalContext::new(resolver, &events, &settings);

        assert!(!ctx.enter_call("greet", "alice"));
        assert!(!ctx.enter_call("greet", "bob"));
    }

    #[test]
    fn reset_clears_call_bookkeeping_and_trims_scope() {
        use crate::scope::ScopeKind;

        let events = EventBus::new();
        let settings = Settings::new();
        let resolver = BindingResolver::new(&NoopJs, &NoopSysproc);
        let mut ctx = EvalContext::new(resolver, &events, &settings);

        ctx.enter_call("greet", "alice");
        ctx.attach(Attachment { name: "log".into(), file: std::path::PathBuf::from("log.txt") });
        ctx.call_chain
            .push(CallChainEntry { node_type: crate::ast::NodeType::Feature, label: "f".into() });
        ctx.scope.push(ScopeKind::Feature, "f1");
        ctx.scope.push(ScopeKind::Scenario, "sc1");

        ctx.reset(StateLevel::Scenario);

        assert!(ctx.take_attachments().is_empty());
        assert!(ctx.call_chain.is_empty());
        assert!(!ctx.enter_call("greet", "alice"), "call stack must be cleared by reset");
        ctx.exit_call();
        assert_eq!(ctx.scope.depth(), 2);
        assert_eq!(ctx.scope.current().kind, ScopeKind::Feature);
    }

    #[test]
    fn synchronized_lock_is_shared_across_lookups_of_same_name() {
        let a = synchronized_lock("payment");
        let b = synchronized_lock("payment");
        assert!(Arc::ptr_eq(&a, &b));
        let c = synchronized_lock("shipping");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
