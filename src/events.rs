//! The Node-Event Bus (spec.md §4.J): a synchronous publish system for
//! reporters. Before-listeners fire in registration order, after-listeners
//! in reverse; listeners must not raise — a panicking listener is logged
//! and swallowed rather than propagated.

use crate::ast::NodeType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

/// One ancestor frame on the path from Root to the node an event concerns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallChainEntry {
    pub node_type: NodeType,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct NodeEvent {
    pub phase: Phase,
    pub node_type: NodeType,
    pub source: String,
    pub call_chain: Vec<CallChainEntry>,
}

/// A subscriber; `ignore_mask` names node types this listener is never
/// invoked for.
pub trait NodeListener: Send + Sync {
    fn ignore_mask(&self) -> &[NodeType] {
        &[]
    }
    fn on_event(&self, event: &NodeEvent);
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn NodeListener>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn register(&mut self, listener: Box<dyn NodeListener>) {
        self.listeners.push(listener);
    }

    pub fn before(&self, node_type: NodeType, source: &str, call_chain: &[CallChainEntry]) {
        for listener in &self.listeners {
            self.dispatch(listener.as_ref(), Phase::Before, node_type, source, call_chain);
        }
    }

    pub fn after(&self, node_type: NodeType, source: &str, call_chain: &[CallChainEntry]) {
        for listener in self.listeners.iter().rev() {
            self.dispatch(listener.as_ref(), Phase::After, node_type, source, call_chain);
        }
    }

    fn dispatch(
        &self,
        listener: &dyn NodeListener,
        phase: Phase,
        node_type: NodeType,
        source: &str,
        call_chain: &[CallChainEntry],
    ) {
        if listener.ignore_mask().contains(&node_type) {
            return;
        }
        let event = NodeEvent {
            phase,
            node_type,
            source: source.to_string(),
            call_chain: call_chain.to_vec(),
        };
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener.on_event(&event)));
        if outcome.is_err() {
            tracing::warn!(?node_type, ?phase, "node listener panicked; swallowing");
        }
    }
}
