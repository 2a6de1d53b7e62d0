//! The Scope/Environment (spec.md §4.D): a layered named-scope stack —
//! top, feature, rule, scenario, StepDef-call, table-record — backed by
//! ordered maps so iteration order matches declaration order for reporting.

use linked_hash_map::LinkedHashMap;

use crate::interpolate::Lookup;

/// The kind of a single scope layer, mirroring the nesting a spec's
/// evaluation walks through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Top,
    Feature,
    Rule,
    Scenario,
    StepDefCall,
    TableRecord,
}

/// One frame of the scope stack: a name (for diagnostics/reporting) plus
/// its own property (`${...}`) and param (`$<...>`) attribute maps.
#[derive(Clone, Debug)]
pub struct ScopeLayer {
    pub kind: ScopeKind,
    pub name: String,
    attributes: LinkedHashMap<String, String>,
    params: LinkedHashMap<String, String>,
}

impl ScopeLayer {
    #[must_use]
    pub fn new(kind: ScopeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes: LinkedHashMap::new(),
            params: LinkedHashMap::new(),
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &LinkedHashMap<String, String> {
        &self.attributes
    }

    #[must_use]
    pub fn params(&self) -> &LinkedHashMap<String, String> {
        &self.params
    }
}

/// A stack of [`ScopeLayer`]s. The innermost (last) layer is searched first
/// for `${...}` property lookups, falling outward to `Top`; `$<...>` param
/// lookups stop at the nearest `StepDefCall`/`TableRecord` boundary and do
/// not leak between sibling calls.
#[derive(Clone, Debug)]
pub struct Scope {
    layers: Vec<ScopeLayer>,
}

impl Default for Scope {
    fn default() -> Self {
        Self { layers: vec![ScopeLayer::new(ScopeKind::Top, "top")] }
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind, name: impl Into<String>) {
        self.layers.push(ScopeLayer::new(kind, name));
    }

    pub fn pop(&mut self) -> Option<ScopeLayer> {
        if self.layers.len() <= 1 {
            return None;
        }
        self.layers.pop()
    }

    #[must_use]
    pub fn current(&self) -> &ScopeLayer {
        self.layers.last().expect("scope stack is never empty")
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Binds `name` on the current (innermost) layer's property map,
    /// shadowing any same-named binding in an outer layer.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.layers
            .last_mut()
            .expect("scope stack is never empty")
            .attributes
            .insert(name.into(), value.into());
    }

    /// Binds `name` on the current layer's param map. Expected to be called
    /// only while the current layer is `StepDefCall` or `TableRecord`.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.layers
            .last_mut()
            .expect("scope stack is never empty")
            .params
            .insert(name.into(), value.into());
    }

    #[must_use]
    pub fn layers(&self) -> &[ScopeLayer] {
        &self.layers
    }

    /// Removes `name` from the current (innermost) layer's property map
    /// only, per spec.md §4.D's `clear(name)` (in current scope).
    pub fn clear(&mut self, name: &str) {
        self.layers
            .last_mut()
            .expect("scope stack is never empty")
            .attributes
            .remove(name);
    }

    /// A flattened, innermost-wins view of every property binding
    /// currently visible (spec.md §4.D's `visible`), outer layers applied
    /// first so inner layers overwrite shadowed names.
    #[must_use]
    pub fn visible(&self) -> LinkedHashMap<String, String> {
        let mut merged = LinkedHashMap::new();
        for layer in &self.layers {
            for (k, v) in layer.attributes.iter() {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }

    /// Whether a layer named `name` (e.g. a scenario or StepDef call, by
    /// its declared name) is currently on the stack.
    #[must_use]
    pub fn contains_scope(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    /// Discards scope layers at or below `level`'s granularity, per
    /// spec.md §4.D/§6's `gwen.state.level`: `Feature` truncates back to
    /// `Top`; `Scenario` keeps `Top`/`Feature`/`Rule`; `StepDef` keeps
    /// everything down through `Scenario`, discarding only call/record
    /// layers.
    pub fn reset(&mut self, level: crate::settings::StateLevel) {
        use crate::settings::StateLevel;
        let discards = |kind: ScopeKind| match level {
            StateLevel::Feature => !matches!(kind, ScopeKind::Top),
            StateLevel::Scenario => {
                matches!(kind, ScopeKind::Scenario | ScopeKind::StepDefCall | ScopeKind::TableRecord)
            }
            StateLevel::StepDef => matches!(kind, ScopeKind::StepDefCall | ScopeKind::TableRecord),
        };
        while self.layers.len() > 1 && discards(self.current().kind) {
            self.layers.pop();
        }
    }
}

impl Lookup for Scope {
    fn get_property(&self, name: &str) -> Option<String> {
        for layer in self.layers.iter().rev() {
            if let Some(v) = layer.attributes.get(name) {
                return Some(v.clone());
            }
        }
        std::env::var(name).ok()
    }

    fn get_param(&self, name: &str) -> Option<String> {
        for layer in self.layers.iter().rev() {
            if matches!(layer.kind, ScopeKind::StepDefCall | ScopeKind::TableRecord) {
                return layer.params.get(name).cloned();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_property_shadows_outer() {
        let mut s = Scope::new();
        s.set_property("env", "outer");
        s.push(ScopeKind::Scenario, "sc1");
        s.set_property("env", "inner");
        assert_eq!(s.get_property("env"), Some("inner".to_string()));
        s.pop();
        assert_eq!(s.get_property("env"), Some("outer".to_string()));
    }

    #[test]
    fn outer_property_is_visible_when_not_shadowed() {
        let mut s = Scope::new();
        s.set_property("base", "x");
        s.push(ScopeKind::Feature, "f1");
        s.push(ScopeKind::Scenario, "sc1");
        assert_eq!(s.get_property("base"), Some("x".to_string()));
    }

    #[test]
    fn params_do_not_leak_between_sibling_calls() {
        let mut s = Scope::new();
        s.push(ScopeKind::StepDefCall, "call-a");
        s.set_param("p", "a-value");
        assert_eq!(s.get_param("p"), Some("a-value".to_string()));
        s.pop();

        s.push(ScopeKind::StepDefCall, "call-b");
        assert_eq!(s.get_param("p"), None, "sibling call must not see call-a's params");
    }

    #[test]
    fn params_are_not_visible_outside_any_call_layer() {
        let mut s = Scope::new();
        assert_eq!(s.get_param("p"), None);
    }

    #[test]
    fn pop_never_empties_the_stack() {
        let mut s = Scope::new();
        assert!(s.pop().is_none());
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn table_record_layer_scopes_params_like_step_def_call() {
        let mut s = Scope::new();
        s.push(ScopeKind::TableRecord, "record-1");
        s.set_param("name", "alice");
        assert_eq!(s.get_param("name"), Some("alice".to_string()));
    }

    #[test]
    fn clear_only_touches_current_scope() {
        let mut s = Scope::new();
        s.set_property("env", "outer");
        s.push(ScopeKind::Scenario, "sc1");
        s.set_property("env", "inner");
        s.clear("env");
        assert_eq!(s.get_property("env"), Some("outer".to_string()));
        s.pop();
        assert_eq!(s.get_property("env"), Some("outer".to_string()));
    }

    #[test]
    fn visible_merges_all_layers_innermost_wins() {
        let mut s = Scope::new();
        s.set_property("base", "x");
        s.set_property("env", "outer");
        s.push(ScopeKind::Scenario, "sc1");
        s.set_property("env", "inner");
        let visible = s.visible();
        assert_eq!(visible.get("base"), Some(&"x".to_string()));
        assert_eq!(visible.get("env"), Some(&"inner".to_string()));
    }

    #[test]
    fn contains_scope_finds_named_layer() {
        let mut s = Scope::new();
        s.push(ScopeKind::StepDefCall, "call-a");
        assert!(s.contains_scope("call-a"));
        assert!(s.contains_scope("top"));
        assert!(!s.contains_scope("call-b"));
    }

    #[test]
    fn reset_feature_level_truncates_to_top() {
        use crate::settings::StateLevel;
        let mut s = Scope::new();
        s.push(ScopeKind::Feature, "f1");
        s.push(ScopeKind::Scenario, "sc1");
        s.push(ScopeKind::StepDefCall, "call-a");
        s.reset(StateLevel::Feature);
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn reset_scenario_level_keeps_feature_and_rule() {
        use crate::settings::StateLevel;
        let mut s = Scope::new();
        s.push(ScopeKind::Feature, "f1");
        s.push(ScopeKind::Rule, "r1");
        s.push(ScopeKind::Scenario, "sc1");
        s.push(ScopeKind::StepDefCall, "call-a");
        s.reset(StateLevel::Scenario);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.current().kind, ScopeKind::Rule);
    }

    #[test]
    fn reset_stepdef_level_only_discards_call_layers() {
        use crate::settings::StateLevel;
        let mut s = Scope::new();
        s.push(ScopeKind::Feature, "f1");
        s.push(ScopeKind::Scenario, "sc1");
        s.push(ScopeKind::StepDefCall, "call-a");
        s.push(ScopeKind::TableRecord, "record-1");
        s.reset(StateLevel::StepDef);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.current().kind, ScopeKind::Scenario);
    }
}
