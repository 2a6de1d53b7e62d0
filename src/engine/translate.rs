//! Translate phase (spec.md §4.G/§4.H): turns interpolated step text into a
//! `Translation` — composite, StepDef call, or unit primitive — tried in
//! that order. `StepDefLibrary` compiles each StepDef's name expression
//! into an anchored regex once, so repeated lookups don't re-parse it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{StepDef, Tag};
use crate::error::{GwenError, Result};

/// Which composite behaviour (if any) wraps a matched StepDef's body,
/// derived from its reserved tags (spec.md §4.H, Open Question 1/2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompositeKind {
    /// No composite tag: a plain `StepDefCall`.
    Plain,
    IfDefined { name: String, negate: bool },
    JsWhile { expression: String },
    JsUntil { expression: String },
    ForEach,
    ForEachTableRecord,
}

#[must_use]
pub fn composite_kind(step_def: &StepDef) -> CompositeKind {
    if let Some(tag) = step_def.if_tag() {
        let (negate, name) = split_negation(tag);
        return CompositeKind::IfDefined { name, negate };
    }
    if let Some(tag) = step_def.until_tag() {
        return CompositeKind::JsUntil { expression: tag.value.clone().unwrap_or_default() };
    }
    if let Some(tag) = step_def.while_tag() {
        return CompositeKind::JsWhile { expression: tag.value.clone().unwrap_or_default() };
    }
    if step_def.is_for_each() {
        return if step_def.data_table_tag().is_some() {
            CompositeKind::ForEachTableRecord
        } else {
            CompositeKind::ForEach
        };
    }
    CompositeKind::Plain
}

fn split_negation(tag: &Tag) -> (bool, String) {
    let value = tag.value.clone().unwrap_or_default();
    match value.strip_prefix('!') {
        Some(rest) => (true, rest.to_string()),
        None => (false, value),
    }
}

/// One StepDef, its name expression compiled into an anchored, case
/// sensitive regex where each `<param>` placeholder becomes a capturing
/// group matched non-greedily.
pub struct CompiledStepDef {
    pub step_def: StepDef,
    pattern: Regex,
}

impl CompiledStepDef {
    pub fn compile(step_def: StepDef) -> Result<Self> {
        let pattern = compile_name_pattern(&step_def.name)?;
        Ok(Self { step_def, pattern })
    }

    /// Matches `text` exactly, returning the ordered parameter values if it
    /// matches.
    #[must_use]
    pub fn match_text(&self, text: &str) -> Option<Vec<String>> {
        let captures = self.pattern.captures(text)?;
        Some(
            self.step_def
                .params
                .iter()
                .enumerate()
                .map(|(i, _)| captures.get(i + 1).map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

fn compile_name_pattern(name: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    let mut rest = name;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            pattern.push_str(&regex::escape(rest));
            rest = "";
            break;
        };
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str("(.+?)");
        rest = &rest[open + close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| GwenError::Internal {
        message: format!("failed to compile StepDef name `{name}`: {e}"),
    })
}

/// The merged, compiled set of StepDefs visible to a unit (its own plus
/// everything inherited from `.meta` files).
pub struct StepDefLibrary {
    defs: Vec<CompiledStepDef>,
}

impl StepDefLibrary {
    pub fn compile(step_defs: Vec<StepDef>) -> Result<Self> {
        let defs = step_defs
            .into_iter()
            .map(CompiledStepDef::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { defs })
    }

    /// Returns the single matching StepDef and its captured parameter
    /// values, or `Ok(None)` if nothing matches, or
    /// `Err(GwenError::Ambiguous)` if more than one StepDef matches.
    pub fn resolve(&self, text: &str) -> Result<Option<(&StepDef, Vec<String>)>> {
        let mut matches: Vec<(&StepDef, Vec<String>)> = self
            .defs
            .iter()
            .filter_map(|d| d.match_text(text).map(|params| (&d.step_def, params)))
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.remove(0))),
            n => Err(GwenError::Ambiguous { subject: text.to_string(), count: n }),
        }
    }

    /// Flags two StepDefs declared under the exact same name expression —
    /// the duplicate-binding half of the step engine's first-step health
    /// check (spec.md §4.G item 3).
    pub fn check_no_duplicate_names(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for def in &self.defs {
            if !seen.insert(def.step_def.name.as_str()) {
                return Err(GwenError::Ambiguous { subject: def.step_def.name.clone(), count: 2 });
            }
        }
        Ok(())
    }
}

/// The small fixed vocabulary of primitive steps the core itself defines
/// (spec.md §1: "binding, capture, assertion primitives"); domain step
/// libraries extend translation through this same hook.
pub trait UnitStepLibrary: Send + Sync {
    fn translate(&self, text: &str) -> Option<UnitAction>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitAction {
    /// `my <name> is "<value>"`: binds a literal value into the current
    /// scope layer.
    Bind { name: String, value: String },
    /// `<name> should be "<value>"`: asserts a resolved binding's value.
    AssertEquals { name: String, expected: String },
    /// `<name> should be defined` / `should not be defined`.
    AssertDefined { name: String, negate: bool },
}

static BIND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^my (.+) is "(.*)"$"#).unwrap());
static ASSERT_EQUALS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^(.+) should be "(.*)"$"#).unwrap());
static ASSERT_DEFINED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+) should be defined$").unwrap());
static ASSERT_NOT_DEFINED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+) should not be defined$").unwrap());

/// The core's own unit translator, covering the fixed binding/assertion
/// vocabulary. Checked last in the Translate phase, after composites and
/// StepDef lookup, per spec.md §4.G.
#[derive(Default)]
pub struct CoreUnitStepLibrary;

impl UnitStepLibrary for CoreUnitStepLibrary {
    fn translate(&self, text: &str) -> Option<UnitAction> {
        if let Some(c) = ASSERT_NOT_DEFINED_RE.captures(text) {
            return Some(UnitAction::AssertDefined { name: c[1].to_string(), negate: true });
        }
        if let Some(c) = ASSERT_DEFINED_RE.captures(text) {
            return Some(UnitAction::AssertDefined { name: c[1].to_string(), negate: false });
        }
        if let Some(c) = ASSERT_EQUALS_RE.captures(text) {
            return Some(UnitAction::AssertEquals { name: c[1].to_string(), expected: c[2].to_string() });
        }
        if let Some(c) = BIND_RE.captures(text) {
            return Some(UnitAction::Bind { name: c[1].to_string(), value: c[2].to_string() });
        }
        None
    }
}
