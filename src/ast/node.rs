//! The spec node model (spec.md §3): immutable value nodes with `withX`
//! copy-constructors, stable `uuid`s, and the closed `NodeType` set.

use std::path::PathBuf;

use uuid::Uuid;

use crate::ast::status::EvalStatus;
use crate::ast::table::RawTable;
use crate::ast::tag::Tag;

/// A location in source text, plus the canonical, human-readable path once
/// normalisation has assigned one.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
    pub uri: String,
    pub line: u32,
    pub column: u32,
    /// A `/`-delimited path of `name[occurrence]` segments, assigned by the
    /// Normaliser's nodePath pass. `None` before normalisation.
    pub node_path: Option<String>,
}

impl SourceRef {
    #[must_use]
    pub fn new(uri: impl Into<String>, line: u32, column: u32) -> Self {
        Self { uri: uri.into(), line, column, node_path: None }
    }

    #[must_use]
    pub fn with_node_path(mut self, path: String) -> Self {
        self.node_path = Some(path);
        self
    }
}

/// The closed set of node kinds spec.md §3 enumerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeType {
    Root,
    Feature,
    Meta,
    Background,
    Rule,
    Scenario,
    StepDef,
    Examples,
    Step,
    Tag,
    Unit,
}

/// A stable identity carried by every spec node.
pub type NodeId = Uuid;

#[must_use]
pub fn new_node_id() -> NodeId {
    Uuid::new_v4()
}

/// A file attached to a step during evaluation (e.g. a screenshot, a
/// downloaded payload).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub name: String,
    pub file: PathBuf,
}

/// A fenced `"""` multi-line argument to a step.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DocString {
    pub line: u32,
    pub content: String,
    pub media_type: Option<String>,
}

/// A single Given/When/Then/And/But action line.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Step {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub keyword: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// Name of the StepDef this step was bound to, if any, set by the
    /// Translate phase of the step engine.
    pub step_def_binding: Option<String>,
    pub table: Option<RawTable>,
    pub doc_string: Option<DocString>,
    pub eval_status: EvalStatus,
    /// `header -> cellValue` bindings this step (or its owning scenario)
    /// carries, e.g. from outline expansion.
    pub params: linked_hash_map::LinkedHashMap<String, String>,
    /// Parameters passed in by a caller (e.g. a StepDef invocation).
    pub caller_params: linked_hash_map::LinkedHashMap<String, String>,
    /// Evaluated call-tree of a StepDef/composite invocation, populated by
    /// the step engine so `errorTrails` can walk into it.
    pub nested: Vec<Step>,
}

impl Step {
    #[must_use]
    pub fn new(source_ref: SourceRef, keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uuid: new_node_id(),
            source_ref,
            keyword: keyword.into(),
            text: text.into(),
            attachments: Vec::new(),
            step_def_binding: None,
            table: None,
            doc_string: None,
            eval_status: EvalStatus::Pending,
            params: Default::default(),
            caller_params: Default::default(),
            nested: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: EvalStatus) -> Self {
        self.eval_status = status;
        self
    }

    #[must_use]
    pub fn with_doc_string(mut self, doc: DocString) -> Self {
        self.doc_string = Some(doc);
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: RawTable) -> Self {
        self.table = Some(table);
        self
    }

    #[must_use]
    pub fn with_nested(mut self, nested: Vec<Step>) -> Self {
        self.nested = nested;
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// `true` if this step, or anything it evaluated in its nested call
    /// tree, is in a `Failed` status.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.eval_status == EvalStatus::Failed
            || self.nested.iter().any(Step::has_failure)
    }
}

/// Steps prepended to every scenario in a feature or rule's scope.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Background {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

impl Background {
    #[must_use]
    pub fn eval_status(&self) -> EvalStatus {
        EvalStatus::aggregate(self.steps.iter().map(|s| s.eval_status), false)
    }
}

/// A named, reusable sequence of steps matched by its Gherkin-expression
/// name, declared via a `@StepDef`-tagged Scenario in a `.meta` file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StepDef {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub tags: Vec<Tag>,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
    /// Ordered parameter names this StepDef's name expression captures.
    pub params: Vec<String>,
}

impl StepDef {
    #[must_use]
    pub fn is_for_each(&self) -> bool {
        self.tags.iter().any(|t| t.name == "ForEach")
    }

    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.tags
            .iter()
            .any(|t| t.name == "Synchronized" || t.name == "Synchronised")
    }

    #[must_use]
    pub fn data_table_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == "DataTable")
    }

    #[must_use]
    pub fn if_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == "If")
    }

    #[must_use]
    pub fn until_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == "Until")
    }

    #[must_use]
    pub fn while_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == "While")
    }
}

/// One row of an Examples table, pre-interpretation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExamplesRow {
    pub line: u32,
    pub cells: Vec<String>,
}

/// An Examples block attached to an outline Scenario.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Examples {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub tags: Vec<Tag>,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub header: Vec<String>,
    pub rows: Vec<ExamplesRow>,
    /// Scenarios expanded from this Examples block by the Normaliser; empty
    /// before normalisation.
    pub expanded_scenarios: Vec<Scenario>,
}

/// An ordered sequence of steps; an outline Scenario carries non-empty
/// `examples` and does not execute its own `steps` directly.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scenario {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub tags: Vec<Tag>,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub background: Option<Background>,
    pub steps: Vec<Step>,
    pub examples: Vec<Examples>,
    pub params: linked_hash_map::LinkedHashMap<String, String>,
    pub caller_params: linked_hash_map::LinkedHashMap<String, String>,
}

impl Scenario {
    #[must_use]
    pub fn is_outline(&self) -> bool {
        !self.examples.is_empty()
    }

    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.tags.iter().any(|t| t.name == "Synthetic")
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.tags.iter().any(|t| t.name == "Ignore")
    }

    /// Status aggregated over background (if any) then steps, per the
    /// "maximum of evaluated children" rule. Outline scenarios aggregate
    /// over their expanded scenarios instead.
    #[must_use]
    pub fn eval_status(&self) -> EvalStatus {
        if self.is_outline() {
            return EvalStatus::aggregate(
                self.examples
                    .iter()
                    .flat_map(|ex| ex.expanded_scenarios.iter())
                    .map(Scenario::eval_status),
                false,
            );
        }
        let bg_status = self.background.as_ref().map(Background::eval_status);
        EvalStatus::aggregate(
            bg_status.into_iter().chain(self.steps.iter().map(|s| s.eval_status)),
            false,
        )
    }
}

/// A group of scenarios sharing additional background context.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
    pub background: Option<Background>,
    pub scenarios: Vec<Scenario>,
}

impl Rule {
    #[must_use]
    pub fn eval_status(&self) -> EvalStatus {
        EvalStatus::aggregate(self.scenarios.iter().map(Scenario::eval_status), false)
    }
}

/// A named Gherkin specification: language, tags, keyword, name,
/// description.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub uuid: NodeId,
    pub source_ref: SourceRef,
    pub language: String,
    pub tags: Vec<Tag>,
    pub keyword: String,
    pub name: String,
    pub description: Option<String>,
}

/// The root parse/normalise result for one `.feature` or `.meta` file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Spec {
    pub uuid: NodeId,
    pub feature: Feature,
    pub background: Option<Background>,
    pub scenarios: Vec<Scenario>,
    pub rules: Vec<Rule>,
    pub source_file: Option<PathBuf>,
    /// Specs contributed by the `.meta` files inherited by this unit.
    pub meta_specs: Vec<Spec>,
}

impl Spec {
    #[must_use]
    pub fn eval_status(&self) -> EvalStatus {
        EvalStatus::aggregate(
            self.scenarios
                .iter()
                .map(Scenario::eval_status)
                .chain(self.rules.iter().map(Rule::eval_status)),
            false,
        )
    }

    /// All StepDefs declared directly on this Spec (i.e. `@StepDef`-tagged
    /// scenarios), not recursing into `meta_specs` — see
    /// `engine::translate::StepDefLibrary` for the merged, inheritance-aware
    /// view used at evaluation time.
    #[must_use]
    pub fn own_step_defs(&self) -> Vec<StepDef> {
        self.scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t.name == "StepDef"))
            .map(scenario_to_step_def)
            .collect()
    }

    /// Walks the tree collecting root-to-leaf Step chains whose leaf is in
    /// a `Failed` status, for reporter consumption. Descends into outline
    /// scenarios' `expanded_scenarios` (an outline scenario's own `steps`
    /// never execute) and both background levels (feature/rule and
    /// per-scenario, the latter a copy replicated by the Normaliser).
    #[must_use]
    pub fn error_trails(&self) -> Vec<Vec<Step>> {
        let mut trails = Vec::new();
        for scenario in &self.scenarios {
            collect_scenario_trails(scenario, &mut trails);
        }
        for rule in &self.rules {
            for scenario in &rule.scenarios {
                collect_scenario_trails(scenario, &mut trails);
            }
        }
        trails
    }
}

fn collect_scenario_trails(scenario: &Scenario, out: &mut Vec<Vec<Step>>) {
    if let Some(background) = &scenario.background {
        for step in &background.steps {
            collect_trails(step, &mut Vec::new(), out);
        }
    }
    for step in &scenario.steps {
        collect_trails(step, &mut Vec::new(), out);
    }
    for examples in &scenario.examples {
        for expanded in &examples.expanded_scenarios {
            collect_scenario_trails(expanded, out);
        }
    }
}

fn collect_trails(step: &Step, prefix: &mut Vec<Step>, out: &mut Vec<Vec<Step>>) {
    prefix.push(step.clone());
    if step.nested.is_empty() {
        if step.eval_status == EvalStatus::Failed {
            out.push(prefix.clone());
        }
    } else {
        for child in &step.nested {
            collect_trails(child, prefix, out);
        }
    }
    prefix.pop();
}

fn scenario_to_step_def(scenario: &Scenario) -> StepDef {
    StepDef {
        uuid: scenario.uuid,
        source_ref: scenario.source_ref.clone(),
        tags: scenario.tags.clone(),
        keyword: scenario.keyword.clone(),
        name: scenario.name.clone(),
        description: scenario.description.clone(),
        steps: scenario.steps.clone(),
        params: param_names(&scenario.name),
    }
}

/// Extracts `<name>` placeholder tokens from a StepDef's name expression, in
/// order of appearance, e.g. `"I transfer <amount> to <account>"` yields
/// `["amount", "account"]`.
#[must_use]
pub fn param_names(step_def_name: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = step_def_name;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else { break };
        names.push(rest[open + 1..open + close].to_string());
        rest = &rest[open + close + 1..];
    }
    names
}

/// Derives the 1-based occurrence index of `name` among `siblings` sharing
/// the same name under the same parent, used for nodePath assignment. Ties
/// (identical source location) are broken by input order.
#[must_use]
pub fn occurrence_index(name: &str, preceding_siblings_same_name: usize) -> usize {
    preceding_siblings_same_name + 1
}

/// Formats one `nodePath` segment: `name[occurrence]`.
#[must_use]
pub fn node_path_segment(name: &str, occurrence: usize) -> String {
    format!("{name}[{occurrence}]")
}
