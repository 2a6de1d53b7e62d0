//! The Gwen evaluation engine (spec.md §4): parses a [`FeatureUnit`],
//! compiles its StepDef library, and walks its [`Spec`] tree through the
//! Step Engine. Implements [`crate::launcher::Evaluator`], the seam the
//! Launcher schedules units through.

pub mod composite;
pub mod context;
pub mod step_engine;
pub mod translate;

use std::path::Path;

use crate::ast::tag::Tag;
use crate::ast::{
    new_node_id, Background, Examples, ExamplesRow, Feature, NodeType, RawTable, Rule, Scenario,
    SourceRef, Spec, Step, StepDef,
};
use crate::binding::{BindingResolver, JsEngine, SysprocRunner};
use crate::engine::context::EvalContext;
use crate::engine::step_engine::StepEngine;
use crate::engine::translate::{CoreUnitStepLibrary, StepDefLibrary, UnitStepLibrary};
use crate::error::Result;
use crate::events::{CallChainEntry, EventBus};
use crate::launcher::Evaluator;
use crate::scope::ScopeKind;
use crate::settings::Settings;
use crate::stream::FeatureUnit;

/// Owns the collaborators a unit's [`EvalContext`] needs (spec.md §5: one
/// context per unit) and implements [`Evaluator`] so the Launcher can drive
/// it without knowing anything about StepDefs or composites.
pub struct GwenEngine {
    pub js: Box<dyn JsEngine>,
    pub sysproc: Box<dyn SysprocRunner>,
    pub unit_library: Box<dyn UnitStepLibrary>,
    pub events: EventBus,
    pub settings: Settings,
}

impl GwenEngine {
    #[must_use]
    pub fn new(js: Box<dyn JsEngine>, sysproc: Box<dyn SysprocRunner>, settings: Settings) -> Self {
        Self {
            js,
            sysproc,
            unit_library: Box::new(CoreUnitStepLibrary),
            events: EventBus::new(),
            settings,
        }
    }
}

impl Evaluator for GwenEngine {
    fn evaluate(&self, unit: &FeatureUnit) -> Result<Spec> {
        let language = self.settings.language();
        let mut spec =
            crate::normaliser::normalise(parse_spec(&unit.feature_file, &language)?)?;
        for meta_path in &unit.meta_files {
            spec.meta_specs
                .push(crate::normaliser::normalise(parse_spec(meta_path, &language)?)?);
        }

        let mut step_defs: Vec<StepDef> = spec.own_step_defs();
        for meta in &spec.meta_specs {
            step_defs.extend(meta.own_step_defs());
        }
        let library = StepDefLibrary::compile(step_defs)?;
        let engine = StepEngine::new(&library, self.unit_library.as_ref());

        let resolver = BindingResolver::new(self.js.as_ref(), self.sysproc.as_ref());
        let mut ctx = EvalContext::new(resolver, &self.events, &self.settings);
        ctx.reset(self.settings.state_level());

        if let Some(record) = &unit.data_record {
            for (key, value) in record.iter() {
                ctx.scope.set_property(key.clone(), value.clone());
            }
        }

        ctx.scope.push(ScopeKind::Feature, spec.feature.name.clone());
        ctx.call_chain
            .push(CallChainEntry { node_type: NodeType::Feature, label: spec.feature.name.clone() });
        ctx.events.before(NodeType::Feature, &spec.feature.name, &ctx.call_chain);

        spec.scenarios = evaluate_scenarios(&engine, &spec.scenarios, &mut ctx)?;

        let mut rules = Vec::with_capacity(spec.rules.len());
        for rule in &spec.rules {
            let mut out_rule = rule.clone();
            ctx.scope.push(ScopeKind::Rule, rule.name.clone());
            ctx.call_chain.push(CallChainEntry { node_type: NodeType::Rule, label: rule.name.clone() });
            ctx.events.before(NodeType::Rule, &rule.name, &ctx.call_chain);

            out_rule.scenarios = evaluate_scenarios(&engine, &rule.scenarios, &mut ctx)?;

            ctx.events.after(NodeType::Rule, &rule.name, &ctx.call_chain);
            ctx.call_chain.pop();
            ctx.scope.pop();
            rules.push(out_rule);
        }
        spec.rules = rules;

        ctx.events.after(NodeType::Feature, &spec.feature.name, &ctx.call_chain);
        ctx.call_chain.pop();
        ctx.scope.pop();

        Ok(spec)
    }
}

/// Evaluates every executable scenario in `scenarios`, leaving `@StepDef`
/// declarations untouched — they are invoked through the library, never
/// walked directly.
fn evaluate_scenarios(
    engine: &StepEngine<'_>,
    scenarios: &[Scenario],
    ctx: &mut EvalContext,
) -> Result<Vec<Scenario>> {
    scenarios
        .iter()
        .map(|s| {
            if s.tags.iter().any(|t| t.name == "StepDef") {
                Ok(s.clone())
            } else {
                engine.evaluate_scenario(s, ctx)
            }
        })
        .collect()
}

fn parse_spec(path: &Path, language: &str) -> Result<Spec> {
    let env = gherkin::GherkinEnv::new(language.to_string()).unwrap_or_default();
    let feature = gherkin::Feature::parse_path(path, env)?;
    spec_from_gherkin(&feature, path, language)
}

fn spec_from_gherkin(feature: &gherkin::Feature, path: &Path, language: &str) -> Result<Spec> {
    let uri = path.display().to_string();
    let source_ref =
        SourceRef::new(uri.clone(), feature.position.line as u32, feature.position.col as u32);

    Ok(Spec {
        uuid: new_node_id(),
        feature: Feature {
            uuid: new_node_id(),
            source_ref,
            language: language.to_string(),
            tags: parse_tags(&feature.tags)?,
            keyword: feature.keyword.trim().to_string(),
            name: feature.name.clone(),
            description: feature.description.clone(),
        },
        background: feature
            .background
            .as_ref()
            .map(|b| background_from_gherkin(b, &uri))
            .transpose()?,
        scenarios: feature
            .scenarios
            .iter()
            .map(|s| scenario_from_gherkin(s, &uri))
            .collect::<Result<Vec<_>>>()?,
        rules: feature.rules.iter().map(|r| rule_from_gherkin(r, &uri)).collect::<Result<Vec<_>>>()?,
        source_file: Some(path.to_path_buf()),
        meta_specs: Vec::new(),
    })
}

fn parse_tags(tags: &[String]) -> Result<Vec<Tag>> {
    tags.iter().map(|t| Tag::parse(t).map_err(Into::into)).collect()
}

fn background_from_gherkin(bg: &gherkin::Background, uri: &str) -> Result<Background> {
    Ok(Background {
        uuid: new_node_id(),
        source_ref: SourceRef::new(uri, bg.position.line as u32, bg.position.col as u32),
        keyword: bg.keyword.trim().to_string(),
        name: bg.name.clone(),
        description: bg.description.clone(),
        steps: bg.steps.iter().map(|s| step_from_gherkin(s, uri)).collect(),
    })
}

fn scenario_from_gherkin(scenario: &gherkin::Scenario, uri: &str) -> Result<Scenario> {
    Ok(Scenario {
        uuid: new_node_id(),
        source_ref: SourceRef::new(uri, scenario.position.line as u32, scenario.position.col as u32),
        tags: parse_tags(&scenario.tags)?,
        keyword: scenario.keyword.trim().to_string(),
        name: scenario.name.clone(),
        description: scenario.description.clone(),
        background: None,
        steps: scenario.steps.iter().map(|s| step_from_gherkin(s, uri)).collect(),
        examples: scenario
            .examples
            .iter()
            .map(|e| examples_from_gherkin(e, uri))
            .collect::<Result<Vec<_>>>()?,
        params: Default::default(),
        caller_params: Default::default(),
    })
}

fn examples_from_gherkin(examples: &gherkin::Examples, uri: &str) -> Result<Examples> {
    let (header, rows) = match &examples.table {
        Some(table) => {
            let mut iter = table.rows.iter();
            let header = iter.next().cloned().unwrap_or_default();
            let rows = iter
                .enumerate()
                .map(|(i, cells)| ExamplesRow { line: i as u32, cells: cells.clone() })
                .collect();
            (header, rows)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(Examples {
        uuid: new_node_id(),
        source_ref: SourceRef::new(uri, examples.position.line as u32, examples.position.col as u32),
        tags: parse_tags(&examples.tags)?,
        keyword: examples.keyword.trim().to_string(),
        name: String::new(),
        description: None,
        header,
        rows,
        expanded_scenarios: Vec::new(),
    })
}

fn rule_from_gherkin(rule: &gherkin::Rule, uri: &str) -> Result<Rule> {
    Ok(Rule {
        uuid: new_node_id(),
        source_ref: SourceRef::new(uri, rule.position.line as u32, rule.position.col as u32),
        keyword: rule.keyword.trim().to_string(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        background: rule.background.as_ref().map(|b| background_from_gherkin(b, uri)).transpose()?,
        scenarios: rule
            .scenarios
            .iter()
            .map(|s| scenario_from_gherkin(s, uri))
            .collect::<Result<Vec<_>>>()?,
    })
}

fn step_from_gherkin(step: &gherkin::Step, uri: &str) -> Step {
    let mut out = Step::new(
        SourceRef::new(uri, step.position.line as u32, step.position.col as u32),
        step.keyword.trim().to_string(),
        step.value.clone(),
    );
    if let Some(table) = &step.table {
        out = out.with_table(RawTable::from_rows(table.rows.clone()));
    }
    if let Some(doc) = &step.docstring {
        out = out.with_doc_string(crate::ast::DocString {
            line: step.position.line as u32,
            content: doc.clone(),
            media_type: None,
        });
    }
    out
}
