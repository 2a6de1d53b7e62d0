//! The Step Engine (spec.md §4.G): walks one scenario's steps through
//! Interpolate -> before-step event -> health check (first step only) ->
//! Translate -> Execute -> Finalise -> after-step event. Composites and
//! plain StepDef calls both flow through [`StepEngine::evaluate_steps`] as
//! the `run` callback their body steps recurse through.

use crate::ast::{
    Attachment, DataTableAnnotation, EvalStatus, NodeType, Scenario, Step, StepDef,
};
use crate::engine::composite::{
    call_step_def, if_defined_condition, js_condition, run_for_each, run_for_each_table_record,
    run_until, run_while, StepRunner,
};
use crate::engine::context::EvalContext;
use crate::engine::translate::{
    composite_kind, CompositeKind, StepDefLibrary, UnitAction, UnitStepLibrary,
};
use crate::error::{GwenError, Result};
use crate::events::CallChainEntry;
use crate::interpolate::{interpolate_params, interpolate_string};
use crate::scope::ScopeKind;

pub struct StepEngine<'e> {
    step_defs: &'e StepDefLibrary,
    unit_library: &'e dyn UnitStepLibrary,
}

impl<'e> StepEngine<'e> {
    #[must_use]
    pub fn new(step_defs: &'e StepDefLibrary, unit_library: &'e dyn UnitStepLibrary) -> Self {
        Self { step_defs, unit_library }
    }

    /// Evaluates one scenario end to end: its replicated background (if
    /// any), then its own steps, skipped entirely if the background
    /// failed. Outline scenarios recurse into their expanded scenarios
    /// instead of evaluating `self.steps` directly.
    pub fn evaluate_scenario(&self, scenario: &Scenario, ctx: &mut EvalContext) -> Result<Scenario> {
        let mut out = scenario.clone();

        if scenario.is_outline() {
            let mut examples = Vec::with_capacity(scenario.examples.len());
            for ex in &scenario.examples {
                let mut ex_out = ex.clone();
                ex_out.expanded_scenarios = ex
                    .expanded_scenarios
                    .iter()
                    .map(|s| self.evaluate_plain_scenario(s, ctx))
                    .collect::<Result<Vec<_>>>()?;
                examples.push(ex_out);
            }
            out.examples = examples;
            return Ok(out);
        }

        out = self.evaluate_plain_scenario(scenario, ctx)?;
        Ok(out)
    }

    fn evaluate_plain_scenario(&self, scenario: &Scenario, ctx: &mut EvalContext) -> Result<Scenario> {
        ctx.scope.push(ScopeKind::Scenario, scenario.name.clone());
        ctx.call_chain
            .push(CallChainEntry { node_type: NodeType::Scenario, label: scenario.name.clone() });
        ctx.events.before(NodeType::Scenario, &scenario.name, &ctx.call_chain);

        let mut out = scenario.clone();
        if scenario.is_ignored() {
            out.steps = disable(&scenario.steps);
            out.background = scenario.background.as_ref().map(|bg| {
                let mut bg = bg.clone();
                bg.steps = disable(&bg.steps);
                bg
            });
        } else {
            let mut background_failed = false;
            if let Some(bg) = &scenario.background {
                let steps = self.evaluate_steps(&bg.steps, ctx)?;
                background_failed = steps.iter().any(|s| s.eval_status == EvalStatus::Failed);
                let mut bg = bg.clone();
                bg.steps = steps;
                out.background = Some(bg);
            }
            out.steps = if background_failed {
                skip(&scenario.steps)
            } else {
                self.evaluate_steps(&scenario.steps, ctx)?
            };
        }

        ctx.events.after(NodeType::Scenario, &scenario.name, &ctx.call_chain);
        ctx.call_chain.pop();
        ctx.scope.pop();
        Ok(out)
    }

    /// Evaluates a sequence of sibling steps, skipping the rest of the
    /// sequence once one hard-fails (spec.md §4.G item 5); a soft/sustained
    /// failure does not short-circuit its siblings.
    pub fn evaluate_steps(&self, steps: &[Step], ctx: &mut EvalContext) -> Result<Vec<Step>> {
        let mut out = Vec::with_capacity(steps.len());
        let mut short_circuited = false;
        for (i, step) in steps.iter().enumerate() {
            if short_circuited {
                out.push(step.clone().with_status(EvalStatus::Skipped));
                continue;
            }
            let evaluated = self.evaluate_step(step, i == 0, ctx);
            if evaluated.eval_status == EvalStatus::Failed {
                short_circuited = true;
            }
            out.push(evaluated);
        }
        Ok(out)
    }

    fn evaluate_step(&self, step: &Step, is_first: bool, ctx: &mut EvalContext) -> Step {
        let text = match interpolate_params(&step.text, &ctx.scope)
            .and_then(|t| interpolate_string(&t, &ctx.scope, ctx.settings.dry_run()))
        {
            Ok(t) => t,
            Err(e) => return self.finalize(step, step.text.clone(), Err(e), ctx),
        };

        ctx.events.before(NodeType::Step, &text, &ctx.call_chain);

        let outcome = if is_first {
            self.step_defs
                .check_no_duplicate_names()
                .and_then(|()| self.translate_and_execute(&text, step, ctx))
        } else {
            self.translate_and_execute(&text, step, ctx)
        };

        let result = self.finalize(step, text.clone(), outcome, ctx);
        ctx.events.after(NodeType::Step, &text, &ctx.call_chain);
        result
    }

    fn finalize(
        &self,
        step: &Step,
        text: String,
        outcome: Result<(EvalStatus, Vec<Step>)>,
        ctx: &mut EvalContext,
    ) -> Step {
        let (status, nested, error) = match outcome {
            Ok((status, nested)) => (status, nested, None),
            Err(e) => (e.implied_status(), Vec::new(), Some(e)),
        };

        let mut attachments = ctx.take_attachments();
        if status == EvalStatus::Failed && !attachments.iter().any(|a| a.name == "Error details") {
            attachments.push(error_details(&text, error.as_ref(), ctx));
        }

        step.clone().with_text(text).with_status(status).with_nested(nested).with_attachments(attachments)
    }

    fn translate_and_execute(
        &self,
        text: &str,
        calling_step: &Step,
        ctx: &mut EvalContext,
    ) -> Result<(EvalStatus, Vec<Step>)> {
        if let Some((step_def, params)) = self.step_defs.resolve(text)? {
            let step_def = step_def.clone();
            return self.execute_step_def(&step_def, &params, calling_step, ctx);
        }
        if let Some(action) = self.unit_library.translate(text) {
            return self.execute_unit_action(action, ctx).map(|status| (status, Vec::new()));
        }
        Err(GwenError::UndefinedStep { text: text.to_string() })
    }

    fn execute_step_def(
        &self,
        step_def: &StepDef,
        params: &[String],
        calling_step: &Step,
        ctx: &mut EvalContext,
    ) -> Result<(EvalStatus, Vec<Step>)> {
        let kind = composite_kind(step_def);
        let run: &StepRunner = &|steps, ctx| self.evaluate_steps(steps, ctx);

        if step_def.is_synchronized() {
            let lock = crate::engine::context::synchronized_lock(&step_def.name);
            let _guard = lock.lock().unwrap();
            return self.dispatch_composite(kind, step_def, params, calling_step, ctx, run);
        }
        self.dispatch_composite(kind, step_def, params, calling_step, ctx, run)
    }

    fn dispatch_composite(
        &self,
        kind: CompositeKind,
        step_def: &StepDef,
        params: &[String],
        calling_step: &Step,
        ctx: &mut EvalContext,
        run: &StepRunner,
    ) -> Result<(EvalStatus, Vec<Step>)> {
        match kind {
            CompositeKind::Plain => call_step_def(step_def, params, ctx, run),
            CompositeKind::IfDefined { name, negate } => {
                if if_defined_condition(&name, negate, ctx) {
                    call_step_def(step_def, params, ctx, run)
                } else {
                    // Unsatisfied precondition abstains rather than skips.
                    Ok((EvalStatus::Passed, Vec::new()))
                }
            }
            CompositeKind::JsWhile { expression } => run_while(step_def, &expression, params, ctx, run),
            CompositeKind::JsUntil { expression } => run_until(step_def, &expression, params, ctx, run),
            CompositeKind::ForEach => {
                let elements = params
                    .first()
                    .map(|csv| csv.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default();
                run_for_each(step_def, &elements, ctx, run)
            }
            CompositeKind::ForEachTableRecord => {
                let table = calling_step.table.as_ref().ok_or_else(|| GwenError::DataTable {
                    reason: format!("StepDef `{}` expects a calling data table", step_def.name),
                })?;
                let annotation = step_def
                    .data_table_tag()
                    .and_then(|t| t.value.as_deref())
                    .map(DataTableAnnotation::parse)
                    .transpose()?;
                run_for_each_table_record(step_def, table, annotation.as_ref(), ctx, run)
            }
        }
    }

    fn execute_unit_action(&self, action: UnitAction, ctx: &mut EvalContext) -> Result<EvalStatus> {
        match action {
            UnitAction::Bind { name, value } => {
                let value = interpolate_string(&value, &ctx.scope, ctx.settings.dry_run())?;
                ctx.scope.set_property(name, value);
                Ok(EvalStatus::Passed)
            }
            UnitAction::AssertEquals { name, expected } => {
                let actual = ctx.resolver.resolve(&name, &mut ctx.scope)?;
                let expected = interpolate_string(&expected, &ctx.scope, ctx.settings.dry_run())?;
                if actual == expected {
                    Ok(EvalStatus::Passed)
                } else {
                    Err(GwenError::Assertion {
                        mode: ctx.settings.assertion_mode(),
                        message: format!(
                            "expected `{name}` to be \"{expected}\" but was \"{actual}\""
                        ),
                    })
                }
            }
            UnitAction::AssertDefined { name, negate } => {
                let defined = ctx.resolver.resolve(&name, &mut ctx.scope).is_ok();
                let satisfied = if negate { !defined } else { defined };
                if satisfied {
                    Ok(EvalStatus::Passed)
                } else {
                    Err(GwenError::Assertion {
                        mode: ctx.settings.assertion_mode(),
                        message: if negate {
                            format!("expected `{name}` not to be defined")
                        } else {
                            format!("expected `{name}` to be defined")
                        },
                    })
                }
            }
        }
    }
}

fn skip(steps: &[Step]) -> Vec<Step> {
    steps.iter().cloned().map(|s| s.with_status(EvalStatus::Skipped)).collect()
}

fn disable(steps: &[Step]) -> Vec<Step> {
    steps.iter().cloned().map(|s| s.with_status(EvalStatus::Disabled)).collect()
}

/// Dumps the error message plus every visible scope attribute to a temp
/// file, attached to a Failed step with no reporter-supplied detail of its
/// own (spec.md §4.G item 6).
fn error_details(text: &str, error: Option<&GwenError>, ctx: &EvalContext) -> Attachment {
    let message = error.map(ToString::to_string).unwrap_or_else(|| "step failed".to_string());
    let mut dump = format!("step: {text}\nerror: {message}\n\nscope:\n");
    for layer in ctx.scope.layers() {
        dump.push_str(&format!("[{:?} {}]\n", layer.kind, layer.name));
        for (k, v) in layer.attributes() {
            dump.push_str(&format!("  {k} = {v}\n"));
        }
    }
    let file = std::env::temp_dir().join(format!("gwen-error-{}.txt", uuid::Uuid::new_v4()));
    let _ = std::fs::write(&file, dump);
    Attachment { name: "Error details".to_string(), file }
}
