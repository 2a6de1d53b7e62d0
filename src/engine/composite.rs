//! Composite lambdas (spec.md §4.H): `StepDefCall`, `IfDefinedCondition`,
//! `JSCondition`, `While`/`Until`, `ForEach`, `ForEachTableRecord`. Each
//! takes a `run` callback — the step engine's own step-sequence evaluator —
//! so a composite's body is evaluated through the same pipeline as any
//! other step, including further nested composite dispatch.

use crate::ast::{DataTable, EvalStatus, RawTable, SourceRef, Step, StepDef};
use crate::engine::context::EvalContext;
use crate::error::{GwenError, Result};
use crate::scope::ScopeKind;

/// Evaluates a sequence of steps under whatever scope the caller has
/// already pushed, returning the evaluated steps.
pub type StepRunner<'r> = dyn Fn(&[Step], &mut EvalContext) -> Result<Vec<Step>> + 'r;

/// Binds `step_def.params` to `args` in a fresh `StepDefCall` scope layer,
/// runs the body, unbinds on exit (including on error, via the `Drop`-style
/// pop happening before the `?` propagates).
pub fn call_step_def(
    step_def: &StepDef,
    args: &[String],
    ctx: &mut EvalContext,
    run: &StepRunner,
) -> Result<(EvalStatus, Vec<Step>)> {
    let args_signature = args.join("\u{1}");
    let recursive = ctx.enter_call(&step_def.name, &args_signature);
    if recursive {
        ctx.exit_call();
        return Err(GwenError::RecursiveStepDef { name: step_def.name.clone() });
    }

    ctx.scope.push(ScopeKind::StepDefCall, step_def.name.clone());
    for (name, value) in step_def.params.iter().zip(args) {
        ctx.scope.set_param(name.clone(), value.clone());
    }
    let result = run(&step_def.steps, ctx);
    ctx.scope.pop();
    ctx.exit_call();

    let body = result?;
    let status = EvalStatus::aggregate(body.iter().map(|s| s.eval_status), true);
    Ok((status, body))
}

/// Tests whether `name` currently has a successful binding (or does not,
/// when `negate`).
pub fn if_defined_condition(name: &str, negate: bool, ctx: &mut EvalContext) -> bool {
    let resolved = ctx.resolver.resolve(name, &mut ctx.scope).is_ok();
    if negate {
        !resolved
    } else {
        resolved
    }
}

/// Evaluates a JS expression, coercing its result to a boolean (`"true"`/
/// `"1"` are truthy, everything else falsy), then applies `negate`.
pub fn js_condition(expression: &str, negate: bool, ctx: &mut EvalContext) -> Result<bool> {
    let interpolated =
        crate::interpolate::interpolate_string(expression, &ctx.scope, ctx.settings.dry_run())?;
    let value = ctx
        .resolver
        .js
        .evaluate(&interpolated)
        .map_err(|message| GwenError::JSExecution { message })?;
    let truthy = matches!(value.trim(), "true" | "1");
    Ok(if negate { !truthy } else { truthy })
}

/// `While(condition) do stepDef`: tests first each iteration.
pub fn run_while(
    step_def: &StepDef,
    expression: &str,
    args: &[String],
    ctx: &mut EvalContext,
    run: &StepRunner,
) -> Result<(EvalStatus, Vec<Step>)> {
    run_loop(step_def, expression, args, ctx, run, true)
}

/// `Until(condition) do stepDef`: runs the body first, then tests.
pub fn run_until(
    step_def: &StepDef,
    expression: &str,
    args: &[String],
    ctx: &mut EvalContext,
    run: &StepRunner,
) -> Result<(EvalStatus, Vec<Step>)> {
    run_loop(step_def, expression, args, ctx, run, false)
}

fn run_loop(
    step_def: &StepDef,
    expression: &str,
    args: &[String],
    ctx: &mut EvalContext,
    run: &StepRunner,
    test_before_body: bool,
) -> Result<(EvalStatus, Vec<Step>)> {
    let max_iterations = ctx.settings.max_loop_iterations();
    let delay = std::time::Duration::from_millis(ctx.settings.loop_delay_millis());
    let mut iterations = Vec::new();

    for i in 0..max_iterations {
        if test_before_body && !js_condition(expression, false, ctx)? {
            break;
        }
        if i > 0 && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let (status, body) = call_step_def(step_def, args, ctx, run)?;
        iterations.push(iteration_step(i, step_def, status, body));
        // Until stops once its condition becomes true.
        if !test_before_body && js_condition(expression, false, ctx)? {
            break;
        }
    }

    let status = EvalStatus::aggregate(iterations.iter().map(|s| s.eval_status), false);
    Ok((status, iterations))
}

/// `ForEach(elements, elementName, doStep)`: `step_def` must declare exactly
/// one parameter, bound in turn to each of `elements`.
pub fn run_for_each(
    step_def: &StepDef,
    elements: &[String],
    ctx: &mut EvalContext,
    run: &StepRunner,
) -> Result<(EvalStatus, Vec<Step>)> {
    let mut iterations = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        let (status, body) = call_step_def(step_def, std::slice::from_ref(element), ctx, run)?;
        iterations.push(iteration_step(i, step_def, status, body));
    }
    let status = EvalStatus::aggregate(iterations.iter().map(|s| s.eval_status), false);
    Ok((status, iterations))
}

/// `ForEachTableRecord`: one invocation per row of `table`, binding
/// `data[col]` per column and `record.number` in a `TableRecord` scope.
pub fn run_for_each_table_record(
    step_def: &StepDef,
    table: &RawTable,
    annotation: Option<&crate::ast::DataTableAnnotation>,
    ctx: &mut EvalContext,
    run: &StepRunner,
) -> Result<(EvalStatus, Vec<Step>)> {
    let interpreted = DataTable::interpret(table, annotation)?;
    let records = interpreted.records();
    let mut iterations = Vec::new();

    for (i, record) in records.iter().enumerate() {
        ctx.scope.push(ScopeKind::TableRecord, format!("record-{}", i + 1));
        for (col, value) in record.iter() {
            ctx.scope.set_param(format!("data[{col}]"), value.clone());
        }
        ctx.scope.set_param("record.number", (i + 1).to_string());
        let body = run(&step_def.steps, ctx);
        ctx.scope.pop();
        let body = body?;
        let status = EvalStatus::aggregate(body.iter().map(|s| s.eval_status), true);
        iterations.push(iteration_step(i, step_def, status, body));
    }

    let status = EvalStatus::aggregate(iterations.iter().map(|s| s.eval_status), false);
    Ok((status, iterations))
}

fn iteration_step(index: usize, step_def: &StepDef, status: EvalStatus, body: Vec<Step>) -> Step {
    Step::new(step_def.source_ref.clone(), "*", format!("iteration {}", index + 1))
        .with_status(status)
        .with_nested(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Tag;
    use crate::binding::{BindingResolver, JsEngine, SysprocRunner};
    use crate::events::EventBus;
    use crate::settings::Settings;

    struct CountingJs;
    impl JsEngine for CountingJs {
        fn evaluate(&self, expression: &str) -> std::result::Result<String, String> {
            Ok(expression.to_string())
        }
        fn call(&self, _: &str, _: &[String]) -> std::result::Result<String, String> {
            Ok(String::new())
        }
    }
    struct NoopSysproc;
    impl SysprocRunner for NoopSysproc {
        fn run(&self, _: &str) -> std::result::Result<String, String> {
            Ok(String::new())
        }
    }

    fn step_def(name: &str, params: Vec<&str>, tags: Vec<Tag>) -> StepDef {
        StepDef {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("m.feature", 1, 1),
            tags,
            keyword: "Given".into(),
            name: name.into(),
            description: None,
            steps: vec![Step::new(SourceRef::new("m.feature", 2, 1), "Given", "noop")
                .with_status(EvalStatus::Passed)],
            params: params.into_iter().map(String::from).collect(),
        }
    }

    fn identity_run(steps: &[Step], _ctx: &mut EvalContext) -> Result<Vec<Step>> {
        Ok(steps.to_vec())
    }

    fn context(events: &EventBus, settings: &Settings) -> EvalContext<'_> {
        EvalContext::new(BindingResolver::new(&CountingJs, &NoopSysproc), events, settings)
    }

    #[test]
    fn call_step_def_binds_params_and_unwinds_scope() {
        let events = EventBus::new();
        let settings = Settings::new();
        let mut ctx = context(&events, &settings);
        let def = step_def("greet <name>", vec!["name"], vec![]);

        let (status, body) =
            call_step_def(&def, &["alice".to_string()], &mut ctx, &identity_run).unwrap();

        assert_eq!(status, EvalStatus::Passed);
        assert_eq!(body.len(), 1);
        assert_eq!(ctx.scope.depth(), 1, "call scope must be popped on return");
    }

    #[test]
    fn for_each_runs_body_once_per_element() {
        let events = EventBus::new();
        let settings = Settings::new();
        let mut ctx = context(&events, &settings);
        let def = step_def("greet <name>", vec!["name"], vec![]);

        let elements = vec!["alice".to_string(), "bob".to_string(), "carl".to_string()];
        let (status, iterations) = run_for_each(&def, &elements, &mut ctx, &identity_run).unwrap();

        assert_eq!(status, EvalStatus::Passed);
        assert_eq!(iterations.len(), 3);
    }

    #[test]
    fn while_stops_when_condition_becomes_false() {
        let events = EventBus::new();
        let settings = Settings::new();
        settings.set_max_loop_iterations(10);
        let mut ctx = context(&events, &settings);
        let def = step_def("tick", vec![], vec![]);

        let (_, iterations) = run_while(&def, "false", &[], &mut ctx, &identity_run).unwrap();
        assert!(iterations.is_empty(), "while tests before the first iteration");
    }

    #[test]
    fn until_runs_body_at_least_once() {
        let events = EventBus::new();
        let settings = Settings::new();
        settings.set_max_loop_iterations(10);
        let mut ctx = context(&events, &settings);
        let def = step_def("tick", vec![], vec![]);

        let (_, iterations) = run_until(&def, "true", &[], &mut ctx, &identity_run).unwrap();
        assert_eq!(iterations.len(), 1, "until runs the body before its first test");
    }

    #[test]
    fn if_defined_condition_negates() {
        let events = EventBus::new();
        let settings = Settings::new();
        let mut ctx = context(&events, &settings);
        ctx.scope.set_property("ready", "yes");
        assert!(if_defined_condition("ready", false, &mut ctx));
        assert!(!if_defined_condition("ready", true, &mut ctx));
        assert!(!if_defined_condition("missing", false, &mut ctx));
    }
}
