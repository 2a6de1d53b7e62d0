//! Sequential launch strategy (spec.md §4.I): folds the unit stream into a
//! [`ResultsSummary`] one `FeatureUnit` at a time, on the calling thread.

use std::time::SystemTime;

use crate::error::Result;
use crate::launcher::summary::{ResultsSummary, SpecResult};
use crate::launcher::Evaluator;
use crate::reporter::ReportGenerator;
use crate::settings::Settings;
use crate::stream::FeatureUnit;

/// Evaluates `units` one at a time, reporting each as it finishes.
///
/// Stops early (without evaluating the remaining units) once a unit's
/// result is not exit-clean and both `Settings::failfast_exit()` is set and
/// dry-run is off — a dry run always evaluates every unit so its reports
/// stay complete.
pub fn run(
    units: &[FeatureUnit],
    evaluator: &dyn Evaluator,
    reporter: &dyn ReportGenerator,
    settings: &Settings,
) -> Result<ResultsSummary> {
    let mut summary = ResultsSummary::new();
    reporter.init();

    for unit in units {
        let started = SystemTime::now();
        let spec = evaluator.evaluate(unit)?;
        let finished = SystemTime::now();
        let result = SpecResult { feature_unit: unit.clone(), spec, started, finished };

        reporter.report_detail(unit, &result);
        let clean = result.status().is_exit_clean();
        summary.add(result);

        if !clean && settings.failfast_exit() && !settings.dry_run() {
            break;
        }
    }

    reporter.report_summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EvalStatus, Feature, Scenario, SourceRef, Spec, Step};
    use crate::reporter::NullReportGenerator;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unit(name: &str) -> FeatureUnit {
        FeatureUnit {
            feature_file: PathBuf::from(name),
            meta_files: vec![],
            data_record: None,
        }
    }

    fn spec_with_status(status: EvalStatus) -> Spec {
        Spec {
            uuid: crate::ast::new_node_id(),
            feature: Feature {
                uuid: crate::ast::new_node_id(),
                source_ref: SourceRef::new("f.feature", 1, 1),
                language: "en".into(),
                tags: vec![],
                keyword: "Feature".into(),
                name: "f".into(),
                description: None,
            },
            background: None,
            scenarios: vec![Scenario {
                uuid: crate::ast::new_node_id(),
                source_ref: SourceRef::new("f.feature", 2, 1),
                tags: vec![],
                keyword: "Scenario".into(),
                name: "s".into(),
                description: None,
                background: None,
                steps: vec![Step::new(SourceRef::new("f.feature", 3, 1), "Given", "x")
                    .with_status(status)],
                examples: vec![],
                params: Default::default(),
                caller_params: Default::default(),
            }],
            rules: vec![],
            source_file: None,
            meta_specs: vec![],
        }
    }

    struct CountingEvaluator {
        status: EvalStatus,
        calls: AtomicUsize,
    }

    impl Evaluator for CountingEvaluator {
        fn evaluate(&self, _unit: &FeatureUnit) -> Result<Spec> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(spec_with_status(self.status))
        }
    }

    #[test]
    fn evaluates_every_unit_when_no_failfast() {
        let units = vec![unit("a.feature"), unit("b.feature"), unit("c.feature")];
        let evaluator = CountingEvaluator { status: EvalStatus::Failed, calls: AtomicUsize::new(0) };
        let settings = Settings::new();
        let reporter = NullReportGenerator;

        let summary = run(&units, &evaluator, &reporter, &settings).unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.results().len(), 3);
    }

    #[test]
    fn stops_after_first_unclean_result_when_failfast_enabled() {
        let units = vec![unit("a.feature"), unit("b.feature"), unit("c.feature")];
        let evaluator = CountingEvaluator { status: EvalStatus::Failed, calls: AtomicUsize::new(0) };
        let settings = Settings::new();
        settings.set_failfast_exit(true);
        let reporter = NullReportGenerator;

        let summary = run(&units, &evaluator, &reporter, &settings).unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.results().len(), 1);
    }

    #[test]
    fn dry_run_ignores_failfast_and_evaluates_every_unit() {
        let units = vec![unit("a.feature"), unit("b.feature")];
        let evaluator = CountingEvaluator { status: EvalStatus::Failed, calls: AtomicUsize::new(0) };
        let settings = Settings::new();
        settings.set_failfast_exit(true);
        settings.with_override(crate::settings::SettingsOverride { dry_run: Some(true), ..Default::default() }, || {
            let reporter = NullReportGenerator;
            let summary = run(&units, &evaluator, &reporter, &settings).unwrap();
            assert_eq!(summary.results().len(), 2);
        });
    }
}
