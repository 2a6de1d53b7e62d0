//! The Launcher (spec.md §4.I): turns an assembled stream of `FeatureUnit`s
//! into a `ResultsSummary`, choosing between the sequential and
//! worker-pool-parallel strategies according to `Settings::parallel()`.

pub mod parallel;
pub mod sequential;
pub mod summary;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::ast::Spec;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::settings::Settings;
use crate::stream::FeatureUnit;
use summary::ResultsSummary;

/// The Launcher's only dependency on the rest of the engine: given a unit,
/// produce its fully evaluated `Spec`. Implemented by the Step engine; kept
/// as a trait so the scheduling half of the Launcher has no compile-time
/// dependency on the engine's internals.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, unit: &FeatureUnit) -> Result<Spec>;
}

/// Evaluates `units`, dispatching to the sequential or parallel strategy
/// per `settings`' and `options`' agreement (an explicit `--batch`/
/// `--parallel` flag on `GwenOptions` always wins over `Settings`, since
/// it is the more specific, per-invocation choice).
pub fn launch(
    units: &[FeatureUnit],
    evaluator: Arc<dyn Evaluator>,
    reporter: &(dyn ReportGenerator + Sync),
    settings: &Settings,
    parallel: bool,
    stop: &AtomicBool,
) -> Result<ResultsSummary> {
    if parallel {
        parallel::run(units, evaluator, reporter, settings, stop)
    } else {
        sequential::run(units, evaluator.as_ref(), reporter, settings)
    }
}
