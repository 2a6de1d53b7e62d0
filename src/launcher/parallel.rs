//! Parallel-by-feature launch strategy (spec.md §4.I, §5 Concurrency &
//! Resource Model): a bounded `threadpool::ThreadPool` evaluates
//! independent `FeatureUnit`s concurrently, each on its own worker thread,
//! with results folded back into a single `ResultsSummary` on the calling
//! thread. Ramp-up staggers worker submission so a large batch doesn't
//! spike external resources all at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use threadpool::ThreadPool;

use crate::error::Result;
use crate::launcher::summary::{ResultsSummary, SpecResult};
use crate::launcher::Evaluator;
use crate::reporter::ReportGenerator;
use crate::settings::Settings;
use crate::stream::FeatureUnit;

/// Evaluates `units` concurrently on a pool of `Settings::max_threads()`
/// workers. `stop` is checked before submitting each unit (set by a
/// SIGINT handler or a wall-clock timeout upstream) — once set, no further
/// units are submitted, but already-running ones finish and report.
pub fn run(
    units: &[FeatureUnit],
    evaluator: Arc<dyn Evaluator>,
    reporter: &(dyn ReportGenerator + Sync),
    settings: &Settings,
    stop: &AtomicBool,
) -> Result<ResultsSummary> {
    reporter.init();

    let pool = ThreadPool::new(settings.max_threads().max(1));
    let (tx, rx) = mpsc::channel::<Result<SpecResult>>();
    let rampup = Duration::from_secs(settings.rampup_interval_seconds());

    let mut submitted = 0usize;
    for unit in units {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if submitted > 0 && !rampup.is_zero() {
            std::thread::sleep(rampup);
        }
        submitted += 1;

        let unit = unit.clone();
        let evaluator = Arc::clone(&evaluator);
        let tx = tx.clone();
        pool.execute(move || {
            let started = SystemTime::now();
            let outcome = evaluator.evaluate(&unit).map(|spec| {
                let finished = SystemTime::now();
                SpecResult { feature_unit: unit, spec, started, finished }
            });
            let _ = tx.send(outcome);
        });
    }
    drop(tx);

    let mut summary = ResultsSummary::new();
    let mut first_err = None;
    for _ in 0..submitted {
        match rx.recv() {
            Ok(Ok(result)) => {
                reporter.report_detail(&result.feature_unit, &result);
                summary.add(result);
            }
            Ok(Err(err)) => {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
            Err(_) => break,
        }
    }
    pool.join();

    if let Some(err) = first_err {
        return Err(err);
    }

    reporter.report_summary(&summary);
    Ok(summary)
}
