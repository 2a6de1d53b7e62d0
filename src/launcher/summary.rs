//! `SpecResult` and `ResultsSummary` (spec.md §4.I, testable property 9,
//! concrete scenario S6): the per-unit evaluation outcome and the
//! fold-to-exit-code accumulator.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::ast::{EvalStatus, Spec};
use crate::stream::FeatureUnit;

/// One evaluated `FeatureUnit`'s immutable result, as handed to reporters.
#[derive(Clone, Debug)]
pub struct SpecResult {
    pub feature_unit: FeatureUnit,
    pub spec: Spec,
    pub started: SystemTime,
    pub finished: SystemTime,
}

impl SpecResult {
    #[must_use]
    pub fn status(&self) -> EvalStatus {
        self.spec.eval_status()
    }
}

/// Per-feature status tally: every non-clean status bucketed under its own
/// label, every exit-clean status folded into `"OK"` (matching S6's
/// `featureCounts = {OK:1, Failed:1}`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub counts: BTreeMap<String, usize>,
}

fn status_label(status: EvalStatus) -> String {
    if status.is_exit_clean() {
        "OK".to_string()
    } else {
        status.to_string()
    }
}

/// Accumulates `SpecResult`s, preserving finish-time order (ties broken by
/// insertion/input order, matching §5's ordering guarantee).
#[derive(Clone, Debug, Default)]
pub struct ResultsSummary {
    results: Vec<SpecResult>,
}

impl ResultsSummary {
    #[must_use]
    pub fn new() -> Self {
        Self { results: Vec::new() }
    }

    pub fn add(&mut self, result: SpecResult) {
        self.results.push(result);
        self.results.sort_by_key(|r| r.finished);
    }

    #[must_use]
    pub fn results(&self) -> &[SpecResult] {
        &self.results
    }

    #[must_use]
    pub fn feature_counts(&self) -> FeatureCounts {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(status_label(result.status())).or_insert(0) += 1;
        }
        FeatureCounts { counts }
    }

    #[must_use]
    pub fn overall_status(&self) -> EvalStatus {
        EvalStatus::aggregate(self.results.iter().map(SpecResult::status), false)
    }

    /// Testable property 9: exit code mapping.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.overall_status().is_exit_clean() {
            0
        } else {
            1
        }
    }
}
