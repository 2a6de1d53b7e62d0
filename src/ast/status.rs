//! Evaluation status algebra (spec.md §3 "Status algebra").

use derive_more::Display;

/// Ordered evaluation status, `Passed < Loaded < Sustained < Skipped <
/// Pending < Disabled < Failed`. `Pending` is the initial status of every
/// unevaluated step.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum EvalStatus {
    Passed,
    Loaded,
    Sustained,
    Skipped,
    Pending,
    Disabled,
    Failed,
}

impl Default for EvalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl EvalStatus {
    /// `true` for statuses that keep a batch run's exit code at `0`.
    #[must_use]
    pub fn is_exit_clean(self) -> bool {
        matches!(self, Self::Passed | Self::Skipped | Self::Sustained | Self::Loaded)
    }

    /// Aggregates the statuses of a node's evaluated children into the
    /// status of their parent.
    ///
    /// The aggregation rule is "maximum status of evaluated children",
    /// except that `Sustained` absorbs into `Passed` when the parent is
    /// *not* itself a StepDef call — a StepDef call step reports the raw
    /// aggregate (so a sustained failure inside a StepDef is still visible
    /// as `Sustained` on the call step), but every other composite (Scenario,
    /// Background, Rule, Feature, Examples record, ForEach, While/Until)
    /// folds `Sustained` back down to `Passed` so a soft assertion never
    /// fails the run.
    #[must_use]
    pub fn aggregate<I: IntoIterator<Item = EvalStatus>>(
        children: I,
        parent_is_stepdef: bool,
    ) -> EvalStatus {
        let max = children.into_iter().max().unwrap_or(EvalStatus::Passed);
        if max == EvalStatus::Sustained && !parent_is_stepdef {
            EvalStatus::Passed
        } else {
            max
        }
    }
}
