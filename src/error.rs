//! Closed error hierarchy for the Gwen interpreter core.
//!
//! Mirrors the kinds enumerated in the specification's error handling
//! design: one variant family per error kind, each carrying whatever
//! structured payload the raising component has on hand.

use std::io;

use derive_more::{Display, Error};

use crate::ast::status::EvalStatus;

/// Top-level error type for all Gwen evaluation operations.
#[derive(Debug, Display, Error)]
pub enum GwenError {
    /// Malformed Gherkin syntax, surfaced by the upstream parser.
    #[display("syntax error: {_0}")]
    Syntax(gherkin::ParseFileError),

    /// A tag used reserved syntax incorrectly (e.g. whitespace in a value).
    #[display("invalid tag `{tag}`: {reason}")]
    InvalidTag { tag: String, reason: String },

    /// No StepDef, composite or unit translator matched the step text.
    #[display("undefined step: {text}")]
    UndefinedStep { text: String },

    /// A StepDef was invoked recursively without fresh arguments.
    #[display("recursive call to StepDef `{name}` with no new arguments")]
    RecursiveStepDef { name: String },

    /// More than one StepDef or data file could satisfy a lookup.
    #[display("ambiguous match for `{subject}`: {count} candidates")]
    Ambiguous { subject: String, count: usize },

    /// A DataTable annotation or shape violated its invariants.
    #[display("data table error: {reason}")]
    DataTable { reason: String },

    /// Interpolation referenced a name with no binding in scope.
    #[display("unbound attribute `{name}` in scope `{scope}`")]
    UnboundAttribute { name: String, scope: String },

    /// A binding was referenced before (or without) being declared.
    #[display("unbound binding `{name}`")]
    UnboundBinding { name: String },

    /// A JS function binding was missing a positional argument.
    #[display("missing JS argument #{index} for `{reference}`")]
    MissingJSArgument { reference: String, index: usize },

    /// The (collaborator) JS engine failed to evaluate an expression.
    #[display("JS execution failed: {message}")]
    JSExecution { message: String },

    /// The (collaborator) system process invocation failed.
    #[display("system process failed: {message}")]
    SysprocExecution { message: String },

    /// I/O failure reading a feature, meta or data file.
    #[display("I/O error: {_0}")]
    Io(io::Error),

    /// Placeholder substitution failed for a reason other than an unbound
    /// name (e.g. malformed nesting).
    #[display("interpolation error: {reason}")]
    Interpolation { reason: String },

    /// A hard or soft assertion failed.
    #[display("assertion failed ({mode}): {message}")]
    Assertion { mode: AssertionMode, message: String },

    /// A step was explicitly disabled.
    #[display("disabled: {reason}")]
    Disabled { reason: String },

    /// A unit's hard timeout expired, or a SIGINT interrupted evaluation.
    #[display("interrupted: {reason}")]
    Interrupted { reason: String },

    /// Two sibling data files were found with no explicit override.
    #[display("ambiguous data file in `{dir}`: {candidates:?}")]
    AmbiguousDataFile { dir: String, candidates: Vec<String> },

    /// Anything else: a logic error internal to the interpreter.
    #[display("internal error: {message}")]
    Internal { message: String },
}

impl From<gherkin::ParseFileError> for GwenError {
    fn from(err: gherkin::ParseFileError) -> Self {
        Self::Syntax(err)
    }
}

impl From<io::Error> for GwenError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Whether a [`GwenError::Assertion`] is hard (short-circuits siblings) or
/// soft (recorded as [`EvalStatus::Sustained`] and evaluation continues).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum AssertionMode {
    #[display("hard")]
    Hard,
    #[display("soft")]
    Soft,
}

impl GwenError {
    /// Status this error should drive a step towards, absent any later
    /// promotion rules (sustained/disabled) applied by the step engine.
    #[must_use]
    pub fn implied_status(&self) -> EvalStatus {
        match self {
            Self::Disabled { .. } => EvalStatus::Disabled,
            Self::Assertion { mode: AssertionMode::Soft, .. } => {
                EvalStatus::Sustained
            }
            _ => EvalStatus::Failed,
        }
    }

    /// Whether this error, if raised by a step, should block its later
    /// siblings from evaluating (hard failure semantics).
    #[must_use]
    pub fn short_circuits(&self) -> bool {
        !matches!(self, Self::Assertion { mode: AssertionMode::Soft, .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GwenError>;
