#![recursion_limit = "512"]
#![deny(rust_2018_idioms)]

//! Gwen: an interpreter for Gherkin feature specifications. Parses
//! Features/Backgrounds/Rules/Scenario Outlines and StepDef-declaring
//! `.meta` files, normalises them into an evaluable tree, and walks that
//! tree through a small evaluation engine against pluggable binding
//! back-ends (JS expressions, JS functions, files, system processes).

// Re-export Gherkin for the convenience of downstream crates that want to
// inspect the parsed tree directly.
pub use gherkin;

pub mod ast;
pub mod binding;
pub mod engine;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod launcher;
pub mod normaliser;
pub mod options;
pub mod reporter;
pub mod scope;
pub mod settings;
pub mod stream;

pub use engine::GwenEngine;
pub use error::{GwenError, Result};
pub use launcher::{launch, Evaluator};
pub use options::GwenOptions;
pub use reporter::{NullReportGenerator, ReportGenerator};
pub use settings::Settings;
