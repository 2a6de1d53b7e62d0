//! `GwenOptions` (spec.md §6): the record the (out-of-scope) CLI parser
//! populates and hands to the core. Reduced from the teacher's
//! `cli::opts::Opts<Parser, Runner, Writer, Custom>` composition to a plain
//! struct, since parsing itself is a collaborator, not core.

use std::path::PathBuf;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GwenOptions {
    /// Paths to `.feature` files or directories to evaluate.
    pub paths: Vec<PathBuf>,
    /// `-b, --batch`.
    pub batch: bool,
    /// `-p, --parallel`.
    pub parallel: bool,
    /// `-n, --dry-run`.
    pub dry_run: bool,
    /// `-r DIR, --report DIR`.
    pub report_dir: Option<PathBuf>,
    /// `-f FMTS, --formats`: e.g. `["html", "junit", "json", "rp", "sysout"]`.
    pub formats: Vec<String>,
    /// `-t TAGS, --tags`: e.g. `["@x", "~@y"]`.
    pub tags: Vec<String>,
    /// `-m FILES, --meta`.
    pub meta_files: Vec<PathBuf>,
    /// `-i FILE, --input-data`.
    pub input_data: Option<PathBuf>,
    /// `--init [DIR]`.
    pub init_dir: Option<PathBuf>,
}
