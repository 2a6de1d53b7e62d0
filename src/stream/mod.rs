//! The Feature Stream assembler (spec.md §4.F): walks input paths, unions
//! inherited `.meta` files ancestor-before-descendant, associates at most
//! one data file per directory, and expands each data record into its own
//! [`FeatureUnit`].

pub mod datafile;

use std::path::{Path, PathBuf};

use crate::ast::table::Record;
use crate::error::{GwenError, Result};

/// The schedulable atom: one feature file, its inherited meta files, and an
/// optional bound data record.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureUnit {
    pub feature_file: PathBuf,
    pub meta_files: Vec<PathBuf>,
    pub data_record: Option<Record>,
}

/// Walks `inputs` in the given order, producing the full unit list. An
/// `explicit_data_file`, if given, overrides any directory-local data file
/// and applies to every feature unit produced by this call.
pub fn assemble(inputs: &[PathBuf], explicit_data_file: Option<&Path>) -> Result<Vec<FeatureUnit>> {
    let explicit = match explicit_data_file {
        Some(p) => Some(datafile::load(p)?),
        None => None,
    };

    let mut units = Vec::new();
    for input in inputs {
        if input.is_dir() {
            units.extend(walk_dir(input, &[], explicit.as_deref())?);
        } else if input.extension().and_then(|e| e.to_str()) == Some("feature") {
            let dir = input.parent().unwrap_or_else(|| Path::new("."));
            let meta_files = list_matching(dir, "*.meta")?;
            units.extend(units_for_feature(input, &meta_files, dir, explicit.as_deref())?);
        }
    }
    Ok(units)
}

fn walk_dir(
    dir: &Path,
    inherited_metas: &[PathBuf],
    explicit: Option<&[Record]>,
) -> Result<Vec<FeatureUnit>> {
    let mut metas_here = inherited_metas.to_vec();
    metas_here.extend(list_matching(dir, "*.meta")?);

    let mut units = Vec::new();
    for feature_file in list_matching(dir, "*.feature")? {
        units.extend(units_for_feature(&feature_file, &metas_here, dir, explicit)?);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    for sub in subdirs {
        units.extend(walk_dir(&sub, &metas_here, explicit)?);
    }

    Ok(units)
}

fn units_for_feature(
    feature_file: &Path,
    meta_files: &[PathBuf],
    dir: &Path,
    explicit: Option<&[Record]>,
) -> Result<Vec<FeatureUnit>> {
    let records: Option<Vec<Record>> = match explicit {
        Some(recs) => Some(recs.to_vec()),
        None => local_data_file(dir)?.map(|p| datafile::load(&p)).transpose()?,
    };

    Ok(match records {
        Some(recs) if !recs.is_empty() => recs
            .into_iter()
            .map(|rec| FeatureUnit {
                feature_file: feature_file.to_path_buf(),
                meta_files: meta_files.to_vec(),
                data_record: Some(rec),
            })
            .collect(),
        _ => vec![FeatureUnit {
            feature_file: feature_file.to_path_buf(),
            meta_files: meta_files.to_vec(),
            data_record: None,
        }],
    })
}

/// The single `.csv`/`.json` data file sitting alongside feature files in
/// `dir`, if any; two or more with no caller override is an error.
fn local_data_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates = list_matching(dir, "*.csv")?;
    candidates.extend(list_matching(dir, "*.json")?);
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(candidates.remove(0))),
        _ => Err(GwenError::AmbiguousDataFile {
            dir: dir.display().to_string(),
            candidates: candidates.iter().map(|p| p.display().to_string()).collect(),
        }),
    }
}

/// Non-recursive glob over `dir`, sorted for deterministic ordering.
fn list_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let walker = globwalk::GlobWalkerBuilder::from_patterns(dir, &[pattern])
        .max_depth(1)
        .build()
        .map_err(|e| GwenError::Internal { message: e.to_string() })?;
    let mut out: Vec<PathBuf> =
        walker.filter_map(std::result::Result::ok).map(|e| e.into_path()).collect();
    out.sort();
    Ok(out)
}
