//! `File` binding: `name/file` holds a path whose content is the resolved
//! value.

use super::key;
use crate::error::Result;
use crate::interpolate::Lookup;
use crate::scope::Scope;

/// The file path bound to `name`, if any.
#[must_use]
pub fn path(name: &str, scope: &Scope) -> Option<String> {
    scope.get_property(&key(name, "file"))
}

/// Reads the file at `path` whole, converting I/O failures into
/// `GwenError::Io` via the `?`-compatible conversion on [`std::io::Error`].
pub fn read(path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
