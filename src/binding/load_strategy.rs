//! `LoadStrategy` binding: `name/loadStrategy` ∈ `{eager, lazy}` controls
//! whether a resolved value is cached back onto `name` itself. Absent, a
//! binding is eager (resolved fresh every lookup).

use super::key;
use crate::interpolate::Lookup;
use crate::scope::Scope;

/// `true` if `name` is declared `loadStrategy=lazy`.
#[must_use]
pub fn is_lazy(name: &str, scope: &Scope) -> bool {
    scope.get_property(&key(name, "loadStrategy")).as_deref() == Some("lazy")
}
