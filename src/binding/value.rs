//! `Value` binding: the simplest kind — a name is bound directly to a
//! literal string in scope, no indirection.

use crate::interpolate::Lookup;
use crate::scope::Scope;

/// Reads `name` straight out of scope, if bound.
#[must_use]
pub fn resolve(name: &str, scope: &Scope) -> Option<String> {
    scope.get_property(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_bound_literal() {
        let mut scope = Scope::new();
        scope.set_property("x", "42");
        assert_eq!(resolve("x", &scope), Some("42".to_string()));
    }

    #[test]
    fn unbound_name_resolves_to_none() {
        let scope = Scope::new();
        assert_eq!(resolve("x", &scope), None);
    }
}
