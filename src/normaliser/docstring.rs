//! Doc-stringification (spec.md §4.B, transformation 4).
//!
//! A step whose text ends in a double-quoted `"$<param>"` literal and whose
//! doc-string is empty is rewritten: the literal is stripped from the text
//! and the param name moves into a doc-string of `mediaType: None`, so long
//! parameter values can be supplied as multi-line bodies instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{DocString, Step};

static TRAILING_PARAM_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?P<rest>.*?)\s*"\$<(?P<name>[^>]+)>"\s*$"#).unwrap());

/// Rewrites `step` in place per the rule above; a no-op if the text does
/// not end in a bare `"$<name>"` literal or the step already carries a
/// doc-string.
#[must_use]
pub fn docstringify(step: &Step) -> Step {
    if step.doc_string.is_some() {
        return step.clone();
    }
    let Some(caps) = TRAILING_PARAM_LITERAL.captures(&step.text) else {
        return step.clone();
    };
    let mut out = step.clone();
    out.text = caps["rest"].to_string();
    out.doc_string = Some(DocString {
        line: step.source_ref.line,
        content: format!("$<{}>", &caps["name"]),
        media_type: None,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRef;

    #[test]
    fn strips_trailing_param_literal_into_docstring() {
        let step = Step::new(
            SourceRef::new("f", 1, 1),
            "Given",
            r#"the payload is "$<body>""#,
        );
        let out = docstringify(&step);
        assert_eq!(out.text, "the payload is");
        assert_eq!(out.doc_string.unwrap().content, "$<body>");
    }

    #[test]
    fn leaves_step_with_existing_docstring_alone() {
        let mut step = Step::new(SourceRef::new("f", 1, 1), "Given", r#"x is "$<y>""#);
        step.doc_string = Some(DocString { line: 1, content: "already here".into(), media_type: None });
        let out = docstringify(&step);
        assert_eq!(out.text, step.text);
    }

    #[test]
    fn leaves_step_without_trailing_literal_alone() {
        let step = Step::new(SourceRef::new("f", 1, 1), "Given", "a plain step");
        let out = docstringify(&step);
        assert_eq!(out.text, "a plain step");
        assert!(out.doc_string.is_none());
    }

    #[test]
    fn preserves_plus_before_digit_is_unrelated_but_does_not_break_match() {
        let step = Step::new(SourceRef::new("f", 1, 1), "Given", r#"amount is "$<n>""#);
        let out = docstringify(&step);
        assert_eq!(out.doc_string.unwrap().content, "$<n>");
    }
}
