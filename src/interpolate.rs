//! The Interpolator (spec.md §4.C): recursive `${prop}` / `$<param>`
//! substitution with dry-run decoration and a restricted `interpolateParams`
//! pass.

use crate::error::GwenError;

/// Supplies values for `${name}` (property/env/scope) and `$<name>`
/// (StepDef parameter) placeholders. Implemented by [`crate::scope::Scope`].
pub trait Lookup {
    fn get_property(&self, name: &str) -> Option<String>;
    fn get_param(&self, name: &str) -> Option<String>;
}

/// A plain map-backed [`Lookup`], handy for tests and one-off calls.
#[derive(Default, Clone, Debug)]
pub struct MapLookup {
    pub properties: std::collections::HashMap<String, String>,
    pub params: std::collections::HashMap<String, String>,
}

impl Lookup for MapLookup {
    fn get_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
    fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }
}

/// Fully interpolates `input`: both `${...}` and `$<...>` placeholders,
/// innermost-first, recursively. In `dry_run` mode, unresolved `$<name>` is
/// decorated to `$[param:name]` rather than raising; unresolved `${...}` is
/// left exactly as written. Outside dry-run, any unresolved placeholder
/// raises [`GwenError::UnboundAttribute`].
pub fn interpolate_string(
    input: &str,
    lookup: &dyn Lookup,
    dry_run: bool,
) -> Result<String, GwenError> {
    let chars: Vec<char> = input.chars().collect();
    let (out, _) = parse(&chars, 0, lookup, dry_run, None)?;
    Ok(out)
}

fn parse(
    chars: &[char],
    mut i: usize,
    lookup: &dyn Lookup,
    dry_run: bool,
    stop: Option<char>,
) -> Result<(String, usize), GwenError> {
    let mut out = String::new();
    while i < chars.len() {
        let c = chars[i];
        if Some(c) == stop {
            return Ok((out, i + 1));
        }
        if c == '$' && i + 1 < chars.len() && (chars[i + 1] == '{' || chars[i + 1] == '<') {
            let is_prop = chars[i + 1] == '{';
            let close = if is_prop { '}' } else { '>' };
            let (inner, next_i) = parse(chars, i + 2, lookup, dry_run, Some(close))?;
            if is_prop {
                match lookup.get_property(&inner) {
                    Some(v) => out.push_str(&v),
                    None if dry_run => {
                        out.push_str("${");
                        out.push_str(&inner);
                        out.push('}');
                    }
                    None => {
                        return Err(GwenError::UnboundAttribute {
                            name: inner,
                            scope: "properties".into(),
                        })
                    }
                }
            } else {
                match lookup.get_param(&inner) {
                    Some(v) => out.push_str(&v),
                    None if dry_run => {
                        out.push_str("$[param:");
                        out.push_str(&inner);
                        out.push(']');
                    }
                    None => {
                        return Err(GwenError::UnboundAttribute {
                            name: inner,
                            scope: "params".into(),
                        })
                    }
                }
            }
            i = next_i;
            continue;
        }
        out.push(c);
        i += 1;
    }
    if stop.is_some() {
        return Err(GwenError::Interpolation {
            reason: "unterminated placeholder".into(),
        });
    }
    Ok((out, i))
}

/// The restricted pass used before StepDef dispatch: expands only `$<...>`,
/// leaves `${...}` completely untouched (not even scanned for balance other
/// than to skip over it), and raises `UnboundAttribute` for a missing param
/// unless the placeholder is a composite `$<${...}>` whose name is itself
/// not yet resolvable — that case is silently skipped rather than erroring.
pub fn interpolate_params(input: &str, lookup: &dyn Lookup) -> Result<String, GwenError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && chars[i + 1] == '<' {
            let start = i + 2;
            let mut j = start;
            let mut brace_depth = 0i32;
            while j < chars.len() {
                match chars[j] {
                    '{' => brace_depth += 1,
                    '}' => brace_depth -= 1,
                    '>' if brace_depth == 0 => break,
                    _ => {}
                }
                j += 1;
            }
            if j >= chars.len() {
                return Err(GwenError::Interpolation {
                    reason: "unterminated $<...> placeholder".into(),
                });
            }
            let body: String = chars[start..j].iter().collect();
            if body.contains("${") {
                out.push_str("$<");
                out.push_str(&body);
                out.push('>');
            } else {
                match lookup.get_param(&body) {
                    Some(v) => out.push_str(&v),
                    None => {
                        return Err(GwenError::UnboundAttribute {
                            name: body,
                            scope: "params".into(),
                        })
                    }
                }
            }
            i = j + 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    Ok(out)
}
