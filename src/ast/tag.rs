//! Tags: `@name` / `@name("value")`, the reserved closed set, and the
//! `@DataTable(...)` annotation grammar (spec.md §3).

use derive_more::Display;

use crate::error::GwenError;

/// A single tag attached to a Feature, Rule, Scenario or StepDef.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: Option<String>,
}

impl Tag {
    /// Parses `@name` or `@name("value")`. Whitespace inside the name or
    /// value is rejected.
    pub fn parse(raw: &str) -> Result<Self, GwenError> {
        let raw = raw.trim();
        let body = raw.strip_prefix('@').ok_or_else(|| GwenError::InvalidTag {
            tag: raw.to_string(),
            reason: "tag must start with `@`".into(),
        })?;

        let (name, value) = if let Some(open) = body.find('(') {
            let name = &body[..open];
            let rest = body[open + 1..].strip_suffix(')').ok_or_else(|| {
                GwenError::InvalidTag {
                    tag: raw.to_string(),
                    reason: "unterminated `(` in tag value".into(),
                }
            })?;
            let value = rest
                .trim()
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| GwenError::InvalidTag {
                    tag: raw.to_string(),
                    reason: "tag value must be a double-quoted string".into(),
                })?;
            (name, Some(value.to_string()))
        } else {
            (body, None)
        };

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GwenError::InvalidTag {
                tag: raw.to_string(),
                reason: "whitespace is not allowed in a tag name".into(),
            });
        }
        if let Some(v) = &value {
            if v.chars().any(char::is_whitespace) {
                return Err(GwenError::InvalidTag {
                    tag: raw.to_string(),
                    reason: "whitespace is not allowed in a tag value".into(),
                });
            }
        }

        Ok(Self { name: name.to_string(), value })
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        Reserved::from_name(&self.name).is_some()
    }
}

/// The closed set of reserved tags the interpreter assigns meaning to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Reserved {
    StepDef,
    ForEach,
    If,
    Until,
    While,
    DataTable,
    Examples,
    Synthetic,
    Synchronized,
    Ignore,
}

impl Reserved {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "StepDef" => Self::StepDef,
            "ForEach" => Self::ForEach,
            "If" => Self::If,
            "Until" => Self::Until,
            "While" => Self::While,
            "DataTable" => Self::DataTable,
            "Examples" => Self::Examples,
            "Synthetic" => Self::Synthetic,
            "Synchronized" | "Synchronised" => Self::Synchronized,
            "Ignore" => Self::Ignore,
            _ => return None,
        })
    }
}

/// Header orientation for a `@DataTable` annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableHeader {
    Top,
    Left,
}

/// Parsed shape of a `@DataTable(...)` StepDef tag.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DataTableAnnotation {
    pub horizontal_names: Option<Vec<String>>,
    pub vertical_names: Option<Vec<String>>,
    pub header: Option<TableHeader>,
    pub matrix: bool,
}

impl DataTableAnnotation {
    /// Parses the value inside `@DataTable(...)`, e.g.
    /// `horizontal="n1,n2"`, `header="left"`, `type="matrix"`.
    pub fn parse(value: &str) -> Result<Self, GwenError> {
        let mut out = Self::default();
        for part in split_top_level_commas(value) {
            let (key, val) = part.split_once('=').ok_or_else(|| {
                GwenError::DataTable {
                    reason: format!("malformed @DataTable clause `{part}`"),
                }
            })?;
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            match key {
                "horizontal" => {
                    out.horizontal_names =
                        Some(val.split(',').map(|s| s.trim().to_string()).collect());
                }
                "vertical" => {
                    out.vertical_names =
                        Some(val.split(',').map(|s| s.trim().to_string()).collect());
                }
                "header" => {
                    out.header = Some(match val {
                        "top" => TableHeader::Top,
                        "left" => TableHeader::Left,
                        other => {
                            return Err(GwenError::DataTable {
                                reason: format!("unknown header orientation `{other}`"),
                            })
                        }
                    });
                }
                "type" => {
                    if val == "matrix" {
                        out.matrix = true;
                    } else {
                        return Err(GwenError::DataTable {
                            reason: format!("unknown @DataTable type `{val}`"),
                        });
                    }
                }
                other => {
                    return Err(GwenError::DataTable {
                        reason: format!("unknown @DataTable clause `{other}`"),
                    })
                }
            }
        }
        Ok(out)
    }

    /// The explicit name list, resolving the ambiguity (Open Question 2)
    /// between a header-type annotation and an explicit name list by
    /// letting the name list win; the header/type clauses then only decide
    /// orientation.
    #[must_use]
    pub fn names(&self) -> Option<&[String]> {
        self.horizontal_names
            .as_deref()
            .or(self.vertical_names.as_deref())
    }
}

/// Splits `a="x,y",b="p,q"` on commas that are not inside a quoted string.
fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}
