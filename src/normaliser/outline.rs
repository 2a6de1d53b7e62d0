//! Outline expansion (spec.md §4.B, transformation 1; testable property 2,
//! concrete scenario S3).

use crate::ast::{Examples, Scenario, Step, Tag};

/// Expands every outline scenario's Examples tables into executable
/// scenarios: one per body row, named
/// `"<original> -- <examples.name> (record <i> of <n>)"`, with `<header>`
/// placeholders substituted in step text and `params` set to
/// `header -> cellValue`.
pub fn expand_outline(scenario: &Scenario) -> Scenario {
    if !scenario.is_outline() {
        return scenario.clone();
    }

    let mut expanded = scenario.clone();
    for examples in &mut expanded.examples {
        let n = examples.rows.len();
        examples.expanded_scenarios = examples
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                build_expanded_scenario(scenario, examples, &row.cells, i + 1, n)
            })
            .collect();
    }
    expanded
}

fn build_expanded_scenario(
    outline: &Scenario,
    examples: &Examples,
    cells: &[String],
    record_number: usize,
    total_records: usize,
) -> Scenario {
    let mut params = linked_hash_map::LinkedHashMap::new();
    for (name, value) in examples.header.iter().zip(cells.iter()) {
        params.insert(name.clone(), value.clone());
    }

    let steps = outline
        .steps
        .iter()
        .map(|step| substitute_placeholders(step, &params))
        .collect();

    let mut tags = outline.tags.clone();
    tags.push(Tag { name: "Synthetic".into(), value: None });

    Scenario {
        uuid: crate::ast::new_node_id(),
        source_ref: outline.source_ref.clone(),
        tags,
        keyword: outline.keyword.clone(),
        name: format!(
            "{} -- {} (record {} of {})",
            outline.name, examples.name, record_number, total_records
        ),
        description: outline.description.clone(),
        background: None,
        steps,
        examples: Vec::new(),
        params,
        caller_params: Default::default(),
    }
}

/// Substitutes `<name>` placeholders in a step's text/doc-string with the
/// given record's cell values, and records them onto the step's `params`.
fn substitute_placeholders(
    step: &Step,
    params: &linked_hash_map::LinkedHashMap<String, String>,
) -> Step {
    let mut out = step.clone();
    out.uuid = crate::ast::new_node_id();
    out.text = replace_angle_placeholders(&step.text, params);
    if let Some(doc) = &mut out.doc_string {
        doc.content = replace_angle_placeholders(&doc.content, params);
    }
    for (k, v) in params.iter() {
        out.params.insert(k.clone(), v.clone());
    }
    out
}

fn replace_angle_placeholders(
    text: &str,
    params: &linked_hash_map::LinkedHashMap<String, String>,
) -> String {
    let mut out = text.to_string();
    for (name, value) in params.iter() {
        out = out.replace(&format!("<{name}>"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExamplesRow, SourceRef};

    fn scenario_with_examples() -> Scenario {
        let steps = vec![
            Step::new(SourceRef::new("f", 2, 1), "Given", "string 1 is \"<s1>\""),
            Step::new(SourceRef::new("f", 3, 1), "And", "string 2 is \"<s2>\""),
            Step::new(SourceRef::new("f", 4, 1), "Then", "the result is \"<result>\""),
        ];
        Scenario {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("f", 1, 1),
            tags: vec![],
            keyword: "Scenario Outline".into(),
            name: "Join two strings".into(),
            description: None,
            background: None,
            steps,
            examples: vec![Examples {
                uuid: crate::ast::new_node_id(),
                source_ref: SourceRef::new("f", 5, 1),
                tags: vec![],
                keyword: "Examples".into(),
                name: "".into(),
                description: None,
                header: vec!["s1".into(), "s2".into(), "result".into()],
                rows: vec![
                    ExamplesRow { line: 6, cells: vec!["howdy".into(), "doo".into(), "howdydoo".into()] },
                    ExamplesRow { line: 7, cells: vec!["any".into(), "thing".into(), "anything".into()] },
                ],
                expanded_scenarios: vec![],
            }],
            params: Default::default(),
            caller_params: Default::default(),
        }
    }

    #[test]
    fn s3_two_rows_two_scenarios_three_steps_each() {
        let outline = scenario_with_examples();
        let expanded = expand_outline(&outline);
        let scenarios = &expanded.examples[0].expanded_scenarios;
        assert_eq!(scenarios.len(), 2);
        for s in scenarios {
            assert_eq!(s.steps.len(), 3);
            assert!(s.tags.iter().any(|t| t.name == "Synthetic"));
        }
        assert_eq!(scenarios[0].steps[0].text, "string 1 is \"howdy\"");
        assert_eq!(scenarios[0].steps[2].text, "the result is \"howdydoo\"");
        assert_eq!(scenarios[1].steps[0].text, "string 1 is \"any\"");
    }

    #[test]
    fn non_outline_scenario_is_unchanged() {
        let mut s = scenario_with_examples();
        s.examples.clear();
        let out = expand_outline(&s);
        assert!(out.examples.is_empty());
    }

    #[test]
    fn name_includes_record_index_and_total() {
        let outline = scenario_with_examples();
        let expanded = expand_outline(&outline);
        let scenarios = &expanded.examples[0].expanded_scenarios;
        assert!(scenarios[0].name.contains("record 1 of 2"));
        assert!(scenarios[1].name.contains("record 2 of 2"));
    }
}
