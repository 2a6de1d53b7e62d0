//! The Normaliser (spec.md §4.B): expands outline examples and
//! DataTable-annotated StepDefs into executable scenario shapes. Pure (no
//! I/O) and idempotent (testable property 1, 2, 4).

pub mod background;
pub mod docstring;
pub mod outline;

use std::collections::HashMap;

use crate::ast::{Background, Rule, Scenario, Spec, Step};
use crate::error::Result;

/// Runs the four transformations in order: outline expansion, background
/// replication (+ synthetic `@DataTable` background), nodePath assignment,
/// doc-stringification.
pub fn normalise(mut spec: Spec) -> Result<Spec> {
    expand_and_replicate_top_level(&mut spec);
    expand_and_replicate_rules(&mut spec);
    assign_node_paths(&mut spec);
    docstringify_all(&mut spec);
    Ok(spec)
}

fn expand_and_replicate_top_level(spec: &mut Spec) {
    let feature_bg = spec.background.clone();
    spec.scenarios = spec
        .scenarios
        .iter()
        .map(|s| {
            let mut expanded = outline::expand_outline(s);
            finish_scenario(&mut expanded, feature_bg.as_ref());
            expanded
        })
        .collect();
}

fn expand_and_replicate_rules(spec: &mut Spec) {
    let feature_bg = spec.background.clone();
    for rule in &mut spec.rules {
        let effective = effective_background(feature_bg.as_ref(), rule.background.as_ref());
        rule.scenarios = rule
            .scenarios
            .iter()
            .map(|s| {
                let mut expanded = outline::expand_outline(s);
                finish_scenario(&mut expanded, effective.as_ref());
                expanded
            })
            .collect();
    }
}

fn finish_scenario(scenario: &mut Scenario, background: Option<&Background>) {
    background::replicate(scenario, background);
    background::apply_synthetic_data_background(scenario);
    for examples in &mut scenario.examples {
        for expanded in &mut examples.expanded_scenarios {
            background::apply_synthetic_data_background(expanded);
        }
    }
}

/// Merges a feature-level and rule-level background: feature steps run
/// first, then the rule's own steps, mirroring ordinary Gherkin semantics
/// while treating the rule as the "closer" parent scope.
fn effective_background(
    feature_bg: Option<&Background>,
    rule_bg: Option<&Background>,
) -> Option<Background> {
    match (feature_bg, rule_bg) {
        (None, None) => None,
        (Some(f), None) => Some(f.clone()),
        (None, Some(r)) => Some(r.clone()),
        (Some(f), Some(r)) => {
            let mut merged = f.clone();
            merged.steps.extend(r.steps.iter().cloned());
            Some(merged)
        }
    }
}

/// Assigns `SourceRef::node_path` across the whole tree. Segments are
/// `keyword[occurrence]`, occurrence counted among siblings sharing the
/// same keyword under the same parent (ties broken by declaration order,
/// which is also source-location order since the parser hands us nodes in
/// document order).
fn assign_node_paths(spec: &mut Spec) {
    let root = "Root[1]".to_string();
    let feature_path = format!("{root}/{}", crate::ast::node_path_segment("Feature", 1));
    spec.feature.source_ref.node_path = Some(feature_path.clone());

    if let Some(bg) = &mut spec.background {
        let bg_path = format!("{feature_path}/{}", crate::ast::node_path_segment("Background", 1));
        bg.source_ref.node_path = Some(bg_path.clone());
        assign_step_paths(&mut bg.steps, &bg_path);
    }

    let mut occ: HashMap<&'static str, usize> = HashMap::new();
    for scenario in &mut spec.scenarios {
        let n = bump(&mut occ, "Scenario");
        let path = format!("{feature_path}/{}", crate::ast::node_path_segment("Scenario", n));
        assign_scenario_paths(scenario, &path);
    }

    let mut rule_occ: HashMap<&'static str, usize> = HashMap::new();
    for rule in &mut spec.rules {
        let n = bump(&mut rule_occ, "Rule");
        let rule_path = format!("{feature_path}/{}", crate::ast::node_path_segment("Rule", n));
        rule.source_ref.node_path = Some(rule_path.clone());
        if let Some(bg) = &mut rule.background {
            let bg_path = format!("{rule_path}/{}", crate::ast::node_path_segment("Background", 1));
            bg.source_ref.node_path = Some(bg_path.clone());
            assign_step_paths(&mut bg.steps, &bg_path);
        }
        let mut s_occ: HashMap<&'static str, usize> = HashMap::new();
        for scenario in &mut rule.scenarios {
            let n = bump(&mut s_occ, "Scenario");
            let path = format!("{rule_path}/{}", crate::ast::node_path_segment("Scenario", n));
            assign_scenario_paths(scenario, &path);
        }
    }
}

fn assign_scenario_paths(scenario: &mut Scenario, path: &str) {
    scenario.source_ref.node_path = Some(path.to_string());
    if let Some(bg) = &mut scenario.background {
        let bg_path = format!("{path}/{}", crate::ast::node_path_segment("Background", 1));
        bg.source_ref.node_path = Some(bg_path.clone());
        assign_step_paths(&mut bg.steps, &bg_path);
    }
    assign_step_paths(&mut scenario.steps, path);

    let mut ex_occ: HashMap<&'static str, usize> = HashMap::new();
    for examples in &mut scenario.examples {
        let n = bump(&mut ex_occ, "Examples");
        let ex_path = format!("{path}/{}", crate::ast::node_path_segment("Examples", n));
        examples.source_ref.node_path = Some(ex_path.clone());
        let mut rec_occ: HashMap<&'static str, usize> = HashMap::new();
        for expanded in &mut examples.expanded_scenarios {
            let rn = bump(&mut rec_occ, "Scenario");
            let rpath = format!("{ex_path}/{}", crate::ast::node_path_segment("Scenario", rn));
            assign_scenario_paths(expanded, &rpath);
        }
    }
}

fn assign_step_paths(steps: &mut [Step], parent_path: &str) {
    let mut occ: HashMap<&'static str, usize> = HashMap::new();
    for step in steps {
        let n = bump(&mut occ, "Step");
        step.source_ref.node_path =
            Some(format!("{parent_path}/{}", crate::ast::node_path_segment("Step", n)));
    }
}

fn bump(map: &mut HashMap<&'static str, usize>, key: &'static str) -> usize {
    let entry = map.entry(key).or_insert(0);
    *entry += 1;
    *entry
}

fn docstringify_all(spec: &mut Spec) {
    if let Some(bg) = &mut spec.background {
        for step in &mut bg.steps {
            *step = docstring::docstringify(step);
        }
    }
    for scenario in &mut spec.scenarios {
        docstringify_scenario(scenario);
    }
    for rule in &mut spec.rules {
        docstringify_rule(rule);
    }
}

fn docstringify_rule(rule: &mut Rule) {
    if let Some(bg) = &mut rule.background {
        for step in &mut bg.steps {
            *step = docstring::docstringify(step);
        }
    }
    for scenario in &mut rule.scenarios {
        docstringify_scenario(scenario);
    }
}

fn docstringify_scenario(scenario: &mut Scenario) {
    if let Some(bg) = &mut scenario.background {
        for step in &mut bg.steps {
            *step = docstring::docstringify(step);
        }
    }
    for step in &mut scenario.steps {
        *step = docstring::docstringify(step);
    }
    for examples in &mut scenario.examples {
        for expanded in &mut examples.expanded_scenarios {
            docstringify_scenario(expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Examples, ExamplesRow, Feature, SourceRef};

    fn spec_with_outline_and_background() -> Spec {
        let background = Background {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("f", 2, 1),
            keyword: "Background".into(),
            name: "".into(),
            description: None,
            steps: vec![Step::new(SourceRef::new("f", 3, 1), "Given", "a clean start")],
        };
        let outline = Scenario {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("f", 5, 1),
            tags: vec![],
            keyword: "Scenario Outline".into(),
            name: "Join two strings".into(),
            description: None,
            background: None,
            steps: vec![
                Step::new(SourceRef::new("f", 6, 1), "Given", "string 1 is \"<s1>\""),
                Step::new(SourceRef::new("f", 7, 1), "And", "string 2 is \"<s2>\""),
            ],
            examples: vec![Examples {
                uuid: crate::ast::new_node_id(),
                source_ref: SourceRef::new("f", 8, 1),
                tags: vec![],
                keyword: "Examples".into(),
                name: "values".into(),
                description: None,
                header: vec!["s1".into(), "s2".into()],
                rows: vec![
                    ExamplesRow { line: 9, cells: vec!["howdy".into(), "doo".into()] },
                    ExamplesRow { line: 10, cells: vec!["any".into(), "thing".into()] },
                ],
                expanded_scenarios: vec![],
            }],
            params: Default::default(),
            caller_params: Default::default(),
        };
        Spec {
            uuid: crate::ast::new_node_id(),
            feature: Feature {
                uuid: crate::ast::new_node_id(),
                source_ref: SourceRef::new("f", 1, 1),
                language: "en".into(),
                tags: vec![],
                keyword: "Feature".into(),
                name: "Strings".into(),
                description: None,
            },
            background: Some(background),
            scenarios: vec![outline],
            rules: vec![],
            source_file: None,
            meta_specs: vec![],
        }
    }

    #[test]
    fn property_1_node_paths_are_unique() {
        let spec = normalise(spec_with_outline_and_background()).unwrap();
        let mut paths = Vec::new();
        collect_paths(&spec, &mut paths);
        let mut sorted = paths.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(paths.len(), sorted.len(), "all node paths must be unique");
    }

    #[test]
    fn property_2_outline_expansion_and_background_replication() {
        let spec = normalise(spec_with_outline_and_background()).unwrap();
        let scenario = &spec.scenarios[0];
        let expanded = &scenario.examples[0].expanded_scenarios;
        assert_eq!(expanded.len(), 2);
        for s in expanded {
            assert_eq!(s.steps.len(), 2);
            let bg = s.background.as_ref().expect("background replicated");
            assert_eq!(bg.steps[0].text, "a clean start");
        }
    }

    #[test]
    fn normalisation_is_idempotent() {
        let once = normalise(spec_with_outline_and_background()).unwrap();
        let twice = normalise(once.clone()).unwrap();
        assert_eq!(once.feature.source_ref.node_path, twice.feature.source_ref.node_path);
        assert_eq!(
            once.scenarios[0].examples[0].expanded_scenarios.len(),
            twice.scenarios[0].examples[0].expanded_scenarios.len(),
        );
    }

    fn collect_paths(spec: &Spec, out: &mut Vec<String>) {
        out.push(spec.feature.source_ref.node_path.clone().unwrap());
        if let Some(bg) = &spec.background {
            out.push(bg.source_ref.node_path.clone().unwrap());
            for s in &bg.steps {
                out.push(s.source_ref.node_path.clone().unwrap());
            }
        }
        for scenario in &spec.scenarios {
            collect_scenario_paths(scenario, out);
        }
        for rule in &spec.rules {
            out.push(rule.source_ref.node_path.clone().unwrap());
            for scenario in &rule.scenarios {
                collect_scenario_paths(scenario, out);
            }
        }
    }

    fn collect_scenario_paths(scenario: &Scenario, out: &mut Vec<String>) {
        out.push(scenario.source_ref.node_path.clone().unwrap());
        if let Some(bg) = &scenario.background {
            out.push(bg.source_ref.node_path.clone().unwrap());
            for s in &bg.steps {
                out.push(s.source_ref.node_path.clone().unwrap());
            }
        }
        for s in &scenario.steps {
            out.push(s.source_ref.node_path.clone().unwrap());
        }
        for ex in &scenario.examples {
            out.push(ex.source_ref.node_path.clone().unwrap());
            for expanded in &ex.expanded_scenarios {
                collect_scenario_paths(expanded, out);
            }
        }
    }
}
