//! Background replication (spec.md §4.B, transformation 2).
//!
//! Background steps are *copied* into each expanded scenario (not
//! referenced), so per-record parameter bindings can differ between
//! copies.

use crate::ast::{Background, Scenario, SourceRef, Step, Tag};

/// Prepends a copy of `background` to `scenario` and every one of its
/// expanded outline scenarios.
pub fn replicate(scenario: &mut Scenario, background: Option<&Background>) {
    let Some(bg) = background else { return };
    apply_to(scenario, bg);
    for examples in &mut scenario.examples {
        for expanded in &mut examples.expanded_scenarios {
            apply_to(expanded, bg);
        }
    }
}

fn apply_to(scenario: &mut Scenario, bg: &Background) {
    let mut copy = bg.clone();
    copy.uuid = crate::ast::new_node_id();
    copy.steps = copy
        .steps
        .iter()
        .map(|s| {
            let mut c = s.clone();
            c.uuid = crate::ast::new_node_id();
            c
        })
        .collect();
    scenario.background = Some(copy);
}

/// If `scenario` carries a `@DataTable(...)` annotation, synthesises a
/// background whose steps bind each of the scenario's own `params` cells
/// via `@Data`-tagged steps labelled `"string N is \"value\""`, placed
/// *before* the scenario's existing (already-replicated) background steps.
pub fn apply_synthetic_data_background(scenario: &mut Scenario) {
    if !scenario.tags.iter().any(|t| t.name == "DataTable") {
        return;
    }
    if scenario.params.is_empty() {
        return;
    }
    let synthetic_steps: Vec<Step> = scenario
        .params
        .values()
        .enumerate()
        .map(|(i, value)| {
            let mut step = Step::new(
                SourceRef::new(scenario.source_ref.uri.clone(), scenario.source_ref.line, 1),
                "Given",
                format!("string {} is \"{}\"", i + 1, value),
            );
            step.table = None;
            step
        })
        .collect();

    let existing_steps = scenario.background.take().map(|b| b.steps).unwrap_or_default();
    let mut steps = synthetic_steps;
    steps.extend(existing_steps);

    scenario.background = Some(Background {
        uuid: crate::ast::new_node_id(),
        source_ref: scenario.source_ref.clone(),
        keyword: "Background".into(),
        name: "".into(),
        description: None,
        steps,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRef;

    fn bg() -> Background {
        Background {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("f", 1, 1),
            keyword: "Background".into(),
            name: "".into(),
            description: None,
            steps: vec![Step::new(SourceRef::new("f", 2, 1), "Given", "a clean state")],
        }
    }

    fn scenario() -> Scenario {
        Scenario {
            uuid: crate::ast::new_node_id(),
            source_ref: SourceRef::new("f", 5, 1),
            tags: vec![],
            keyword: "Scenario".into(),
            name: "s".into(),
            description: None,
            background: None,
            steps: vec![],
            examples: vec![],
            params: Default::default(),
            caller_params: Default::default(),
        }
    }

    #[test]
    fn replication_copies_not_references() {
        let background = bg();
        let mut s = scenario();
        replicate(&mut s, Some(&background));
        let copied = s.background.as_ref().unwrap();
        assert_ne!(copied.uuid, background.uuid);
        assert_eq!(copied.steps[0].text, "a clean state");
        assert_ne!(copied.steps[0].uuid, background.steps[0].uuid);
    }

    #[test]
    fn no_background_is_noop() {
        let mut s = scenario();
        replicate(&mut s, None);
        assert!(s.background.is_none());
    }

    #[test]
    fn synthetic_data_background_prepends_string_n_steps() {
        let mut s = scenario();
        s.tags.push(Tag { name: "DataTable".into(), value: None });
        s.params.insert("s1".into(), "howdy".into());
        s.params.insert("s2".into(), "doo".into());
        replicate(&mut s, Some(&bg()));
        apply_synthetic_data_background(&mut s);
        let steps = &s.background.as_ref().unwrap().steps;
        assert_eq!(steps[0].text, "string 1 is \"howdy\"");
        assert_eq!(steps[1].text, "string 2 is \"doo\"");
        assert_eq!(steps[2].text, "a clean state");
    }
}
