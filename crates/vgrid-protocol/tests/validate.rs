//! Protocol authoring validation tests.

use std::collections::BTreeMap;

use vgrid_model::{
    ActivationThreshold, DisplaySetRef, DisplaySetSelector, GridProperties, LayoutType, Protocol,
    SelectorId, Stage, StageActivation, SyncGroup, SyncGroupId, SyncGroupOptions,
    ViewportDefinition, ViewportOptions, ViewportStructure,
};
use vgrid_protocol::validate_protocol;

fn selector_id(name: &str) -> SelectorId {
    SelectorId::new(name).expect("valid id")
}

fn viewport_for(selector: &str, index: usize) -> ViewportDefinition {
    ViewportDefinition {
        viewport_options: ViewportOptions::default(),
        display_sets: vec![DisplaySetRef {
            id: selector_id(selector),
            matched_display_sets_index: index,
        }],
    }
}

fn stage(id: &str, rows: usize, columns: usize, viewports: Vec<ViewportDefinition>) -> Stage {
    Stage {
        id: id.to_string(),
        name: None,
        stage_activation: StageActivation {
            enabled: ActivationThreshold {
                min_viewports_matched: 1,
            },
        },
        viewport_structure: ViewportStructure {
            layout_type: LayoutType::Grid,
            properties: GridProperties { rows, columns },
        },
        viewports,
    }
}

fn protocol(stages: Vec<Stage>) -> Protocol {
    let mut selectors = BTreeMap::new();
    selectors.insert(selector_id("main"), DisplaySetSelector::default());
    Protocol {
        id: "@vgrid/check".to_string(),
        description: None,
        protocol_matching_rules: Vec::new(),
        display_set_selectors: selectors,
        default_viewport: None,
        stages,
        number_of_priors_referenced: 0,
    }
}

fn codes(report: &vgrid_protocol::ValidationReport) -> Vec<&str> {
    report.issues.iter().map(|i| i.code.as_str()).collect()
}

#[test]
fn clean_protocol_passes() {
    let report = validate_protocol(&protocol(vec![stage(
        "1x1",
        1,
        1,
        vec![viewport_for("main", 0)],
    )]));
    // The permissive selector still warns; nothing should error.
    assert!(!report.has_errors());
}

#[test]
fn empty_selector_rule_set_warns() {
    let report = validate_protocol(&protocol(vec![stage(
        "1x1",
        1,
        1,
        vec![viewport_for("main", 0)],
    )]));
    assert!(codes(&report).contains(&"HP0003"));
    assert_eq!(report.warning_count(), 1);
}

#[test]
fn unknown_selector_reference_is_an_error() {
    let report = validate_protocol(&protocol(vec![stage(
        "1x1",
        1,
        1,
        vec![viewport_for("nonexistent", 0)],
    )]));
    assert!(report.has_errors());
    assert!(codes(&report).contains(&"HP0009"));
}

#[test]
fn surplus_viewports_error_and_missing_viewports_warn() {
    let surplus = validate_protocol(&protocol(vec![stage(
        "1x1",
        1,
        1,
        vec![viewport_for("main", 0), viewport_for("main", 1)],
    )]));
    assert!(codes(&surplus).contains(&"HP0006"));

    let padded = validate_protocol(&protocol(vec![stage(
        "2x2",
        2,
        2,
        vec![viewport_for("main", 0)],
    )]));
    assert!(codes(&padded).contains(&"HP0007"));
    assert!(!padded.has_errors());
}

#[test]
fn unreachable_threshold_is_an_error() {
    let mut unreachable = stage("1x1", 1, 1, vec![viewport_for("main", 0)]);
    unreachable.stage_activation.enabled.min_viewports_matched = 5;
    let report = validate_protocol(&protocol(vec![unreachable]));
    assert!(codes(&report).contains(&"HP0008"));
}

#[test]
fn duplicate_stage_ids_are_an_error() {
    let report = validate_protocol(&protocol(vec![
        stage("same", 1, 1, vec![viewport_for("main", 0)]),
        stage("same", 1, 1, vec![viewport_for("main", 0)]),
    ]));
    assert!(codes(&report).contains(&"HP0004"));
}

#[test]
fn rebound_selector_index_is_an_error() {
    let report = validate_protocol(&protocol(vec![stage(
        "2x1",
        1,
        2,
        vec![viewport_for("main", 0), viewport_for("main", 0)],
    )]));
    assert!(codes(&report).contains(&"HP0010"));
}

#[test]
fn unknown_sync_predicate_warns() {
    let mut viewport = viewport_for("main", 0);
    viewport.viewport_options.sync_groups = vec![SyncGroup {
        kind: "hydrateseg".to_string(),
        id: SyncGroupId::new("sameFORId").expect("valid id"),
        source: true,
        target: true,
        options: SyncGroupOptions {
            matching_rules: vec!["samePatient".to_string()],
        },
    }];
    let report = validate_protocol(&protocol(vec![stage("1x1", 1, 1, vec![viewport])]));
    assert!(codes(&report).contains(&"HP0011"));
}

#[test]
fn report_serializes() {
    let report = validate_protocol(&protocol(vec![stage(
        "1x1",
        1,
        1,
        vec![viewport_for("nonexistent", 0)],
    )]));
    let json = serde_json::to_string(&report).expect("serialize report");
    let round: vgrid_protocol::ValidationReport =
        serde_json::from_str(&json).expect("deserialize report");
    assert_eq!(round.protocol_id, report.protocol_id);
    assert_eq!(round.error_count(), report.error_count());
}

#[test]
fn stageless_protocol_and_bad_prior_budget_error() {
    let mut bad = protocol(Vec::new());
    bad.number_of_priors_referenced = -2;
    let report = validate_protocol(&bad);
    assert!(codes(&report).contains(&"HP0001"));
    assert!(codes(&report).contains(&"HP0002"));
}
