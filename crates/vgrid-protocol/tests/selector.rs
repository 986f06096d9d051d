//! Stage selection against a staged grid protocol.

use chrono::NaiveDate;

use vgrid_model::{
    ActivationThreshold, Constraint, DisplaySet, DisplaySetKind, DisplaySetRef,
    DisplaySetSelector, DisplaySetUid, GridProperties, LayoutType, MatchingRule, Protocol,
    SelectorId, Stage, StageActivation, Study, StudyUid, ViewportDefinition, ViewportOptions,
    ViewportStructure, UNLIMITED_PRIORS,
};
use vgrid_protocol::{select_stage, MatchError};

const SELECTOR: &str = "defaultDisplaySetId";

fn series(uid: &str, images: usize) -> DisplaySet {
    DisplaySet {
        uid: DisplaySetUid::new(uid).expect("valid uid"),
        series_number: None,
        modality: "MR".to_string(),
        series_description: None,
        frame_of_reference: None,
        image_ids: (0..images).map(|i| format!("img-{i}")).collect(),
        pixel_spacing: None,
        slice_thickness: None,
        referenced_display_set: None,
        kind: DisplaySetKind::Image,
    }
}

fn study_with_series(uid: &str, count: usize) -> Study {
    let mut study = Study::new(StudyUid::new(uid).expect("valid uid"));
    for index in 0..count {
        study.add_display_set(series(&format!("{uid}.{index}"), 10));
    }
    study
}

fn grid_stage(id: &str, rows: usize, columns: usize, min_matched: usize) -> Stage {
    let viewports = (0..rows * columns)
        .map(|index| ViewportDefinition {
            viewport_options: ViewportOptions {
                allow_unmatched_view: Some(true),
                ..ViewportOptions::default()
            },
            display_sets: vec![DisplaySetRef {
                id: SelectorId::new(SELECTOR).expect("valid id"),
                matched_display_sets_index: index,
            }],
        })
        .collect();
    Stage {
        id: id.to_string(),
        name: Some(id.to_string()),
        stage_activation: StageActivation {
            enabled: ActivationThreshold {
                min_viewports_matched: min_matched,
            },
        },
        viewport_structure: ViewportStructure {
            layout_type: LayoutType::Grid,
            properties: GridProperties { rows, columns },
        },
        viewports,
    }
}

/// The staged m-by-n grid protocol: 2x2, then 3x1, 2x1, 1x1.
fn mn_grid_protocol(allow_priors: bool) -> Protocol {
    let mut selectors = std::collections::BTreeMap::new();
    selectors.insert(
        SelectorId::new(SELECTOR).expect("valid id"),
        DisplaySetSelector {
            series_matching_rules: vec![MatchingRule {
                id: None,
                weight: 1.0,
                required: true,
                attribute: "numImageFrames".to_string(),
                constraint: Constraint::GreaterThan(0.0),
            }],
            allow_priors,
        },
    );
    Protocol {
        id: "@vgrid/mnGrid".to_string(),
        description: None,
        protocol_matching_rules: Vec::new(),
        display_set_selectors: selectors,
        default_viewport: None,
        stages: vec![
            grid_stage("2x2", 2, 2, 4),
            grid_stage("3x1", 1, 3, 3),
            grid_stage("2x1", 1, 2, 2),
            grid_stage("1x1", 1, 1, 1),
        ],
        number_of_priors_referenced: UNLIMITED_PRIORS,
    }
}

#[test]
fn four_series_activates_the_2x2_stage() {
    let protocol = mn_grid_protocol(false);
    let study = study_with_series("1.2.840.100", 4);
    let selection = select_stage(&protocol, &study, &[]).expect("stage selected");
    assert_eq!(selection.stage(&protocol).id, "2x2");
}

#[test]
fn staged_fallback_follows_declared_order() {
    let protocol = mn_grid_protocol(false);
    for (count, expected) in [(6, "2x2"), (3, "3x1"), (2, "2x1"), (1, "1x1")] {
        let study = study_with_series("1.2.840.100", count);
        let selection = select_stage(&protocol, &study, &[]).expect("stage selected");
        assert_eq!(selection.stage(&protocol).id, expected, "{count} series");
    }
}

#[test]
fn no_qualifying_stage_reports_match_failure() {
    let protocol = mn_grid_protocol(false);
    let study = study_with_series("1.2.840.100", 0);
    let error = select_stage(&protocol, &study, &[]).expect_err("no stage qualifies");
    assert!(matches!(error, MatchError::NoStageActivated { .. }));
}

#[test]
fn series_without_images_do_not_match() {
    let protocol = mn_grid_protocol(false);
    let mut study = study_with_series("1.2.840.100", 2);
    study.add_display_set(series("1.2.840.100.nine", 0));
    study.add_display_set(series("1.2.840.100.ten", 0));
    let selection = select_stage(&protocol, &study, &[]).expect("stage selected");
    assert_eq!(selection.stage(&protocol).id, "2x1");
}

#[test]
fn reselection_is_idempotent() {
    let protocol = mn_grid_protocol(false);
    let study = study_with_series("1.2.840.100", 3);
    let first = select_stage(&protocol, &study, &[]).expect("stage selected");
    let second = select_stage(&protocol, &study, &[]).expect("stage selected");
    assert_eq!(first.stage_index, second.stage_index);
    assert_eq!(first.rankings, second.rankings);
}

#[test]
fn ties_keep_original_series_order() {
    let protocol = mn_grid_protocol(false);
    let study = study_with_series("1.2.840.100", 4);
    let selection = select_stage(&protocol, &study, &[]).expect("stage selected");
    let ranked = &selection.rankings[&SelectorId::new(SELECTOR).expect("valid id")];
    let uids: Vec<&str> = ranked.iter().map(|r| r.display_set.as_str()).collect();
    assert_eq!(
        uids,
        vec![
            "1.2.840.100.0",
            "1.2.840.100.1",
            "1.2.840.100.2",
            "1.2.840.100.3"
        ]
    );
}

#[test]
fn protocol_gate_rejects_non_matching_study() {
    let mut protocol = mn_grid_protocol(false);
    protocol.protocol_matching_rules = vec![MatchingRule {
        id: None,
        weight: 1.0,
        required: true,
        attribute: "StudyDescription".to_string(),
        constraint: Constraint::Contains("BRAIN".to_string()),
    }];
    let study = study_with_series("1.2.840.100", 4);
    let error = select_stage(&protocol, &study, &[]).expect_err("gate rejects");
    assert!(matches!(error, MatchError::ProtocolNotApplicable { .. }));
}

#[test]
fn priors_extend_the_candidate_pool_when_allowed() {
    let protocol = mn_grid_protocol(true);
    let study = study_with_series("1.2.840.100", 2);
    let mut prior = study_with_series("1.2.840.99", 2);
    prior.study_date = NaiveDate::from_ymd_opt(2024, 3, 1);
    let selection = select_stage(&protocol, &study, std::slice::from_ref(&prior))
        .expect("stage selected");
    assert_eq!(selection.stage(&protocol).id, "2x2");
    let ranked = &selection.rankings[&SelectorId::new(SELECTOR).expect("valid id")];
    assert_eq!(ranked.iter().filter(|r| r.from_prior).count(), 2);
}

#[test]
fn prior_budget_zero_ignores_priors() {
    let mut protocol = mn_grid_protocol(true);
    protocol.number_of_priors_referenced = 0;
    let study = study_with_series("1.2.840.100", 2);
    let prior = study_with_series("1.2.840.99", 2);
    let selection = select_stage(&protocol, &study, std::slice::from_ref(&prior))
        .expect("stage selected");
    assert_eq!(selection.stage(&protocol).id, "2x1");
}

#[test]
fn prior_budget_takes_newest_first() {
    let mut protocol = mn_grid_protocol(true);
    protocol.number_of_priors_referenced = 1;
    let study = study_with_series("1.2.840.100", 2);
    let mut newer = study_with_series("1.2.840.99", 1);
    newer.study_date = NaiveDate::from_ymd_opt(2024, 6, 1);
    let mut older = study_with_series("1.2.840.98", 1);
    older.study_date = NaiveDate::from_ymd_opt(2023, 1, 1);
    let selection =
        select_stage(&protocol, &study, &[older, newer]).expect("stage selected");
    let ranked = &selection.rankings[&SelectorId::new(SELECTOR).expect("valid id")];
    let from_priors: Vec<&str> = ranked
        .iter()
        .filter(|r| r.from_prior)
        .map(|r| r.display_set.as_str())
        .collect();
    assert_eq!(from_priors, vec!["1.2.840.99.0"]);
}
