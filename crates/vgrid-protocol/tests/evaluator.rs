//! Unit tests for matching rule evaluation.

use vgrid_model::{
    AttributeValue, Constraint, DisplaySet, DisplaySetKind, DisplaySetUid, FrameOfReferenceUid,
    MatchingRule, Study, StudyUid,
};
use vgrid_protocol::{evaluate, Candidate};

fn make_series(uid: &str, modality: &str, images: usize) -> DisplaySet {
    DisplaySet {
        uid: DisplaySetUid::new(uid).expect("valid uid"),
        series_number: Some(1),
        modality: modality.to_string(),
        series_description: Some("T2 AXIAL".to_string()),
        frame_of_reference: Some(FrameOfReferenceUid::new("1.2.840.9").expect("valid uid")),
        image_ids: (0..images).map(|i| format!("img-{i}")).collect(),
        pixel_spacing: None,
        slice_thickness: None,
        referenced_display_set: None,
        kind: DisplaySetKind::Image,
    }
}

fn make_study(display_sets: Vec<DisplaySet>) -> Study {
    let mut study = Study::new(StudyUid::new("1.2.840.100").expect("valid uid"));
    for ds in display_sets {
        study.add_display_set(ds);
    }
    study
}

fn rule(attribute: &str, constraint: Constraint, weight: f64, required: bool) -> MatchingRule {
    MatchingRule {
        id: None,
        weight,
        required,
        attribute: attribute.to_string(),
        constraint,
    }
}

#[test]
fn weighted_sum_over_satisfied_rules() {
    let study = make_study(vec![make_series("1.2", "MR", 30)]);
    let candidate = Candidate {
        study: &study,
        display_set: &study.display_sets[0],
    };
    let rules = vec![
        rule(
            "Modality",
            Constraint::Equals(AttributeValue::Str("MR".into())),
            10.0,
            false,
        ),
        rule("numImageFrames", Constraint::GreaterThan(0.0), 1.0, false),
        rule("SeriesDescription", Constraint::ContainsI("sag".into()), 5.0, false),
    ];
    let outcome = evaluate(&rules, &candidate);
    assert!(outcome.satisfied);
    assert_eq!(outcome.score, 11.0);
    assert_eq!(outcome.details.len(), 3);
    assert!(!outcome.details[2].satisfied);
}

#[test]
fn missing_attribute_is_not_an_error() {
    let study = make_study(vec![make_series("1.2", "MR", 1)]);
    let candidate = Candidate {
        study: &study,
        display_set: &study.display_sets[0],
    };
    let rules = vec![
        rule("NoSuchAttribute", Constraint::GreaterThan(1.0), 50.0, false),
        rule("numImageFrames", Constraint::GreaterThan(0.0), 1.0, false),
    ];
    let outcome = evaluate(&rules, &candidate);
    assert!(outcome.satisfied);
    assert_eq!(outcome.score, 1.0);
    assert!(!outcome.details[0].satisfied);
}

#[test]
fn failed_required_rule_disqualifies() {
    let study = make_study(vec![make_series("1.2", "CT", 10)]);
    let candidate = Candidate {
        study: &study,
        display_set: &study.display_sets[0],
    };
    let rules = vec![
        rule(
            "Modality",
            Constraint::Equals(AttributeValue::Str("MR".into())),
            10.0,
            true,
        ),
        rule("numImageFrames", Constraint::GreaterThan(0.0), 1.0, false),
    ];
    let outcome = evaluate(&rules, &candidate);
    assert!(!outcome.satisfied);
    assert_eq!(outcome.score, 0.0);
}

#[test]
fn empty_rule_set_matches_trivially() {
    let study = make_study(vec![make_series("1.2", "MR", 0)]);
    let candidate = Candidate {
        study: &study,
        display_set: &study.display_sets[0],
    };
    let outcome = evaluate(&[], &candidate);
    assert!(outcome.satisfied);
    assert_eq!(outcome.score, 0.0);
}

#[test]
fn study_attributes_back_fill_display_set_lookup() {
    let mut study = make_study(vec![make_series("1.2", "MR", 3)]);
    study.description = Some("BRAIN ROUTINE".to_string());
    let candidate = Candidate {
        study: &study,
        display_set: &study.display_sets[0],
    };
    let rules = vec![rule(
        "StudyDescription",
        Constraint::Contains("BRAIN".into()),
        2.0,
        false,
    )];
    let outcome = evaluate(&rules, &candidate);
    assert!(outcome.satisfied);
    assert_eq!(outcome.score, 2.0);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_constraint() -> impl Strategy<Value = Constraint> {
        prop_oneof![
            any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Constraint::GreaterThan),
            any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Constraint::LessThan),
            "[A-Z]{1,4}".prop_map(|s| Constraint::Equals(AttributeValue::Str(s))),
            "[a-z]{1,4}".prop_map(Constraint::Contains),
        ]
    }

    fn arb_rule() -> impl Strategy<Value = MatchingRule> {
        (
            prop_oneof![
                Just("Modality".to_string()),
                Just("numImageFrames".to_string()),
                Just("SeriesNumber".to_string()),
                Just("Unknown".to_string()),
            ],
            arb_constraint(),
            -10.0f64..10.0,
            any::<bool>(),
        )
            .prop_map(|(attribute, constraint, weight, required)| MatchingRule {
                id: None,
                weight,
                required,
                attribute,
                constraint,
            })
    }

    proptest! {
        /// Evaluating the same rule set against the same candidate twice
        /// yields identical scores.
        #[test]
        fn evaluation_is_deterministic(
            rules in proptest::collection::vec(arb_rule(), 0..8),
            modality in "[A-Z]{2}",
            images in 0usize..50,
        ) {
            let study = make_study(vec![make_series("1.2", &modality, images)]);
            let candidate = Candidate {
                study: &study,
                display_set: &study.display_sets[0],
            };
            let first = evaluate(&rules, &candidate);
            let second = evaluate(&rules, &candidate);
            prop_assert_eq!(first.score, second.score);
            prop_assert_eq!(first.satisfied, second.satisfied);
        }
    }
}
