//! Matching rules as tagged data.
//!
//! A rule is a declarative predicate over study/series attributes with a
//! weight; rule sets combine by weighted sum into a match score. Rules are
//! data interpreted by a single evaluator, never executable code, so the
//! same definitions serve runtime matching and protocol authoring
//! validation.

use serde::{Deserialize, Serialize};

/// A matching-rule attribute value resolved from a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl AttributeValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// The predicate half of a matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Equals(AttributeValue),
    NotEquals(AttributeValue),
    GreaterThan(f64),
    LessThan(f64),
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
    Contains(String),
    ContainsI(String),
}

impl Constraint {
    /// Whether a resolved attribute value satisfies this constraint.
    ///
    /// Type mismatches (e.g. a numeric constraint against a string value)
    /// are simply unsatisfied.
    pub fn is_satisfied_by(&self, value: &AttributeValue) -> bool {
        match self {
            Constraint::Equals(expected) => value == expected,
            Constraint::NotEquals(expected) => value != expected,
            Constraint::GreaterThan(threshold) => {
                value.as_number().is_some_and(|n| n > *threshold)
            }
            Constraint::LessThan(threshold) => value.as_number().is_some_and(|n| n < *threshold),
            Constraint::Range { min, max } => value
                .as_number()
                .is_some_and(|n| n >= *min && n <= *max),
            Constraint::Contains(needle) => match value {
                AttributeValue::Str(s) => s.contains(needle),
                _ => false,
            },
            Constraint::ContainsI(needle) => match value {
                AttributeValue::Str(s) => {
                    s.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }
}

/// A declarative predicate over candidate attributes plus a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingRule {
    #[serde(default)]
    pub id: Option<String>,
    /// Score contribution when satisfied.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// A failed required rule disqualifies the candidate outright.
    #[serde(default)]
    pub required: bool,
    pub attribute: String,
    pub constraint: Constraint,
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_type_mismatch_is_unsatisfied() {
        let numeric = Constraint::GreaterThan(2.0);
        assert!(!numeric.is_satisfied_by(&AttributeValue::Str("CT".into())));
        assert!(numeric.is_satisfied_by(&AttributeValue::Number(3.0)));

        let contains = Constraint::Contains("AX".into());
        assert!(!contains.is_satisfied_by(&AttributeValue::Number(1.0)));
        assert!(contains.is_satisfied_by(&AttributeValue::Str("T2 AXIAL".into())));
    }

    #[test]
    fn case_insensitive_contains() {
        let rule = Constraint::ContainsI("axial".into());
        assert!(rule.is_satisfied_by(&AttributeValue::Str("T2 AXIAL".into())));
    }

    #[test]
    fn rule_deserializes_from_protocol_json() {
        let rule: MatchingRule = serde_json::from_str(
            r#"{
                "attribute": "numImageFrames",
                "constraint": { "greaterThan": 0 },
                "weight": 10,
                "required": true
            }"#,
        )
        .expect("deserialize rule");
        assert_eq!(rule.attribute, "numImageFrames");
        assert_eq!(rule.weight, 10.0);
        assert!(rule.required);
        assert_eq!(rule.constraint, Constraint::GreaterThan(0.0));
    }
}
