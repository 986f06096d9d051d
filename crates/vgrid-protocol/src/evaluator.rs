//! Matching rule evaluation.
//!
//! Rules are tagged data (`vgrid_model::MatchingRule`) interpreted here by a
//! single evaluator. Evaluation is pure: the same rule set against the same
//! candidate always yields the same score, and rule order only matters
//! through explicit weighting.

use vgrid_model::{AttributeValue, DisplaySet, MatchingRule, Study};

/// A candidate for rule evaluation: a display set in the context of its
/// study. Attribute lookup consults the display set first, then the study.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub study: &'a Study,
    pub display_set: &'a DisplaySet,
}

impl Candidate<'_> {
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.display_set
            .attribute(name)
            .or_else(|| self.study.attribute(name))
    }
}

/// Outcome of a single rule against a candidate.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: Option<String>,
    pub attribute: String,
    pub satisfied: bool,
    /// Score contribution (0 when unsatisfied).
    pub score: f64,
}

/// Aggregated outcome of a rule set against a candidate.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// Weighted sum over satisfied rules. Zero when disqualified.
    pub score: f64,
    /// False when any required rule failed.
    pub satisfied: bool,
    pub details: Vec<RuleOutcome>,
}

impl RuleMatch {
    fn disqualified(details: Vec<RuleOutcome>) -> Self {
        Self {
            score: 0.0,
            satisfied: false,
            details,
        }
    }
}

/// Evaluate a rule set against a candidate's display-set attributes.
///
/// A missing or unknown attribute makes that rule unsatisfied with a zero
/// contribution; it is never an error. A failed `required` rule
/// disqualifies the candidate outright.
pub fn evaluate(rules: &[MatchingRule], candidate: &Candidate<'_>) -> RuleMatch {
    evaluate_with(rules, |name| candidate.attribute(name))
}

/// Evaluate a rule set against study-level attributes only. Used for the
/// protocol-level gate, where no display set is in play yet.
pub fn evaluate_study(rules: &[MatchingRule], study: &Study) -> RuleMatch {
    evaluate_with(rules, |name| study.attribute(name))
}

fn evaluate_with(
    rules: &[MatchingRule],
    lookup: impl Fn(&str) -> Option<AttributeValue>,
) -> RuleMatch {
    let mut score = 0.0;
    let mut details = Vec::with_capacity(rules.len());
    let mut required_failed = false;

    for rule in rules {
        let satisfied = lookup(&rule.attribute)
            .map(|value| rule.constraint.is_satisfied_by(&value))
            .unwrap_or(false);
        let contribution = if satisfied { rule.weight } else { 0.0 };
        if !satisfied && rule.required {
            required_failed = true;
        }
        score += contribution;
        details.push(RuleOutcome {
            rule_id: rule.id.clone(),
            attribute: rule.attribute.clone(),
            satisfied,
            score: contribution,
        });
    }

    if required_failed {
        return RuleMatch::disqualified(details);
    }

    // An empty rule set matches trivially with a zero score; ranking then
    // falls back to original series order.
    let satisfied = rules.is_empty() || details.iter().any(|outcome| outcome.satisfied);
    RuleMatch {
        score,
        satisfied,
        details,
    }
}
