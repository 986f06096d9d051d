//! Static validation of protocol definitions.
//!
//! Catches authoring mistakes before a protocol ever meets a study:
//! selector references that resolve nowhere, grid shapes that disagree with
//! their viewport lists, thresholds that can never activate. Runs on the
//! same tagged rule data the runtime evaluator interprets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vgrid_model::{Protocol, Stage, SYNC_RULE_SAME_FOR, UNLIMITED_PRIORS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A single authoring issue found in a protocol definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolIssue {
    /// Stable issue code, e.g. "HP0003".
    pub code: String,
    pub message: String,
    pub severity: IssueSeverity,
    /// Stage id (if the issue is scoped to one stage).
    pub stage: Option<String>,
}

/// Validation report for a single protocol definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(rename = "protocol")]
    pub protocol_id: String,
    pub issues: Vec<ProtocolIssue>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Validate a protocol definition for authoring mistakes.
pub fn validate_protocol(protocol: &Protocol) -> ValidationReport {
    let mut issues = Vec::new();

    if protocol.stages.is_empty() {
        issues.push(error("HP0001", "protocol declares no stages", None));
    }

    if protocol.number_of_priors_referenced < UNLIMITED_PRIORS {
        issues.push(error(
            "HP0002",
            format!(
                "numberOfPriorsReferenced must be -1 or greater, got {}",
                protocol.number_of_priors_referenced
            ),
            None,
        ));
    }

    for (selector_id, selector) in &protocol.display_set_selectors {
        if selector.series_matching_rules.is_empty() {
            issues.push(warning(
                "HP0003",
                format!("selector {selector_id} has no matching rules; it matches every series"),
                None,
            ));
        }
    }

    let mut seen_stage_ids = BTreeSet::new();
    for stage in &protocol.stages {
        if !seen_stage_ids.insert(stage.id.as_str()) {
            issues.push(error(
                "HP0004",
                format!("duplicate stage id {:?}", stage.id),
                Some(stage.id.as_str()),
            ));
        }
        validate_stage(protocol, stage, &mut issues);
    }

    ValidationReport {
        protocol_id: protocol.id.clone(),
        issues,
    }
}

fn validate_stage(protocol: &Protocol, stage: &Stage, issues: &mut Vec<ProtocolIssue>) {
    let cells = stage.viewport_structure.slot_count();
    if cells == 0 {
        issues.push(error(
            "HP0005",
            "grid shape declares zero cells",
            Some(stage.id.as_str()),
        ));
    }
    if stage.viewports.len() > cells {
        issues.push(error(
            "HP0006",
            format!(
                "{} viewport definitions for {} grid cells",
                stage.viewports.len(),
                cells
            ),
            Some(stage.id.as_str()),
        ));
    } else if stage.viewports.len() < cells {
        issues.push(warning(
            "HP0007",
            format!(
                "{} viewport definitions for {} grid cells; the rest render empty",
                stage.viewports.len(),
                cells
            ),
            Some(stage.id.as_str()),
        ));
    }

    if stage.min_viewports_matched() > stage.viewports.len() {
        issues.push(error(
            "HP0008",
            format!(
                "minViewportsMatched {} exceeds the {} declared viewports; stage can never activate",
                stage.min_viewports_matched(),
                stage.viewports.len()
            ),
            Some(stage.id.as_str()),
        ));
    }

    let mut bindings = BTreeSet::new();
    for (slot, viewport) in stage.viewports.iter().enumerate() {
        for ds_ref in &viewport.display_sets {
            if !protocol.display_set_selectors.contains_key(&ds_ref.id) {
                issues.push(error(
                    "HP0009",
                    format!("slot {slot} references unknown selector {}", ds_ref.id),
                    Some(stage.id.as_str()),
                ));
            }
            if !bindings.insert((ds_ref.id.clone(), ds_ref.matched_display_sets_index)) {
                issues.push(error(
                    "HP0010",
                    format!(
                        "slot {slot} re-binds selector {} index {}",
                        ds_ref.id, ds_ref.matched_display_sets_index
                    ),
                    Some(stage.id.as_str()),
                ));
            }
        }
        for sync in &viewport.viewport_options.sync_groups {
            for rule in &sync.options.matching_rules {
                if rule != SYNC_RULE_SAME_FOR {
                    issues.push(warning(
                        "HP0011",
                        format!(
                            "sync group {} names unknown membership predicate {rule:?}",
                            sync.id
                        ),
                        Some(stage.id.as_str()),
                    ));
                }
            }
        }
    }
}

fn error(code: &str, message: impl Into<String>, stage: Option<&str>) -> ProtocolIssue {
    issue(code, message, IssueSeverity::Error, stage)
}

fn warning(code: &str, message: impl Into<String>, stage: Option<&str>) -> ProtocolIssue {
    issue(code, message, IssueSeverity::Warning, stage)
}

fn issue(
    code: &str,
    message: impl Into<String>,
    severity: IssueSeverity,
    stage: Option<&str>,
) -> ProtocolIssue {
    ProtocolIssue {
        code: code.to_string(),
        message: message.into(),
        severity,
        stage: stage.map(str::to_string),
    }
}
