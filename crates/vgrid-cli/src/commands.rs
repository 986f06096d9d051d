//! Command implementations for the `vgrid` binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use vgrid_model::{Protocol, Study};
use vgrid_protocol::{assign, select_stage, validate_protocol};

use crate::cli::{CheckArgs, LayoutArgs};
use crate::types::{CheckResult, LayoutResult, SlotSummary};

pub fn run_layout(args: &LayoutArgs) -> Result<LayoutResult> {
    let protocol: Protocol = read_json(&args.protocol, "protocol")?;
    let study: Study = read_json(&args.study, "study")?;
    let priors: Vec<Study> = args
        .priors
        .iter()
        .map(|path| read_json(path, "prior study"))
        .collect::<Result<_>>()?;

    info!(protocol = %protocol.id, study = %study.uid, "matching study against protocol");
    let selection = select_stage(&protocol, &study, &priors)?;
    let assignment = assign(&protocol, &selection);

    let slots = assignment
        .viewports
        .iter()
        .map(|bound| {
            let first = bound.display_sets.first();
            let resolved = first.and_then(|uid| study.display_set(uid));
            let score = first.and_then(|uid| {
                selection
                    .rankings
                    .values()
                    .flatten()
                    .find(|ranked| &ranked.display_set == uid)
                    .map(|ranked| ranked.score)
            });
            SlotSummary {
                slot: bound.slot,
                viewport_id: bound.viewport_id.to_string(),
                display_sets: bound
                    .display_sets
                    .iter()
                    .map(|uid| uid.to_string())
                    .collect(),
                modality: resolved.map(|ds| ds.modality.clone()),
                description: resolved.and_then(|ds| ds.series_description.clone()),
                score,
            }
        })
        .collect();

    Ok(LayoutResult {
        protocol_id: protocol.id.clone(),
        study_uid: study.uid.to_string(),
        stage_id: assignment.stage_id.clone(),
        rows: assignment.rows,
        columns: assignment.columns,
        slots,
        issues: assignment
            .issues
            .iter()
            .map(|issue| issue.to_string())
            .collect(),
    })
}

pub fn run_check(args: &CheckArgs) -> Result<CheckResult> {
    let protocol: Protocol = read_json(&args.protocol, "protocol")?;
    info!(protocol = %protocol.id, "validating protocol definition");
    Ok(CheckResult {
        report: validate_protocol(&protocol),
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {what} file {}", path.display()))
}
