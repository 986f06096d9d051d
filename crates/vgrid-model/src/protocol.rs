//! Declarative hanging protocol definitions.
//!
//! Protocols are configuration data supplied at session start, deserialized
//! from JSON with the original configuration key spelling
//! (`minViewportsMatched`, `matchedDisplaySetsIndex`, `allowUnmatchedView`).
//! The engine in `vgrid-protocol` interprets them; nothing here executes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{SelectorId, SyncGroupId};
use crate::rules::MatchingRule;

/// How many prior studies a protocol may pull candidates from.
/// -1 means unlimited.
pub const UNLIMITED_PRIORS: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Study-level gate: all required rules must pass for the protocol to
    /// be considered at all.
    #[serde(default)]
    pub protocol_matching_rules: Vec<MatchingRule>,
    /// Logical selector names -> the rule sets that rank series for them.
    #[serde(default)]
    pub display_set_selectors: BTreeMap<SelectorId, DisplaySetSelector>,
    /// Fallback viewport definition merged under every stage viewport.
    #[serde(default)]
    pub default_viewport: Option<ViewportDefinition>,
    pub stages: Vec<Stage>,
    #[serde(default = "default_priors")]
    pub number_of_priors_referenced: i32,
}

fn default_priors() -> i32 {
    0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySetSelector {
    #[serde(default)]
    pub series_matching_rules: Vec<MatchingRule>,
    /// When true the selector may draw candidates from prior studies, up to
    /// the protocol's `number_of_priors_referenced`.
    #[serde(default)]
    pub allow_priors: bool,
}

/// One concrete grid layout option within a protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stage_activation: StageActivation,
    pub viewport_structure: ViewportStructure,
    pub viewports: Vec<ViewportDefinition>,
}

impl Stage {
    pub fn min_viewports_matched(&self) -> usize {
        self.stage_activation.enabled.min_viewports_matched
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageActivation {
    #[serde(default)]
    pub enabled: ActivationThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationThreshold {
    #[serde(default = "default_min_matched")]
    pub min_viewports_matched: usize,
}

impl Default for ActivationThreshold {
    fn default() -> Self {
        Self {
            min_viewports_matched: default_min_matched(),
        }
    }
}

fn default_min_matched() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportStructure {
    pub layout_type: LayoutType,
    pub properties: GridProperties,
}

impl ViewportStructure {
    /// Total slot count declared by this layout.
    pub fn slot_count(&self) -> usize {
        self.properties.rows * self.properties.columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutType {
    #[default]
    Grid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridProperties {
    pub rows: usize,
    pub columns: usize,
}

/// Declares which selector(s) supply a viewport slot and how it behaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportDefinition {
    #[serde(default)]
    pub viewport_options: ViewportOptions,
    #[serde(default)]
    pub display_sets: Vec<DisplaySetRef>,
}

/// Reference from a viewport slot into a selector's ranked match list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySetRef {
    pub id: SelectorId,
    /// Index into the ranked match list for the named selector.
    #[serde(default)]
    pub matched_display_sets_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportOptions {
    #[serde(default)]
    pub viewport_type: Option<ViewportType>,
    #[serde(default)]
    pub tool_group_id: Option<String>,
    /// Render the slot empty instead of failing when its selector index is
    /// out of range.
    #[serde(default)]
    pub allow_unmatched_view: Option<bool>,
    #[serde(default)]
    pub sync_groups: Vec<SyncGroup>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ViewportType {
    #[default]
    Stack,
    Volume,
    /// Single-overlay surface: exactly one segmentation display set.
    Segmentation,
}

/// Runtime-computed viewport binding declared on a protocol viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncGroup {
    /// Discriminates what state the group propagates, e.g. "position" or
    /// "hydrateseg".
    #[serde(rename = "type")]
    pub kind: String,
    pub id: SyncGroupId,
    #[serde(default = "default_true")]
    pub source: bool,
    #[serde(default = "default_true")]
    pub target: bool,
    #[serde(default)]
    pub options: SyncGroupOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncGroupOptions {
    /// Named membership predicates, e.g. "sameFOR".
    #[serde(default)]
    pub matching_rules: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// The membership predicate names understood by the sync coordinator.
pub const SYNC_RULE_SAME_FOR: &str = "sameFOR";
