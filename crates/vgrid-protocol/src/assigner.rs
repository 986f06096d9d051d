//! Viewport grid assignment.
//!
//! Binds the chosen stage's viewport definitions to concrete display sets
//! using the selector rankings. The resulting `GridAssignment` is the sole
//! authority on which content a physical slot shows; layout components
//! render purely from it.

use tracing::debug;

use vgrid_model::{
    DisplaySetUid, Protocol, SelectorId, SyncGroup, ViewportDefinition, ViewportId, ViewportType,
};

use crate::selector::StageSelection;

/// Viewport options after merging definition, stage default and protocol
/// default layers (definition wins).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedViewportOptions {
    pub viewport_type: ViewportType,
    pub tool_group_id: Option<String>,
    pub allow_unmatched_view: bool,
    pub sync_groups: Vec<SyncGroup>,
}

/// One bound slot: its content (possibly empty) and resolved options.
#[derive(Debug, Clone)]
pub struct ViewportAssignment {
    pub slot: usize,
    pub viewport_id: ViewportId,
    /// Empty means the slot renders as an empty viewport.
    pub display_sets: Vec<DisplaySetUid>,
    pub options: ResolvedViewportOptions,
}

impl ViewportAssignment {
    pub fn is_empty(&self) -> bool {
        self.display_sets.is_empty()
    }
}

/// Why a slot ended up empty (or a definition was ignored). Local to the
/// affected slot; sibling slots are never aborted.
#[derive(Debug, Clone)]
pub enum AssignmentIssue {
    /// Selector index out of range without `allowUnmatchedView`.
    UnresolvedReference {
        slot: usize,
        selector: SelectorId,
        index: usize,
    },
    /// The definition names a selector the protocol does not declare.
    UnknownSelector { slot: usize, selector: SelectorId },
    /// A ranked entry was already bound to an earlier slot.
    DuplicateBinding {
        slot: usize,
        selector: SelectorId,
        index: usize,
    },
    /// More viewport definitions than grid cells; the surplus is dropped.
    SurplusDefinitions { declared: usize, cells: usize },
}

impl std::fmt::Display for AssignmentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentIssue::UnresolvedReference {
                slot,
                selector,
                index,
            } => write!(
                f,
                "slot {slot}: selector {selector} has no match at index {index}"
            ),
            AssignmentIssue::UnknownSelector { slot, selector } => {
                write!(f, "slot {slot}: unknown selector {selector}")
            }
            AssignmentIssue::DuplicateBinding {
                slot,
                selector,
                index,
            } => write!(
                f,
                "slot {slot}: selector {selector} index {index} already bound"
            ),
            AssignmentIssue::SurplusDefinitions { declared, cells } => write!(
                f,
                "{declared} viewport definitions for {cells} grid cells"
            ),
        }
    }
}

/// The final ordered slot binding for an activated stage.
#[derive(Debug, Clone)]
pub struct GridAssignment {
    pub stage_id: String,
    pub rows: usize,
    pub columns: usize,
    pub viewports: Vec<ViewportAssignment>,
    pub issues: Vec<AssignmentIssue>,
}

/// Bind the selected stage's slots to display sets.
///
/// Always emits exactly rows x columns slots: missing definitions pad as
/// empty slots, surplus definitions are reported and dropped. An
/// out-of-range selector index yields an empty slot, with an issue unless
/// the definition allows unmatched views.
pub fn assign(protocol: &Protocol, selection: &StageSelection) -> GridAssignment {
    let stage = selection.stage(protocol);
    let cells = stage.viewport_structure.slot_count();
    let mut issues = Vec::new();
    if stage.viewports.len() > cells {
        issues.push(AssignmentIssue::SurplusDefinitions {
            declared: stage.viewports.len(),
            cells,
        });
    }

    let mut bound: Vec<(SelectorId, usize)> = Vec::new();
    let mut viewports = Vec::with_capacity(cells);
    for slot in 0..cells {
        let definition = stage.viewports.get(slot);
        let options = resolve_options(definition, protocol.default_viewport.as_ref());
        let mut display_sets = Vec::new();

        if let Some(definition) = definition {
            for ds_ref in &definition.display_sets {
                let Some(ranked) = selection.rankings.get(&ds_ref.id) else {
                    issues.push(AssignmentIssue::UnknownSelector {
                        slot,
                        selector: ds_ref.id.clone(),
                    });
                    continue;
                };
                let index = ds_ref.matched_display_sets_index;
                let key = (ds_ref.id.clone(), index);
                if bound.contains(&key) {
                    issues.push(AssignmentIssue::DuplicateBinding {
                        slot,
                        selector: ds_ref.id.clone(),
                        index,
                    });
                    continue;
                }
                match ranked.get(index) {
                    Some(entry) => {
                        bound.push(key);
                        display_sets.push(entry.display_set.clone());
                    }
                    None => {
                        if !options.allow_unmatched_view {
                            issues.push(AssignmentIssue::UnresolvedReference {
                                slot,
                                selector: ds_ref.id.clone(),
                                index,
                            });
                        }
                    }
                }
            }
        }

        viewports.push(ViewportAssignment {
            slot,
            viewport_id: slot_viewport_id(slot),
            display_sets,
            options,
        });
    }

    debug!(
        stage = %stage.id,
        bound = viewports.iter().filter(|v| !v.is_empty()).count(),
        empty = viewports.iter().filter(|v| v.is_empty()).count(),
        issues = issues.len(),
        "grid assignment"
    );

    GridAssignment {
        stage_id: stage.id.clone(),
        rows: stage.viewport_structure.properties.rows,
        columns: stage.viewport_structure.properties.columns,
        viewports,
        issues,
    }
}

fn slot_viewport_id(slot: usize) -> ViewportId {
    ViewportId::new(format!("viewport-{slot}")).expect("slot id is never empty")
}

fn resolve_options(
    definition: Option<&ViewportDefinition>,
    default_viewport: Option<&ViewportDefinition>,
) -> ResolvedViewportOptions {
    let defined = definition.map(|d| &d.viewport_options);
    let fallback = default_viewport.map(|d| &d.viewport_options);

    ResolvedViewportOptions {
        viewport_type: defined
            .and_then(|o| o.viewport_type)
            .or_else(|| fallback.and_then(|o| o.viewport_type))
            .unwrap_or_default(),
        tool_group_id: defined
            .and_then(|o| o.tool_group_id.clone())
            .or_else(|| fallback.and_then(|o| o.tool_group_id.clone())),
        allow_unmatched_view: defined
            .and_then(|o| o.allow_unmatched_view)
            .or_else(|| fallback.and_then(|o| o.allow_unmatched_view))
            .unwrap_or(false),
        sync_groups: defined
            .filter(|o| !o.sync_groups.is_empty())
            .map(|o| o.sync_groups.clone())
            .or_else(|| fallback.map(|o| o.sync_groups.clone()))
            .unwrap_or_default(),
    }
}
