//! Cross-viewport sync propagation.
//!
//! A sync group binds viewports by a shared key derived from a membership
//! predicate (currently `sameFOR`). On a qualifying change at a source
//! viewport the coordinator recomputes membership against the viewports
//! open right now, then emits one application per qualifying target,
//! excluding the origin. Applications are applied directly and never
//! re-propagated, so there are no broadcast loops.

use tracing::trace;

use vgrid_model::{SegmentationId, SyncGroupId, ViewportId, SYNC_RULE_SAME_FOR};

use crate::grid::{OpenViewport, ViewportGridState};
use crate::presentation::{PositionPresentation, RepresentationType};

/// State pushed through a sync group.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncChange {
    Position(PositionPresentation),
    SegmentationHydrated {
        segmentation: SegmentationId,
        representation: RepresentationType,
    },
}

impl SyncChange {
    /// The group kind this change travels on.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncChange::Position(_) => "position",
            SyncChange::SegmentationHydrated { .. } => "hydrateseg",
        }
    }
}

/// One push of changed state to one target viewport.
#[derive(Debug, Clone)]
pub struct SyncApplication {
    pub group: SyncGroupId,
    pub target: ViewportId,
    pub change: SyncChange,
}

/// Coordinates propagation across the grid's declared sync groups.
///
/// Holds no membership cache: display sets move between slots, so
/// membership is recomputed from the grid on every propagation.
#[derive(Debug, Default)]
pub struct SyncGroupCoordinator {}

impl SyncGroupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the applications for a change originating at `source`.
    ///
    /// The source viewport must declare a matching group with
    /// `source: true`; each other open viewport participates when it
    /// declares the same group id with `target: true` and satisfies every
    /// membership predicate the source's group names.
    pub fn propagate(
        &self,
        grid: &ViewportGridState,
        source: &ViewportId,
        change: &SyncChange,
    ) -> Vec<SyncApplication> {
        let Some(origin) = grid.get(source) else {
            return Vec::new();
        };

        let mut applications = Vec::new();
        for group in &origin.sync_groups {
            if group.kind != change.kind() || !group.source {
                continue;
            }
            for viewport in grid.viewports() {
                if &viewport.id == source {
                    continue;
                }
                let member = viewport
                    .sync_groups
                    .iter()
                    .any(|g| g.id == group.id && g.kind == group.kind && g.target);
                if !member {
                    continue;
                }
                if !membership_predicates_hold(&group.options.matching_rules, origin, viewport) {
                    continue;
                }
                trace!(group = %group.id, target = %viewport.id, "sync propagation");
                applications.push(SyncApplication {
                    group: group.id.clone(),
                    target: viewport.id.clone(),
                    change: change.clone(),
                });
            }
        }
        applications
    }
}

fn membership_predicates_hold(
    rules: &[String],
    origin: &OpenViewport,
    candidate: &OpenViewport,
) -> bool {
    rules.iter().all(|rule| match rule.as_str() {
        SYNC_RULE_SAME_FOR => {
            origin.frame_of_reference.is_some()
                && origin.frame_of_reference == candidate.frame_of_reference
        }
        // Unknown predicates exclude rather than err; protocol validation
        // flags them at authoring time.
        _ => false,
    })
}
