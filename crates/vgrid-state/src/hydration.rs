//! Segmentation hydration state machine.
//!
//! Drives each overlay through `Unloaded -> Loading -> Loaded -> Hydrated`
//! with guarded transitions, and expresses every side effect as an explicit
//! [`HydrationEffect`] for the session to interpret. That keeps transitions
//! testable in isolation: feed a registry, call a transition, assert the
//! status and the effect list.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use vgrid_model::{
    DisplaySet, DisplaySetUid, Segmentation, SegmentationId, SegmentationStatus, ViewportId,
};

use crate::error::{Result, StateError};
use crate::presentation::RepresentationType;
use crate::segmentations::{LoadProgress, SegmentationRegistry};

/// Whether a loaded overlay hydrates on its own or waits for the user.
///
/// The choice is injected configuration, not inferred behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPolicy {
    #[default]
    Automatic,
    RequireConfirmation,
}

/// A side effect requested by a state transition. The session interprets
/// these against the stores, the sync coordinator and the rendering
/// collaborator, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HydrationEffect {
    /// Ask the loading collaborator to decode the overlay's binary data.
    RequestLoad { display_set: DisplaySetUid },
    /// Surface a user-visible error notification.
    NotifyError { message: String },
    /// Ask the user to confirm hydration.
    PromptHydration { segmentation: SegmentationId },
    /// Capture current presentation for every open viewport.
    StorePresentations,
    /// Record the representation the base display set should carry.
    UpdateStoredSegmentationPresentation {
        base: DisplaySetUid,
        segmentation: SegmentationId,
        representation: RepresentationType,
    },
    /// Record where the camera should land when the base display set
    /// returns to the viewport.
    UpdateStoredPositionPresentation {
        viewport: ViewportId,
        display_set: DisplaySetUid,
    },
    /// Place display sets into a viewport slot.
    SetViewportDisplaySets {
        viewport: ViewportId,
        display_sets: Vec<DisplaySetUid>,
    },
    /// Propagate the hydrated representation through the same-FOR sync
    /// group.
    NotifySyncGroup {
        source: ViewportId,
        segmentation: SegmentationId,
        representation: RepresentationType,
    },
    /// Re-center the camera on a segment's centroid.
    JumpToSegmentCenter {
        segmentation: SegmentationId,
        segment_index: u8,
        viewport: ViewportId,
    },
    /// Tear down the segmentation's representations in every viewport.
    RemoveRepresentations { segmentation: SegmentationId },
    /// Empty the viewport that housed the overlay.
    ClearViewport { viewport: ViewportId },
}

/// Per-overlay bookkeeping while it is open in a viewport.
#[derive(Debug, Clone)]
struct OverlayBinding {
    segmentation: SegmentationId,
    /// The base image display set the overlay references.
    base: Option<DisplaySetUid>,
    viewport: ViewportId,
    selected_segment: u8,
}

#[derive(Debug, Default)]
pub struct HydrationController {
    policy: HydrationPolicy,
    /// Keyed by the overlay's display set uid.
    bindings: BTreeMap<DisplaySetUid, OverlayBinding>,
    /// Segmentations parked in `Loaded` awaiting a user decision.
    pending: BTreeSet<SegmentationId>,
}

impl HydrationController {
    pub fn new(policy: HydrationPolicy) -> Self {
        Self {
            policy,
            bindings: BTreeMap::new(),
            pending: BTreeSet::new(),
        }
    }

    pub fn policy(&self) -> HydrationPolicy {
        self.policy
    }

    pub fn selected_segment(&self, display_set: &DisplaySetUid) -> Option<u8> {
        self.bindings
            .get(display_set)
            .map(|binding| binding.selected_segment)
    }

    pub fn is_pending(&self, segmentation: &SegmentationId) -> bool {
        self.pending.contains(segmentation)
    }

    /// An overlay display set was opened in a viewport.
    ///
    /// Registers the segmentation (`Unloaded`) and requests a decode. An
    /// overlay already decoded re-enters the hydration decision instead of
    /// reloading.
    pub fn open_overlay(
        &mut self,
        registry: &mut SegmentationRegistry,
        overlay: &DisplaySet,
        viewport: ViewportId,
    ) -> Vec<HydrationEffect> {
        let segmentation_id = segmentation_id_for(&overlay.uid);
        registry.register(Segmentation::new(
            segmentation_id.clone(),
            overlay.uid.clone(),
        ));
        self.bindings.insert(
            overlay.uid.clone(),
            OverlayBinding {
                segmentation: segmentation_id.clone(),
                base: overlay.referenced_display_set.clone(),
                viewport,
                selected_segment: 1,
            },
        );

        match registry.status(&segmentation_id) {
            Some(SegmentationStatus::Unloaded) => {
                registry
                    .set_status(&segmentation_id, SegmentationStatus::Loading)
                    .expect("entry registered above");
                debug!(display_set = %overlay.uid, "segmentation load requested");
                vec![HydrationEffect::RequestLoad {
                    display_set: overlay.uid.clone(),
                }]
            }
            Some(SegmentationStatus::Loaded) => self.ready(registry, &overlay.uid),
            _ => Vec::new(),
        }
    }

    /// Decode completed. Out-of-order duplicates are no-ops.
    pub fn on_loading_complete(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
    ) -> Vec<HydrationEffect> {
        let Some(binding) = self.bindings.get(display_set) else {
            return Vec::new();
        };
        match registry.status(&binding.segmentation) {
            Some(SegmentationStatus::Loading) => {
                let segmentation = binding.segmentation.clone();
                registry
                    .set_status(&segmentation, SegmentationStatus::Loaded)
                    .expect("status read above");
                debug!(display_set = %display_set, "segmentation loaded");
                self.ready(registry, display_set)
            }
            _ => Vec::new(),
        }
    }

    /// Decode progress for UI feedback; never gates correctness.
    pub fn on_progress(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
        progress: LoadProgress,
    ) {
        if let Some(binding) = self.bindings.get(display_set) {
            let _ = registry.set_progress(&binding.segmentation, progress);
        }
    }

    /// Decode failed: terminal `Unloaded`, user notified, no automatic
    /// retry.
    pub fn on_loading_failed(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
        message: &str,
    ) -> Vec<HydrationEffect> {
        let Some(binding) = self.bindings.get(display_set) else {
            return Vec::new();
        };
        if registry.status(&binding.segmentation) != Some(SegmentationStatus::Loading) {
            return Vec::new();
        }
        registry
            .set_status(&binding.segmentation, SegmentationStatus::Unloaded)
            .expect("status read above");
        warn!(display_set = %display_set, "segmentation decode failed");
        vec![HydrationEffect::NotifyError {
            message: format!("Failed to decode segmentation for {display_set}: {message}"),
        }]
    }

    /// Resolve a pending hydration prompt. Declining leaves the overlay
    /// `Loaded`; the viewer keeps showing the segmentation-only view.
    pub fn confirm_hydration(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
        accepted: bool,
    ) -> Result<Vec<HydrationEffect>> {
        let binding = self
            .bindings
            .get(display_set)
            .ok_or_else(|| StateError::NoSegmentationForDisplaySet(display_set.clone()))?;
        let segmentation = binding.segmentation.clone();
        if !self.pending.remove(&segmentation) {
            return Err(StateError::NoPendingPrompt(segmentation));
        }
        if !accepted {
            debug!(display_set = %display_set, "hydration declined");
            return Ok(Vec::new());
        }
        self.hydrate(registry, display_set)
    }

    /// Promote a loaded overlay to hydrated. Also the manual path when the
    /// user clicks the viewport status button.
    pub fn hydrate(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
    ) -> Result<Vec<HydrationEffect>> {
        let binding = self
            .bindings
            .get(display_set)
            .ok_or_else(|| StateError::NoSegmentationForDisplaySet(display_set.clone()))?;
        let segmentation = binding.segmentation.clone();
        let status = registry
            .status(&segmentation)
            .ok_or_else(|| StateError::UnknownSegmentation(segmentation.clone()))?;
        if !status.can_hydrate() {
            return Err(StateError::NotHydratable(segmentation));
        }
        registry
            .set_status(&segmentation, SegmentationStatus::Hydrated)
            .expect("status read above");
        debug!(display_set = %display_set, "segmentation hydrated");
        Ok(self.hydration_effects(display_set))
    }

    /// Navigate between segments, wrapping past the ends. Index 0 is the
    /// background and never produced.
    pub fn segment_change(
        &mut self,
        registry: &SegmentationRegistry,
        display_set: &DisplaySetUid,
        direction: i32,
    ) -> Result<(u8, Vec<HydrationEffect>)> {
        let binding = self
            .bindings
            .get_mut(display_set)
            .ok_or_else(|| StateError::NoSegmentationForDisplaySet(display_set.clone()))?;
        let entry = registry
            .get(&binding.segmentation)
            .ok_or_else(|| StateError::UnknownSegmentation(binding.segmentation.clone()))?;
        let last = entry
            .segmentation
            .max_index()
            .ok_or_else(|| StateError::NoSegments(binding.segmentation.clone()))?;

        let mut next = i32::from(binding.selected_segment) + direction;
        if next > i32::from(last) {
            next = 1;
        } else if next < 1 {
            next = i32::from(last);
        }
        let next = next as u8;
        binding.selected_segment = next;

        Ok((
            next,
            vec![HydrationEffect::JumpToSegmentCenter {
                segmentation: binding.segmentation.clone(),
                segment_index: next,
                viewport: binding.viewport.clone(),
            }],
        ))
    }

    /// Display sets left the session. Tears down any overlay whose own
    /// display set or referenced base was removed.
    pub fn on_display_sets_removed(
        &mut self,
        registry: &mut SegmentationRegistry,
        removed: &[DisplaySetUid],
    ) -> Vec<HydrationEffect> {
        let affected: Vec<DisplaySetUid> = self
            .bindings
            .iter()
            .filter(|(overlay_uid, binding)| {
                removed.contains(overlay_uid)
                    || binding
                        .base
                        .as_ref()
                        .is_some_and(|base| removed.contains(base))
            })
            .map(|(overlay_uid, _)| overlay_uid.clone())
            .collect();

        let mut effects = Vec::new();
        for overlay_uid in affected {
            let binding = self
                .bindings
                .remove(&overlay_uid)
                .expect("collected from bindings above");
            self.pending.remove(&binding.segmentation);
            registry.remove(&binding.segmentation);
            effects.push(HydrationEffect::RemoveRepresentations {
                segmentation: binding.segmentation,
            });
            effects.push(HydrationEffect::ClearViewport {
                viewport: binding.viewport,
            });
        }
        effects
    }

    /// Forget all bindings and pending prompts. Session teardown.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.pending.clear();
    }

    /// A decoded overlay is ready: hydrate or prompt, per policy.
    fn ready(
        &mut self,
        registry: &mut SegmentationRegistry,
        display_set: &DisplaySetUid,
    ) -> Vec<HydrationEffect> {
        let binding = &self.bindings[display_set];
        match self.policy {
            HydrationPolicy::Automatic => {
                let segmentation = binding.segmentation.clone();
                registry
                    .set_status(&segmentation, SegmentationStatus::Hydrated)
                    .expect("entry exists for bound overlay");
                self.hydration_effects(display_set)
            }
            HydrationPolicy::RequireConfirmation => {
                let segmentation = binding.segmentation.clone();
                self.pending.insert(segmentation.clone());
                vec![HydrationEffect::PromptHydration { segmentation }]
            }
        }
    }

    /// The ordered side effects of hydration: store current presentations,
    /// record the representation and camera for the base display set, put
    /// the base back into the originating viewport, then notify the
    /// same-FOR sync group.
    fn hydration_effects(&self, display_set: &DisplaySetUid) -> Vec<HydrationEffect> {
        let binding = &self.bindings[display_set];
        let mut effects = vec![HydrationEffect::StorePresentations];
        if let Some(base) = &binding.base {
            effects.push(HydrationEffect::UpdateStoredSegmentationPresentation {
                base: base.clone(),
                segmentation: binding.segmentation.clone(),
                representation: RepresentationType::Labelmap,
            });
            effects.push(HydrationEffect::UpdateStoredPositionPresentation {
                viewport: binding.viewport.clone(),
                display_set: base.clone(),
            });
            effects.push(HydrationEffect::SetViewportDisplaySets {
                viewport: binding.viewport.clone(),
                display_sets: vec![base.clone()],
            });
        }
        effects.push(HydrationEffect::NotifySyncGroup {
            source: binding.viewport.clone(),
            segmentation: binding.segmentation.clone(),
            representation: RepresentationType::Labelmap,
        });
        effects
    }
}

/// Segmentations share identity with their display set.
pub fn segmentation_id_for(display_set: &DisplaySetUid) -> SegmentationId {
    SegmentationId::new(display_set.as_str()).expect("display set uid is non-empty")
}
