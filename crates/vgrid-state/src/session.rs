//! Viewer session: the composition root.
//!
//! Owns the grid state, the presentation store, the sync coordinator, the
//! segmentation registry, the event bus and the hydration controller, and
//! wires them to the external imaging engine through the
//! [`RenderingCollaborator`] seam. All state mutation flows through the
//! narrow operations here; no component reaches into another's maps.

use tracing::{debug, info, warn};

use vgrid_model::{
    DisplaySet, DisplaySetUid, Segmentation, SegmentationId, ViewportId, ViewportType,
};
use vgrid_protocol::GridAssignment;

use crate::error::{Result, StateError};
use crate::events::{EventBus, EventSubscription, ViewerEvent};
use crate::grid::{OpenViewport, ViewportGridState};
use crate::hydration::{HydrationController, HydrationEffect, HydrationPolicy};
use crate::presentation::{
    LutPresentation, PositionPresentation, PresentationKey, PresentationStore, RepresentationType,
    SegmentationPresentation,
};
use crate::segmentations::{LoadProgress, SegmentationRegistry};
use crate::sync::{SyncChange, SyncGroupCoordinator};

/// Interface boundary to the external imaging/rendering engine.
///
/// The core never blocks on these: long-running work is requested here and
/// reported back as [`ViewerEvent`]s.
pub trait RenderingCollaborator {
    /// Kick off binary decode of an overlay display set.
    fn request_segmentation_load(&mut self, display_set: &DisplaySetUid);
    /// Fetch the decoded segment map once loading completed.
    fn fetch_segmentation(&mut self, display_set: &DisplaySetUid) -> Option<Segmentation>;
    /// Resolve a display set by identifier.
    fn resolve_display_set(&self, uid: &DisplaySetUid) -> Option<DisplaySet>;
    /// Current camera state of a viewport, if it is rendering.
    fn position_of(&self, viewport: &ViewportId) -> Option<PositionPresentation>;
    /// Current window-level state of a viewport, if it is rendering.
    fn lut_of(&self, viewport: &ViewportId) -> Option<LutPresentation>;
    /// Apply a synced camera state to a viewport.
    fn apply_position(&mut self, viewport: &ViewportId, presentation: &PositionPresentation);
    /// Replace the content of a viewport.
    fn set_viewport_display_sets(&mut self, viewport: &ViewportId, display_sets: &[DisplaySetUid]);
    fn add_segmentation_representation(
        &mut self,
        viewport: &ViewportId,
        segmentation: &SegmentationId,
        representation: RepresentationType,
    );
    fn remove_segmentation_representations(&mut self, viewport: &ViewportId);
    /// Re-center the camera on a segment's centroid.
    fn jump_to_segment_center(
        &mut self,
        segmentation: &SegmentationId,
        segment_index: u8,
        viewport: &ViewportId,
    );
    /// Surface a user-visible error notification.
    fn notify_error(&mut self, message: &str);
    /// Ask the user to confirm hydration. Fire-and-forget: the answer comes
    /// back through [`ViewerSession::confirm_hydration`].
    fn prompt_hydration(&mut self, segmentation: &SegmentationId);
}

pub struct ViewerSession<C: RenderingCollaborator> {
    collaborator: C,
    grid: ViewportGridState,
    presentation: PresentationStore,
    sync: SyncGroupCoordinator,
    segmentations: SegmentationRegistry,
    hydration: HydrationController,
    bus: EventBus,
    /// Per-overlay topic subscriptions, torn down with their display set.
    overlay_subscriptions: Vec<(DisplaySetUid, EventSubscription)>,
}

impl<C: RenderingCollaborator> ViewerSession<C> {
    pub fn new(collaborator: C, policy: HydrationPolicy) -> Self {
        Self {
            collaborator,
            grid: ViewportGridState::new(),
            presentation: PresentationStore::new(),
            sync: SyncGroupCoordinator::new(),
            segmentations: SegmentationRegistry::new(),
            hydration: HydrationController::new(policy),
            bus: EventBus::new(),
            overlay_subscriptions: Vec::new(),
        }
    }

    pub fn grid(&self) -> &ViewportGridState {
        &self.grid
    }

    pub fn presentation(&self) -> &PresentationStore {
        &self.presentation
    }

    pub fn segmentations(&self) -> &SegmentationRegistry {
        &self.segmentations
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    pub fn collaborator_mut(&mut self) -> &mut C {
        &mut self.collaborator
    }

    /// Bind the grid to an assignment produced by the protocol engine.
    ///
    /// The assignment is the sole authority on slot content. A viewport
    /// whose invariants fail (e.g. a single-overlay surface handed several
    /// display sets) renders nothing; its siblings are unaffected.
    pub fn apply_assignment(&mut self, assignment: &GridAssignment) -> Vec<StateError> {
        info!(
            stage = %assignment.stage_id,
            rows = assignment.rows,
            columns = assignment.columns,
            "applying grid assignment"
        );
        let mut failures = Vec::new();
        let mut open = Vec::with_capacity(assignment.viewports.len());
        for bound in &assignment.viewports {
            let mut viewport =
                OpenViewport::from_options(bound.viewport_id.clone(), bound.slot, &bound.options);
            match self.bind_content(&mut viewport, &bound.display_sets) {
                Ok(()) => {}
                Err(error) => {
                    warn!(viewport = %viewport.id, %error, "viewport construction failed");
                    viewport.display_sets.clear();
                    viewport.frame_of_reference = None;
                    failures.push(error);
                }
            }
            self.collaborator
                .set_viewport_display_sets(&viewport.id, &viewport.display_sets);
            open.push(viewport);
        }
        self.grid.replace_all(open);

        // Overlays come online after the grid exists, so their hydration
        // effects can see the final slot layout.
        let overlay_slots: Vec<(ViewportId, DisplaySetUid)> = self
            .grid
            .viewports()
            .iter()
            .filter(|v| v.viewport_type == ViewportType::Segmentation)
            .filter_map(|v| {
                v.display_sets
                    .first()
                    .map(|uid| (v.id.clone(), uid.clone()))
            })
            .collect();
        for (viewport_id, overlay_uid) in overlay_slots {
            self.open_overlay(&overlay_uid, viewport_id);
        }
        failures
    }

    fn bind_content(
        &mut self,
        viewport: &mut OpenViewport,
        display_sets: &[DisplaySetUid],
    ) -> Result<()> {
        if viewport.viewport_type == ViewportType::Segmentation && display_sets.len() > 1 {
            return Err(StateError::InvariantViolation {
                viewport: viewport.id.clone(),
                message: format!(
                    "single-overlay surface given {} display sets",
                    display_sets.len()
                ),
            });
        }
        viewport.display_sets = display_sets.to_vec();
        viewport.frame_of_reference = display_sets.first().and_then(|uid| {
            self.collaborator
                .resolve_display_set(uid)
                .and_then(|ds| ds.frame_of_reference)
        });
        Ok(())
    }

    /// Open an overlay display set in a viewport: subscribe to its events
    /// and start the hydration lifecycle.
    fn open_overlay(&mut self, overlay_uid: &DisplaySetUid, viewport: ViewportId) {
        let Some(overlay) = self.collaborator.resolve_display_set(overlay_uid) else {
            warn!(display_set = %overlay_uid, "overlay display set did not resolve");
            return;
        };
        let subscription = self.bus.subscribe(Some(overlay_uid.clone()));
        self.overlay_subscriptions
            .push((overlay_uid.clone(), subscription));
        let effects = self
            .hydration
            .open_overlay(&mut self.segmentations, &overlay, viewport);
        self.apply_effects(effects);
    }

    /// Deliver a collaborator event into the session.
    ///
    /// Publishes to the bus, then pumps overlay subscriptions so the
    /// hydration controller only ever sees events for overlays that are
    /// still open.
    pub fn dispatch(&mut self, event: ViewerEvent) {
        self.bus.publish(&event);
        if let ViewerEvent::DisplaySetsRemoved { display_sets } = &event {
            self.handle_display_sets_removed(&display_sets.clone());
        }
        self.pump();
    }

    fn pump(&mut self) {
        loop {
            let mut batch = Vec::new();
            for (uid, subscription) in &self.overlay_subscriptions {
                for event in subscription.drain() {
                    batch.push((uid.clone(), event));
                }
            }
            if batch.is_empty() {
                break;
            }
            for (uid, event) in batch {
                self.route_overlay_event(&uid, event);
            }
        }
    }

    fn route_overlay_event(&mut self, overlay_uid: &DisplaySetUid, event: ViewerEvent) {
        match event {
            ViewerEvent::SegmentationLoadingComplete { .. } => {
                // Pull the decoded segment map before the status flips.
                if let Some(fetched) = self.collaborator.fetch_segmentation(overlay_uid) {
                    if let Some(entry) = self
                        .segmentations
                        .id_for_display_set(overlay_uid)
                        .and_then(|id| self.segmentations.get_mut(&id))
                    {
                        entry.segmentation = fetched;
                    }
                }
                let effects = self
                    .hydration
                    .on_loading_complete(&mut self.segmentations, overlay_uid);
                self.apply_effects(effects);
            }
            ViewerEvent::SegmentLoadingComplete {
                percent_complete,
                num_segments,
                ..
            } => {
                self.hydration.on_progress(
                    &mut self.segmentations,
                    overlay_uid,
                    LoadProgress {
                        percent_complete,
                        num_segments,
                    },
                );
            }
            ViewerEvent::SegmentationLoadingFailed { message, .. } => {
                let effects = self.hydration.on_loading_failed(
                    &mut self.segmentations,
                    overlay_uid,
                    &message,
                );
                self.apply_effects(effects);
            }
            _ => {}
        }
    }

    fn handle_display_sets_removed(&mut self, removed: &[DisplaySetUid]) {
        // Unsubscribe first: no event may fire against a torn-down overlay.
        self.overlay_subscriptions
            .retain(|(uid, _)| !removed.contains(uid));
        for uid in removed {
            self.bus.remove_topic(uid);
        }
        let effects = self
            .hydration
            .on_display_sets_removed(&mut self.segmentations, removed);
        self.apply_effects(effects);

        // Drop removed content from any slot still referencing it.
        let affected: Vec<ViewportId> = self
            .grid
            .viewports()
            .iter()
            .filter(|v| v.display_sets.iter().any(|uid| removed.contains(uid)))
            .map(|v| v.id.clone())
            .collect();
        for viewport in affected {
            self.set_display_sets_for_viewport(&viewport, Vec::new());
        }
    }

    /// Resolve a pending hydration prompt.
    pub fn confirm_hydration(
        &mut self,
        display_set: &DisplaySetUid,
        accepted: bool,
    ) -> Result<()> {
        let effects =
            self.hydration
                .confirm_hydration(&mut self.segmentations, display_set, accepted)?;
        self.apply_effects(effects);
        Ok(())
    }

    /// Manual hydrate (viewport status button).
    pub fn hydrate(&mut self, display_set: &DisplaySetUid) -> Result<()> {
        let effects = self.hydration.hydrate(&mut self.segmentations, display_set)?;
        self.apply_effects(effects);
        Ok(())
    }

    /// Navigate between segments of an open overlay.
    pub fn segment_change(&mut self, display_set: &DisplaySetUid, direction: i32) -> Result<u8> {
        let (index, effects) =
            self.hydration
                .segment_change(&self.segmentations, display_set, direction)?;
        self.apply_effects(effects);
        Ok(index)
    }

    /// Replace a viewport's content. The sole mutation path for slot
    /// content outside of a full re-assignment.
    pub fn set_display_sets_for_viewport(
        &mut self,
        viewport: &ViewportId,
        display_sets: Vec<DisplaySetUid>,
    ) {
        let frame_of_reference = display_sets.first().and_then(|uid| {
            self.collaborator
                .resolve_display_set(uid)
                .and_then(|ds| ds.frame_of_reference)
        });
        let Some(open) = self.grid.get_mut(viewport) else {
            warn!(viewport = %viewport, "set_display_sets_for_viewport on unknown viewport");
            return;
        };
        open.display_sets = display_sets.clone();
        open.frame_of_reference = frame_of_reference;
        self.collaborator
            .set_viewport_display_sets(viewport, &display_sets);
    }

    /// A source viewport's camera changed: persist it and push it through
    /// its position sync groups. Synced targets receive the state directly;
    /// their updates do not re-propagate.
    pub fn on_camera_changed(&mut self, viewport: &ViewportId) {
        let Some(position) = self.collaborator.position_of(viewport) else {
            return;
        };
        self.store_viewport_presentation(viewport);
        let applications =
            self.sync
                .propagate(&self.grid, viewport, &SyncChange::Position(position));
        for application in applications {
            if let SyncChange::Position(state) = &application.change {
                self.collaborator
                    .apply_position(&application.target, state);
            }
        }
    }

    /// Capture the current presentation of every open viewport into the
    /// store, keyed by content identity.
    pub fn store_presentations(&mut self) {
        let ids: Vec<ViewportId> = self
            .grid
            .viewports()
            .iter()
            .map(|v| v.id.clone())
            .collect();
        for id in ids {
            self.store_viewport_presentation(&id);
        }
    }

    fn store_viewport_presentation(&mut self, viewport: &ViewportId) {
        let Some(open) = self.grid.get(viewport) else {
            return;
        };
        let Some(display_set) = open.display_sets.first().cloned() else {
            return;
        };
        let key = PresentationKey::new(display_set, open.viewport_type);
        if let Some(position) = self.collaborator.position_of(viewport) {
            self.presentation.set_position(key.clone(), position);
        }
        if let Some(lut) = self.collaborator.lut_of(viewport) {
            self.presentation.set_lut(key, lut);
        }
    }

    fn apply_effects(&mut self, effects: Vec<HydrationEffect>) {
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: HydrationEffect) {
        match effect {
            HydrationEffect::RequestLoad { display_set } => {
                self.collaborator.request_segmentation_load(&display_set);
            }
            HydrationEffect::NotifyError { message } => {
                self.collaborator.notify_error(&message);
            }
            HydrationEffect::PromptHydration { segmentation } => {
                self.collaborator.prompt_hydration(&segmentation);
            }
            HydrationEffect::StorePresentations => {
                self.store_presentations();
            }
            HydrationEffect::UpdateStoredSegmentationPresentation {
                base,
                segmentation,
                representation,
            } => {
                let key = PresentationKey::new(base, ViewportType::Stack);
                self.presentation.set_segmentation(
                    key,
                    SegmentationPresentation {
                        segmentation,
                        representation,
                    },
                );
            }
            HydrationEffect::UpdateStoredPositionPresentation {
                viewport,
                display_set,
            } => {
                // The overlay viewport's camera becomes the stored position
                // for the base display set about to replace it.
                if let Some(position) = self.collaborator.position_of(&viewport) {
                    let key = PresentationKey::new(display_set, ViewportType::Stack);
                    self.presentation.set_position(key, position);
                }
            }
            HydrationEffect::SetViewportDisplaySets {
                viewport,
                display_sets,
            } => {
                self.set_display_sets_for_viewport(&viewport, display_sets);
            }
            HydrationEffect::NotifySyncGroup {
                source,
                segmentation,
                representation,
            } => {
                let change = SyncChange::SegmentationHydrated {
                    segmentation: segmentation.clone(),
                    representation,
                };
                // The source viewport shows the hydrated overlay itself.
                self.collaborator.add_segmentation_representation(
                    &source,
                    &segmentation,
                    representation,
                );
                for application in self.sync.propagate(&self.grid, &source, &change) {
                    self.collaborator.add_segmentation_representation(
                        &application.target,
                        &segmentation,
                        representation,
                    );
                }
            }
            HydrationEffect::JumpToSegmentCenter {
                segmentation,
                segment_index,
                viewport,
            } => {
                self.collaborator
                    .jump_to_segment_center(&segmentation, segment_index, &viewport);
            }
            HydrationEffect::RemoveRepresentations { segmentation } => {
                let ids: Vec<ViewportId> = self
                    .grid
                    .viewports()
                    .iter()
                    .map(|v| v.id.clone())
                    .collect();
                for viewport in ids {
                    self.collaborator
                        .remove_segmentation_representations(&viewport);
                }
                self.bus
                    .publish(&ViewerEvent::SegmentationRemoved { segmentation });
            }
            HydrationEffect::ClearViewport { viewport } => {
                if self.grid.get(&viewport).is_some() {
                    self.set_display_sets_for_viewport(&viewport, Vec::new());
                }
            }
        }
    }

    /// Segment metadata edits; each emits `SegmentationModified`.
    pub fn set_segment_visibility(
        &mut self,
        segmentation: &SegmentationId,
        index: u8,
        visible: bool,
    ) -> Result<()> {
        self.segmentations
            .set_segment_visibility(segmentation, index, visible)?;
        self.bus.publish(&ViewerEvent::SegmentationModified {
            segmentation: segmentation.clone(),
        });
        Ok(())
    }

    pub fn set_segment_locked(
        &mut self,
        segmentation: &SegmentationId,
        index: u8,
        locked: bool,
    ) -> Result<()> {
        self.segmentations
            .set_segment_locked(segmentation, index, locked)?;
        self.bus.publish(&ViewerEvent::SegmentationModified {
            segmentation: segmentation.clone(),
        });
        Ok(())
    }

    pub fn set_segment_label(
        &mut self,
        segmentation: &SegmentationId,
        index: u8,
        label: String,
    ) -> Result<()> {
        self.segmentations
            .set_segment_label(segmentation, index, label)?;
        self.bus.publish(&ViewerEvent::SegmentationModified {
            segmentation: segmentation.clone(),
        });
        Ok(())
    }

    pub fn set_segment_color(
        &mut self,
        segmentation: &SegmentationId,
        index: u8,
        color: [u8; 4],
    ) -> Result<()> {
        self.segmentations
            .set_segment_color(segmentation, index, color)?;
        self.bus.publish(&ViewerEvent::SegmentationModified {
            segmentation: segmentation.clone(),
        });
        Ok(())
    }

    /// Session/mode teardown: wipe stores, drop subscriptions, forget
    /// segmentations. The well-defined lifecycle boundary for every bulk
    /// mutation.
    pub fn teardown(&mut self) {
        debug!("session teardown");
        for id in self.segmentations.remove_all() {
            self.bus
                .publish(&ViewerEvent::SegmentationRemoved { segmentation: id });
        }
        self.presentation.clear();
        self.hydration.clear();
        self.overlay_subscriptions.clear();
        self.bus.clear();
        self.grid.clear();
    }
}
