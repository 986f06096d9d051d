//! Open-viewport bookkeeping.
//!
//! Mirrors the grid assignment into runtime state: which slot shows which
//! display sets, under which options. The assigner's output is the sole
//! authority; this module only records and updates it.

use vgrid_model::{DisplaySetUid, FrameOfReferenceUid, SyncGroup, ViewportId, ViewportType};
use vgrid_protocol::ResolvedViewportOptions;

/// Runtime record of one open viewport slot.
#[derive(Debug, Clone)]
pub struct OpenViewport {
    pub id: ViewportId,
    pub slot: usize,
    pub display_sets: Vec<DisplaySetUid>,
    /// Frame of reference of the content, used for sync membership.
    pub frame_of_reference: Option<FrameOfReferenceUid>,
    pub viewport_type: ViewportType,
    pub tool_group_id: Option<String>,
    pub sync_groups: Vec<SyncGroup>,
}

impl OpenViewport {
    pub fn from_options(
        id: ViewportId,
        slot: usize,
        options: &ResolvedViewportOptions,
    ) -> Self {
        Self {
            id,
            slot,
            display_sets: Vec::new(),
            frame_of_reference: None,
            viewport_type: options.viewport_type,
            tool_group_id: options.tool_group_id.clone(),
            sync_groups: options.sync_groups.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_sets.is_empty()
    }

    pub fn shows(&self, display_set: &DisplaySetUid) -> bool {
        self.display_sets.contains(display_set)
    }
}

/// Ordered set of currently open viewports.
#[derive(Debug, Default)]
pub struct ViewportGridState {
    viewports: Vec<OpenViewport>,
}

impl ViewportGridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, viewports: Vec<OpenViewport>) {
        self.viewports = viewports;
    }

    pub fn viewports(&self) -> &[OpenViewport] {
        &self.viewports
    }

    pub fn get(&self, id: &ViewportId) -> Option<&OpenViewport> {
        self.viewports.iter().find(|v| &v.id == id)
    }

    pub fn get_mut(&mut self, id: &ViewportId) -> Option<&mut OpenViewport> {
        self.viewports.iter_mut().find(|v| &v.id == id)
    }

    /// Viewports currently showing a display set.
    pub fn showing(&self, display_set: &DisplaySetUid) -> Vec<&OpenViewport> {
        self.viewports
            .iter()
            .filter(|v| v.shows(display_set))
            .collect()
    }

    pub fn clear(&mut self) {
        self.viewports.clear();
    }
}
