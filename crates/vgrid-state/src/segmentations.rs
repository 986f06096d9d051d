//! Runtime segmentation registry.
//!
//! Tracks every known segmentation with its lifecycle status and decode
//! progress, and owns segment-level metadata edits (visibility, lock,
//! label, color). Mutation goes through the narrow operations here; the
//! session emits `SegmentationModified` events around them.

use std::collections::BTreeMap;

use vgrid_model::{DisplaySetUid, Segmentation, SegmentationId, SegmentationStatus};

use crate::error::{Result, StateError};

/// Decode progress as reported by the loading collaborator. UI feedback
/// only; never gates correctness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    pub percent_complete: f64,
    pub num_segments: usize,
}

#[derive(Debug, Clone)]
pub struct SegmentationEntry {
    pub segmentation: Segmentation,
    pub status: SegmentationStatus,
    pub progress: Option<LoadProgress>,
}

#[derive(Debug, Default)]
pub struct SegmentationRegistry {
    entries: BTreeMap<SegmentationId, SegmentationEntry>,
}

impl SegmentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a segmentation in the `Unloaded` state. Re-registering an
    /// existing id keeps the current entry.
    pub fn register(&mut self, segmentation: Segmentation) {
        self.entries
            .entry(segmentation.id.clone())
            .or_insert(SegmentationEntry {
                segmentation,
                status: SegmentationStatus::Unloaded,
                progress: None,
            });
    }

    pub fn get(&self, id: &SegmentationId) -> Option<&SegmentationEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &SegmentationId) -> Option<&mut SegmentationEntry> {
        self.entries.get_mut(id)
    }

    pub fn by_display_set(&self, display_set: &DisplaySetUid) -> Option<&SegmentationEntry> {
        self.entries
            .values()
            .find(|entry| &entry.segmentation.display_set == display_set)
    }

    pub fn id_for_display_set(&self, display_set: &DisplaySetUid) -> Option<SegmentationId> {
        self.by_display_set(display_set)
            .map(|entry| entry.segmentation.id.clone())
    }

    pub fn status(&self, id: &SegmentationId) -> Option<SegmentationStatus> {
        self.entries.get(id).map(|entry| entry.status)
    }

    pub fn set_status(&mut self, id: &SegmentationId, status: SegmentationStatus) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownSegmentation(id.clone()))?;
        entry.status = status;
        Ok(())
    }

    pub fn set_progress(&mut self, id: &SegmentationId, progress: LoadProgress) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownSegmentation(id.clone()))?;
        entry.progress = Some(progress);
        Ok(())
    }

    pub fn set_segment_visibility(
        &mut self,
        id: &SegmentationId,
        index: u8,
        visible: bool,
    ) -> Result<()> {
        self.with_segment(id, index, |segment| segment.visible = visible)
    }

    pub fn set_segment_locked(
        &mut self,
        id: &SegmentationId,
        index: u8,
        locked: bool,
    ) -> Result<()> {
        self.with_segment(id, index, |segment| segment.locked = locked)
    }

    pub fn set_segment_label(
        &mut self,
        id: &SegmentationId,
        index: u8,
        label: String,
    ) -> Result<()> {
        self.with_segment(id, index, |segment| segment.label = label)
    }

    pub fn set_segment_color(
        &mut self,
        id: &SegmentationId,
        index: u8,
        color: [u8; 4],
    ) -> Result<()> {
        self.with_segment(id, index, |segment| segment.color = color)
    }

    fn with_segment(
        &mut self,
        id: &SegmentationId,
        index: u8,
        edit: impl FnOnce(&mut vgrid_model::Segment),
    ) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownSegmentation(id.clone()))?;
        let segment = entry
            .segmentation
            .segment_mut(index)
            .ok_or_else(|| StateError::NoSegments(id.clone()))?;
        edit(segment);
        Ok(())
    }

    pub fn remove(&mut self, id: &SegmentationId) -> Option<SegmentationEntry> {
        self.entries.remove(id)
    }

    /// Session teardown: drop every entry, returning the removed ids so the
    /// session can emit removal events.
    pub fn remove_all(&mut self) -> Vec<SegmentationId> {
        let ids: Vec<SegmentationId> = self.entries.keys().cloned().collect();
        self.entries.clear();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
