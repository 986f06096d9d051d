//! Segmentation overlays and their lifecycle states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{DisplaySetUid, SegmentationId};

/// Lifecycle of a segmentation overlay.
///
/// `Loaded` means the binary data is decoded; `Hydrated` means the overlay
/// is actively represented in at least one viewport and its segments are
/// selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentationStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Hydrated,
}

impl SegmentationStatus {
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded | Self::Hydrated)
    }

    pub fn can_hydrate(self) -> bool {
        self == Self::Loaded
    }
}

/// Metadata for a single labeled segment. Index 0 is reserved background
/// and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub index: u8,
    pub label: String,
    /// RGBA.
    pub color: [u8; 4],
    pub visible: bool,
    pub locked: bool,
}

impl Segment {
    pub fn new(index: u8, label: impl Into<String>) -> Result<Self, ModelError> {
        if index == 0 {
            return Err(ModelError::BackgroundSegmentIndex);
        }
        Ok(Self {
            index,
            label: label.into(),
            color: [255, 0, 0, 255],
            visible: true,
            locked: false,
        })
    }
}

/// A segmentation overlay: identity, owning display set, and the segment
/// map keyed by index (1..=N).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    pub id: SegmentationId,
    /// The overlay display set this segmentation belongs to.
    pub display_set: DisplaySetUid,
    pub segments: BTreeMap<u8, Segment>,
}

impl Segmentation {
    pub fn new(id: SegmentationId, display_set: DisplaySetUid) -> Self {
        Self {
            id,
            display_set,
            segments: BTreeMap::new(),
        }
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.insert(segment.index, segment);
    }

    pub fn segment(&self, index: u8) -> Option<&Segment> {
        self.segments.get(&index)
    }

    pub fn segment_mut(&mut self, index: u8) -> Option<&mut Segment> {
        self.segments.get_mut(&index)
    }

    /// Number of navigable segments (background excluded).
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Highest stored segment index, if any segments exist.
    pub fn max_index(&self) -> Option<u8> {
        self.segments.keys().next_back().copied()
    }
}
