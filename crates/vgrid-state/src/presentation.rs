//! Per-content presentation state.
//!
//! Three independently keyed stores: camera/position, LUT (window level),
//! and segmentation representation. Keys derive from stable content
//! identity, not from the transient slot index, so state survives layout
//! changes. Entries are never created implicitly on read; absence means
//! "use defaults". `clear` is the only bulk mutation and runs on session
//! teardown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vgrid_model::{DisplaySetUid, SegmentationId, ViewportType};

/// Stable identity for a presentation entry: the content plus the kind of
/// viewport showing it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresentationKey {
    pub display_set: DisplaySetUid,
    pub viewport_type: ViewportType,
}

impl PresentationKey {
    pub fn new(display_set: DisplaySetUid, viewport_type: ViewportType) -> Self {
        Self {
            display_set,
            viewport_type,
        }
    }
}

/// Cached camera state for a viewport's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPresentation {
    pub pan: (f64, f64),
    pub zoom: f64,
    /// Image the camera was parked on, used to restore scroll position.
    #[serde(default)]
    pub view_reference: Option<String>,
}

/// Cached window-level state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LutPresentation {
    pub window_width: f64,
    pub window_center: f64,
    pub invert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationType {
    #[default]
    Labelmap,
    Contour,
}

/// Cached segmentation representation for a base display set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationPresentation {
    pub segmentation: SegmentationId,
    pub representation: RepresentationType,
}

/// Explicit, dependency-injected presentation container. Constructed at
/// session start and handed to whoever needs it; never an ambient global.
#[derive(Debug, Default)]
pub struct PresentationStore {
    position: BTreeMap<PresentationKey, PositionPresentation>,
    lut: BTreeMap<PresentationKey, LutPresentation>,
    segmentation: BTreeMap<PresentationKey, SegmentationPresentation>,
}

impl PresentationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, key: &PresentationKey) -> Option<&PositionPresentation> {
        self.position.get(key)
    }

    pub fn set_position(&mut self, key: PresentationKey, state: PositionPresentation) {
        self.position.insert(key, state);
    }

    pub fn lut(&self, key: &PresentationKey) -> Option<&LutPresentation> {
        self.lut.get(key)
    }

    pub fn set_lut(&mut self, key: PresentationKey, state: LutPresentation) {
        self.lut.insert(key, state);
    }

    pub fn segmentation(&self, key: &PresentationKey) -> Option<&SegmentationPresentation> {
        self.segmentation.get(key)
    }

    pub fn set_segmentation(&mut self, key: PresentationKey, state: SegmentationPresentation) {
        self.segmentation.insert(key, state);
    }

    /// Wipe all three stores. Session/mode teardown only.
    pub fn clear(&mut self) {
        self.position.clear();
        self.lut.clear();
        self.segmentation.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty() && self.lut.is_empty() && self.segmentation.is_empty()
    }
}
