use thiserror::Error;

use vgrid_model::{DisplaySetUid, SegmentationId, ViewportId};

#[derive(Debug, Error)]
pub enum StateError {
    /// Fatal for the affected viewport's construction only; siblings keep
    /// rendering.
    #[error("viewport {viewport}: {message}")]
    InvariantViolation {
        viewport: ViewportId,
        message: String,
    },
    #[error("unknown viewport {0}")]
    UnknownViewport(ViewportId),
    #[error("unknown segmentation {0}")]
    UnknownSegmentation(SegmentationId),
    #[error("no segmentation loaded for display set {0}")]
    NoSegmentationForDisplaySet(DisplaySetUid),
    #[error("segmentation {0} is not in a hydratable state")]
    NotHydratable(SegmentationId),
    #[error("segmentation {0} has no pending hydration prompt")]
    NoPendingPrompt(SegmentationId),
    #[error("segmentation {0} has no segments to navigate")]
    NoSegments(SegmentationId),
}

pub type Result<T> = std::result::Result<T, StateError>;
