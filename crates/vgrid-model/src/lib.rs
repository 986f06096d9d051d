pub mod error;
pub mod ids;
pub mod protocol;
pub mod rules;
pub mod segmentation;
pub mod study;

pub use error::{ModelError, Result};
pub use ids::{
    DisplaySetUid, FrameOfReferenceUid, SegmentationId, SelectorId, StudyUid, SyncGroupId,
    ViewportId,
};
pub use protocol::{
    ActivationThreshold, DisplaySetRef, DisplaySetSelector, GridProperties, LayoutType, Protocol,
    Stage, StageActivation, SyncGroup, SyncGroupOptions, ViewportDefinition, ViewportOptions,
    ViewportStructure, ViewportType, SYNC_RULE_SAME_FOR, UNLIMITED_PRIORS,
};
pub use rules::{AttributeValue, Constraint, MatchingRule};
pub use segmentation::{Segment, Segmentation, SegmentationStatus};
pub use study::{DisplaySet, DisplaySetKind, Study};
