pub mod error;
pub mod events;
pub mod grid;
pub mod hydration;
pub mod presentation;
pub mod segmentations;
pub mod session;
pub mod sync;

pub use error::{Result, StateError};
pub use events::{EventBus, EventSubscription, ViewerEvent};
pub use grid::{OpenViewport, ViewportGridState};
pub use hydration::{
    segmentation_id_for, HydrationController, HydrationEffect, HydrationPolicy,
};
pub use presentation::{
    LutPresentation, PositionPresentation, PresentationKey, PresentationStore, RepresentationType,
    SegmentationPresentation,
};
pub use segmentations::{LoadProgress, SegmentationEntry, SegmentationRegistry};
pub use session::{RenderingCollaborator, ViewerSession};
pub use sync::{SyncApplication, SyncChange, SyncGroupCoordinator};
