use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid display set uid: {0:?}")]
    InvalidDisplaySetUid(String),
    #[error("invalid viewport id: {0:?}")]
    InvalidViewportId(String),
    #[error("invalid study uid: {0:?}")]
    InvalidStudyUid(String),
    #[error("invalid segmentation id: {0:?}")]
    InvalidSegmentationId(String),
    #[error("invalid frame of reference uid: {0:?}")]
    InvalidFrameOfReferenceUid(String),
    #[error("invalid selector id: {0:?}")]
    InvalidSelectorId(String),
    #[error("invalid sync group id: {0:?}")]
    InvalidSyncGroupId(String),
    #[error("segment index 0 is reserved for background")]
    BackgroundSegmentIndex,
}

pub type Result<T> = std::result::Result<T, ModelError>;
