#![deny(unsafe_code)]

use std::fmt;

use crate::error::ModelError;

/// Declares a validated string identifier newtype.
///
/// Construction trims surrounding whitespace and rejects empty values;
/// identifiers serialize as plain strings.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $error:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ModelError::$error(value));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Stable identity of a display set (an image series or a derived
    /// overlay). Presentation state is keyed by this, never by the slot the
    /// content currently occupies.
    DisplaySetUid,
    InvalidDisplaySetUid
);

string_id!(
    /// Identity of a physical viewport slot in the grid.
    ViewportId,
    InvalidViewportId
);

string_id!(StudyUid, InvalidStudyUid);

string_id!(SegmentationId, InvalidSegmentationId);

string_id!(
    /// Coordinate-system identifier shared by spatially co-registered
    /// series.
    FrameOfReferenceUid,
    InvalidFrameOfReferenceUid
);

string_id!(
    /// Logical name of a display set selector inside a protocol definition.
    SelectorId,
    InvalidSelectorId
);

string_id!(SyncGroupId, InvalidSyncGroupId);
