//! Studies and display sets: the candidates that hanging protocols match
//! against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{DisplaySetUid, FrameOfReferenceUid, StudyUid};
use crate::rules::AttributeValue;

/// What a display set renders: a plain image series or a derived overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplaySetKind {
    #[default]
    Image,
    Segmentation,
}

/// A renderable grouping of images (a series) or a derived overlay.
///
/// The `referenced_display_set` relation is a non-owning lookup link from an
/// overlay to its base image series; it never controls lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySet {
    pub uid: DisplaySetUid,
    #[serde(default)]
    pub series_number: Option<i64>,
    pub modality: String,
    #[serde(default)]
    pub series_description: Option<String>,
    #[serde(default)]
    pub frame_of_reference: Option<FrameOfReferenceUid>,
    /// Ordered image references. Matching rules only consult the count.
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default)]
    pub pixel_spacing: Option<f64>,
    #[serde(default)]
    pub slice_thickness: Option<f64>,
    #[serde(default)]
    pub referenced_display_set: Option<DisplaySetUid>,
    #[serde(default)]
    pub kind: DisplaySetKind,
}

impl DisplaySet {
    pub fn num_images(&self) -> usize {
        self.image_ids.len()
    }

    pub fn is_overlay(&self) -> bool {
        self.kind == DisplaySetKind::Segmentation
    }

    /// Resolve a matching-rule attribute by name.
    ///
    /// Unknown names and unpopulated attributes both yield `None`; rule
    /// evaluation treats that as "not satisfied", never as an error.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "Modality" => Some(AttributeValue::Str(self.modality.clone())),
            "SeriesNumber" => self.series_number.map(|n| AttributeValue::Number(n as f64)),
            "SeriesDescription" => self
                .series_description
                .clone()
                .map(AttributeValue::Str),
            "FrameOfReferenceUID" => self
                .frame_of_reference
                .as_ref()
                .map(|uid| AttributeValue::Str(uid.as_str().to_string())),
            "numImageFrames" => Some(AttributeValue::Number(self.num_images() as f64)),
            "PixelSpacing" => self.pixel_spacing.map(AttributeValue::Number),
            "SliceThickness" => self.slice_thickness.map(AttributeValue::Number),
            "isOverlay" => Some(AttributeValue::Bool(self.is_overlay())),
            _ => None,
        }
    }
}

/// A loaded study: identity plus an ordered list of display sets.
///
/// Immutable once loaded except for adding/removing display sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub uid: StudyUid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub study_date: Option<NaiveDate>,
    #[serde(default)]
    pub display_sets: Vec<DisplaySet>,
}

impl Study {
    pub fn new(uid: StudyUid) -> Self {
        Self {
            uid,
            description: None,
            study_date: None,
            display_sets: Vec::new(),
        }
    }

    pub fn add_display_set(&mut self, display_set: DisplaySet) {
        self.display_sets.push(display_set);
    }

    /// Removes a display set by uid, returning it if present.
    pub fn remove_display_set(&mut self, uid: &DisplaySetUid) -> Option<DisplaySet> {
        let position = self.display_sets.iter().position(|ds| &ds.uid == uid)?;
        Some(self.display_sets.remove(position))
    }

    pub fn display_set(&self, uid: &DisplaySetUid) -> Option<&DisplaySet> {
        self.display_sets.iter().find(|ds| &ds.uid == uid)
    }

    /// Study-level matching attributes.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "StudyDescription" => self.description.clone().map(AttributeValue::Str),
            "numDisplaySets" => Some(AttributeValue::Number(self.display_sets.len() as f64)),
            "numImageDisplaySets" => Some(AttributeValue::Number(
                self.display_sets
                    .iter()
                    .filter(|ds| !ds.is_overlay() && !ds.image_ids.is_empty())
                    .count() as f64,
            )),
            _ => None,
        }
    }
}
