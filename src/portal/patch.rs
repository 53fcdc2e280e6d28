/// Typed partial updates of a section's client-editable config
///
/// Each section accepts only its own fields; anything else in the payload
/// is rejected. Lifecycle flags are never part of a patch.
use super::models::{SectionFields, SectionKind};
use crate::error::{PortalError, PortalResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotesPatch {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocationsPatch {
    pub multiple_locations: Option<bool>,
}

/// Minutes, capped at one day
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeEstimatePatch {
    #[validate(range(max = 1440))]
    pub total_time_estimated: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionConfigPatch {
    KeyPeople(NotesPatch),
    Locations(LocationsPatch),
    GroupShots(TimeEstimatePatch),
    PhotoRequests(NotesPatch),
    Timeline(TimeEstimatePatch),
}

fn parse_as<T: DeserializeOwned + Validate>(kind: SectionKind, value: serde_json::Value) -> PortalResult<T> {
    let patch: T = serde_json::from_value(value).map_err(|e| {
        PortalError::InvalidArgument(format!("Invalid {} config: {}", kind, e))
    })?;
    patch.validate()?;
    Ok(patch)
}

impl SectionConfigPatch {
    /// Parse the raw config payload of a draft save for `kind`
    pub fn parse(kind: SectionKind, value: serde_json::Value) -> PortalResult<Self> {
        Ok(match kind {
            SectionKind::KeyPeople => Self::KeyPeople(parse_as(kind, value)?),
            SectionKind::Locations => Self::Locations(parse_as(kind, value)?),
            SectionKind::GroupShots => Self::GroupShots(parse_as(kind, value)?),
            SectionKind::PhotoRequests => Self::PhotoRequests(parse_as(kind, value)?),
            SectionKind::Timeline => Self::Timeline(parse_as(kind, value)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::KeyPeople(p) | Self::PhotoRequests(p) => p.notes.is_none(),
            Self::Locations(p) => p.multiple_locations.is_none(),
            Self::GroupShots(p) | Self::Timeline(p) => p.total_time_estimated.is_none(),
        }
    }

    /// Merge supplied fields, leaving the others untouched
    pub fn apply(&self, fields: &mut SectionFields) {
        match self {
            Self::KeyPeople(p) | Self::PhotoRequests(p) => {
                if let Some(notes) = &p.notes {
                    fields.notes = Some(notes.clone());
                }
            }
            Self::Locations(p) => {
                if let Some(multiple) = p.multiple_locations {
                    fields.multiple_locations = Some(multiple);
                }
            }
            Self::GroupShots(p) | Self::Timeline(p) => {
                if let Some(minutes) = p.total_time_estimated {
                    fields.total_time_estimated = Some(minutes);
                }
            }
        }
    }
}
