use serde::{Deserialize, Serialize};

/// Metadata for one recording.
///
/// The configured defaults are cloned into a fresh event whenever a recording
/// starts; the copy is then stamped with the start time and vehicle, and may
/// later receive an inferred venue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEvent {
    pub name: String,
    pub session: String,
    pub vehicle: String,
    pub driver: String,
    pub venue: String,
    pub comment: String,
    pub short_comment: String,
    /// Local start time, `%Y-%m-%dT%H:%M:%S`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
}

impl SessionEvent {
    /// Date part of `datetime`, if stamped.
    pub fn date(&self) -> Option<&str> {
        self.datetime.as_deref().and_then(|dt| dt.split_once('T')).map(|(d, _)| d)
    }

    /// Time part of `datetime`, if stamped.
    pub fn time(&self) -> Option<&str> {
        self.datetime.as_deref().and_then(|dt| dt.split_once('T')).map(|(_, t)| t)
    }
}
