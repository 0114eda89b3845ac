use serde::{Deserialize, Serialize};

use crate::ids::VideoId;

/// A video the backend has ingested for the active session.
///
/// Field names follow the backend wire format, which is also the format
/// the catalog is persisted in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub video_id: VideoId,
    pub title: String,
    pub url: String,
}

impl VideoRef {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            video_id: VideoId::from_raw(video_id),
            title: title.into(),
            url: url.into(),
        }
    }
}
