use crate::{
    events::Event,
    intake::Rejection,
    job::BroadcastJob,
    timezone::ZoneTime,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub rejected_documents: Vec<Rejection>,
    pub zone_preview: Vec<ZoneTime>,
    pub jobs: Vec<BroadcastJob>,
    pub notifications: Vec<Notice>,
    pub action_errors: Vec<ActionError>,
}

/// Toast-equivalent rendering of an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub job_id: String,
    pub headline: String,
    pub detail: String,
}

impl Notice {
    pub fn from_event(event: &Event, time_format: &str) -> Self {
        Self {
            job_id: event.job_id().to_string(),
            headline: event.headline().to_string(),
            detail: event.detail(time_format),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionError {
    pub index: usize,
    pub action: String,
    pub error: String,
}
