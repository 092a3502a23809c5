use crate::{
    job::{JobId, TestFaxStatus},
    util::format_instant,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User-visible confirmation of a dispatcher action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    TestFaxRecorded {
        job_id: JobId,
        status: TestFaxStatus,
    },
    TestFaxApproved {
        job_id: JobId,
    },
    TestFaxRejected {
        job_id: JobId,
        reclassified: u64,
    },
    Rescheduled {
        job_id: JobId,
        #[serde(with = "time::serde::rfc3339")]
        new_time: OffsetDateTime,
    },
    Started {
        job_id: JobId,
    },
    Paused {
        job_id: JobId,
    },
    Resumed {
        job_id: JobId,
    },
    Cancelled {
        job_id: JobId,
        reclassified: u64,
    },
    DeliveriesRecorded {
        job_id: JobId,
        delivered: u64,
        failed: u64,
    },
    Completed {
        job_id: JobId,
    },
}

impl Event {
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::TestFaxRecorded { job_id, .. }
            | Event::TestFaxApproved { job_id }
            | Event::TestFaxRejected { job_id, .. }
            | Event::Rescheduled { job_id, .. }
            | Event::Started { job_id }
            | Event::Paused { job_id }
            | Event::Resumed { job_id }
            | Event::Cancelled { job_id, .. }
            | Event::DeliveriesRecorded { job_id, .. }
            | Event::Completed { job_id } => job_id,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Event::TestFaxRecorded { .. } => "Test Fax Updated",
            Event::TestFaxApproved { .. } => "Test Fax Approved",
            Event::TestFaxRejected { .. } => "Test Fax Rejected",
            Event::Rescheduled { .. } => "Broadcast Rescheduled",
            Event::Started { .. } => "Broadcast started",
            Event::Paused { .. } => "Broadcast paused",
            Event::Resumed { .. } => "Broadcast resumed",
            Event::Cancelled { .. } => "Broadcast Cancelled",
            Event::DeliveriesRecorded { .. } => "Deliveries recorded",
            Event::Completed { .. } => "Broadcast Completed",
        }
    }

    /// Second line of the toast. `time_format` is a `time` format description.
    pub fn detail(&self, time_format: &str) -> String {
        match self {
            Event::TestFaxRecorded { status, .. } => format!("Test fax {}", status.as_str()),
            Event::TestFaxApproved { .. } => "Broadcast will begin at scheduled time".to_string(),
            Event::TestFaxRejected { .. } => "Broadcast has been cancelled".to_string(),
            Event::Rescheduled { new_time, .. } => {
                format!("New start time: {}", format_instant(time_format, *new_time))
            }
            Event::DeliveriesRecorded {
                delivered, failed, ..
            } => format!("{delivered} delivered, {failed} failed"),
            other => format!("Job ID: {}", other.job_id()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback list fired after every committed change to the owning state.
pub struct Subscribers<T: ?Sized> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Box<dyn FnMut(&T)>)>,
}

impl<T: ?Sized> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    pub fn emit(&mut self, value: &T) {
        for (_, cb) in self.callbacks.iter_mut() {
            cb(value);
        }
    }
}

impl<T: ?Sized> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}
