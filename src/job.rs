use crate::{
    error::{CoreError, CoreResult},
    intake::PreviewHandle,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingTest,
    Scheduled,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::PendingTest => "pending_test",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Status badge text.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::PendingTest => "Pending Test",
            JobStatus::Scheduled => "Scheduled",
            JobStatus::InProgress => "In Progress",
            JobStatus::Paused => "Paused",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTransition {
    ApproveTest,
    RejectTest,
    Start,
    Pause,
    Resume,
    Cancel,
    Complete,
}

impl JobTransition {
    pub fn verb(self) -> &'static str {
        match self {
            JobTransition::ApproveTest => "approve the test fax",
            JobTransition::RejectTest => "reject the test fax",
            JobTransition::Start => "start",
            JobTransition::Pause => "pause",
            JobTransition::Resume => "resume",
            JobTransition::Cancel => "cancel",
            JobTransition::Complete => "complete",
        }
    }

    /// Target status if `self` is legal from `from`.
    pub fn target(self, from: JobStatus) -> Option<JobStatus> {
        use JobStatus::*;
        use JobTransition::*;
        match (from, self) {
            (PendingTest, ApproveTest) => Some(Scheduled),
            (PendingTest, RejectTest) => Some(Cancelled),
            (Scheduled, Start) => Some(InProgress),
            (InProgress, Pause) => Some(Paused),
            (Paused, Resume) => Some(InProgress),
            (Scheduled | InProgress | Paused, Cancel) => Some(Cancelled),
            (InProgress, Complete) => Some(Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Transmission,
    BroadcastCancelled,
}

/// Recipient tallies. `delivered + failed + pending == total` always holds;
/// recipients only ever leave `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientCounters {
    total: u64,
    delivered: u64,
    failed: u64,
    pending: u64,
}

impl RecipientCounters {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            delivered: 0,
            failed: 0,
            pending: total,
        }
    }

    /// Counters for a job already part way through; rejects inconsistent sums.
    pub fn from_parts(total: u64, delivered: u64, failed: u64, pending: u64) -> CoreResult<Self> {
        let sum = delivered
            .checked_add(failed)
            .and_then(|s| s.checked_add(pending));
        if sum != Some(total) {
            return Err(CoreError::Validation(format!(
                "recipient counters do not add up: {delivered} + {failed} + {pending} != {total}"
            )));
        }
        Ok(Self {
            total,
            delivered,
            failed,
            pending,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }

    pub fn is_consistent(&self) -> bool {
        self.delivered
            .checked_add(self.failed)
            .and_then(|s| s.checked_add(self.pending))
            == Some(self.total)
    }

    /// Moves `delivered + failed` recipients out of pending.
    pub(crate) fn resolve(&mut self, delivered: u64, failed: u64) -> CoreResult<()> {
        let moving = delivered.checked_add(failed).filter(|n| *n <= self.pending);
        let Some(moving) = moving else {
            return Err(CoreError::Validation(format!(
                "cannot resolve {delivered} delivered and {failed} failed with only {} pending",
                self.pending
            )));
        };
        self.delivered += delivered;
        self.failed += failed;
        self.pending -= moving;
        Ok(())
    }

    /// Marks every pending recipient failed; returns how many moved.
    pub(crate) fn fail_all_pending(&mut self) -> u64 {
        let moved = self.pending;
        self.failed += moved;
        self.pending = 0;
        moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFaxStatus {
    Pending,
    Delivered,
    Failed,
}

impl TestFaxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestFaxStatus::Pending => "pending",
            TestFaxStatus::Delivered => "delivered",
            TestFaxStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFax {
    pub status: TestFaxStatus,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub delivery_time: Option<OffsetDateTime>,
    pub preview: Option<PreviewHandle>,
}

impl TestFax {
    pub fn pending() -> Self {
        Self {
            status: TestFaxStatus::Pending,
            delivery_time: None,
            preview: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub page_count: Option<u32>,
    pub preview: Option<PreviewHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastJob {
    pub id: JobId,
    pub billing_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_time: OffsetDateTime,
    pub status: JobStatus,
    pub documents: Vec<DocumentSummary>,
    pub recipients: RecipientCounters,
    #[serde(default)]
    pub failure_reasons: BTreeMap<FailureReason, u64>,
    pub test_fax: Option<TestFax>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl BroadcastJob {
    /// Applies a status transition from the legal table. On failure the job
    /// is left exactly as it was.
    pub fn apply(&mut self, transition: JobTransition) -> CoreResult<JobStatus> {
        let target = transition
            .target(self.status)
            .ok_or_else(|| CoreError::illegal(self.status, transition.verb()))?;
        if transition == JobTransition::Complete && self.recipients.pending() > 0 {
            return Err(CoreError::illegal(
                format!("{} with {} pending", self.status, self.recipients.pending()),
                transition.verb(),
            ));
        }
        self.status = target;
        Ok(target)
    }

    /// Pending recipients become failures attributed to `reason`.
    pub(crate) fn fail_pending(&mut self, reason: FailureReason) -> u64 {
        let moved = self.recipients.fail_all_pending();
        if moved > 0 {
            *self.failure_reasons.entry(reason).or_insert(0) += moved;
        }
        moved
    }

    pub(crate) fn record_failures(&mut self, reason: FailureReason, count: u64) {
        if count > 0 {
            *self.failure_reasons.entry(reason).or_insert(0) += count;
        }
    }
}
