use crate::{
    error::{CoreError, CoreResult},
    events::{SubscriptionId, Subscribers},
    job::{BroadcastJob, JobId, JobStatus},
};
use time::OffsetDateTime;
use tracing::info;

/// Submitted jobs in submission order. Jobs are never removed; terminal
/// statuses are where they end up.
///
/// Not built for concurrent writers: callers serialize actions per job.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<BroadcastJob>,
    listeners: Subscribers<BroadcastJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job: BroadcastJob) -> CoreResult<JobId> {
        if self.jobs.iter().any(|j| j.id == job.id) {
            return Err(CoreError::Validation(format!("job {} already exists", job.id)));
        }
        if !job.recipients.is_consistent() {
            return Err(CoreError::Validation(format!(
                "job {} has inconsistent recipient counters",
                job.id
            )));
        }
        info!(job_id = %job.id, status = %job.status, "job registered");
        let id = job.id.clone();
        self.jobs.push(job);
        if let Some(job) = self.jobs.last() {
            self.listeners.emit(job);
        }
        Ok(id)
    }

    pub fn list_jobs(&self) -> &[BroadcastJob] {
        &self.jobs
    }

    pub fn get_job(&self, id: &JobId) -> CoreResult<&BroadcastJob> {
        self.jobs
            .iter()
            .find(|j| &j.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&BroadcastJob) + 'static) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Runs `f` against a copy of the job and commits the copy only if `f`
    /// succeeds, so a failed action never leaves a half-applied job behind.
    pub(crate) fn update<T>(
        &mut self,
        id: &JobId,
        f: impl FnOnce(&mut BroadcastJob) -> CoreResult<T>,
    ) -> CoreResult<(T, BroadcastJob)> {
        let idx = self
            .jobs
            .iter()
            .position(|j| &j.id == id)
            .ok_or_else(|| not_found(id))?;

        let mut staged = self.jobs[idx].clone();
        let out = f(&mut staged)?;
        debug_assert!(staged.recipients.is_consistent());
        self.jobs[idx] = staged.clone();
        self.listeners.emit(&self.jobs[idx]);
        Ok((out, staged))
    }

    /// Scheduled jobs whose start instant is at or before `now`, in
    /// submission order. See [`Dispatcher::start_due`].
    ///
    /// [`Dispatcher::start_due`]: crate::dispatcher::Dispatcher::start_due
    pub fn due_jobs(&self, now: OffsetDateTime) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Scheduled && j.scheduled_time <= now)
            .map(|j| j.id.clone())
            .collect()
    }
}

fn not_found(id: &JobId) -> CoreError {
    CoreError::NotFound(format!("job {id}"))
}
