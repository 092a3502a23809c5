//! User actions on submitted jobs.
//!
//! Every action validates against the job's current status before touching
//! it, notifies the sink on success, and returns the updated job. Nothing is
//! retried here.

use crate::{
    error::{CoreError, CoreResult},
    events::Event,
    intake::PreviewHandle,
    job::{BroadcastJob, FailureReason, JobId, JobStatus, JobTransition, TestFax, TestFaxStatus},
    registry::JobRegistry,
    services::{Clock, NotificationSink},
};
use time::OffsetDateTime;
use tracing::{info, warn};

pub struct Dispatcher<C: Clock, N: NotificationSink> {
    clock: C,
    sink: N,
}

impl<C: Clock, N: NotificationSink> Dispatcher<C, N> {
    pub fn new(clock: C, sink: N) -> Self {
        Self { clock, sink }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Approval schedules the broadcast; rejection cancels it outright.
    pub fn approve_test_fax(
        &self,
        registry: &mut JobRegistry,
        id: &JobId,
        approved: bool,
    ) -> CoreResult<BroadcastJob> {
        let transition = if approved {
            JobTransition::ApproveTest
        } else {
            JobTransition::RejectTest
        };

        let (event, job) = registry.update(id, |job| {
            let delivered = job
                .test_fax
                .as_ref()
                .is_some_and(|t| t.status == TestFaxStatus::Delivered);
            if job.status != JobStatus::PendingTest || !delivered {
                return Err(CoreError::illegal(test_fax_state(job), transition.verb()));
            }
            job.apply(transition)?;
            Ok(if approved {
                Event::TestFaxApproved {
                    job_id: job.id.clone(),
                }
            } else {
                Event::TestFaxRejected {
                    job_id: job.id.clone(),
                    reclassified: job.fail_pending(FailureReason::BroadcastCancelled),
                }
            })
        })?;

        info!(job_id = %id, approved, status = %job.status, "test fax reviewed");
        self.emit(&event);
        Ok(job)
    }

    /// Moves the start time; status is untouched.
    pub fn reschedule(
        &self,
        registry: &mut JobRegistry,
        id: &JobId,
        new_time: OffsetDateTime,
    ) -> CoreResult<BroadcastJob> {
        let now = self.clock.now();
        let (event, job) = registry.update(id, |job| {
            if job.status.is_terminal() {
                return Err(CoreError::illegal(job.status, "reschedule"));
            }
            if new_time < now {
                return Err(CoreError::Validation(format!(
                    "new start time {new_time} is before now ({now})"
                )));
            }
            job.scheduled_time = new_time;
            Ok(Event::Rescheduled {
                job_id: job.id.clone(),
                new_time,
            })
        })?;

        info!(job_id = %id, new_time = %new_time, "job rescheduled");
        self.emit(&event);
        Ok(job)
    }

    pub fn pause_resume(&self, registry: &mut JobRegistry, id: &JobId) -> CoreResult<BroadcastJob> {
        let (event, job) = registry.update(id, |job| {
            let job_id = job.id.clone();
            match job.status {
                JobStatus::InProgress => {
                    job.apply(JobTransition::Pause)?;
                    Ok(Event::Paused { job_id })
                }
                JobStatus::Paused => {
                    job.apply(JobTransition::Resume)?;
                    Ok(Event::Resumed { job_id })
                }
                other => Err(CoreError::illegal(other, "pause or resume")),
            }
        })?;

        info!(job_id = %id, status = %job.status, "job paused/resumed");
        self.emit(&event);
        Ok(job)
    }

    /// Cancels the job; recipients still pending are counted as failed.
    pub fn cancel(&self, registry: &mut JobRegistry, id: &JobId) -> CoreResult<BroadcastJob> {
        let (event, job) = registry.update(id, |job| {
            job.apply(JobTransition::Cancel)?;
            Ok(Event::Cancelled {
                job_id: job.id.clone(),
                reclassified: job.fail_pending(FailureReason::BroadcastCancelled),
            })
        })?;

        info!(
            job_id = %id,
            delivered = job.recipients.delivered(),
            failed = job.recipients.failed(),
            "job cancelled"
        );
        self.emit(&event);
        Ok(job)
    }

    /// `scheduled -> in_progress`, for the external driver that watches the
    /// scheduled instant.
    pub fn start(&self, registry: &mut JobRegistry, id: &JobId) -> CoreResult<BroadcastJob> {
        let (event, job) = registry.update(id, |job| {
            job.apply(JobTransition::Start)?;
            Ok(Event::Started {
                job_id: job.id.clone(),
            })
        })?;
        info!(job_id = %id, "job started");
        self.emit(&event);
        Ok(job)
    }

    /// Starts every scheduled job whose instant has arrived by the clock,
    /// notifying the sink once per job.
    pub fn start_due(&self, registry: &mut JobRegistry) -> Vec<BroadcastJob> {
        let now = self.clock.now();
        let mut started = Vec::new();
        for id in registry.due_jobs(now) {
            match self.start(registry, &id) {
                Ok(job) => started.push(job),
                Err(err) => warn!(job_id = %id, "due job not started: {err}"),
            }
        }
        started
    }

    /// Outcome of the test transmission, reported by the delivery side.
    pub fn record_test_fax(
        &self,
        registry: &mut JobRegistry,
        id: &JobId,
        status: TestFaxStatus,
        preview: Option<PreviewHandle>,
    ) -> CoreResult<BroadcastJob> {
        let now = self.clock.now();
        let (event, job) = registry.update(id, |job| {
            if job.status != JobStatus::PendingTest {
                return Err(CoreError::illegal(job.status, "record a test fax"));
            }
            let test_fax = job.test_fax.get_or_insert_with(TestFax::pending);
            test_fax.status = status;
            test_fax.delivery_time = (status == TestFaxStatus::Delivered).then_some(now);
            if preview.is_some() {
                test_fax.preview = preview;
            }
            Ok(Event::TestFaxRecorded {
                job_id: job.id.clone(),
                status,
            })
        })?;

        if status == TestFaxStatus::Failed {
            warn!(job_id = %id, "test fax failed");
        } else {
            info!(job_id = %id, status = status.as_str(), "test fax recorded");
        }
        self.emit(&event);
        Ok(job)
    }

    /// Moves recipients out of pending as delivery reports arrive. The job
    /// completes once nothing is pending.
    pub fn record_deliveries(
        &self,
        registry: &mut JobRegistry,
        id: &JobId,
        delivered: u64,
        failed: u64,
    ) -> CoreResult<BroadcastJob> {
        let (events, job) = registry.update(id, |job| {
            if job.status != JobStatus::InProgress {
                return Err(CoreError::illegal(job.status, "record deliveries"));
            }
            job.recipients.resolve(delivered, failed)?;
            job.record_failures(FailureReason::Transmission, failed);

            let mut events = vec![Event::DeliveriesRecorded {
                job_id: job.id.clone(),
                delivered,
                failed,
            }];
            if job.recipients.pending() == 0 {
                job.apply(JobTransition::Complete)?;
                events.push(Event::Completed {
                    job_id: job.id.clone(),
                });
            }
            Ok(events)
        })?;

        info!(
            job_id = %id,
            delivered,
            failed,
            pending = job.recipients.pending(),
            status = %job.status,
            "deliveries recorded"
        );
        for event in &events {
            self.emit(event);
        }
        Ok(job)
    }

    fn emit(&self, event: &Event) {
        self.sink.notify(event);
    }
}

fn test_fax_state(job: &BroadcastJob) -> String {
    match &job.test_fax {
        Some(t) => format!("{} (test fax {})", job.status, t.status.as_str()),
        None => format!("{} (no test fax)", job.status),
    }
}
