use fax_broadcast::{
    job::{
        BroadcastJob, JobId, JobStatus, JobTransition, RecipientCounters,
    },
    registry::JobRegistry,
    CoreError,
};
use std::collections::BTreeMap;
use time::macros::datetime;

const ALL_STATUSES: [JobStatus; 6] = [
    JobStatus::PendingTest,
    JobStatus::Scheduled,
    JobStatus::InProgress,
    JobStatus::Paused,
    JobStatus::Completed,
    JobStatus::Cancelled,
];

const ALL_TRANSITIONS: [JobTransition; 7] = [
    JobTransition::ApproveTest,
    JobTransition::RejectTest,
    JobTransition::Start,
    JobTransition::Pause,
    JobTransition::Resume,
    JobTransition::Cancel,
    JobTransition::Complete,
];

fn job(status: JobStatus, pending: u64) -> BroadcastJob {
    BroadcastJob {
        id: JobId::from("66460"),
        billing_code: "MONTHLY-NEWSLETTER".into(),
        scheduled_time: datetime!(2024-10-30 09:00 UTC),
        status,
        documents: Vec::new(),
        recipients: RecipientCounters::from_parts(100, 90 - pending.min(90), 10, pending).unwrap(),
        failure_reasons: BTreeMap::new(),
        test_fax: None,
        created_at: datetime!(2024-10-29 09:00 UTC),
    }
}

#[test]
fn legal_table() {
    use JobStatus::*;
    use JobTransition::*;
    let legal = [
        (PendingTest, ApproveTest, Scheduled),
        (PendingTest, RejectTest, Cancelled),
        (Scheduled, Start, InProgress),
        (InProgress, Pause, Paused),
        (Paused, Resume, InProgress),
        (Scheduled, Cancel, Cancelled),
        (InProgress, Cancel, Cancelled),
        (Paused, Cancel, Cancelled),
        (InProgress, Complete, Completed),
    ];

    for from in ALL_STATUSES {
        for t in ALL_TRANSITIONS {
            let expected = legal
                .iter()
                .find(|(f, tr, _)| *f == from && *tr == t)
                .map(|(_, _, to)| *to);
            assert_eq!(t.target(from), expected, "{from:?} + {t:?}");
        }
    }
}

#[test]
fn illegal_transition_leaves_job_untouched() {
    for from in ALL_STATUSES {
        for t in ALL_TRANSITIONS {
            if t.target(from).is_some() {
                continue;
            }
            let mut j = job(from, 50);
            let before = j.clone();
            let err = j.apply(t).unwrap_err();
            assert!(matches!(err, CoreError::IllegalTransition { .. }));
            assert_eq!(j, before);
        }
    }
}

#[test]
fn terminal_states_reject_everything() {
    for status in [JobStatus::Completed, JobStatus::Cancelled] {
        assert!(status.is_terminal());
        for t in ALL_TRANSITIONS {
            assert!(job(status, 0).apply(t).is_err());
        }
    }
}

#[test]
fn complete_requires_no_pending() {
    let mut j = job(JobStatus::InProgress, 5);
    assert!(j.apply(JobTransition::Complete).is_err());
    assert_eq!(j.status, JobStatus::InProgress);

    let mut j = job(JobStatus::InProgress, 0);
    assert_eq!(j.apply(JobTransition::Complete).unwrap(), JobStatus::Completed);
}

#[test]
fn counters_must_add_up() {
    assert!(RecipientCounters::from_parts(100, 40, 10, 50).is_ok());
    assert!(matches!(
        RecipientCounters::from_parts(100, 40, 10, 49),
        Err(CoreError::Validation(_))
    ));
    let fresh = RecipientCounters::new(850);
    assert_eq!(fresh.pending(), 850);
    assert!(fresh.is_consistent());
}

#[test]
fn status_labels_and_wire_names() {
    assert_eq!(JobStatus::PendingTest.label(), "Pending Test");
    assert_eq!(JobStatus::InProgress.label(), "In Progress");
    assert_eq!(
        serde_json::to_string(&JobStatus::PendingTest).unwrap(),
        "\"pending_test\""
    );
    assert_eq!(JobStatus::InProgress.to_string(), "in_progress");
}

#[test]
fn overflowing_counters_from_the_wire_are_rejected() {
    let counters: RecipientCounters = serde_json::from_value(serde_json::json!({
        "total": 5,
        "delivered": u64::MAX,
        "failed": 1,
        "pending": 0,
    }))
    .unwrap();
    assert!(!counters.is_consistent());

    let mut j = job(JobStatus::InProgress, 0);
    j.recipients = counters;
    let mut registry = JobRegistry::new();
    assert!(matches!(registry.insert(j), Err(CoreError::Validation(_))));
    assert!(registry.list_jobs().is_empty());
}
