use fax_broadcast::{
    config::Config,
    intake::RejectReason,
    job::JobStatus,
    pipeline::Pipeline,
    script::Script,
    services::{HeuristicAnalyzer, NoPreview},
};
use std::path::Path;

#[test]
fn demo_script_runs_end_to_end() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/q4-statements.toml");
    let script = Script::load(&path).expect("load script");
    let pipeline = Pipeline::new(&Config::default(), HeuristicAnalyzer, NoPreview);
    let report = pipeline
        .run_script(&script, path.parent().unwrap())
        .expect("run script");

    let reasons: Vec<_> = report
        .rejected_documents
        .iter()
        .map(|r| r.reason.clone())
        .collect();
    assert_eq!(
        reasons,
        vec![RejectReason::Duplicate, RejectReason::UnsupportedType]
    );

    assert_eq!(report.jobs.len(), 1);
    let job = &report.jobs[0];
    assert_eq!(job.billing_code, "Q4-STATEMENTS");
    assert_eq!(job.documents[0].page_count, Some(3));
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.recipients.delivered(), 600);
    assert_eq!(job.recipients.failed(), 650);
    assert_eq!(job.recipients.pending(), 0);

    let failed: Vec<_> = report.action_errors.iter().map(|e| e.index).collect();
    assert_eq!(failed, vec![0, 10]);

    let headlines: Vec<_> = report
        .notifications
        .iter()
        .map(|n| n.headline.as_str())
        .collect();
    assert_eq!(
        headlines,
        vec![
            "Test Fax Updated",
            "Test Fax Approved",
            "Broadcast Rescheduled",
            "Broadcast started",
            "Deliveries recorded",
            "Broadcast paused",
            "Broadcast resumed",
            "Broadcast Cancelled",
        ]
    );
    assert_eq!(
        report.notifications[2].detail,
        "New start time: Oct 31, 2024 4:00 PM"
    );

    let honolulu = &report.zone_preview[0];
    assert_eq!(honolulu.name, "Honolulu");
    assert_eq!(honolulu.display, "5:00 AM");
}

#[test]
fn script_without_documents_fails() {
    let script: Script = toml::from_str("recipients = 3\n").unwrap();
    let pipeline = Pipeline::new(&Config::default(), HeuristicAnalyzer, NoPreview);
    assert!(pipeline.run_script(&script, Path::new(".")).is_err());
}
