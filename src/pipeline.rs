use crate::{
    config::Config,
    dispatcher::Dispatcher,
    draft::{BroadcastDraft, DeliveryPlan},
    intake::PROGRESS_DONE,
    job::JobId,
    registry::JobRegistry,
    report::{ActionError, Notice, SessionReport},
    script::{Action, DocumentSpec, PlanSpec, Script},
    services::{
        Clock, DocumentAnalyzer, FixedClock, IncomingFile, NotificationSink, PreviewRenderer,
        RecordingSink, SystemClock, TracingSink,
    },
    timezone,
    util::parse_rfc3339,
};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use time::Duration;
use tracing::{debug, info, warn};

/// Drives one draft from intake to submission, then replays the scripted
/// job actions through the dispatcher.
pub struct Pipeline<A: DocumentAnalyzer, R: PreviewRenderer> {
    cfg: Config,
    analyzer: A,
    renderer: R,
}

impl<A: DocumentAnalyzer, R: PreviewRenderer> Pipeline<A, R> {
    pub fn new(cfg: &Config, analyzer: A, renderer: R) -> Self {
        Self {
            cfg: cfg.clone(),
            analyzer,
            renderer,
        }
    }

    pub fn run_script(&self, script: &Script, base_dir: &Path) -> Result<SessionReport> {
        let clock = FixedClock::new(
            script
                .start_time()?
                .unwrap_or_else(|| SystemClock.now()),
        );

        let mut draft = BroadcastDraft::new(&self.cfg)?;
        draft.intake_mut().subscribe(|docs| {
            debug!(count = docs.len(), "intake changed");
        });

        let files = script
            .documents
            .iter()
            .map(|spec| load_document(spec, base_dir))
            .collect::<Result<Vec<_>>>()?;

        let outcome = draft
            .intake_mut()
            .add(files, &self.analyzer, &self.renderer);
        for rejection in &outcome.rejected {
            warn!("{}", rejection.message());
        }

        // Stand-in for the upload timer.
        for id in &outcome.accepted {
            while draft.intake_mut().progress_tick(*id)? < PROGRESS_DONE {}
        }

        draft
            .advance()
            .map_err(|e| anyhow!("no documents to send: {e}"))?;

        let plan = match &script.plan {
            PlanSpec::Immediate => DeliveryPlan::Immediate,
            PlanSpec::Scheduled { at } => DeliveryPlan::scheduled(parse_rfc3339(at)?),
        };
        draft.set_delivery_plan(plan, &clock)?;
        draft.set_billing_code(&script.billing_code)?;
        draft.set_recipient_count(script.recipients);

        let zone_preview = timezone::project(
            Some(plan.instant().unwrap_or_else(|| clock.now())),
            &self.cfg.time_zones,
        );

        let job = draft.submit(&self.cfg, &clock)?;
        let job_id = job.id.clone();

        let mut registry = JobRegistry::new();
        registry.subscribe(|job| {
            debug!(job_id = %job.id, status = %job.status, "job changed");
        });
        registry.insert(job)?;

        let recorder = RecordingSink::new();
        let dispatcher = Dispatcher::new(clock.clone(), (TracingSink, recorder.clone()));

        let mut action_errors = Vec::new();
        for (index, action) in script.actions.iter().enumerate() {
            if let Err(err) = apply_action(&dispatcher, &clock, &mut registry, &job_id, action) {
                warn!(index, action = action.name(), "action failed: {err:#}");
                action_errors.push(ActionError {
                    index,
                    action: action.name().to_string(),
                    error: format!("{err:#}"),
                });
            }
        }

        let notifications = recorder
            .events()
            .iter()
            .map(|e| Notice::from_event(e, &self.cfg.display.time_format))
            .collect();

        info!(
            job_id = %job_id,
            actions = script.actions.len(),
            failed_actions = action_errors.len(),
            "session finished"
        );

        Ok(SessionReport {
            rejected_documents: outcome.rejected,
            zone_preview,
            jobs: registry.list_jobs().to_vec(),
            notifications,
            action_errors,
        })
    }
}

fn apply_action<N: NotificationSink>(
    dispatcher: &Dispatcher<FixedClock, N>,
    clock: &FixedClock,
    registry: &mut JobRegistry,
    id: &JobId,
    action: &Action,
) -> Result<()> {
    match action {
        Action::RecordTestFax { status } => {
            dispatcher.record_test_fax(registry, id, *status, None)?;
        }
        Action::Approve => {
            dispatcher.approve_test_fax(registry, id, true)?;
        }
        Action::Reject => {
            dispatcher.approve_test_fax(registry, id, false)?;
        }
        Action::Start => {
            dispatcher.start(registry, id)?;
        }
        Action::StartDue => {
            let started = dispatcher.start_due(registry);
            debug!(count = started.len(), "due jobs started");
        }
        Action::PauseResume => {
            dispatcher.pause_resume(registry, id)?;
        }
        Action::Reschedule { at } => {
            dispatcher.reschedule(registry, id, parse_rfc3339(at)?)?;
        }
        Action::Cancel => {
            dispatcher.cancel(registry, id)?;
        }
        Action::Deliveries { delivered, failed } => {
            dispatcher.record_deliveries(registry, id, *delivered, *failed)?;
        }
        Action::AdvanceClock { minutes } => {
            clock.advance(Duration::minutes(*minutes));
        }
    }
    Ok(())
}

fn load_document(spec: &DocumentSpec, base_dir: &Path) -> Result<IncomingFile> {
    let bytes = match &spec.path {
        Some(p) => {
            let path = base_dir.join(p);
            std::fs::read(&path).with_context(|| format!("reading document: {}", path.display()))?
        }
        None => synthetic_pdf(spec.pages.unwrap_or(1), spec.size_bytes.unwrap_or(0)),
    };
    Ok(IncomingFile::new(&spec.name, bytes))
}

/// Just enough PDF structure for the heuristic analyzer to count pages.
fn synthetic_pdf(pages: u32, size_bytes: u64) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n1 0 obj << /Type /Pages >> endobj\n".to_vec();
    for n in 0..pages {
        out.extend_from_slice(format!("{} 0 obj << /Type /Page >> endobj\n", n + 2).as_bytes());
    }
    out.extend_from_slice(b"%%EOF\n");
    let target = usize::try_from(size_bytes).unwrap_or(usize::MAX);
    if out.len() < target {
        out.resize(target, b' ');
    }
    out
}
