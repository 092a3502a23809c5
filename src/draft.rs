//! The broadcast wizard: documents, then review/schedule, then confirmation.

use crate::{
    config::Config,
    error::{CoreError, CoreResult},
    intake::DocumentIntakeSet,
    job::{BroadcastJob, DocumentSummary, JobId, JobStatus, RecipientCounters, TestFax},
    services::Clock,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStep {
    Documents,
    Review,
    Confirmation,
}

impl fmt::Display for DraftStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DraftStep::Documents => "documents",
            DraftStep::Review => "review",
            DraftStep::Confirmation => "confirmation",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryPlan {
    #[default]
    Immediate,
    Scheduled {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
}

impl DeliveryPlan {
    pub fn scheduled(at: OffsetDateTime) -> Self {
        DeliveryPlan::Scheduled { at }
    }

    pub fn instant(&self) -> Option<OffsetDateTime> {
        match self {
            DeliveryPlan::Immediate => None,
            DeliveryPlan::Scheduled { at } => Some(*at),
        }
    }
}

#[derive(Debug)]
pub struct BroadcastDraft {
    step: DraftStep,
    intake: DocumentIntakeSet,
    plan: DeliveryPlan,
    billing_code: String,
    billing_pattern: Regex,
    recipient_count: u64,
}

impl BroadcastDraft {
    pub fn new(cfg: &Config) -> CoreResult<Self> {
        let billing_pattern = Regex::new(&cfg.billing.code_pattern).map_err(|e| {
            CoreError::Validation(format!("billing.code_pattern does not compile: {e}"))
        })?;
        Ok(Self {
            step: DraftStep::Documents,
            intake: DocumentIntakeSet::new(&cfg.intake),
            plan: DeliveryPlan::Immediate,
            billing_code: String::new(),
            billing_pattern,
            recipient_count: 0,
        })
    }

    pub fn step(&self) -> DraftStep {
        self.step
    }

    pub fn intake(&self) -> &DocumentIntakeSet {
        &self.intake
    }

    pub fn intake_mut(&mut self) -> &mut DocumentIntakeSet {
        &mut self.intake
    }

    pub fn plan(&self) -> DeliveryPlan {
        self.plan
    }

    pub fn billing_code(&self) -> &str {
        &self.billing_code
    }

    pub fn recipient_count(&self) -> u64 {
        self.recipient_count
    }

    pub fn can_advance(&self) -> bool {
        match self.step {
            DraftStep::Documents => !self.intake.is_empty() && !self.intake.is_uploading(),
            DraftStep::Review | DraftStep::Confirmation => false,
        }
    }

    pub fn advance(&mut self) -> CoreResult<DraftStep> {
        if !self.can_advance() {
            return Err(CoreError::illegal(self.step, "advance"));
        }
        self.step = DraftStep::Review;
        Ok(self.step)
    }

    /// Jumps back to an earlier step. Staying put is allowed; going forward is
    /// not. A submitted draft only leaves confirmation through [`start_over`].
    ///
    /// [`start_over`]: BroadcastDraft::start_over
    pub fn back_to(&mut self, step: DraftStep) -> CoreResult<DraftStep> {
        if self.step == DraftStep::Confirmation {
            return Err(CoreError::illegal(self.step, "go back after submitting"));
        }
        if step > self.step {
            return Err(CoreError::illegal(self.step, "go forward with back"));
        }
        self.step = step;
        Ok(self.step)
    }

    pub fn start_over(&mut self) {
        self.intake.clear();
        self.plan = DeliveryPlan::Immediate;
        self.billing_code.clear();
        self.recipient_count = 0;
        self.step = DraftStep::Documents;
        info!("draft reset");
    }

    /// A scheduled instant in the past is rejected and the previous plan kept.
    pub fn set_delivery_plan(&mut self, plan: DeliveryPlan, clock: &dyn Clock) -> CoreResult<()> {
        if let DeliveryPlan::Scheduled { at } = plan {
            let now = clock.now();
            if at < now {
                return Err(CoreError::Validation(format!(
                    "scheduled time {at} is before now ({now})"
                )));
            }
        }
        self.plan = plan;
        Ok(())
    }

    pub fn set_billing_code(&mut self, code: &str) -> CoreResult<()> {
        let code = code.trim();
        if !code.is_empty() && !self.billing_pattern.is_match(code) {
            return Err(CoreError::Validation(format!(
                "billing code {code:?} does not match {}",
                self.billing_pattern.as_str()
            )));
        }
        self.billing_code = code.to_string();
        Ok(())
    }

    pub fn set_recipient_count(&mut self, count: u64) {
        self.recipient_count = count;
    }

    /// Turns the reviewed draft into a job and moves to confirmation.
    pub fn submit(&mut self, cfg: &Config, clock: &dyn Clock) -> CoreResult<BroadcastJob> {
        if self.step != DraftStep::Review {
            return Err(CoreError::illegal(self.step, "submit"));
        }
        if self.intake.is_empty() {
            return Err(CoreError::Validation("no documents attached".into()));
        }
        if self.intake.is_uploading() {
            return Err(CoreError::Validation("documents are still uploading".into()));
        }

        let now = clock.now();
        let status = match (cfg.product.require_test_fax, self.plan) {
            (true, _) => JobStatus::PendingTest,
            (false, DeliveryPlan::Immediate) => JobStatus::InProgress,
            (false, DeliveryPlan::Scheduled { .. }) => JobStatus::Scheduled,
        };

        let job = BroadcastJob {
            id: JobId::new(),
            billing_code: self.billing_code.clone(),
            scheduled_time: self.plan.instant().unwrap_or(now),
            status,
            documents: self
                .intake
                .documents()
                .iter()
                .map(|d| DocumentSummary {
                    name: d.name.clone(),
                    page_count: d.page_count(),
                    preview: d.preview.clone(),
                })
                .collect(),
            recipients: RecipientCounters::new(self.recipient_count),
            failure_reasons: BTreeMap::new(),
            test_fax: cfg.product.require_test_fax.then(TestFax::pending),
            created_at: now,
        };

        info!(
            job_id = %job.id,
            status = %job.status,
            documents = job.documents.len(),
            recipients = self.recipient_count,
            "draft submitted"
        );
        self.step = DraftStep::Confirmation;
        Ok(job)
    }
}
