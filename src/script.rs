//! TOML description of a scripted broadcast session, used by `fax-broadcast run`.

use crate::{job::TestFaxStatus, util::parse_rfc3339};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Session start time (RFC 3339). Defaults to the wall clock.
    #[serde(default)]
    pub now: Option<String>,
    #[serde(default)]
    pub billing_code: String,
    #[serde(default)]
    pub recipients: u64,
    #[serde(default)]
    pub plan: PlanSpec,
    #[serde(default)]
    pub documents: Vec<DocumentSpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading script: {}", path.display()))?;
        let script: Script = toml::from_str(&raw).with_context(|| "parsing script TOML")?;
        Ok(script)
    }

    pub fn start_time(&self) -> Result<Option<OffsetDateTime>> {
        self.now.as_deref().map(parse_rfc3339).transpose()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlanSpec {
    #[default]
    Immediate,
    Scheduled {
        at: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub name: String,
    /// Read from disk, relative to the script, when set.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Otherwise a synthetic PDF with this many pages is used.
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    RecordTestFax { status: TestFaxStatus },
    Approve,
    Reject,
    Start,
    StartDue,
    PauseResume,
    Reschedule { at: String },
    Cancel,
    Deliveries { delivered: u64, failed: u64 },
    AdvanceClock { minutes: i64 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::RecordTestFax { .. } => "record_test_fax",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Start => "start",
            Action::StartDue => "start_due",
            Action::PauseResume => "pause_resume",
            Action::Reschedule { .. } => "reschedule",
            Action::Cancel => "cancel",
            Action::Deliveries { .. } => "deliveries",
            Action::AdvanceClock { .. } => "advance_clock",
        }
    }
}
