//! Narrow interfaces to the collaborators the core calls out to, plus the
//! in-process implementations the CLI and tests use.

use crate::{
    events::Event,
    intake::{OptimizationIssues, PreviewHandle},
};
use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use time::{Duration, OffsetDateTime};
use tracing::info;

/// File handed to the intake set by the caller.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            media_type: media_type_for(name).to_string(),
            bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == "application/pdf"
    }

    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

fn media_type_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if lower.ends_with(".doc") {
        "application/msword"
    } else {
        "application/octet-stream"
    }
}

pub trait DocumentAnalyzer {
    fn analyze(&self, file: &IncomingFile) -> Result<OptimizationIssues>;
}

pub trait PreviewRenderer {
    fn render_preview(&self, file: &IncomingFile) -> Result<PreviewHandle>;
}

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

pub trait NotificationSink {
    fn notify(&self, event: &Event);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually driven clock; clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Rc<Cell<OffsetDateTime>>,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.now.get()
    }
}

/// Logs each notification as an `info` line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &Event) {
        info!(job_id = %event.job_id(), "{}", event.headline());
    }
}

/// Keeps every notification; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Fans each notification out to both sinks.
impl<A: NotificationSink, B: NotificationSink> NotificationSink for (A, B) {
    fn notify(&self, event: &Event) {
        self.0.notify(event);
        self.1.notify(event);
    }
}

/// Analyzer for deployments without one; intake keeps the document and
/// leaves the optimization fields unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalysis;

impl DocumentAnalyzer for NoAnalysis {
    fn analyze(&self, file: &IncomingFile) -> Result<OptimizationIssues> {
        bail!("no document analyzer configured for {}", file.name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreview;

impl PreviewRenderer for NoPreview {
    fn render_preview(&self, file: &IncomingFile) -> Result<PreviewHandle> {
        bail!("no preview renderer configured for {}", file.name)
    }
}

/// Scans raw PDF bytes for object markers. Good enough for page counts and
/// for flagging content that transmits poorly over fax.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

const LARGE_IMAGE_BYTES: usize = 1024 * 1024;

impl DocumentAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, file: &IncomingFile) -> Result<OptimizationIssues> {
        if !file.bytes.starts_with(b"%PDF-") {
            bail!("{} is not a PDF stream", file.name);
        }
        // Writers emit both `/Type /Page` and the compact `/Type/Page`.
        let page_count = count(&file.bytes, b"/Type /Page") - count(&file.bytes, b"/Type /Pages")
            + count(&file.bytes, b"/Type/Page")
            - count(&file.bytes, b"/Type/Pages");
        if page_count == 0 {
            bail!("no page objects found in {}", file.name);
        }
        let images = count(&file.bytes, b"/Subtype /Image");
        Ok(OptimizationIssues {
            has_color_content: count(&file.bytes, b"/DeviceRGB") > 0
                || count(&file.bytes, b"/DeviceCMYK") > 0,
            has_background_elements: count(&file.bytes, b"/ExtGState") > 0,
            has_large_images: images > 0 && file.bytes.len() > LARGE_IMAGE_BYTES,
            page_count: u32::try_from(page_count).unwrap_or(u32::MAX),
        })
    }
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
