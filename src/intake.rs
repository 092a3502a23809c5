//! Ordered working set of documents attached to a draft.
//!
//! Order is the send order. Names are unique after NFC normalization, so
//! "résumé.pdf" typed two different ways is still one document.

use crate::{
    config::Intake as IntakeConfig,
    error::{CoreError, CoreResult},
    events::{SubscriptionId, Subscribers},
    services::{DocumentAnalyzer, IncomingFile, PreviewRenderer},
    util::sha256_hex,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptimizationIssues {
    pub has_color_content: bool,
    pub has_background_elements: bool,
    pub has_large_images: bool,
    pub page_count: u32,
}

impl OptimizationIssues {
    pub fn any(&self) -> bool {
        self.has_color_content || self.has_background_elements || self.has_large_images
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub media_type: String,
    pub size_bytes: u64,
    pub content_sha256: String,
    pub progress: u8,
    pub optimization: Option<OptimizationIssues>,
    pub preview: Option<PreviewHandle>,
}

impl Document {
    pub fn is_uploaded(&self) -> bool {
        self.progress >= PROGRESS_DONE
    }

    pub fn page_count(&self) -> Option<u32> {
        self.optimization.map(|o| o.page_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Duplicate,
    UnsupportedType,
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

impl Rejection {
    /// Inline message for the user.
    pub fn message(&self) -> String {
        match &self.reason {
            RejectReason::Duplicate => CoreError::DuplicateDocument(self.name.clone()).to_string(),
            RejectReason::UnsupportedType => {
                format!("{} is not a supported file type", self.name)
            }
            RejectReason::TooLarge { max_bytes, .. } => format!(
                "{} is too large. Max size is {}MB",
                self.name,
                max_bytes / (1024 * 1024)
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub accepted: Vec<DocumentId>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug)]
pub struct DocumentIntakeSet {
    cfg: IntakeConfig,
    documents: Vec<Document>,
    listeners: Subscribers<[Document]>,
}

impl DocumentIntakeSet {
    pub fn new(cfg: &IntakeConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            documents: Vec::new(),
            listeners: Subscribers::new(),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_uploading(&self) -> bool {
        self.documents.iter().any(|d| !d.is_uploaded())
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&[Document]) + 'static) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Appends every acceptable file in input order at progress 0; each
    /// rejected file is reported by name without affecting the others.
    pub fn add(
        &mut self,
        files: Vec<IncomingFile>,
        analyzer: &dyn DocumentAnalyzer,
        renderer: &dyn PreviewRenderer,
    ) -> AddOutcome {
        let mut outcome = AddOutcome::default();

        for file in files {
            if let Some(reason) = self.check(&file) {
                warn!(name = %file.name, ?reason, "document rejected");
                outcome.rejected.push(Rejection {
                    name: file.name,
                    reason,
                });
                continue;
            }

            let (optimization, preview) = if file.is_pdf() {
                inspect(&file, analyzer, renderer)
            } else {
                (None, None)
            };

            let doc = Document {
                id: DocumentId::new(),
                name: file.name.clone(),
                media_type: file.media_type.clone(),
                size_bytes: file.bytes.len() as u64,
                content_sha256: sha256_hex(&file.bytes),
                progress: 0,
                optimization,
                preview,
            };
            info!(id = %doc.id, name = %doc.name, "document accepted");
            outcome.accepted.push(doc.id);
            self.documents.push(doc);
        }

        if !outcome.accepted.is_empty() {
            self.changed();
        }
        outcome
    }

    /// Re-seeds previously uploaded documents, e.g. when the user navigates
    /// back to the documents step. Restored entries are complete.
    pub fn restore(&mut self, documents: Vec<Document>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for mut doc in documents {
            if self.contains_name(&doc.name) {
                outcome.rejected.push(Rejection {
                    name: doc.name,
                    reason: RejectReason::Duplicate,
                });
                continue;
            }
            doc.progress = PROGRESS_DONE;
            outcome.accepted.push(doc.id);
            self.documents.push(doc);
        }
        if !outcome.accepted.is_empty() {
            self.changed();
        }
        outcome
    }

    /// Idempotent; returns the removed document if it was present.
    pub fn remove(&mut self, id: DocumentId) -> Option<Document> {
        let idx = self.position(id)?;
        let doc = self.documents.remove(idx);
        info!(id = %doc.id, name = %doc.name, "document removed");
        self.changed();
        Some(doc)
    }

    /// Swaps with the neighbour in `direction`. Returns whether anything moved;
    /// boundaries and unknown ids are no-ops.
    pub fn move_document(&mut self, id: DocumentId, direction: Direction) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let other = match direction {
            Direction::Up if idx > 0 => idx - 1,
            Direction::Down if idx + 1 < self.documents.len() => idx + 1,
            _ => return false,
        };
        self.documents.swap(idx, other);
        self.changed();
        true
    }

    /// Advances upload progress by one step and returns the new value.
    pub fn progress_tick(&mut self, id: DocumentId) -> CoreResult<u8> {
        let step = self.cfg.progress_step.max(1);
        let idx = self
            .position(id)
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))?;

        let doc = &mut self.documents[idx];
        if doc.is_uploaded() {
            return Ok(doc.progress);
        }
        doc.progress = doc.progress.saturating_add(step).min(PROGRESS_DONE);
        let progress = doc.progress;
        debug!(id = %id, progress, "upload progress");

        if progress == PROGRESS_DONE {
            self.changed();
        }
        Ok(progress)
    }

    pub fn clear(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        self.documents.clear();
        self.changed();
    }

    fn check(&self, file: &IncomingFile) -> Option<RejectReason> {
        if self.contains_name(&file.name) {
            return Some(RejectReason::Duplicate);
        }
        let accepted = file.extension().is_some_and(|ext| {
            self.cfg
                .accepted_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&ext))
        });
        if !accepted {
            return Some(RejectReason::UnsupportedType);
        }
        let size = file.bytes.len() as u64;
        if size > self.cfg.max_file_bytes {
            return Some(RejectReason::TooLarge {
                size_bytes: size,
                max_bytes: self.cfg.max_file_bytes,
            });
        }
        None
    }

    fn contains_name(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.documents.iter().any(|d| normalize_name(&d.name) == key)
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    fn changed(&mut self) {
        self.listeners.emit(&self.documents);
    }
}

fn normalize_name(name: &str) -> String {
    name.nfc().collect()
}

/// Analysis and preview are best effort: a failure leaves the field unset.
fn inspect(
    file: &IncomingFile,
    analyzer: &dyn DocumentAnalyzer,
    renderer: &dyn PreviewRenderer,
) -> (Option<OptimizationIssues>, Option<PreviewHandle>) {
    let optimization = match analyzer.analyze(file) {
        Ok(issues) => Some(issues),
        Err(err) => {
            warn!(name = %file.name, "document analysis failed: {err:#}");
            None
        }
    };
    let preview = match renderer.render_preview(file) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(name = %file.name, "preview rendering failed: {err:#}");
            None
        }
    };
    (optimization, preview)
}
