use anyhow::{anyhow, Result};
use fax_broadcast::{
    config::Intake,
    intake::{Direction, DocumentIntakeSet, OptimizationIssues, PreviewHandle, RejectReason},
    services::{
        DocumentAnalyzer, HeuristicAnalyzer, IncomingFile, NoAnalysis, NoPreview, PreviewRenderer,
    },
    CoreError,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

struct FailingAnalyzer;

impl DocumentAnalyzer for FailingAnalyzer {
    fn analyze(&self, _file: &IncomingFile) -> Result<OptimizationIssues> {
        Err(anyhow!("analysis service down"))
    }
}

struct StubAnalyzer;

impl DocumentAnalyzer for StubAnalyzer {
    fn analyze(&self, _file: &IncomingFile) -> Result<OptimizationIssues> {
        Ok(OptimizationIssues {
            has_color_content: true,
            page_count: 4,
            ..Default::default()
        })
    }
}

struct StubRenderer;

impl PreviewRenderer for StubRenderer {
    fn render_preview(&self, file: &IncomingFile) -> Result<PreviewHandle> {
        Ok(PreviewHandle(format!("preview:{}", file.name)))
    }
}

fn pdf(name: &str) -> IncomingFile {
    IncomingFile::new(name, b"%PDF-1.4\n".to_vec())
}

fn names(set: &DocumentIntakeSet) -> Vec<String> {
    set.documents().iter().map(|d| d.name.clone()).collect()
}

fn set_with(files: &[&str]) -> DocumentIntakeSet {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    let outcome = set.add(files.iter().map(|n| pdf(n)).collect(), &NoAnalysis, &NoPreview);
    assert!(outcome.rejected.is_empty());
    set
}

#[test]
fn add_appends_in_order_at_zero_progress() {
    let set = set_with(&["a.pdf", "b.pdf", "c.docx"]);
    assert_eq!(names(&set), vec!["a.pdf", "b.pdf", "c.docx"]);
    assert!(set.documents().iter().all(|d| d.progress == 0));
    assert!(set.is_uploading());
}

#[test]
fn duplicates_rejected_per_file_others_proceed() {
    let mut set = set_with(&["a.pdf"]);
    let outcome = set.add(
        vec![pdf("a.pdf"), pdf("b.pdf"), pdf("b.pdf")],
        &NoAnalysis,
        &NoPreview,
    );

    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.rejected.len(), 2);
    assert!(outcome
        .rejected
        .iter()
        .all(|r| r.reason == RejectReason::Duplicate));
    assert_eq!(outcome.rejected[0].message(), "File \"a.pdf\" already exists");
    assert_eq!(
        outcome.rejected[0].message(),
        CoreError::DuplicateDocument("a.pdf".into()).to_string()
    );
    assert_eq!(names(&set), vec!["a.pdf", "b.pdf"]);
}

#[test]
fn names_compare_after_unicode_normalization() {
    let mut set = set_with(&["r\u{e9}sum\u{e9}.pdf"]);
    let outcome = set.add(vec![pdf("re\u{301}sume\u{301}.pdf")], &NoAnalysis, &NoPreview);
    assert!(outcome.accepted.is_empty());
    assert_eq!(set.len(), 1);
}

#[test]
fn unsupported_and_oversized_files_rejected() {
    let cfg = Intake {
        max_file_bytes: 16,
        ..Intake::default()
    };
    let mut set = DocumentIntakeSet::new(&cfg);
    let outcome = set.add(
        vec![
            IncomingFile::new("notes.txt", b"hi".to_vec()),
            IncomingFile::new("big.pdf", vec![b' '; 17]),
            IncomingFile::new("ok.doc", vec![b' '; 16]),
        ],
        &NoAnalysis,
        &NoPreview,
    );

    assert_eq!(names(&set), vec!["ok.doc"]);
    assert_eq!(outcome.rejected[0].reason, RejectReason::UnsupportedType);
    assert_eq!(
        outcome.rejected[1].reason,
        RejectReason::TooLarge {
            size_bytes: 17,
            max_bytes: 16
        }
    );
}

#[test]
fn analysis_failure_keeps_document() {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    let outcome = set.add(vec![pdf("a.pdf")], &FailingAnalyzer, &NoPreview);
    assert_eq!(outcome.accepted.len(), 1);
    let doc = &set.documents()[0];
    assert!(doc.optimization.is_none());
    assert!(doc.preview.is_none());
}

#[test]
fn heuristic_page_count_reads_both_type_spellings() {
    let spaced = b"%PDF-1.4\n<< /Type /Pages >>\n<< /Type /Page >>\n<< /Type /Page >>\n";
    let compact = b"%PDF-1.7\n<</Type/Pages>>\n<</Type/Page>>\n<</Type/Page>>\n<</Type/Page>>\n";
    let spaced = HeuristicAnalyzer
        .analyze(&IncomingFile::new("spaced.pdf", spaced.to_vec()))
        .unwrap();
    let compact = HeuristicAnalyzer
        .analyze(&IncomingFile::new("compact.pdf", compact.to_vec()))
        .unwrap();
    assert_eq!(spaced.page_count, 2);
    assert_eq!(compact.page_count, 3);
}

#[test]
fn pdf_without_page_objects_has_no_page_count() {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    set.add(vec![pdf("bare.pdf")], &HeuristicAnalyzer, &NoPreview);
    let doc = &set.documents()[0];
    assert!(doc.optimization.is_none());
    assert_eq!(doc.page_count(), None);
}

#[test]
fn pdfs_are_analyzed_and_previewed() {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    set.add(
        vec![pdf("a.pdf"), IncomingFile::new("b.doc", b"x".to_vec())],
        &StubAnalyzer,
        &StubRenderer,
    );
    let docs = set.documents();
    assert_eq!(docs[0].page_count(), Some(4));
    assert_eq!(docs[0].preview, Some(PreviewHandle("preview:a.pdf".into())));
    assert!(docs[1].optimization.is_none());
    assert!(docs[1].preview.is_none());
}

#[test]
fn move_swaps_neighbours_and_is_noop_at_boundaries() {
    let mut set = set_with(&["a.pdf", "b.pdf", "c.pdf"]);
    let first = set.documents()[0].id;
    let last = set.documents()[2].id;

    assert!(!set.move_document(first, Direction::Up));
    assert!(!set.move_document(last, Direction::Down));
    assert_eq!(names(&set), vec!["a.pdf", "b.pdf", "c.pdf"]);

    assert!(set.move_document(first, Direction::Down));
    assert_eq!(names(&set), vec!["b.pdf", "a.pdf", "c.pdf"]);
    assert!(set.move_document(last, Direction::Up));
    assert_eq!(names(&set), vec!["b.pdf", "c.pdf", "a.pdf"]);
}

#[test]
fn remove_is_idempotent() {
    let mut set = set_with(&["a.pdf", "b.pdf"]);
    let id = set.documents()[0].id;
    assert!(set.remove(id).is_some());
    assert!(set.remove(id).is_none());
    assert_eq!(names(&set), vec!["b.pdf"]);
}

#[test]
fn progress_advances_in_steps_and_stops_at_100() {
    let mut set = set_with(&["a.pdf", "b.pdf"]);
    let a = set.documents()[0].id;
    let b = set.documents()[1].id;

    assert_eq!(set.progress_tick(a).unwrap(), 10);
    for _ in 0..20 {
        set.progress_tick(a).unwrap();
    }
    assert_eq!(set.get(a).unwrap().progress, 100);
    assert_eq!(set.progress_tick(a).unwrap(), 100);
    assert!(set.is_uploading());

    while set.progress_tick(b).unwrap() < 100 {}
    assert!(!set.is_uploading());
}

#[test]
fn progress_tick_on_unknown_id_is_not_found() {
    let mut set = set_with(&["a.pdf"]);
    let id = set.documents()[0].id;
    set.remove(id);
    assert!(matches!(set.progress_tick(id), Err(CoreError::NotFound(_))));
}

#[test]
fn structural_changes_notify_subscribers() {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
    let sink = seen.clone();
    set.subscribe(move |docs| {
        sink.borrow_mut()
            .push(docs.iter().map(|d| d.name.clone()).collect());
    });

    set.add(vec![pdf("a.pdf"), pdf("b.pdf")], &NoAnalysis, &NoPreview);
    let a = set.documents()[0].id;
    set.move_document(a, Direction::Up); // boundary: silent
    set.move_document(a, Direction::Down);
    for _ in 0..9 {
        set.progress_tick(a).unwrap();
    }
    assert_eq!(seen.borrow().len(), 2);
    set.progress_tick(a).unwrap(); // reaches 100
    set.remove(a);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], vec!["a.pdf", "b.pdf"]);
    assert_eq!(seen[1], vec!["b.pdf", "a.pdf"]);
    assert_eq!(seen[3], vec!["b.pdf"]);
}

#[test]
fn names_stay_unique_across_operation_sequences() {
    let mut set = DocumentIntakeSet::new(&Intake::default());
    let pool = ["a.pdf", "b.pdf", "c.pdf", "d.pdf"];
    for round in 0..12usize {
        let batch = (0..3)
            .map(|k| pdf(pool[(round + k) % pool.len()]))
            .collect();
        set.add(batch, &NoAnalysis, &NoPreview);
        if let Some(doc) = set.documents().get(round % 3).map(|d| d.id) {
            if round % 2 == 0 {
                set.move_document(doc, Direction::Down);
            } else {
                set.remove(doc);
            }
        }
        let unique: HashSet<_> = set.documents().iter().map(|d| d.name.clone()).collect();
        assert_eq!(unique.len(), set.len());
    }
}

#[test]
fn restore_marks_documents_complete_and_skips_duplicates() {
    let mut source = set_with(&["a.pdf", "b.pdf"]);
    let kept = source.documents().to_vec();
    source.clear();

    let mut set = set_with(&["b.pdf"]);
    let b = set.documents()[0].id;
    while set.progress_tick(b).unwrap() < 100 {}

    let outcome = set.restore(kept);
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.rejected[0].name, "b.pdf");
    assert_eq!(names(&set), vec!["b.pdf", "a.pdf"]);
    assert!(!set.is_uploading());
}
