// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document store — the single source PDF held by one workflow session.
//
// The uploaded bytes are immutable once loaded. Every extraction reparses
// them into a private `lopdf::Document`, so concurrent extractions share the
// buffer without locks and can never disturb one another or the original.

use std::sync::Arc;

use lopdf::Document;
use payseal_core::error::{PaysealError, Result};
use tracing::{debug, info, instrument};

use crate::integrity::hash_bytes;
use crate::pdf::extract::single_page_document;

/// An uploaded source document: raw bytes plus facts derived at load time.
///
/// Cheap to clone; clones share the byte buffer.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Arc<[u8]>,
    page_count: u32,
    name: Option<String>,
    sha256: String,
}

impl SourceDocument {
    /// Parse `bytes` as a PDF and count its pages.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn from_bytes(bytes: Vec<u8>, name: Option<String>) -> Result<Self> {
        let document = Document::load_mem(&bytes)
            .map_err(|err| PaysealError::Document(format!("not a readable PDF: {err}")))?;

        let page_count = u32::try_from(document.get_pages().len())
            .map_err(|_| PaysealError::Document("page count exceeds u32".into()))?;
        let sha256 = hash_bytes(&bytes);

        debug!(page_count, %sha256, "source document parsed");
        Ok(Self {
            bytes: Arc::from(bytes),
            page_count,
            name,
            sha256,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy page `page_number` (1-indexed) into a new single-page PDF.
    ///
    /// Pure with respect to the stored bytes: repeated calls for the same
    /// page return identical output.
    #[instrument(skip(self))]
    pub fn extract_page(&self, page_number: u32) -> Result<ExtractedPage> {
        if page_number == 0 || page_number > self.page_count {
            return Err(PaysealError::PageOutOfRange {
                page: page_number,
                page_count: self.page_count,
            });
        }

        let document = Document::load_mem(&self.bytes)
            .map_err(|err| PaysealError::Document(format!("failed to reload source: {err}")))?;

        // lopdf pages are keyed by 1-indexed page number.
        let page_id = *document.get_pages().get(&page_number).ok_or_else(|| {
            PaysealError::Document(format!("page {page_number} not found in page tree"))
        })?;

        let mut single = single_page_document(&document, page_id)?;
        let mut output = Vec::new();
        single.save_to(&mut output).map_err(|err| {
            PaysealError::Document(format!("failed to serialise extracted page: {err}"))
        })?;

        debug!(page_number, output_bytes = output.len(), "page extracted");
        Ok(ExtractedPage {
            page_number,
            bytes: output,
        })
    }
}

/// A single-page PDF copied out of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub page_number: u32,
    pub bytes: Vec<u8>,
}

/// Single-slot holder for the session's source document.
#[derive(Debug, Default)]
pub struct DocumentStore {
    current: Option<SourceDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new document, replacing any previous one. Returns its page count.
    ///
    /// On failure the previously loaded document is kept.
    pub fn load(&mut self, bytes: Vec<u8>, name: Option<String>) -> Result<u32> {
        let document = SourceDocument::from_bytes(bytes, name)?;
        Ok(self.install(document))
    }

    /// Install an already-parsed document, replacing any previous one.
    /// Returns its page count.
    pub fn install(&mut self, document: SourceDocument) -> u32 {
        let page_count = document.page_count();
        if let Some(previous) = self.current.replace(document) {
            debug!(previous_sha256 = previous.sha256(), "replaced source document");
        }
        info!(page_count, "source document loaded");
        page_count
    }

    /// Extract one page from the current document.
    pub fn extract_page(&self, page_number: u32) -> Result<ExtractedPage> {
        self.require()?.extract_page(page_number)
    }

    pub fn page_count(&self) -> Option<u32> {
        self.current.as_ref().map(SourceDocument::page_count)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Shared handle to the current document, for handing to worker tasks.
    pub fn snapshot(&self) -> Option<SourceDocument> {
        self.current.clone()
    }

    pub fn current(&self) -> Option<&SourceDocument> {
        self.current.as_ref()
    }

    /// Drop the current document.
    pub fn clear(&mut self) {
        if self.current.take().is_some() {
            info!("source document cleared");
        }
    }

    fn require(&self) -> Result<&SourceDocument> {
        self.current.as_ref().ok_or_else(|| {
            PaysealError::Precondition("no PDF loaded; upload a PDF first".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::{PayslipPage, PdfWriter};

    fn three_page_pdf() -> Vec<u8> {
        let pages: Vec<PayslipPage> = ["Jane Smith", "John Jones", "Emma Brown"]
            .iter()
            .map(|name| PayslipPage::new(vec![format!("Payslip for {name}")]))
            .collect();
        PdfWriter::new("Payroll run").create_payslips(&pages)
    }

    #[test]
    fn load_reports_page_count() {
        let mut store = DocumentStore::new();
        assert_eq!(store.load(three_page_pdf(), Some("run.pdf".into())).expect("load"), 3);
        assert_eq!(store.page_count(), Some(3));
        assert_eq!(store.current().and_then(SourceDocument::name), Some("run.pdf"));
    }

    #[test]
    fn invalid_bytes_are_a_document_error() {
        let mut store = DocumentStore::new();
        let err = store.load(b"not a pdf at all".to_vec(), None).unwrap_err();
        assert!(matches!(err, PaysealError::Document(_)));
        assert!(!store.is_loaded());
    }

    #[test]
    fn failed_load_keeps_previous_document() {
        let mut store = DocumentStore::new();
        store.load(three_page_pdf(), None).expect("load");
        assert!(store.load(Vec::new(), None).is_err());
        assert_eq!(store.page_count(), Some(3));
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        let mut store = DocumentStore::new();
        store.load(three_page_pdf(), None).expect("load");
        for page in [0, 4, u32::MAX] {
            let err = store.extract_page(page).unwrap_err();
            assert!(
                matches!(err, PaysealError::PageOutOfRange { page: p, page_count: 3 } if p == page),
                "page {page}: {err}"
            );
        }
    }

    #[test]
    fn extraction_is_single_page_and_idempotent() {
        let mut store = DocumentStore::new();
        store.load(three_page_pdf(), None).expect("load");
        let original = store.current().expect("loaded").bytes().to_vec();

        let first = store.extract_page(2).expect("extract");
        let second = store.extract_page(2).expect("extract again");
        assert_eq!(first, second);
        assert_eq!(first.page_number, 2);

        let single = Document::load_mem(&first.bytes).expect("parse extracted page");
        assert_eq!(single.get_pages().len(), 1);
        assert_eq!(store.current().expect("loaded").bytes(), original.as_slice());
    }

    #[test]
    fn extraction_without_document_is_a_precondition_error() {
        let store = DocumentStore::new();
        assert!(matches!(
            store.extract_page(1),
            Err(PaysealError::Precondition(_))
        ));
    }

    #[test]
    fn clear_discards_document() {
        let mut store = DocumentStore::new();
        store.load(three_page_pdf(), None).expect("load");
        store.clear();
        assert!(!store.is_loaded());
        assert_eq!(store.page_count(), None);
    }
}
