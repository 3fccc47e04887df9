// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payroll session — the explicitly owned state of one partition-and-seal
// workflow: roster, source document, page records and their outputs.
//
// Order of use:
//   load_roster + load_document -> partition -> reconcile -> seal
// Each step checks its own preconditions. Loading a new roster or document
// discards everything derived from the old one.

use std::future::Future;

use payseal_core::config::PaysealConfig;
use payseal_core::error::{PaysealError, Result};
use payseal_core::types::{
    BatchOutcome, Employee, KeyFileEntry, PageRecord, PageStatus, SessionId, dedupe_file_names,
};
use payseal_document::{DocumentStore, NamedArtifact, SourceDocument};
use payseal_roster::{TabularInput, ValidationReport, parse_key_file, parse_roster, reconcile};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::backend::{SealRequest, SealingBackend};
use crate::batch::{BatchItem, BatchObserver, BatchOrchestrator, CancelHandle, ProgressTracker};

/// Applies batch events to the page records. The drain loop is its only
/// caller, so it is the single writer of record state during a run.
struct RecordWriter<'a> {
    records: &'a mut [PageRecord],
    outputs: &'a mut [Option<Vec<u8>>],
    /// Record index for each batch item.
    slots: Vec<usize>,
    on_success: PageStatus,
}

impl RecordWriter<'_> {
    fn slot(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied()
    }

    fn apply(&mut self, slot: usize, next: PageStatus) {
        if let Some(record) = self.records.get_mut(slot) {
            if let Err(err) = record.transition(next) {
                warn!(record = %record.id, %err, "status transition rejected");
            }
        }
    }
}

impl BatchObserver<Vec<u8>> for RecordWriter<'_> {
    fn started(&mut self, index: usize) {
        if let Some(slot) = self.slot(index) {
            self.apply(slot, PageStatus::Processing);
        }
    }

    fn settled(&mut self, index: usize, result: Result<Vec<u8>>) {
        let Some(slot) = self.slot(index) else {
            warn!(index, "settled item has no record");
            return;
        };
        match result {
            Ok(bytes) => {
                if let Some(output) = self.outputs.get_mut(slot) {
                    *output = Some(bytes);
                }
                self.apply(slot, self.on_success);
            }
            Err(err) => {
                self.apply(slot, PageStatus::Failed);
                if let Some(record) = self.records.get_mut(slot) {
                    record.error = Some(err.to_string());
                }
            }
        }
    }
}

/// One workflow session. Owns all state; nothing is global.
#[derive(Debug)]
pub struct PayrollSession {
    id: SessionId,
    config: PaysealConfig,
    orchestrator: BatchOrchestrator,
    documents: DocumentStore,
    roster_label: Option<String>,
    employees: Vec<Employee>,
    records: Vec<PageRecord>,
    /// Partition output per record, same index as `records`.
    pages: Vec<Option<Vec<u8>>>,
    /// Sealed output per record, same index as `records`.
    sealed: Vec<Option<Vec<u8>>>,
    validation: Option<ValidationReport>,
    partition_progress: ProgressTracker,
    seal_progress: ProgressTracker,
}

impl PayrollSession {
    pub fn new(config: PaysealConfig) -> Result<Self> {
        config.validate()?;
        let orchestrator = BatchOrchestrator::new(config.max_concurrency);
        let session = Self {
            id: SessionId::new(),
            config,
            orchestrator,
            documents: DocumentStore::new(),
            roster_label: None,
            employees: Vec::new(),
            records: Vec::new(),
            pages: Vec::new(),
            sealed: Vec::new(),
            validation: None,
            partition_progress: ProgressTracker::new(),
            seal_progress: ProgressTracker::new(),
        };
        info!(session = %session.id, "session created");
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PaysealConfig {
        &self.config
    }

    // -- Inputs --------------------------------------------------------------

    /// Replace the roster. Returns the number of employees kept.
    #[instrument(skip_all, fields(session = %self.id, rows = table.len()))]
    pub fn load_roster(&mut self, table: &TabularInput, label: impl Into<String>) -> usize {
        self.employees = parse_roster(table);
        self.roster_label = Some(label.into());
        self.reset_derived();
        self.employees.len()
    }

    /// Decode a JSON roster and load it.
    pub fn load_roster_json(&mut self, data: &[u8], label: impl Into<String>) -> Result<usize> {
        let table = TabularInput::from_json(data)?;
        Ok(self.load_roster(&table, label))
    }

    /// Replace the source document. Returns its page count. A failed load
    /// leaves the previous document and all derived state in place.
    ///
    /// Parsing runs on the blocking pool.
    #[instrument(skip_all, fields(session = %self.id, bytes_len = bytes.len()))]
    pub async fn load_document(&mut self, bytes: Vec<u8>, name: Option<String>) -> Result<u32> {
        let document =
            tokio::task::spawn_blocking(move || SourceDocument::from_bytes(bytes, name))
                .await
                .map_err(|err| PaysealError::Task(err.to_string()))??;
        let page_count = self.documents.install(document);
        self.reset_derived();
        Ok(page_count)
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn roster_label(&self) -> Option<&str> {
        self.roster_label.as_deref()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.documents.page_count()
    }

    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn validation(&self) -> Option<&ValidationReport> {
        self.validation.as_ref()
    }

    pub fn partition_progress(&self) -> watch::Receiver<u8> {
        self.partition_progress.subscribe()
    }

    pub fn seal_progress(&self) -> watch::Receiver<u8> {
        self.seal_progress.subscribe()
    }

    // -- Partition -----------------------------------------------------------

    /// A roster and a document are both loaded.
    pub fn can_partition(&self) -> bool {
        !self.employees.is_empty() && self.documents.is_loaded()
    }

    /// Split the document into one single-page artifact per employee.
    ///
    /// Employee `i` receives page `i + 1`; the roster length must equal the
    /// page count. Per-page failures are reported in the outcome, never
    /// raised. Cancelling stops further pages from starting; records not yet
    /// started stay pending.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn partition(&mut self, cancel: &CancelHandle) -> Result<BatchOutcome> {
        let document = self.prepare_partition(cancel)?;
        let extract = move |page_number: u32| {
            let document = document.clone();
            async move {
                tokio::task::spawn_blocking(move || document.extract_page(page_number))
                    .await
                    .map_err(|err| PaysealError::Task(err.to_string()))?
                    .map(|page| page.bytes)
            }
        };
        self.run_partition(extract, cancel).await
    }

    /// Check inputs and lay out fresh pending records, one per employee.
    fn prepare_partition(&mut self, cancel: &CancelHandle) -> Result<SourceDocument> {
        let document = self.documents.snapshot().ok_or_else(|| {
            PaysealError::Precondition("no PDF loaded; upload a PDF first".into())
        })?;
        if self.employees.is_empty() {
            return Err(PaysealError::Precondition(
                "no employees loaded; upload a roster first".into(),
            ));
        }
        let page_count = document.page_count() as usize;
        if page_count != self.employees.len() {
            return Err(PaysealError::Precondition(format!(
                "roster has {} employees but the document has {page_count} pages",
                self.employees.len()
            )));
        }
        if cancel.is_cancelled() {
            return Err(PaysealError::Cancelled);
        }

        let period = self.config.period()?;
        let mut records = self
            .employees
            .iter()
            .enumerate()
            .map(|(index, employee)| PageRecord::for_employee(index, employee, period))
            .collect::<Result<Vec<_>>>()?;
        dedupe_file_names(&mut records);

        self.records = records;
        self.pages = vec![None; self.records.len()];
        self.sealed = vec![None; self.records.len()];
        self.validation = None;
        self.partition_progress.reset();
        Ok(document)
    }

    /// Run `extract` over every pending record's page number.
    async fn run_partition<F, Fut>(
        &mut self,
        extract: F,
        cancel: &CancelHandle,
    ) -> Result<BatchOutcome>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        let items: Vec<BatchItem<u32>> = self
            .records
            .iter()
            .map(|record| BatchItem::new(record_label(record), record.page_number))
            .collect();

        let mut writer = RecordWriter {
            slots: (0..self.records.len()).collect(),
            records: &mut self.records,
            outputs: &mut self.pages,
            on_success: PageStatus::Ready,
        };
        let outcome = self
            .orchestrator
            .run(items, extract, &mut writer, &self.partition_progress, cancel)
            .await;

        info!(
            completed = outcome.completed_count,
            failed = outcome.failed_count,
            cancelled = outcome.cancelled,
            "partition finished"
        );
        Ok(outcome)
    }

    /// Partition has settled, nothing is sealed yet and at least one page is
    /// ready. Pages that failed extraction stay failed and are skipped.
    pub fn is_partitioned(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.status == PageStatus::Ready)
            && self
                .records
                .iter()
                .all(|record| matches!(record.status, PageStatus::Ready | PageStatus::Failed))
    }

    /// Single-page artifacts from the last partition, in record order.
    pub fn artifacts(&self) -> Vec<NamedArtifact> {
        collect_artifacts(&self.records, &self.pages)
    }

    // -- Reconciliation -----------------------------------------------------

    /// Check the key list against the partitioned records and remember the
    /// report. Sealing is gated on the most recent report.
    #[instrument(skip_all, fields(session = %self.id, keys = entries.len()))]
    pub fn reconcile(&mut self, entries: &[KeyFileEntry]) -> Result<&ValidationReport> {
        if self.records.is_empty() {
            return Err(PaysealError::Precondition(
                "nothing to reconcile; partition the document first".into(),
            ));
        }
        let report = reconcile(&self.records, entries);
        info!(
            matched = report.matched,
            expected = report.expected,
            discrepancies = report.discrepancies.len(),
            "reconciliation finished"
        );
        Ok(&*self.validation.insert(report))
    }

    /// Parse a key-file table and reconcile it.
    pub fn reconcile_table(&mut self, table: &TabularInput) -> Result<&ValidationReport> {
        let entries = parse_key_file(table);
        self.reconcile(&entries)
    }

    // -- Sealing -------------------------------------------------------------

    /// Partition complete, lengths agree and the last reconciliation passed.
    pub fn can_seal(&self) -> bool {
        self.check_seal_ready(false).is_ok()
    }

    /// Seal every ready page with its employee's identity key.
    ///
    /// Refused outright unless reconciliation authorised the whole batch.
    /// Pages that failed extraction are left as they are. Per-page failures
    /// are reported in the outcome.
    #[instrument(skip_all, fields(session = %self.id, backend = backend.name()))]
    pub async fn seal(&mut self, backend: &dyn SealingBackend) -> Result<BatchOutcome> {
        self.check_seal_ready(backend.requires_source_label())?;

        let mut items = Vec::with_capacity(self.records.len());
        let mut slots = Vec::with_capacity(self.records.len());
        for (slot, (record, page)) in self.records.iter().zip(&self.pages).enumerate() {
            if record.status != PageStatus::Ready {
                continue;
            }
            let page_bytes = page.clone().ok_or_else(|| {
                PaysealError::Precondition(format!("record {} has no extracted page", record.id))
            })?;
            items.push(BatchItem::new(
                record_label(record),
                SealRequest {
                    page_bytes,
                    identity_key: record.identity_key.clone(),
                    source_label: self.roster_label.clone(),
                },
            ));
            slots.push(slot);
        }
        self.seal_progress.reset();

        let mut writer = RecordWriter {
            slots,
            records: &mut self.records,
            outputs: &mut self.sealed,
            on_success: PageStatus::Encrypted,
        };
        // Sealing is not cancellable.
        let outcome = self
            .orchestrator
            .run(
                items,
                |request| backend.seal(request),
                &mut writer,
                &self.seal_progress,
                &CancelHandle::new(),
            )
            .await;

        info!(
            completed = outcome.completed_count,
            failed = outcome.failed_count,
            "sealing finished"
        );
        Ok(outcome)
    }

    /// Sealed artifacts from the last sealing run, in record order.
    pub fn sealed_artifacts(&self) -> Vec<NamedArtifact> {
        collect_artifacts(&self.records, &self.sealed)
    }

    /// Drop every input and derived result. The session id is kept.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.employees.clear();
        self.roster_label = None;
        self.reset_derived();
        info!(session = %self.id, "session cleared");
    }

    fn reset_derived(&mut self) {
        self.records.clear();
        self.pages.clear();
        self.sealed.clear();
        self.validation = None;
        self.partition_progress.reset();
        self.seal_progress.reset();
    }

    fn check_seal_ready(&self, needs_label: bool) -> Result<()> {
        if self.records.is_empty() {
            return Err(PaysealError::Precondition(
                "nothing to seal; partition the document first".into(),
            ));
        }
        let page_count = self.documents.page_count().unwrap_or(0) as usize;
        if self.records.len() != self.employees.len() || self.records.len() != page_count {
            return Err(PaysealError::Precondition(format!(
                "{} records, {} employees and {page_count} pages do not line up",
                self.records.len(),
                self.employees.len()
            )));
        }
        if !self.is_partitioned() {
            return Err(PaysealError::Precondition(
                "partition must finish with at least one ready page before sealing".into(),
            ));
        }
        match &self.validation {
            None => {
                return Err(PaysealError::Precondition(
                    "reconcile the key file before sealing".into(),
                ));
            }
            Some(report) => report.ensure_authorized()?,
        }
        if needs_label && self.roster_label.is_none() {
            return Err(PaysealError::Precondition(
                "this backend needs the roster file name".into(),
            ));
        }
        Ok(())
    }
}

fn record_label(record: &PageRecord) -> String {
    format!("{} ({})", record.id, record.employee_name)
}

fn collect_artifacts(records: &[PageRecord], outputs: &[Option<Vec<u8>>]) -> Vec<NamedArtifact> {
    records
        .iter()
        .zip(outputs)
        .filter_map(|(record, output)| {
            output
                .as_ref()
                .map(|bytes| NamedArtifact::new(record.file_name.clone(), bytes.clone()))
        })
        .collect()
}
