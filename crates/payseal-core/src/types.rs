// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Payseal engine.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PaysealError, Result};
use crate::identity::{IdentityKey, normalize};

/// Unique identifier for one workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One roster row that survived parsing.
///
/// Position in the parsed roster is the page assignment: employee `i`
/// (0-indexed) owns document page `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Opaque sequence key (`emp-1`, `emp-2`, ...).
    pub id: String,
    pub name: String,
    pub surname: String,
    /// Raw identity string as read from the roster (trimmed, not normalised).
    pub id_number: String,
}

impl Employee {
    /// `"name surname"`, skipping whichever half is empty.
    pub fn display_name(&self) -> String {
        [self.name.as_str(), self.surname.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn identity_key(&self) -> IdentityKey {
        normalize(&self.id_number)
    }
}

/// Lifecycle of a page record.
///
/// Partition: `Pending -> Processing -> {Ready | Failed}`.
/// Sealing:   `Ready -> Processing -> {Encrypted | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Processing,
    Ready,
    Encrypted,
    Failed,
}

impl PageStatus {
    /// Whether `self -> next` is an edge of the record state machine.
    pub fn can_transition_to(self, next: PageStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Ready, Self::Processing)
                | (Self::Processing, Self::Ready)
                | (Self::Processing, Self::Encrypted)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Encrypted | Self::Failed)
    }
}

/// One per-employee page artifact and its processing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Sequence id (`file-1`, `file-2`, ...).
    pub id: String,
    pub file_name: String,
    pub identity_key: IdentityKey,
    pub employee_name: String,
    /// 1-indexed page of the source document.
    pub page_number: u32,
    pub status: PageStatus,
    /// Last failure message, if the record ended in `Failed`.
    pub error: Option<String>,
}

impl PageRecord {
    /// Build the record for the employee at roster position `index`.
    pub fn for_employee(index: usize, employee: &Employee, period: NaiveDate) -> Result<Self> {
        let page_number = index
            .checked_add(1)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                PaysealError::Precondition(format!("roster position {index} has no page number"))
            })?;
        Ok(Self {
            id: format!("file-{page_number}"),
            file_name: artifact_file_name(employee, period),
            identity_key: employee.identity_key(),
            employee_name: employee.display_name(),
            page_number,
            status: PageStatus::Pending,
            error: None,
        })
    }

    /// Apply one status transition, rejecting edges outside the state machine.
    pub fn transition(&mut self, next: PageStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PaysealError::Precondition(format!(
                "record {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        if next != PageStatus::Failed {
            self.error = None;
        }
        Ok(())
    }
}

/// `{name}_{surname}_{Month}_{Year}.pdf` with unsafe characters replaced.
pub fn artifact_file_name(employee: &Employee, period: NaiveDate) -> String {
    let stem = format!(
        "{}_{}_{}",
        employee.name,
        employee.surname,
        period.format("%B_%Y")
    );
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.pdf")
}

/// Make file names unique within one partition. The first record keeps its
/// name; later records with the same name get their record id appended.
pub fn dedupe_file_names(records: &mut [PageRecord]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(records.len());
    for record in records.iter_mut() {
        if !taken.insert(record.file_name.clone()) {
            let stem = record
                .file_name
                .strip_suffix(".pdf")
                .unwrap_or(&record.file_name);
            record.file_name = format!("{stem}_{}.pdf", record.id);
            taken.insert(record.file_name.clone());
        }
    }
}

/// One row of the independently supplied key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFileEntry {
    pub identity_key: IdentityKey,
    pub name: Option<String>,
    pub surname: Option<String>,
}

/// Permission bits embedded in a sealed page.
///
/// These are advisory flags carried in the sealed container; whatever opens
/// the file later is responsible for honouring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    pub print: bool,
    pub print_high_resolution: bool,
    pub copy_content: bool,
    pub modify_content: bool,
    pub annotate: bool,
    pub fill_forms: bool,
    pub accessibility_extraction: bool,
    pub assemble_document: bool,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            print: true,
            print_high_resolution: true,
            copy_content: false,
            modify_content: false,
            annotate: false,
            fill_forms: true,
            accessibility_extraction: true,
            assemble_document: false,
        }
    }
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub completed_count: usize,
    pub failed_count: usize,
    /// One message per failed item, in settle order.
    pub errors: Vec<String>,
    /// Set when submission stopped early because of a cancel request.
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Overall success as the product currently defines it: no failures, or
    /// strictly fewer failures than successes.
    pub fn is_success(&self) -> bool {
        self.failed_count == 0 || self.failed_count < self.completed_count
    }

    /// Some items succeeded and some failed.
    pub fn is_partial(&self) -> bool {
        self.completed_count > 0 && self.failed_count > 0
    }

    /// Plain-text error log, one failure per line, for writing next to
    /// partial results.
    pub fn error_log(&self) -> String {
        let mut log = format!(
            "{} completed, {} failed{}\n",
            self.completed_count,
            self.failed_count,
            if self.cancelled { " (cancelled)" } else { "" }
        );
        for error in &self.errors {
            log.push_str(error);
            log.push('\n');
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str, surname: &str, id_number: &str) -> Employee {
        Employee {
            id: "emp-1".into(),
            name: name.into(),
            surname: surname.into(),
            id_number: id_number.into(),
        }
    }

    #[test]
    fn record_for_employee_assigns_position_and_name() {
        let period = NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date");
        let record = PageRecord::for_employee(2, &employee("Jane", "Smith", " ID 7 "), period)
            .expect("record");
        assert_eq!(record.id, "file-3");
        assert_eq!(record.page_number, 3);
        assert_eq!(record.file_name, "Jane_Smith_March_2026.pdf");
        assert_eq!(record.identity_key.as_str(), "ID7");
        assert_eq!(record.employee_name, "Jane Smith");
        assert_eq!(record.status, PageStatus::Pending);
    }

    #[test]
    fn file_name_replaces_unsafe_characters() {
        let period = NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date");
        let name = artifact_file_name(&employee("Mary Ann", "O'Neil/Jr", "x"), period);
        assert_eq!(name, "Mary_Ann_O_Neil_Jr_December_2025.pdf");
    }

    #[test]
    fn page_number_must_fit_u32() {
        let period = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let last = u32::MAX as usize - 1;
        let record = PageRecord::for_employee(last, &employee("A", "B", "1"), period)
            .expect("last representable page");
        assert_eq!(record.page_number, u32::MAX);
        assert!(matches!(
            PageRecord::for_employee(last + 1, &employee("A", "B", "1"), period),
            Err(PaysealError::Precondition(_))
        ));
    }

    #[test]
    fn repeated_names_get_record_id_suffix() {
        let period = NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date");
        let mut records: Vec<PageRecord> = [
            employee("John", "Smith", "1"),
            employee("Jane", "Doe", "2"),
            employee("John", "Smith", "3"),
            employee("John", "Smith", "4"),
        ]
        .iter()
        .enumerate()
        .map(|(i, e)| PageRecord::for_employee(i, e, period).expect("record"))
        .collect();

        dedupe_file_names(&mut records);
        let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "John_Smith_March_2026.pdf",
                "Jane_Doe_March_2026.pdf",
                "John_Smith_March_2026_file-3.pdf",
                "John_Smith_March_2026_file-4.pdf",
            ]
        );
    }

    #[test]
    fn display_name_skips_empty_parts() {
        assert_eq!(employee("", "Brown", "1").display_name(), "Brown");
        assert_eq!(employee("Emma", "", "1").display_name(), "Emma");
    }

    #[test]
    fn state_machine_accepts_both_phases() {
        let period = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let mut record =
            PageRecord::for_employee(0, &employee("A", "B", "1"), period).expect("record");
        for next in [
            PageStatus::Processing,
            PageStatus::Ready,
            PageStatus::Processing,
            PageStatus::Encrypted,
        ] {
            record.transition(next).expect("legal transition");
        }
        assert!(record.status.is_terminal());
    }

    #[test]
    fn state_machine_rejects_skipping_processing() {
        let period = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let mut record =
            PageRecord::for_employee(0, &employee("A", "B", "1"), period).expect("record");
        assert!(record.transition(PageStatus::Ready).is_err());
        assert!(record.transition(PageStatus::Encrypted).is_err());
        assert_eq!(record.status, PageStatus::Pending);
    }

    #[test]
    fn failed_is_terminal() {
        assert!(!PageStatus::Failed.can_transition_to(PageStatus::Processing));
        assert!(!PageStatus::Encrypted.can_transition_to(PageStatus::Processing));
    }

    #[test]
    fn success_rule_tolerates_minority_failures() {
        let outcome = BatchOutcome {
            completed_count: 4,
            failed_count: 1,
            ..Default::default()
        };
        assert!(outcome.is_success());
        assert!(outcome.is_partial());

        let tie = BatchOutcome {
            completed_count: 2,
            failed_count: 2,
            ..Default::default()
        };
        assert!(!tie.is_success());

        let all_failed = BatchOutcome {
            completed_count: 0,
            failed_count: 5,
            ..Default::default()
        };
        assert!(!all_failed.is_success());

        assert!(BatchOutcome::default().is_success());
    }

    #[test]
    fn error_log_lists_each_failure() {
        let outcome = BatchOutcome {
            completed_count: 1,
            failed_count: 2,
            errors: vec!["file-2: bad page".into(), "file-3: timeout".into()],
            cancelled: false,
        };
        let log = outcome.error_log();
        assert!(log.starts_with("1 completed, 2 failed\n"));
        assert!(log.contains("file-2: bad page\n"));
        assert!(log.contains("file-3: timeout\n"));
    }

    #[test]
    fn default_permission_policy() {
        let policy = PermissionPolicy::default();
        assert!(policy.print && policy.print_high_resolution);
        assert!(!policy.copy_content && !policy.modify_content && !policy.annotate);
        assert!(policy.fill_forms && policy.accessibility_extraction);
        assert!(!policy.assemble_document);
    }
}
