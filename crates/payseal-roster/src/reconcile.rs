// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconciliation — cross-check record identity keys against the key file.
//
// Sealing is all-or-nothing: a report authorises it only when every record
// key has a partner in the key file and nothing in the key file is left over.
// The report still itemises every discrepancy so the caller can show them.

use std::collections::{BTreeMap, HashSet};

use payseal_core::error::PaysealError;
use payseal_core::identity::{IdentityKey, normalize};
use payseal_core::types::{KeyFileEntry, PageRecord};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// One itemised reconciliation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// A record whose key is absent from the key file.
    MissingKey {
        record_id: String,
        employee_name: String,
        identity_key: IdentityKey,
    },
    /// A key-file entry that matches no record.
    ExtraKey {
        identity_key: IdentityKey,
        name: Option<String>,
    },
    /// Several records share one key, so the mapping cannot be 1:1.
    DuplicateKey {
        identity_key: IdentityKey,
        record_ids: Vec<String>,
    },
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey {
                employee_name,
                identity_key,
                ..
            } => write!(
                f,
                "Missing encryption key for: {employee_name} (ID: {identity_key})"
            ),
            Self::ExtraKey { identity_key, .. } => {
                write!(f, "Extra key found: {identity_key} (no matching payslip)")
            }
            Self::DuplicateKey {
                identity_key,
                record_ids,
            } => write!(
                f,
                "Duplicate ID {identity_key} shared by {}",
                record_ids.join(", ")
            ),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub discrepancies: Vec<Discrepancy>,
    /// `|record keys ∩ key-file keys|`.
    pub matched: usize,
    /// Number of page records checked.
    pub expected: usize,
}

impl ValidationReport {
    /// Sealing may start only with zero discrepancies and a full match.
    pub fn is_authorized(&self) -> bool {
        self.discrepancies.is_empty() && self.matched == self.expected
    }

    pub fn missing_count(&self) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| matches!(d, Discrepancy::MissingKey { .. }))
            .count()
    }

    pub fn extra_count(&self) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| matches!(d, Discrepancy::ExtraKey { .. }))
            .count()
    }

    /// Display lines, one per discrepancy.
    pub fn messages(&self) -> Vec<String> {
        self.discrepancies.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when authorised, otherwise a reconciliation error with counts.
    pub fn ensure_authorized(&self) -> Result<(), PaysealError> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(PaysealError::Reconciliation {
                missing: self.missing_count(),
                extra: self.extra_count(),
            })
        }
    }
}

/// Compare the record keys with the key-file keys. Pure; never mutates input.
#[instrument(skip_all, fields(records = records.len(), keys = entries.len()))]
pub fn reconcile(records: &[PageRecord], entries: &[KeyFileEntry]) -> ValidationReport {
    let record_keys: HashSet<IdentityKey> = records
        .iter()
        .map(|r| normalize(r.identity_key.as_str()))
        .collect();
    let file_keys: HashSet<IdentityKey> = entries
        .iter()
        .map(|e| normalize(e.identity_key.as_str()))
        .collect();

    let mut discrepancies = Vec::new();

    for record in records {
        let key = normalize(record.identity_key.as_str());
        if !file_keys.contains(&key) {
            discrepancies.push(Discrepancy::MissingKey {
                record_id: record.id.clone(),
                employee_name: record.employee_name.clone(),
                identity_key: key,
            });
        }
    }

    for entry in entries {
        let key = normalize(entry.identity_key.as_str());
        if !record_keys.contains(&key) {
            discrepancies.push(Discrepancy::ExtraKey {
                identity_key: key,
                name: entry.name.clone(),
            });
        }
    }

    let mut owners: BTreeMap<IdentityKey, Vec<String>> = BTreeMap::new();
    for record in records {
        owners
            .entry(normalize(record.identity_key.as_str()))
            .or_default()
            .push(record.id.clone());
    }
    for (identity_key, record_ids) in owners {
        if record_ids.len() > 1 {
            discrepancies.push(Discrepancy::DuplicateKey {
                identity_key,
                record_ids,
            });
        }
    }

    let matched = record_keys.intersection(&file_keys).count();
    let report = ValidationReport {
        discrepancies,
        matched,
        expected: records.len(),
    };

    if report.is_authorized() {
        info!(matched, "identity keys reconciled");
    } else {
        warn!(
            matched,
            expected = report.expected,
            discrepancies = report.discrepancies.len(),
            "identity keys do not reconcile"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use payseal_core::types::PageStatus;

    fn record(index: usize, key: &str) -> PageRecord {
        PageRecord {
            id: format!("file-{}", index + 1),
            file_name: format!("emp{index}.pdf"),
            identity_key: normalize(key),
            employee_name: format!("Employee {key}"),
            page_number: index as u32 + 1,
            status: PageStatus::Ready,
            error: None,
        }
    }

    fn entry(key: &str) -> KeyFileEntry {
        KeyFileEntry {
            identity_key: normalize(key),
            name: None,
            surname: None,
        }
    }

    #[test]
    fn one_missing_and_one_extra() {
        let records = vec![record(0, "A"), record(1, "B"), record(2, "C")];
        let entries = vec![entry("A"), entry("B"), entry("D")];
        let report = reconcile(&records, &entries);

        assert_eq!(report.missing_count(), 1);
        assert_eq!(report.extra_count(), 1);
        assert_eq!(report.discrepancies.len(), 2);
        assert!(matches!(
            &report.discrepancies[0],
            Discrepancy::MissingKey { identity_key, .. } if identity_key.as_str() == "C"
        ));
        assert!(matches!(
            &report.discrepancies[1],
            Discrepancy::ExtraKey { identity_key, .. } if identity_key.as_str() == "D"
        ));
        assert_eq!(report.matched, 2);
        assert!(!report.is_authorized());
        assert!(matches!(
            report.ensure_authorized(),
            Err(PaysealError::Reconciliation { missing: 1, extra: 1 })
        ));
    }

    #[test]
    fn whitespace_variants_reconcile() {
        let records = vec![record(0, "ID100001"), record(1, "ID100002")];
        let entries = vec![
            KeyFileEntry {
                identity_key: normalize("ID100002"),
                name: Some("Jane".into()),
                surname: None,
            },
            entry("ID100001"),
        ];
        let report = reconcile(&records, &entries);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.matched, 2);
        assert!(report.is_authorized());
        report.ensure_authorized().expect("authorised");
    }

    #[test]
    fn duplicate_record_keys_block_sealing() {
        let records = vec![record(0, "A"), record(1, "A")];
        let report = reconcile(&records, &[entry("A")]);
        assert_eq!(report.matched, 1);
        assert!(!report.is_authorized());
        assert!(matches!(
            &report.discrepancies[0],
            Discrepancy::DuplicateKey { record_ids, .. } if record_ids.len() == 2
        ));
    }

    #[test]
    fn messages_name_employee_and_key() {
        let report = reconcile(&[record(0, "C")], &[entry("D")]);
        let messages = report.messages();
        assert_eq!(messages[0], "Missing encryption key for: Employee C (ID: C)");
        assert_eq!(messages[1], "Extra key found: D (no matching payslip)");
    }

    #[test]
    fn reconcile_does_not_touch_records() {
        let records = vec![record(0, "A")];
        let before = records.clone();
        let _ = reconcile(&records, &[]);
        assert_eq!(records, before);
    }

    #[test]
    fn empty_inputs_are_trivially_authorised() {
        assert!(reconcile(&[], &[]).is_authorized());
    }
}
