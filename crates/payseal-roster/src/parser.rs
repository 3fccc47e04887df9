// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Roster and key-file parsing.
//
// Both inputs go through the same alias resolver. Row order is preserved
// because it decides which document page each employee receives.

use payseal_core::identity::normalize;
use payseal_core::types::{Employee, KeyFileEntry};
use tracing::{info, instrument, warn};

use crate::columns::{LogicalField, resolve};
use crate::table::TabularInput;

/// Build the ordered employee roster.
///
/// A row is kept when its identity key is non-empty and at least one of
/// name/surname is present. Dropped rows are logged, never errors. An empty
/// table yields an empty roster.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn parse_roster(table: &TabularInput) -> Vec<Employee> {
    let mut employees = Vec::with_capacity(table.len());

    for (index, row) in table.rows().iter().enumerate() {
        let id_number = resolve(row, LogicalField::IdentityNumber).unwrap_or_default();
        let name = resolve(row, LogicalField::Name).unwrap_or_default();
        let surname = resolve(row, LogicalField::Surname).unwrap_or_default();

        if normalize(id_number).is_empty() {
            warn!(row = index + 1, "dropping roster row without an identity number");
            continue;
        }
        if name.is_empty() && surname.is_empty() {
            warn!(row = index + 1, "dropping roster row without a name or surname");
            continue;
        }

        employees.push(Employee {
            id: format!("emp-{}", employees.len() + 1),
            name: name.to_owned(),
            surname: surname.to_owned(),
            id_number: id_number.to_owned(),
        });
    }

    info!(
        kept = employees.len(),
        dropped = table.len() - employees.len(),
        "roster parsed"
    );
    employees
}

/// Build the key list used for reconciliation. Only the identity column is
/// required; rows without one are dropped.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn parse_key_file(table: &TabularInput) -> Vec<KeyFileEntry> {
    let mut entries = Vec::with_capacity(table.len());

    for (index, row) in table.rows().iter().enumerate() {
        let identity_key = normalize(resolve(row, LogicalField::IdentityNumber).unwrap_or_default());
        if identity_key.is_empty() {
            warn!(row = index + 1, "dropping key-file row without an identity number");
            continue;
        }

        entries.push(KeyFileEntry {
            identity_key,
            name: resolve(row, LogicalField::Name).map(str::to_owned),
            surname: resolve(row, LogicalField::Surname).map(str::to_owned),
        });
    }

    info!(entries = entries.len(), "key file parsed");
    entries
}
