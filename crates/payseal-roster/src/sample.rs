// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic sample roster and key list, for demos and tests.

use payseal_core::types::{Employee, KeyFileEntry};

use crate::parser::{parse_key_file, parse_roster};
use crate::table::{Row, TabularInput};

const FIRST_NAMES: [&str; 10] = [
    "John", "Jane", "Michael", "Sarah", "David", "Emily", "Robert", "Lisa", "William", "Emma",
];
const LAST_NAMES: [&str; 10] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];

/// Roster table with `count` rows: names cycle through fixed lists and
/// identity numbers run `ID100000`, `ID100001`, ...
pub fn sample_roster(count: usize) -> TabularInput {
    (0..count)
        .map(|i| {
            Row::from([
                ("name".to_string(), FIRST_NAMES[i % FIRST_NAMES.len()].to_string()),
                ("surname".to_string(), LAST_NAMES[i % LAST_NAMES.len()].to_string()),
                ("id_number".to_string(), sample_id_number(i)),
            ])
        })
        .collect()
}

/// Key list that reconciles exactly with [`sample_roster`] of the same size.
pub fn sample_key_file(count: usize) -> TabularInput {
    (0..count)
        .map(|i| Row::from([("employee_id".to_string(), sample_id_number(i))]))
        .collect()
}

pub fn sample_employees(count: usize) -> Vec<Employee> {
    parse_roster(&sample_roster(count))
}

pub fn sample_key_entries(count: usize) -> Vec<KeyFileEntry> {
    parse_key_file(&sample_key_file(count))
}

fn sample_id_number(index: usize) -> String {
    format!("ID{:06}", 100_000 + index)
}
