// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// payseal-roster — Tabular inputs for the Payseal engine.
//
// Turns decoded spreadsheet rows into the ordered employee roster and the
// independent key list, and cross-checks the two identity sets before any
// page is sealed.

pub mod columns;
pub mod parser;
pub mod reconcile;
pub mod sample;
pub mod table;

pub use columns::{LogicalField, resolve};
pub use parser::{parse_key_file, parse_roster};
pub use reconcile::{Discrepancy, ValidationReport, reconcile};
pub use sample::{sample_employees, sample_key_entries, sample_key_file, sample_roster};
pub use table::{Row, TabularInput};
