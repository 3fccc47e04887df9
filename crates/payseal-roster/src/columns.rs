// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Column resolution — a declarative alias table and one resolver.

use crate::table::Row;

/// A field the engine needs, independent of how the sheet names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    Name,
    Surname,
    IdentityNumber,
}

/// Accepted header names per field, tried in order. Matching ignores ASCII
/// case and surrounding whitespace in the header.
pub const COLUMN_ALIASES: &[(LogicalField, &[&str])] = &[
    (
        LogicalField::Name,
        &[
            "name",
            "first_name",
            "firstname",
            "first name",
            "given_name",
            "employee_name",
        ],
    ),
    (
        LogicalField::Surname,
        &[
            "surname",
            "last_name",
            "lastname",
            "last name",
            "family_name",
        ],
    ),
    (
        LogicalField::IdentityNumber,
        &[
            "id_number",
            "id number",
            "idnumber",
            "id",
            "employee_id",
            "national_id",
            "staff_id",
        ],
    ),
];

/// Aliases for one field.
pub fn aliases(field: LogicalField) -> &'static [&'static str] {
    COLUMN_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// Value of `field` in `row`: the first alias whose cell is non-empty after
/// trimming, returned trimmed.
pub fn resolve(row: &Row, field: LogicalField) -> Option<&str> {
    aliases(field).iter().find_map(|alias| {
        row.iter()
            .filter(|(header, _)| header.trim().eq_ignore_ascii_case(alias))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    })
}
