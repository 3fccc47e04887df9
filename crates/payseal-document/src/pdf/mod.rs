// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — single-page extraction, sealing, and sample document creation.

pub mod extract;
pub mod seal;
pub mod writer;

pub use seal::PageSealer;
pub use writer::PdfWriter;
