// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// payseal-document — Document handling for the Payseal engine.
//
// Holds the uploaded source PDF for a session, copies single pages out of it,
// seals pages with the PDF standard security handler, and renders sample
// payslip runs.

pub mod integrity;
pub mod pdf;
pub mod store;

// Re-export the primary structs so callers can use `payseal_document::DocumentStore` etc.
pub use integrity::{NamedArtifact, hash_bytes};
pub use pdf::seal::PageSealer;
pub use pdf::writer::{PayslipPage, PdfWriter};
pub use store::{DocumentStore, ExtractedPage, SourceDocument};
