// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Payseal.

use thiserror::Error;

/// Top-level error type for all Payseal operations.
#[derive(Debug, Error)]
pub enum PaysealError {
    // -- Input errors --
    #[error("tabular input could not be decoded: {0}")]
    Parse(String),

    // -- Document errors --
    #[error("document could not be loaded: {0}")]
    Document(String),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    // -- Reconciliation --
    #[error("identity keys do not reconcile: {missing} missing, {extra} unmatched")]
    Reconciliation { missing: usize, extra: usize },

    // -- Sealing --
    #[error("sealing failed: {0}")]
    Seal(String),

    #[error("sealing backend transport failed: {0}")]
    Transport(String),

    // -- Workflow --
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("batch cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Task(String),

    // -- Persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PaysealError>;
