// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// payseal-pipeline — Batch orchestration and the workflow session.
//
// Drives partitioning and sealing over many pages concurrently, behind a
// pluggable sealing backend (in-process or remote HTTP service).

pub mod backend;
pub mod batch;
pub mod logging;
pub mod remote;
pub mod session;

pub use backend::{LocalSealer, SealRequest, SealingBackend, backend_from_config};
pub use batch::{
    BatchItem, BatchObserver, BatchOrchestrator, CancelHandle, ProgressTracker, percent,
};
pub use remote::RemoteSealer;
pub use session::PayrollSession;
