// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payseal — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{PaysealConfig, SealingBackendKind};
pub use error::PaysealError;
pub use identity::{IdentityKey, normalize};
pub use types::*;
