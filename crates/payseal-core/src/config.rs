// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PaysealError, Result};
use crate::types::PermissionPolicy;

/// Which sealing backend the pipeline should construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SealingBackendKind {
    /// Seal in-process with the PDF standard security handler.
    Local,
    /// Delegate to an HTTP sealing service.
    Remote {
        /// Base URL; requests go to `{endpoint}/api/encrypt`.
        endpoint: String,
        /// Per-request timeout.
        timeout_secs: u64,
    },
}

/// Engine settings supplied by the host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaysealConfig {
    /// Upper bound on in-flight per-page operations.
    pub max_concurrency: usize,
    /// Administrative password applied to every sealed page.
    pub owner_password: String,
    /// Key length in bits for local sealing (40..=128, multiple of 8).
    pub key_length: usize,
    /// Permission bits embedded in sealed pages.
    pub permissions: PermissionPolicy,
    pub backend: SealingBackendKind,
    /// `YYYY-MM` used in artifact file names; current month when unset.
    pub file_name_period: Option<String>,
}

impl Default for PaysealConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            owner_password: "payseal-admin".into(),
            key_length: 128,
            permissions: PermissionPolicy::default(),
            backend: SealingBackendKind::Local,
            file_name_period: None,
        }
    }
}

impl PaysealConfig {
    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(PaysealError::Precondition(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.owner_password.is_empty() {
            return Err(PaysealError::Precondition(
                "owner_password must not be empty".into(),
            ));
        }
        if !(40..=128).contains(&self.key_length) || self.key_length % 8 != 0 {
            return Err(PaysealError::Precondition(format!(
                "key_length {} must be a multiple of 8 in 40..=128",
                self.key_length
            )));
        }
        self.period()?;
        Ok(())
    }

    /// First day of the naming period.
    pub fn period(&self) -> Result<NaiveDate> {
        match &self.file_name_period {
            Some(raw) => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").map_err(
                |e| PaysealError::Precondition(format!("file_name_period {raw:?}: {e}")),
            ),
            None => {
                let today = Local::now().date_naive();
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).ok_or_else(|| {
                    PaysealError::Precondition("current month is not representable".into())
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PaysealConfig::default().validate().expect("default config");
    }

    #[test]
    fn explicit_period_parses() {
        let config = PaysealConfig {
            file_name_period: Some("2026-02".into()),
            ..Default::default()
        };
        assert_eq!(
            config.period().expect("period"),
            NaiveDate::from_ymd_opt(2026, 2, 1).expect("date")
        );
    }

    #[test]
    fn bad_period_is_rejected() {
        let config = PaysealConfig {
            file_name_period: Some("February".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = PaysealConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_fills_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("payseal.json");
        std::fs::write(
            &path,
            r#"{"max_concurrency": 8, "backend": {"kind": "remote", "endpoint": "http://localhost:7071", "timeout_secs": 30}}"#,
        )
        .expect("write config");

        let config = PaysealConfig::load(&path).expect("load");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.key_length, 128);
        assert_eq!(
            config.backend,
            SealingBackendKind::Remote {
                endpoint: "http://localhost:7071".into(),
                timeout_secs: 30
            }
        );
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("payseal.json");
        let config = PaysealConfig {
            owner_password: "hr-office".into(),
            ..Default::default()
        };
        config.save(&path).expect("save");
        let loaded = PaysealConfig::load(&path).expect("load");
        assert_eq!(loaded.owner_password, "hr-office");
        assert_eq!(loaded.backend, SealingBackendKind::Local);
    }
}
