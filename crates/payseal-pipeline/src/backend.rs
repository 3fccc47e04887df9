// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sealing backends — the seam between the orchestrator and whatever
// actually password-protects a page.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use payseal_core::config::{PaysealConfig, SealingBackendKind};
use payseal_core::error::{PaysealError, Result};
use payseal_core::identity::IdentityKey;
use payseal_document::PageSealer;
use tracing::debug;

use crate::remote::RemoteSealer;

/// Everything a backend needs to seal one page.
#[derive(Debug, Clone)]
pub struct SealRequest {
    /// Single-page PDF produced by partitioning.
    pub page_bytes: Vec<u8>,
    /// Already-normalised identity key; used verbatim as the user password.
    pub identity_key: IdentityKey,
    /// Label of the roster the key came from.
    pub source_label: Option<String>,
}

/// Abstract sealing capability.
///
/// Returned futures own everything they touch so the orchestrator can run
/// them on separate tasks.
pub trait SealingBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether requests must carry a `source_label`.
    fn requires_source_label(&self) -> bool {
        false
    }

    fn seal(&self, request: SealRequest) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// In-process sealing with the PDF standard security handler.
#[derive(Debug, Clone)]
pub struct LocalSealer {
    sealer: Arc<PageSealer>,
}

impl LocalSealer {
    pub fn new(sealer: PageSealer) -> Self {
        Self {
            sealer: Arc::new(sealer),
        }
    }

    pub fn from_config(config: &PaysealConfig) -> Self {
        Self::new(PageSealer::from_config(config))
    }
}

impl SealingBackend for LocalSealer {
    fn name(&self) -> &'static str {
        "local"
    }

    fn seal(&self, request: SealRequest) -> BoxFuture<'static, Result<Vec<u8>>> {
        let sealer = Arc::clone(&self.sealer);
        async move {
            tokio::task::spawn_blocking(move || {
                sealer.seal(&request.page_bytes, &request.identity_key)
            })
            .await
            .map_err(|err| PaysealError::Task(err.to_string()))?
        }
        .boxed()
    }
}

/// Build the backend selected in `config`.
pub fn backend_from_config(config: &PaysealConfig) -> Result<Arc<dyn SealingBackend>> {
    let backend: Arc<dyn SealingBackend> = match &config.backend {
        SealingBackendKind::Local => Arc::new(LocalSealer::from_config(config)),
        SealingBackendKind::Remote {
            endpoint,
            timeout_secs,
        } => Arc::new(RemoteSealer::new(
            endpoint,
            Duration::from_secs(*timeout_secs),
        )?),
    };
    debug!(backend = backend.name(), "sealing backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payseal_core::identity::normalize;
    use payseal_document::{PayslipPage, PdfWriter, SourceDocument};

    fn page() -> Vec<u8> {
        let pdf = PdfWriter::new("backend").create_payslips(&[PayslipPage::new(vec![
            "Payslip for Jane Smith".into(),
        ])]);
        SourceDocument::from_bytes(pdf, None)
            .expect("load")
            .extract_page(1)
            .expect("extract")
            .bytes
    }

    #[tokio::test]
    async fn local_backend_seals_off_the_async_thread() {
        let backend = backend_from_config(&PaysealConfig::default()).expect("backend");
        assert_eq!(backend.name(), "local");
        assert!(!backend.requires_source_label());

        let sealed = backend
            .seal(SealRequest {
                page_bytes: page(),
                identity_key: normalize("ID100001"),
                source_label: None,
            })
            .await
            .expect("seal");
        assert!(sealed.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn local_backend_reports_seal_errors() {
        let backend = LocalSealer::from_config(&PaysealConfig::default());
        let err = backend
            .seal(SealRequest {
                page_bytes: b"garbage".to_vec(),
                identity_key: normalize("ID1"),
                source_label: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaysealError::Seal(_)));
    }

    #[test]
    fn remote_kind_builds_remote_backend() {
        let config = PaysealConfig {
            backend: SealingBackendKind::Remote {
                endpoint: "http://127.0.0.1:7071".into(),
                timeout_secs: 5,
            },
            ..Default::default()
        };
        let backend = backend_from_config(&config).expect("backend");
        assert_eq!(backend.name(), "remote");
        assert!(backend.requires_source_label());
    }
}
