// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote sealing client — delegate page sealing to an HTTP service.
//
// Wire contract:
//   POST {endpoint}/api/encrypt
//   Content-Type: application/json
//   { "pdfBase64": "...", "employeeId": "...", "databaseFileName": "..." }
// A 2xx response body is the sealed PDF. Anything else is a transport error
// carrying the status and response text.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::BoxFuture;
use payseal_core::error::{PaysealError, Result};
use serde::Serialize;
use tracing::{debug, error};

use crate::backend::{SealRequest, SealingBackend};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptRequest {
    pdf_base64: String,
    employee_id: String,
    database_file_name: String,
}

/// HTTP client bound to one sealing service.
#[derive(Debug, Clone)]
pub struct RemoteSealer {
    client: reqwest::Client,
    url: String,
}

impl RemoteSealer {
    /// `endpoint` is the service base URL (`http://` or `https://`).
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(PaysealError::Precondition(format!(
                "remote sealer endpoint {endpoint:?} must be an http(s) URL"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaysealError::Transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{endpoint}/api/encrypt"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SealingBackend for RemoteSealer {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn requires_source_label(&self) -> bool {
        true
    }

    fn seal(&self, request: SealRequest) -> BoxFuture<'static, Result<Vec<u8>>> {
        let client = self.client.clone();
        let url = self.url.clone();

        async move {
            let Some(database_file_name) = request.source_label else {
                return Err(PaysealError::Precondition(
                    "remote sealing needs the roster file name".into(),
                ));
            };
            let body = EncryptRequest {
                pdf_base64: STANDARD.encode(&request.page_bytes),
                employee_id: request.identity_key.to_string(),
                database_file_name,
            };

            debug!(%url, page_bytes = request.page_bytes.len(), "sending seal request");
            let response = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| PaysealError::Transport(format!("POST {url}: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!(%status, "remote sealer rejected request");
                return Err(PaysealError::Transport(format!(
                    "remote sealer returned {status}: {text}"
                )));
            }

            let sealed = response
                .bytes()
                .await
                .map_err(|e| PaysealError::Transport(format!("reading sealed body: {e}")))?;
            debug!(sealed_bytes = sealed.len(), "seal response received");
            Ok(sealed.to_vec())
        }
        .boxed()
    }
}
