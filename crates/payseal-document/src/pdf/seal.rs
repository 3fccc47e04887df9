// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page sealing — password-protect a single-page PDF with the standard
// security handler (RC4, revision 3) via `lopdf`.
//
// The employee's identity key is the user password; a fixed administrative
// owner password is applied alongside it. Each call works on its own parsed
// copy of the page, so sealing is safe to run in parallel and to retry.

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, StringFormat};
use payseal_core::config::PaysealConfig;
use payseal_core::error::{PaysealError, Result};
use payseal_core::identity::IdentityKey;
use payseal_core::types::PermissionPolicy;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Seals single-page PDFs in-process.
#[derive(Debug, Clone)]
pub struct PageSealer {
    owner_password: String,
    key_length: usize,
    permissions: PermissionPolicy,
}

impl PageSealer {
    pub fn new(
        owner_password: impl Into<String>,
        key_length: usize,
        permissions: PermissionPolicy,
    ) -> Self {
        Self {
            owner_password: owner_password.into(),
            key_length,
            permissions,
        }
    }

    pub fn from_config(config: &PaysealConfig) -> Self {
        Self::new(
            config.owner_password.clone(),
            config.key_length,
            config.permissions,
        )
    }

    /// Return a password-protected copy of `page_bytes`.
    ///
    /// Fails with a seal error when the key is empty, the input is not a
    /// single-page PDF, it is already encrypted, or encryption itself fails.
    #[instrument(skip_all, fields(bytes_len = page_bytes.len()))]
    pub fn seal(&self, page_bytes: &[u8], identity_key: &IdentityKey) -> Result<Vec<u8>> {
        if identity_key.is_empty() {
            return Err(PaysealError::Seal(
                "identity key is empty; refusing to seal without a user password".into(),
            ));
        }

        let mut document = Document::load_mem(page_bytes)
            .map_err(|err| PaysealError::Seal(format!("malformed page input: {err}")))?;

        if document.trailer.has(b"Encrypt") {
            return Err(PaysealError::Seal("page is already encrypted".into()));
        }

        let page_count = document.get_pages().len();
        if page_count != 1 {
            return Err(PaysealError::Seal(format!(
                "expected a single-page PDF, got {page_count} pages"
            )));
        }

        // The standard handler derives the file key from the first /ID entry.
        if !document.trailer.has(b"ID") {
            let digest = Sha256::digest(page_bytes);
            let file_id = Object::String(digest[..16].to_vec(), StringFormat::Hexadecimal);
            document
                .trailer
                .set("ID", Object::Array(vec![file_id.clone(), file_id]));
        }

        let version = EncryptionVersion::V2 {
            document: &document,
            owner_password: &self.owner_password,
            user_password: identity_key.as_str(),
            key_length: self.key_length,
            permissions: pdf_permissions(&self.permissions),
        };
        let state = EncryptionState::try_from(version)
            .map_err(|err| PaysealError::Seal(format!("cannot derive encryption state: {err}")))?;

        document
            .encrypt(&state)
            .map_err(|err| PaysealError::Seal(format!("encryption failed: {err}")))?;

        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|err| PaysealError::Seal(format!("failed to serialise sealed page: {err}")))?;

        debug!(output_bytes = output.len(), "page sealed");
        Ok(output)
    }
}

/// Map the policy onto the /P permission bits.
pub fn pdf_permissions(policy: &PermissionPolicy) -> Permissions {
    let mut bits = Permissions::empty();
    let flags = [
        (policy.print, Permissions::PRINTABLE),
        (policy.print_high_resolution, Permissions::PRINTABLE_IN_HIGH_QUALITY),
        (policy.copy_content, Permissions::COPYABLE),
        (policy.modify_content, Permissions::MODIFIABLE),
        (policy.annotate, Permissions::ANNOTABLE),
        (policy.fill_forms, Permissions::FILLABLE),
        (policy.accessibility_extraction, Permissions::COPYABLE_FOR_ACCESSIBILITY),
        (policy.assemble_document, Permissions::ASSEMBLABLE),
    ];
    for (allowed, flag) in flags {
        if allowed {
            bits |= flag;
        }
    }
    bits
}
