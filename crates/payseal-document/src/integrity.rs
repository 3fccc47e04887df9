// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact integrity — SHA-256 fingerprints for source documents and outputs.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// One output file handed back to the host: a name, its bytes, and their
/// fingerprint. Packaging several of these into an archive is the host's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
}

impl NamedArtifact {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let sha256 = hash_bytes(&bytes);
        Self {
            file_name: file_name.into(),
            bytes,
            sha256,
        }
    }

    /// Whether the bytes still match the recorded fingerprint.
    pub fn verify(&self) -> bool {
        hash_bytes(&self.bytes) == self.sha256
    }
}
