// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity normalisation — the only place identity strings are canonicalised.
//
// Every comparison between identity keys (roster vs. key file, record vs.
// password) goes through `normalize`, so two keys are the same identity iff
// their normalised bytes are equal.

use serde::{Deserialize, Serialize};

/// Canonical identity key: no whitespace anywhere.
///
/// Doubles as the end-user password for a sealed page and as the join key
/// during reconciliation. Construct it with [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalise a raw identity string.
///
/// Trims the ends, then drops every remaining whitespace character (spaces,
/// tabs, CR, LF). Total and idempotent; empty input yields an empty key.
pub fn normalize(raw: &str) -> IdentityKey {
    IdentityKey(raw.trim().chars().filter(|c| !c.is_whitespace()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_variants_collapse_to_one_key() {
        let expected = normalize("ID100001");
        assert_eq!(normalize("ID100001\n"), expected);
        assert_eq!(normalize("  ID100001  "), expected);
        assert_eq!(normalize("ID 100 001"), expected);
        assert_eq!(normalize("\tID100\r\n001 "), expected);
        assert_eq!(expected.as_str(), "ID100001");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["", "   ", "a b\tc\nd", " 8001015009087 ", "ÄB C", "x\u{00A0}y"] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn empty_and_blank_inputs_yield_empty_key() {
        assert!(normalize("").is_empty());
        assert!(normalize(" \n\t ").is_empty());
    }

    #[test]
    fn case_is_preserved() {
        assert_ne!(normalize("id1"), normalize("ID1"));
    }
}
