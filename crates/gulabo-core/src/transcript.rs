// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialization of the stored conversation transcript.
//!
//! Storage keeps the transcript as opaque JSON text; only the pipeline
//! interprets it. Decoding never fails: a corrupt transcript reads as empty.

use tracing::warn;

use crate::error::GulaboError;
use crate::types::Turn;

/// The serialized form of an empty transcript.
pub const EMPTY: &str = "[]";

/// Decode a stored transcript. Invalid input yields an empty history.
pub fn decode(raw: &str) -> Vec<Turn> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(turns) => turns,
        Err(e) => {
            warn!(error = %e, "stored transcript is not valid, starting from empty history");
            Vec::new()
        }
    }
}

/// Encode a transcript for storage.
pub fn encode(turns: &[Turn]) -> Result<String, GulaboError> {
    serde_json::to_string(turns).map_err(|e| GulaboError::Internal(format!(
        "failed to serialize transcript: {e}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn garbage_decodes_to_empty() {
        assert!(decode("{not json").is_empty());
        assert!(decode(r#"{"role":"user"}"#).is_empty());
        assert!(decode("").is_empty());
    }

    #[test]
    fn stored_order_is_preserved() {
        let raw = r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#;
        let turns = decode(raw);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "hello");
        assert_eq!(encode(&turns).unwrap(), raw);
    }

    #[test]
    fn empty_constant_decodes_to_nothing() {
        assert!(decode(EMPTY).is_empty());
        assert_eq!(encode(&[]).unwrap(), EMPTY);
    }
}
