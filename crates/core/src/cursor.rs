//! Opaque pagination cursors.
//!
//! A cursor wraps the sort-value tuple of the last hit of the previous page:
//! `base64(JSON({"sort": [...]}))`. The payload is only ever trusted for
//! continuation position, never for filters, and any decode failure is
//! treated as "no cursor" so pagination restarts instead of erroring.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CursorEnvelope {
    sort: Vec<serde_json::Value>,
}

/// Encode a sort tuple into an opaque cursor string.
pub fn encode(sort: &[serde_json::Value]) -> String {
    let envelope = CursorEnvelope {
        sort: sort.to_vec(),
    };
    // Serializing a Vec<Value> cannot fail.
    let json = serde_json::to_vec(&envelope).unwrap_or_default();
    STANDARD.encode(json)
}

/// Decode a cursor back into its sort tuple.
///
/// Returns `None` for anything malformed: bad base64, bad JSON, a missing
/// `sort` field, or an empty tuple.
pub fn decode(cursor: &str) -> Option<Vec<serde_json::Value>> {
    let bytes = STANDARD.decode(cursor).ok()?;
    let envelope: CursorEnvelope = serde_json::from_slice(&bytes).ok()?;
    if envelope.sort.is_empty() {
        None
    } else {
        Some(envelope.sort)
    }
}
