// SPDX-License-Identifier: MIT

//! Canonical serialization used to compute stable hashes.
//!
//! Two independent call sites need a byte-stable representation of a
//! [`serde_json::Value`]: the Tool Interception layer's `arg_hash` (spec
//! §4.4) and the `execution_hash` in [`crate::execution::ExecutionSnapshot`]
//! (spec §3). Both go through [`canonicalize`] so that unstable map-key
//! ordering never silently breaks deduplication (spec §9).

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Rewrite a JSON value into a canonical form: object keys sorted
/// lexicographically at every level, arrays left in place (order is
/// significant there), and numbers/strings passed through as serde_json
/// already normalizes their textual form.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Render `value` as compact canonical JSON text.
///
/// `Value` can only hold finite floats (`serde_json::Number` refuses NaN
/// and infinities at construction), so serialization of an already-parsed
/// `Value` cannot fail in practice; `unwrap_or_default` just avoids a panic
/// path in library code for the case serde_json ever changes that guarantee.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

/// SHA-256 over `canonical(tool_name, args, kwargs)` (spec §4.4).
///
/// `args` is a positional argument list, `kwargs` a keyword map; both are
/// folded into one canonical object so that `{"a": 1}` and a positional
/// `[1]` for the same logical call hash identically only when the adapter
/// itself normalizes them — the Runtime only guarantees that the *same*
/// canonical input always yields the *same* hash.
pub fn arg_hash(tool_name: &str, args: &[Value], kwargs: &Value) -> String {
    let envelope = serde_json::json!({
        "tool_name": tool_name,
        "args": args,
        "kwargs": kwargs,
    });
    let text = canonical_json(&envelope);
    let digest = Sha256::digest(text.as_bytes());
    to_hex(&digest)
}

/// Lower-case hex encoding, shared by `arg_hash` and `execution_hash`.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
#[path = "canonical_tests.rs"]
mod tests;
