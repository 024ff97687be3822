//! Folding of the device's current-user payloads into [`UserRef`].
//!
//! The device reports the current user as `null`, a bare profile name, or a
//! full profile record (`{name, data, memories, context}`). Only this module
//! looks at those raw shapes.

use serde_json::{Map, Value};

use crate::types::{MemoryRecord, UserProfile, UserRef};

/// The payload matched none of the known current-user shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("unrecognized current user payload: expected null, string or object, got {kind}")]
    UnknownShape { kind: &'static str },

    #[error("current user record has no name")]
    MissingName,
}

/// Whether a name denotes guest mode.
pub fn is_guest_name(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case("guest")
}

/// Normalize a raw current-user value.
pub fn normalize_current_user(raw: &Value) -> Result<UserRef, NormalizeError> {
    match raw {
        Value::Null => Ok(UserRef::None),
        Value::String(name) => {
            let name = name.trim().trim_matches(&['\'', '"'][..]);
            if is_guest_name(name) {
                Ok(UserRef::None)
            } else {
                Ok(UserRef::IdOnly {
                    id: name.to_string(),
                })
            }
        }
        Value::Object(record) => {
            let profile = profile_from_record(record)?;
            if is_guest_name(&profile.id) {
                return Ok(UserRef::None);
            }
            Ok(UserRef::Full { profile })
        }
        Value::Bool(_) => Err(NormalizeError::UnknownShape { kind: "bool" }),
        Value::Number(_) => Err(NormalizeError::UnknownShape { kind: "number" }),
        Value::Array(_) => Err(NormalizeError::UnknownShape { kind: "array" }),
    }
}

fn profile_from_record(record: &Map<String, Value>) -> Result<UserProfile, NormalizeError> {
    let id = record
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(NormalizeError::MissingName)?;

    let data = record.get("data").and_then(Value::as_object);
    let user_info = data
        .and_then(|d| d.get("USER_INFO"))
        .and_then(Value::as_object);

    let text = |key: &str| {
        user_info
            .and_then(|info| info.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    // `memories` holds the latest entries; older payloads only carry core_memories.
    let memories = record
        .get("memories")
        .or_else(|| data.and_then(|d| d.get("core_memories")))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value::<MemoryRecord>(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(UserProfile {
        id: id.to_string(),
        display_name: text("display_name"),
        preferred_persona: text("preferred_persona"),
        memories,
    })
}
