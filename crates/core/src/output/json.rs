use serde::Serialize;
use super::FormatError;

/// Pretty-printed JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_json::to_string_pretty(value).map_err(FormatError::from)
}

/// Single-line JSON, for piping
pub fn to_json_compact<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_json::to_string(value).map_err(FormatError::from)
}
