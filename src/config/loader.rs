//! Config file loading

use super::error::SettingsError;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read and parse a JSON config document.
///
/// Every failure is a configuration-author error: a missing file, an
/// unreadable file, or invalid JSON.
pub fn load_document(path: &Path) -> Result<Value, SettingsError> {
    if !path.exists() {
        return Err(SettingsError::FileNotFound { path: path.to_path_buf() });
    }

    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SettingsError::FileNotFound { path: path.to_path_buf() },
        _ => SettingsError::FileRead { path: path.to_path_buf(), source },
    })?;

    serde_json::from_str(&content)
        .map_err(|source| SettingsError::InvalidJson { path: path.to_path_buf(), source })
}

/// Select the object file values are read from.
///
/// With a nested key the section `document[key]` is used, an absent section
/// behaving like an empty object.
pub fn select_section<'a>(document: &'a Value, nested_key: Option<&str>) -> Option<&'a Value> {
    match nested_key {
        Some(key) => document.get(key),
        None => Some(document),
    }
}

/// JSON type name used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
