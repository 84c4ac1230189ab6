//! Field declarations and typed values

use serde::Serialize;
use std::fmt;

/// Prefix marking internal fields that no source may populate.
pub const RESERVED_PREFIX: char = '_';

/// The kind of a field, fixed by the kind of its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Integer => "integer",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Str(_) => FieldKind::String,
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Integer,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Whether the value carries anything worth forwarding (non-empty string, `true`).
    pub fn is_set(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
            Self::Int(_) => true,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// One declared configuration field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub default: FieldValue,
    pub help: String,
    pub secret: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, default: impl Into<FieldValue>) -> Self {
        Self { name: name.into(), default: default.into(), help: String::new(), secret: false }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Mask the value whenever the configuration is printed or logged.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.default.kind()
    }

    pub fn is_reserved(&self) -> bool {
        self.name.starts_with(RESERVED_PREFIX)
    }
}

/// Truthy tokens accepted from environment variables.
const TRUE_TOKENS: &[&str] = &["true", "1", "yes", "on"];
/// Falsy tokens accepted from environment variables.
const FALSE_TOKENS: &[&str] = &["false", "0", "no", "off"];

/// Parse a boolean from the fixed token set, case-insensitively.
pub fn parse_bool_token(raw: &str) -> Option<bool> {
    let token = raw.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a raw string into a value of `kind`.
pub fn parse_as(kind: FieldKind, raw: &str) -> Result<FieldValue, String> {
    match kind {
        FieldKind::String => Ok(FieldValue::Str(raw.to_string())),
        FieldKind::Bool => parse_bool_token(raw)
            .map(FieldValue::Bool)
            .ok_or_else(|| format!("'{raw}' is not one of {TRUE_TOKENS:?} or {FALSE_TOKENS:?}")),
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| format!("'{raw}' is not an integer: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fixes_kind() {
        assert_eq!(FieldSpec::new("debug", false).kind(), FieldKind::Bool);
        assert_eq!(FieldSpec::new("host_name", "").kind(), FieldKind::String);
        assert_eq!(FieldSpec::new("timeout", 20).kind(), FieldKind::Integer);
    }

    #[test]
    fn bool_tokens_are_case_insensitive() {
        assert_eq!(parse_bool_token("TRUE"), Some(true));
        assert_eq!(parse_bool_token(" yes "), Some(true));
        assert_eq!(parse_bool_token("Off"), Some(false));
        assert_eq!(parse_bool_token("maybe"), None);
        assert_eq!(parse_bool_token(""), None);
    }

    #[test]
    fn integer_parse_rejects_garbage() {
        assert_eq!(parse_as(FieldKind::Integer, "42"), Ok(FieldValue::Int(42)));
        assert!(parse_as(FieldKind::Integer, "42s").is_err());
        assert!(parse_as(FieldKind::Integer, "").is_err());
    }

    #[test]
    fn strings_pass_through_verbatim() {
        assert_eq!(parse_as(FieldKind::String, " a b "), Ok(FieldValue::Str(" a b ".into())));
    }

    #[test]
    fn reserved_names_are_detected() {
        assert!(FieldSpec::new("_json_dict_key", "").is_reserved());
        assert!(!FieldSpec::new("json_dict_key", "").is_reserved());
    }
}
