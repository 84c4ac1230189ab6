//! Settings errors

use super::field::FieldKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config file '{}' does not exist", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to open config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}' as JSON: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config key '{field}'{} expects a {expected} value but found {found}", section_suffix(.section))]
    TypeMismatch {
        field: String,
        section: Option<String>,
        expected: FieldKind,
        found: &'static str,
    },

    #[error("config {} must be an object but found {found}", section_name(.section))]
    NotAnObject { section: Option<String>, found: &'static str },

    #[error("unknown setting '{0}'")]
    UnknownField(String),

    #[error("setting '{field}' is a {actual} value, not a {requested}")]
    WrongKind { field: String, actual: FieldKind, requested: FieldKind },
}

fn section_name(section: &Option<String>) -> String {
    match section {
        Some(key) => format!("section '{key}'"),
        None => "file root".to_string(),
    }
}

fn section_suffix(section: &Option<String>) -> String {
    match section {
        Some(key) => format!(" in section '{key}'"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_names_path() {
        let err = SettingsError::FileNotFound { path: PathBuf::from("/nope/settings.json") };
        assert!(err.to_string().contains("/nope/settings.json"));
    }

    #[test]
    fn non_object_section_names_section() {
        let err = SettingsError::NotAnObject { section: Some("mail".into()), found: "string" };
        assert_eq!(err.to_string(), "config section 'mail' must be an object but found string");
        let err = SettingsError::NotAnObject { section: None, found: "array" };
        assert_eq!(err.to_string(), "config file root must be an object but found array");
    }

    #[test]
    fn type_mismatch_names_section() {
        let err = SettingsError::TypeMismatch {
            field: "server".into(),
            section: Some("mail".into()),
            expected: FieldKind::String,
            found: "number",
        };
        assert_eq!(
            err.to_string(),
            "config key 'server' in section 'mail' expects a string value but found number"
        );
    }
}
