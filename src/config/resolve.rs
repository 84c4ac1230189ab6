//! Three-source settings resolution
//!
//! Values start at their declared defaults, then environment variables,
//! command-line arguments and finally the JSON config file are applied in that
//! fixed order. Each stage only writes fields eligible for its source.

use super::args::supplied_value;
use super::env::EnvSource;
use super::error::SettingsError;
use super::field::{parse_as, FieldKind, FieldSpec, FieldValue};
use super::loader::{json_type_name, load_document, select_section};
use super::schema::{SettingsSchema, Source};
use clap::ArgMatches;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Default,
    Env,
    Args,
    File,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Env => "env",
            Self::Args => "args",
            Self::File => "file",
        }
    }
}

impl From<Source> for Origin {
    fn from(source: Source) -> Self {
        match source {
            Source::Env => Self::Env,
            Source::Args => Self::Args,
            Source::File => Self::File,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub value: FieldValue,
    pub origin: Origin,
    pub secret: bool,
}

impl ResolvedField {
    /// The value as it may be shown to a human.
    pub fn display_value(&self) -> String {
        if self.secret && self.value.is_set() {
            "********".to_string()
        } else {
            self.value.to_string()
        }
    }
}

/// Final field values in declaration order. Read-only once resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    fields: Vec<ResolvedField>,
    document: Option<Value>,
}

impl ResolvedConfig {
    /// Every field at its declared default.
    pub fn from_defaults(schema: &SettingsSchema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| ResolvedField {
                name: f.name.clone(),
                value: f.default.clone(),
                origin: Origin::Default,
                secret: f.secret,
            })
            .collect();
        Self { fields, document: None }
    }

    fn set(&mut self, name: &str, value: FieldValue, origin: Origin) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value;
            field.origin = origin;
        }
    }

    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.origin)
    }

    /// The parsed config document, when the file stage ran.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    fn typed(&self, name: &str, requested: FieldKind) -> Result<&FieldValue, SettingsError> {
        let value = self.get(name).ok_or_else(|| SettingsError::UnknownField(name.to_string()))?;
        if value.kind() != requested {
            return Err(SettingsError::WrongKind {
                field: name.to_string(),
                actual: value.kind(),
                requested,
            });
        }
        Ok(value)
    }

    pub fn string(&self, name: &str) -> Result<String, SettingsError> {
        Ok(self.typed(name, FieldKind::String)?.to_string())
    }

    pub fn flag(&self, name: &str) -> Result<bool, SettingsError> {
        Ok(self.typed(name, FieldKind::Bool)?.as_bool().unwrap_or_default())
    }

    pub fn integer(&self, name: &str) -> Result<i64, SettingsError> {
        Ok(self.typed(name, FieldKind::Integer)?.as_int().unwrap_or_default())
    }

    /// Name to value map with secrets masked, for debug logging.
    pub fn to_masked_json(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            let value = if field.secret && field.value.is_set() {
                Value::String(field.display_value())
            } else {
                serde_json::to_value(&field.value).unwrap_or(Value::Null)
            };
            map.insert(field.name.clone(), value);
        }
        Value::Object(map)
    }
}

pub struct ConfigResolver<'a> {
    schema: &'a SettingsSchema,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(schema: &'a SettingsSchema) -> Self {
        Self { schema }
    }

    pub fn eligible_fields(&self, source: Source) -> Vec<&'a FieldSpec> {
        self.schema.eligible(source)
    }

    /// Apply `<prefix><FIELD_NAME_UPPER>` variables. Never fails: values that
    /// do not parse as the field's kind are logged and skipped.
    pub fn resolve_environment<E>(&self, env: &E, config: &mut ResolvedConfig)
    where
        E: EnvSource + ?Sized,
    {
        for field in self.eligible_fields(Source::Env) {
            let key = self.schema.env_var_name(field);
            let Some(raw) = env.var(&key) else {
                continue;
            };
            match parse_as(field.kind(), &raw) {
                Ok(value) => config.set(&field.name, value, Origin::Env),
                Err(reason) => {
                    tracing::warn!("Ignoring environment variable {key}: {reason}");
                }
            }
        }
    }

    /// Apply values supplied on the command line. Flags only ever switch on.
    pub fn resolve_arguments(&self, matches: &ArgMatches, config: &mut ResolvedConfig) {
        for field in self.eligible_fields(Source::Args) {
            if let Some(value) = supplied_value(matches, &field.name, field.kind()) {
                config.set(&field.name, value, Origin::Args);
            }
        }
    }

    /// Apply keys from `document`, or from `document[nested_key]` when the
    /// schema names a section. Values must already have the field's kind.
    pub fn resolve_config_file(
        &self,
        document: &Value,
        config: &mut ResolvedConfig,
    ) -> Result<(), SettingsError> {
        let nested_key = self.schema.nested_key_str();
        let Some(section) = select_section(document, nested_key) else {
            return Ok(());
        };
        if !section.is_object() {
            return Err(SettingsError::NotAnObject {
                section: nested_key.map(str::to_string),
                found: json_type_name(section),
            });
        }
        for field in self.eligible_fields(Source::File) {
            let Some(raw) = section.get(&field.name) else {
                continue;
            };
            let value = json_to_field_value(field, raw).ok_or_else(|| {
                SettingsError::TypeMismatch {
                    field: field.name.clone(),
                    section: nested_key.map(str::to_string),
                    expected: field.kind(),
                    found: json_type_name(raw),
                }
            })?;
            config.set(&field.name, value, Origin::File);
        }
        Ok(())
    }

    /// Defaults, then environment, then arguments, then the config file.
    ///
    /// The file stage runs when the schema names a config-file field whose
    /// resolved value is non-empty; loading errors are fatal.
    pub fn resolve<E>(
        &self,
        env: &E,
        matches: Option<&ArgMatches>,
    ) -> Result<ResolvedConfig, SettingsError>
    where
        E: EnvSource + ?Sized,
    {
        let mut config = ResolvedConfig::from_defaults(self.schema);
        self.resolve_environment(env, &mut config);
        if let Some(matches) = matches {
            self.resolve_arguments(matches, &mut config);
        }

        let config_path = self
            .schema
            .config_file_field_name()
            .and_then(|name| config.get(name))
            .and_then(FieldValue::as_str)
            .filter(|path| !path.is_empty())
            .map(str::to_string);

        if let Some(path) = config_path {
            tracing::debug!("Loading config file {path}");
            let document = load_document(Path::new(&path))?;
            self.resolve_config_file(&document, &mut config)?;
            config.document = Some(document);
        }

        Ok(config)
    }

    /// Resolve a nested section from an already loaded document. Sections
    /// only take values from the file.
    pub fn resolve_section(&self, document: Option<&Value>) -> Result<ResolvedConfig, SettingsError> {
        let mut config = ResolvedConfig::from_defaults(self.schema);
        if let Some(document) = document {
            self.resolve_config_file(document, &mut config)?;
        }
        Ok(config)
    }
}

fn json_to_field_value(field: &FieldSpec, raw: &Value) -> Option<FieldValue> {
    match (field.kind(), raw) {
        (FieldKind::String, Value::String(s)) => Some(FieldValue::Str(s.clone())),
        (FieldKind::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
        (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(FieldValue::Int),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn schema() -> SettingsSchema {
        SettingsSchema::new()
            .env_prefix("NOTIFY_X_")
            .string("config_file", "", "")
            .flag("debug", "")
            .string("host_address", "", "")
            .string("host_name", "localhost", "")
            .integer("timeout", 20, "")
            .config_file_field("config_file")
    }

    fn matches(schema: &SettingsSchema, args: &[&str]) -> ArgMatches {
        schema
            .augment_command(Command::new("t"))
            .try_get_matches_from(std::iter::once("t").chain(args.iter().copied()))
            .expect("args")
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn defaults_only_round_trip() {
        let s = schema();
        let config = ConfigResolver::new(&s).resolve(&no_env(), Some(&matches(&s, &[]))).expect("ok");
        for field in s.fields() {
            assert_eq!(config.get(&field.name), Some(&field.default), "{}", field.name);
            assert_eq!(config.origin(&field.name), Some(Origin::Default));
        }
        assert!(config.document().is_none());
    }

    #[test]
    fn bool_flag_presence_sets_true_and_absence_keeps_env_value() {
        let s = schema();
        let resolver = ConfigResolver::new(&s);

        let config = resolver.resolve(&no_env(), Some(&matches(&s, &["--debug"]))).expect("ok");
        assert_eq!(config.flag("debug").expect("debug"), true);

        let env = [("NOTIFY_X_DEBUG", "true")];
        let config = resolver.resolve(&env, Some(&matches(&s, &[]))).expect("ok");
        assert_eq!(config.flag("debug").expect("debug"), true);
        assert_eq!(config.origin("debug"), Some(Origin::Env));
    }

    #[test]
    fn env_bool_uses_token_set_and_ignores_other_values() {
        let s = schema();
        let resolver = ConfigResolver::new(&s);
        let config = resolver.resolve(&[("NOTIFY_X_DEBUG", "Yes")], None).expect("ok");
        assert_eq!(config.get("debug"), Some(&FieldValue::Bool(true)));

        let config = resolver.resolve(&[("NOTIFY_X_DEBUG", "sometimes")], None).expect("ok");
        assert_eq!(config.get("debug"), Some(&FieldValue::Bool(false)));
        assert_eq!(config.origin("debug"), Some(Origin::Default));
    }

    #[test]
    fn env_integer_that_does_not_parse_keeps_value() {
        let s = schema();
        let config =
            ConfigResolver::new(&s).resolve(&[("NOTIFY_X_TIMEOUT", "soon")], None).expect("ok");
        assert_eq!(config.integer("timeout").expect("timeout"), 20);
    }

    #[test]
    fn excluded_field_is_never_written_by_env() {
        let s = schema().exclude(Source::Env, ["debug"]);
        let config =
            ConfigResolver::new(&s).resolve(&[("NOTIFY_X_DEBUG", "true")], None).expect("ok");
        assert_eq!(config.flag("debug").expect("debug"), false);
    }

    #[test]
    fn excluded_field_is_never_written_by_file() {
        let s = schema().exclude(Source::File, ["host_name"]);
        let mut config = ResolvedConfig::from_defaults(&s);
        ConfigResolver::new(&s)
            .resolve_config_file(&json!({"host_name": "from-file"}), &mut config)
            .expect("ok");
        assert_eq!(config.string("host_name").expect("name"), "localhost");
    }

    #[test]
    fn file_wins_over_args_over_env() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"host_name": "file-host"}"#).expect("write");
        let path = path.to_str().expect("utf8").to_string();

        let s = schema();
        let env = [("NOTIFY_X_HOST_NAME", "env-host")];
        let m = matches(&s, &["--host-name", "arg-host", "--config-file", &path]);
        let config = ConfigResolver::new(&s).resolve(&env, Some(&m)).expect("ok");
        assert_eq!(config.string("host_name").expect("name"), "file-host");
        assert_eq!(config.origin("host_name"), Some(Origin::File));
    }

    #[test]
    fn args_win_over_env() {
        let s = schema();
        let env = [("NOTIFY_X_HOST_NAME", "env-host")];
        let m = matches(&s, &["--host-name", "arg-host"]);
        let config = ConfigResolver::new(&s).resolve(&env, Some(&m)).expect("ok");
        assert_eq!(config.string("host_name").expect("name"), "arg-host");
        assert_eq!(config.origin("host_name"), Some(Origin::Args));
    }

    #[test]
    fn host_address_from_args_scenario() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"debug": false}"#).expect("write");
        let path = path.to_str().expect("utf8").to_string();

        let s = schema();
        let m = matches(&s, &["--host-address", "10.0.0.5", "--config-file", &path]);
        let config = ConfigResolver::new(&s).resolve(&no_env(), Some(&m)).expect("ok");
        assert_eq!(config.string("host_address").expect("addr"), "10.0.0.5");
    }

    #[test]
    fn nested_key_selects_section() {
        let doc = json!({"mail": {"server": "smtp.example.com"}});
        let nested = SettingsSchema::section("mail").string("server", "localhost", "");
        let config = ConfigResolver::new(&nested).resolve_section(Some(&doc)).expect("ok");
        assert_eq!(config.string("server").expect("server"), "smtp.example.com");

        let flat = SettingsSchema::new().string("server", "localhost", "");
        let config = ConfigResolver::new(&flat).resolve_section(Some(&doc)).expect("ok");
        assert_eq!(config.string("server").expect("server"), "localhost");
    }

    #[test]
    fn absent_section_keeps_defaults() {
        let doc = json!({"slack": {}});
        let nested = SettingsSchema::section("mail").string("server", "localhost", "");
        let config = ConfigResolver::new(&nested).resolve_section(Some(&doc)).expect("ok");
        assert_eq!(config.string("server").expect("server"), "localhost");
    }

    #[test]
    fn non_object_sections_are_rejected() {
        let nested = SettingsSchema::section("mail").string("server", "localhost", "");
        let err = ConfigResolver::new(&nested)
            .resolve_section(Some(&json!({"mail": "smtp.example.com"})))
            .expect_err("string section");
        assert!(matches!(
            err,
            SettingsError::NotAnObject { section: Some(ref key), found: "string" } if key == "mail"
        ));

        let s = schema();
        let mut config = ResolvedConfig::from_defaults(&s);
        let err = ConfigResolver::new(&s)
            .resolve_config_file(&json!([]), &mut config)
            .expect_err("array root");
        assert!(matches!(err, SettingsError::NotAnObject { section: None, found: "array" }));
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let s = schema();
        let m = matches(&s, &["--config-file", "/definitely/not/here.json"]);
        let err = ConfigResolver::new(&s).resolve(&no_env(), Some(&m)).expect_err("fatal");
        assert!(matches!(err, SettingsError::FileNotFound { .. }));
    }

    #[test]
    fn file_type_mismatch_is_rejected_at_resolve_time() {
        let s = schema();
        let mut config = ResolvedConfig::from_defaults(&s);
        let err = ConfigResolver::new(&s)
            .resolve_config_file(&json!({"debug": "yes"}), &mut config)
            .expect_err("mismatch");
        assert!(matches!(err, SettingsError::TypeMismatch { found: "string", .. }));

        let err = ConfigResolver::new(&s)
            .resolve_config_file(&json!({"timeout": 2.5}), &mut config)
            .expect_err("mismatch");
        assert!(matches!(err, SettingsError::TypeMismatch { .. }));
    }

    #[test]
    fn typed_accessors_check_kind() {
        let s = schema();
        let config = ResolvedConfig::from_defaults(&s);
        assert!(matches!(config.flag("host_name"), Err(SettingsError::WrongKind { .. })));
        assert!(matches!(config.string("nope"), Err(SettingsError::UnknownField(_))));
    }

    #[test]
    fn masked_json_hides_secrets() {
        let s = SettingsSchema::new().secret("password", "hunter2", "").secret("token", "", "");
        let config = ResolvedConfig::from_defaults(&s);
        let json = config.to_masked_json();
        assert_eq!(json["password"], "********");
        assert_eq!(json["token"], "");
    }
}
