//! Declarative settings schemas
//!
//! A schema is the ordered list of fields a plugin owns, plus the rules that
//! decide which source may write which field.

use super::field::{FieldSpec, FieldValue};
use std::fmt;

/// One of the three places a value can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Env,
    Args,
    File,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Env, Source::Args, Source::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Args => "args",
            Self::File => "file",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source allow-list and deny-list.
///
/// A name in `exclude` is never eligible. When `include` is non-empty only
/// the names it lists are eligible.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl SourceFilter {
    pub fn allows(&self, name: &str) -> bool {
        if self.exclude.iter().any(|n| n == name) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsSchema {
    fields: Vec<FieldSpec>,
    env_prefix: String,
    args_prefix: String,
    nested_key: Option<String>,
    config_file_field: Option<String>,
    env: SourceFilter,
    args: SourceFilter,
    file: SourceFilter,
}

impl Default for SettingsSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSchema {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            env_prefix: "SETTINGS_".to_string(),
            args_prefix: String::new(),
            nested_key: None,
            config_file_field: None,
            env: SourceFilter::default(),
            args: SourceFilter::default(),
            file: SourceFilter::default(),
        }
    }

    /// Schema for a nested config-file section (`{"<key>": {...}}`).
    pub fn section(key: impl Into<String>) -> Self {
        Self::new().nested_key(key)
    }

    /// Declare a field. Declaration order is the enumeration order everywhere.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        debug_assert!(
            !self.fields.iter().any(|f| f.name == spec.name),
            "duplicate field {}",
            spec.name
        );
        self.fields.push(spec);
        self
    }

    pub fn string(self, name: &str, default: &str, help: &str) -> Self {
        self.field(FieldSpec::new(name, default).help(help))
    }

    pub fn flag(self, name: &str, help: &str) -> Self {
        self.field(FieldSpec::new(name, false).help(help))
    }

    pub fn integer(self, name: &str, default: i64, help: &str) -> Self {
        self.field(FieldSpec::new(name, default).help(help))
    }

    pub fn secret(self, name: &str, default: &str, help: &str) -> Self {
        self.field(FieldSpec::new(name, default).help(help).secret())
    }

    /// Set the environment variable prefix, e.g. `NOTIFY_SLACK_`.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Set the argument prefix, e.g. `my-` for `--my-foo`.
    pub fn args_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.args_prefix = prefix.into();
        self
    }

    /// Read file values from `document[key]` instead of the document root.
    pub fn nested_key(mut self, key: impl Into<String>) -> Self {
        self.nested_key = Some(key.into());
        self
    }

    /// Name the string field holding the JSON config file path.
    pub fn config_file_field(mut self, name: impl Into<String>) -> Self {
        self.config_file_field = Some(name.into());
        self
    }

    pub fn exclude<I, S>(mut self, source: Source, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_mut(source).exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Exclude names from every source.
    pub fn exclude_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for source in Source::ALL {
            self = self.exclude(source, names.iter().cloned());
        }
        self
    }

    pub fn include<I, S>(mut self, source: Source, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_mut(source).include.extend(names.into_iter().map(Into::into));
        self
    }

    fn filter_mut(&mut self, source: Source) -> &mut SourceFilter {
        match source {
            Source::Env => &mut self.env,
            Source::Args => &mut self.args,
            Source::File => &mut self.file,
        }
    }

    pub fn filter(&self, source: Source) -> &SourceFilter {
        match source {
            Source::Env => &self.env,
            Source::Args => &self.args,
            Source::File => &self.file,
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|f| (f.name.as_str(), &f.default))
    }

    pub fn env_prefix_str(&self) -> &str {
        &self.env_prefix
    }

    pub fn nested_key_str(&self) -> Option<&str> {
        self.nested_key.as_deref()
    }

    pub fn config_file_field_name(&self) -> Option<&str> {
        self.config_file_field.as_deref()
    }

    /// Fields `source` may write, in declaration order.
    ///
    /// Reserved names are dropped, then the source's exclude list, then, if
    /// non-empty, everything not in its include list.
    pub fn eligible(&self, source: Source) -> Vec<&FieldSpec> {
        let filter = self.filter(source);
        self.fields.iter().filter(|f| !f.is_reserved() && filter.allows(&f.name)).collect()
    }

    pub fn is_eligible(&self, source: Source, name: &str) -> bool {
        self.eligible(source).iter().any(|f| f.name == name)
    }

    /// `<env_prefix><NAME_UPPER>`
    pub fn env_var_name(&self, field: &FieldSpec) -> String {
        format!("{}{}", self.env_prefix, field.name.to_uppercase())
    }

    /// `<args_prefix><name-with-dashes>`, without the leading `--`.
    pub fn arg_long(&self, field: &FieldSpec) -> String {
        format!("{}{}", self.args_prefix, field.name.replace('_', "-"))
    }

    /// `--<args_prefix><name-with-dashes>`
    pub fn arg_flag(&self, field: &FieldSpec) -> String {
        format!("--{}", self.arg_long(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SettingsSchema {
        SettingsSchema::new()
            .env_prefix("NOTIFY_X_")
            .string("config_file", "settings.json", "")
            .flag("debug", "")
            .string("host_address", "", "")
            .field(FieldSpec::new("_internal", ""))
            .flag("print_config", "")
    }

    fn names(fields: Vec<&FieldSpec>) -> Vec<&str> {
        fields.into_iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn eligible_keeps_declaration_order_and_drops_reserved() {
        let s = schema();
        assert_eq!(
            names(s.eligible(Source::Args)),
            vec!["config_file", "debug", "host_address", "print_config"]
        );
    }

    #[test]
    fn exclude_list_drops_field_for_that_source_only() {
        let s = schema().exclude(Source::Env, ["print_config", "debug"]);
        assert_eq!(names(s.eligible(Source::Env)), vec!["config_file", "host_address"]);
        assert!(s.is_eligible(Source::Args, "debug"));
        assert!(s.is_eligible(Source::File, "print_config"));
    }

    #[test]
    fn include_list_restricts_source() {
        let s = schema().include(Source::File, ["debug"]);
        assert_eq!(names(s.eligible(Source::File)), vec!["debug"]);
        assert_eq!(s.eligible(Source::Env).len(), 4);
    }

    #[test]
    fn exclude_wins_over_include() {
        let s = schema().include(Source::File, ["debug"]).exclude(Source::File, ["debug"]);
        assert!(s.eligible(Source::File).is_empty());
    }

    #[test]
    fn exclude_all_covers_every_source() {
        let s = schema().exclude_all(["config_file"]);
        for source in Source::ALL {
            assert!(!s.is_eligible(source, "config_file"), "{source}");
        }
    }

    #[test]
    fn names_follow_prefix_conventions() {
        let s = schema().args_prefix("my-");
        let field = s.get("host_address").expect("field");
        assert_eq!(s.env_var_name(field), "NOTIFY_X_HOST_ADDRESS");
        assert_eq!(s.arg_flag(field), "--my-host-address");
    }
}
