//! Human-readable configuration listings for `--print-config`

use super::resolve::ResolvedConfig;
use super::schema::{SettingsSchema, Source};
use std::fmt::Write;

/// Resolved values tagged with their origin, one per line.
pub fn format_resolved(title: &str, config: &ResolvedConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}:");
    for field in config.fields() {
        let _ = writeln!(out, "  {} = {} ({})", field.name, field.display_value(), field.origin);
    }
    out
}

/// `--flag = value` for every args-eligible field.
pub fn format_arguments(schema: &SettingsSchema, config: &ResolvedConfig) -> String {
    let mut out = String::from("Argument list is:\n");
    for field in schema.eligible(Source::Args) {
        let _ = writeln!(out, "{} = {}", schema.arg_flag(field), shown(config, &field.name));
    }
    out
}

/// `PREFIX_NAME = value` for every env-eligible field.
pub fn format_environment(schema: &SettingsSchema, config: &ResolvedConfig) -> String {
    let mut out = String::from("Environment vars list is:\n");
    for field in schema.eligible(Source::Env) {
        let _ = writeln!(out, "{} = {}", schema.env_var_name(field), shown(config, &field.name));
    }
    out
}

fn shown(config: &ResolvedConfig, name: &str) -> String {
    config
        .fields()
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.display_value())
        .unwrap_or_default()
}
