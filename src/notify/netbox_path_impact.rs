//! Fan-out of a notification to the contacts of impacted Netbox paths
//!
//! The object named by `host_name` is looked up in Netbox, its impact
//! assessment lists the paths running through it, and the configured
//! notification script runs once per path contact.

use super::{base_schema, default_config_file, finish_schema, resolve_section};
use crate::config::{FieldValue, ResolvedConfig, SettingsError, SettingsSchema, Source};
use crate::netbox::{id_string, ImpactedPath, NetboxClient};
use anyhow::{Context, Result};
use std::fmt::Write;
use std::process::Command;

/// Fields that are not passed on to the notification script.
const NOT_FORWARDED: &[&str] =
    &["config_file", "object_type", "notification_script", "host_output", "print_config"];

pub fn schema() -> SettingsSchema {
    finish_schema(
        base_schema("NOTIFY_NETBOX_PATH_IMPACT_", Some(&default_config_file("netbox-path-impact")))
            .string("object_type", "", "Netbox object type of the host, e.g. dcim.devices")
            .string("notification_script", "", "Command run for every impacted contact"),
    )
}

pub fn netbox_schema() -> SettingsSchema {
    SettingsSchema::section("netbox")
        .string("url", "", "Netbox base url without trailing slash")
        .secret("token", "", "Netbox API token")
        .string("api_device", "", "Device API path")
        .string("api_vm", "", "Virtual machine API path")
        .string("api_impact", "", "Impact assessment API path")
        .string("proxy", "", "Proxy for Netbox requests")
        .integer("timeout", 20, "Request timeout in seconds")
}

pub fn sections() -> Vec<SettingsSchema> {
    vec![netbox_schema()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetboxSettings {
    pub url: String,
    pub token: String,
    pub api_impact: String,
    pub proxy: String,
    pub timeout: u64,
}

impl NetboxSettings {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SettingsError> {
        Ok(Self {
            url: config.string("url")?,
            token: config.string("token")?,
            api_impact: config.string("api_impact")?,
            proxy: config.string("proxy")?,
            timeout: u64::try_from(config.integer("timeout")?).unwrap_or(0),
        })
    }
}

/// The arguments this run was given, in a form the notification script
/// accepts: set flags as `--flag`, non-empty values as `--name value`.
pub fn forwarded_args(schema: &SettingsSchema, config: &ResolvedConfig) -> Vec<String> {
    let mut args = Vec::new();
    for field in schema.eligible(Source::Args) {
        if NOT_FORWARDED.contains(&field.name.as_str()) {
            continue;
        }
        match config.get(&field.name) {
            Some(FieldValue::Bool(true)) => args.push(schema.arg_flag(field)),
            Some(FieldValue::Str(s)) if !s.is_empty() => {
                args.push(schema.arg_flag(field));
                args.push(s.clone());
            }
            Some(FieldValue::Int(i)) => {
                args.push(schema.arg_flag(field));
                args.push(i.to_string());
            }
            _ => {}
        }
    }
    args
}

/// Text sent as the host output: the path and its undirected objects.
pub fn path_message(path: &ImpactedPath) -> String {
    let mut message = format!("Impacted Path: {}\n", path.name);
    for object in path.objects.iter().filter(|o| o.direction.is_empty()) {
        let _ = writeln!(
            message,
            "Object: {} - {} - {}",
            object.name, object.object_type, object.description
        );
    }
    message
}

pub fn run(config: &ResolvedConfig, schema: &SettingsSchema) -> Result<()> {
    let script = config.string("notification_script")?;
    let program = shlex::split(&script)
        .filter(|words| !words.is_empty())
        .with_context(|| format!("Invalid notification_script: '{script}'"))?;

    let settings = NetboxSettings::from_config(&resolve_section(config, &netbox_schema())?)?;
    let client = NetboxClient::new(&settings.url, &settings.token, &settings.proxy, settings.timeout)?;

    let host_name = config.string("host_name")?;
    let object_type = config.string("object_type")?.replace('.', "/");
    tracing::debug!("Looking up {object_type} {host_name} in {}", client.base_url());

    let Some(object) = client.search(&format!("/api/{object_type}"), "name", &host_name) else {
        tracing::warn!("Found no objects that match {host_name}");
        return Ok(());
    };
    let id = object.get("id").map(id_string).unwrap_or_default();
    let paths = client.impact_assessment(&settings.api_impact, &id, &object_type.replace('/', "."));

    let forwarded = forwarded_args(schema, config);
    tracing::debug!("Arguments: {program:?} {forwarded:?}");

    for path in &paths {
        let message = path_message(path);
        for contact in path.contacts.iter().filter(|c| !c.email.is_empty()) {
            let output = Command::new(&program[0])
                .args(&program[1..])
                .args(&forwarded)
                .args(["--email-to", contact.email.as_str(), "--host-output", message.as_str()])
                .output();
            match output {
                Ok(output) => tracing::info!(
                    "Notified {} for path {}: {} stdout: {} stderr: {}",
                    contact.email,
                    path.name,
                    output.status,
                    String::from_utf8_lossy(&output.stdout).trim(),
                    String::from_utf8_lossy(&output.stderr).trim(),
                ),
                Err(e) => tracing::error!("Failed to run {} for {}: {e}", program[0], contact.email),
            }
        }
    }
    Ok(())
}
