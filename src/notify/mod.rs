//! Notification plugins
//!
//! Every plugin declares a field schema. The same schema generates the
//! subcommand flags, the environment variable names, the `--print-config`
//! listing and the Director basket.

pub mod mail;
pub mod netbox_path_impact;
pub mod pushover;
pub mod request_tracker;
pub mod slack;

use crate::config::display::{format_arguments, format_environment, format_resolved};
use crate::config::{ConfigResolver, ProcessEnv, ResolvedConfig, SettingsSchema, Source};
use crate::icinga::{with_logging_fields, with_notification_fields};
use crate::logging::{init_logging, with_bootstrap_logging, LogOptions};
use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use std::path::PathBuf;

pub const LOG_DIR: &str = "/var/log/icinga2";
pub const CONFIG_DIR: &str = "/etc/icinga2/scripts/config";

/// Root config-file keys plugins accept; everything else lives in sections.
pub const FILE_FIELDS: &[&str] = &["debug", "disable_log_file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plugin {
    Mail,
    Slack,
    Pushover,
    RequestTracker,
    NetboxPathImpact,
}

impl Plugin {
    pub const ALL: [Plugin; 5] = [
        Plugin::Mail,
        Plugin::Slack,
        Plugin::Pushover,
        Plugin::RequestTracker,
        Plugin::NetboxPathImpact,
    ];

    /// Subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mail => "mail",
            Self::Slack => "slack",
            Self::Pushover => "pushover",
            Self::RequestTracker => "request-tracker",
            Self::NetboxPathImpact => "netbox-path-impact",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Proper name used for Director objects.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Mail => "Enhanced Email",
            Self::Slack => "Slack",
            Self::Pushover => "Pushover",
            Self::RequestTracker => "Request Tracker",
            Self::NetboxPathImpact => "Netbox Path Impact",
        }
    }

    pub fn about(&self) -> &'static str {
        match self {
            Self::Mail => "Send enhanced email notifications with links to Grafana and Netbox",
            Self::Slack => "Post notifications to a Slack webhook",
            Self::Pushover => "Send notifications through Pushover",
            Self::RequestTracker => "Create and track RT tickets for critical hosts and services",
            Self::NetboxPathImpact => "Notify the contacts of Netbox paths impacted by an object",
        }
    }

    pub fn schema(&self) -> SettingsSchema {
        match self {
            Self::Mail => mail::schema(),
            Self::Slack => slack::schema(),
            Self::Pushover => pushover::schema(),
            Self::RequestTracker => request_tracker::schema(),
            Self::NetboxPathImpact => netbox_path_impact::schema(),
        }
    }

    /// Nested config-file sections the plugin reads.
    pub fn sections(&self) -> Vec<SettingsSchema> {
        match self {
            Self::Mail => mail::sections(),
            Self::Slack => slack::sections(),
            Self::Pushover => Vec::new(),
            Self::RequestTracker => request_tracker::sections(),
            Self::NetboxPathImpact => netbox_path_impact::sections(),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        PathBuf::from(LOG_DIR).join(format!("notification-{}.log", self.name()))
    }

    pub fn command(&self) -> Command {
        self.schema().augment_command(Command::new(self.name()).about(self.about()))
    }

    /// Resolve settings, then either print them or send the notification.
    pub fn run(&self, matches: &ArgMatches) -> Result<()> {
        let schema = self.schema();
        let config = with_bootstrap_logging(|| {
            ConfigResolver::new(&schema).resolve(&ProcessEnv, Some(matches))
        })?;

        if config.flag("print_config")? {
            print!("{}", self.describe(&schema, &config)?);
            return Ok(());
        }

        init_logging(&LogOptions {
            debug: config.flag("debug")?,
            disable_log_file: config.flag("disable_log_file")?,
            log_file: self.log_file(),
        });
        tracing::debug!(
            "{}",
            serde_json::to_string_pretty(&config.to_masked_json()).context("Failed to render settings")?
        );

        let result = match self {
            Self::Mail => mail::run(&config),
            Self::Slack => slack::run(&config),
            Self::Pushover => pushover::run(&config),
            Self::RequestTracker => request_tracker::run(&config),
            Self::NetboxPathImpact => netbox_path_impact::run(&config, &schema),
        };
        if let Err(e) = &result {
            tracing::error!("{} notification failed: {e:#}", self.name());
        }
        result
    }

    /// The `--print-config` listing: resolved values with origins, section
    /// values, then the argument and environment names.
    pub fn describe(&self, schema: &SettingsSchema, config: &ResolvedConfig) -> Result<String> {
        let mut out = format_resolved("Settings", config);
        for section in self.sections() {
            let resolved = resolve_section(config, &section)?;
            out.push('\n');
            out.push_str(&format_resolved(section.nested_key_str().unwrap_or("section"), &resolved));
        }
        out.push('\n');
        out.push_str(&format_arguments(schema, config));
        out.push('\n');
        out.push_str(&format_environment(schema, config));
        Ok(out)
    }
}

/// Fields shared by every plugin, in declaration order: the optional config
/// file, logging switches, then the Icinga notification macros.
pub fn base_schema(env_prefix: &str, config_file: Option<&str>) -> SettingsSchema {
    let mut schema = SettingsSchema::new().env_prefix(env_prefix);
    if let Some(path) = config_file {
        schema = schema
            .string("config_file", path, "JSON config file")
            .config_file_field("config_file");
    }
    with_notification_fields(with_logging_fields(schema))
}

/// Final `print_config` switch, kept out of the environment.
pub fn finish_schema(schema: SettingsSchema) -> SettingsSchema {
    schema
        .flag("print_config", "Print the configuration and exit")
        .exclude(Source::Env, ["print_config"])
        .include(Source::File, FILE_FIELDS.iter().copied())
}

pub fn default_config_file(plugin: &str) -> String {
    format!("{CONFIG_DIR}/{plugin}-notification.json")
}

/// Resolve one nested section from the plugin's config document.
pub fn resolve_section(config: &ResolvedConfig, section: &SettingsSchema) -> Result<ResolvedConfig> {
    let resolved = ConfigResolver::new(section).resolve_section(config.document())?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for plugin in Plugin::ALL {
            assert_eq!(Plugin::from_name(plugin.name()), Some(plugin));
        }
        assert_eq!(Plugin::from_name("sms"), None);
    }

    #[test]
    fn log_files_are_per_plugin() {
        assert_eq!(
            Plugin::RequestTracker.log_file(),
            PathBuf::from("/var/log/icinga2/notification-request-tracker.log")
        );
    }

    #[test]
    fn every_plugin_shares_the_common_fields() {
        for plugin in Plugin::ALL {
            let schema = plugin.schema();
            for name in ["debug", "disable_log_file", "host_name", "service_state", "print_config"] {
                assert!(schema.get(name).is_some(), "{} lacks {name}", plugin.name());
            }
            assert!(!schema.is_eligible(Source::Env, "print_config"));
            assert!(!schema.is_eligible(Source::File, "host_name"));
            assert!(schema.is_eligible(Source::File, "debug"));
        }
    }

    #[test]
    fn describe_lists_sections_and_names() {
        let plugin = Plugin::Slack;
        let schema = plugin.schema();
        let config = ConfigResolver::new(&schema)
            .resolve(&[("NOTIFY_SLACK_CONFIG_FILE", "")], None)
            .expect("resolve");
        let text = plugin.describe(&schema, &config).expect("describe");
        assert!(text.contains("Settings:"));
        assert!(text.contains("slack:"));
        assert!(text.contains("  botname = icinga2 (default)"));
        assert!(text.contains("--slack-channel = #alerts"));
        assert!(text.contains("NOTIFY_SLACK_SLACK_CHANNEL = #alerts"));
        assert!(!text.contains("NOTIFY_SLACK_PRINT_CONFIG"));
    }
}
