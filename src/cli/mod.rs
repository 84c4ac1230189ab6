//! Command-line interface for icinga-notify
//!
//! One subcommand per notification plugin, plus `basket` to export the
//! Icinga Director configuration of a plugin.

use crate::notify::Plugin;
use anyhow::{Context, Result};
use clap::{crate_version, Command};

mod basket;

pub fn build_cli() -> Command {
    let mut command = Command::new("icinga-notify")
        .version(crate_version!())
        .about("Icinga2 notification plugins")
        .long_about(
            "Icinga2 notification plugins.\n\n\
             Every plugin setting can be given as an environment variable, a command-line \
             argument or a key in the plugin's JSON config file. Later sources win: \
             config file over arguments over environment over defaults.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true);
    for plugin in Plugin::ALL {
        command = command.subcommand(plugin.command());
    }
    command.subcommand(basket::command())
}

pub fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    match matches.subcommand() {
        Some((basket::NAME, sub)) => basket::run(sub),
        Some((name, sub)) => Plugin::from_name(name)
            .with_context(|| format!("Unknown plugin: {name}"))?
            .run(sub),
        None => anyhow::bail!("No subcommand given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn plugin_flags_come_from_schema() {
        let matches = build_cli()
            .try_get_matches_from(["icinga-notify", "slack", "--host-name", "web01", "--debug"])
            .expect("parse");
        let (name, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "slack");
        assert_eq!(sub.get_one::<String>("host_name").map(String::as_str), Some("web01"));
        assert!(sub.get_flag("debug"));
    }

    #[test]
    fn print_config_is_a_flag_everywhere() {
        for plugin in Plugin::ALL {
            let result = build_cli().try_get_matches_from(["icinga-notify", plugin.name(), "--print-config"]);
            assert!(result.is_ok(), "{}", plugin.name());
        }
    }

    #[test]
    fn pushover_has_no_config_file_flag() {
        let result =
            build_cli().try_get_matches_from(["icinga-notify", "pushover", "--config-file", "x.json"]);
        assert!(result.is_err());
    }
}
