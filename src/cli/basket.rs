//! `basket` subcommand: Icinga Director basket export

use crate::icinga::{notification_basket, NotificationBasketOptions};
use crate::notify::Plugin;
use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgMatches, Command};

pub const NAME: &str = "basket";

const DEFAULT_COMMAND: &str = "/etc/icinga2/scripts/icinga-notify";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Print the Icinga Director basket for a plugin")
        .arg(
            Arg::new("plugin")
                .required(true)
                .value_parser(PossibleValuesParser::new(Plugin::ALL.map(|p| p.name())))
                .help("Plugin to export"),
        )
        .arg(
            Arg::new("command")
                .long("command")
                .default_value(DEFAULT_COMMAND)
                .help("Path of the icinga-notify binary on the Icinga host"),
        )
        .arg(
            Arg::new("start_id")
                .long("start-id")
                .value_parser(value_parser!(u32))
                .default_value("1111")
                .help("First datafield id"),
        )
        .arg(
            Arg::new("var_prefix")
                .long("var-prefix")
                .help("Prefix of the Icinga custom variables [default: plugin name]"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let name = matches.get_one::<String>("plugin").context("plugin is required")?;
    let plugin = Plugin::from_name(name).with_context(|| format!("Unknown plugin: {name}"))?;

    let options = NotificationBasketOptions {
        name: plugin.title().to_string(),
        command: matches
            .get_one::<String>("command")
            .cloned()
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
        subcommand: Some(plugin.name().to_string()),
        var_prefix: matches.get_one::<String>("var_prefix").cloned(),
        command_name: None,
        start_id: matches.get_one::<u32>("start_id").copied().unwrap_or(1111),
    };
    let basket = notification_basket(&plugin.schema(), &options);
    println!("{}", basket.to_json_pretty().context("Failed to serialize basket")?);
    Ok(())
}
