//! Command-line arguments generated from a schema

use super::field::{FieldKind, FieldValue};
use super::schema::{SettingsSchema, Source};
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

impl SettingsSchema {
    /// Add one argument per args-eligible field to `command`.
    ///
    /// Boolean fields become presence flags, integer fields parse as `i64`,
    /// everything else takes a string value. The argument id is the field name.
    pub fn augment_command(&self, mut command: Command) -> Command {
        for field in self.eligible(Source::Args) {
            let mut arg = Arg::new(field.name.clone()).long(self.arg_long(field));
            if !field.help.is_empty() {
                arg = arg.help(field.help.clone());
            }
            arg = match field.kind() {
                FieldKind::Bool => arg.action(ArgAction::SetTrue),
                FieldKind::Integer => arg
                    .action(ArgAction::Set)
                    .value_name("N")
                    .value_parser(value_parser!(i64))
                    .default_value(field.default.to_string()),
                FieldKind::String => {
                    let arg = arg.action(ArgAction::Set).value_name("VALUE");
                    if field.default.is_set() && !field.secret {
                        arg.default_value(field.default.to_string())
                    } else {
                        arg
                    }
                }
            };
            command = command.arg(arg);
        }
        command
    }
}

/// The value supplied on the command line for `name`, if it was supplied there.
///
/// Values clap filled in from declared defaults do not count: they must not
/// overwrite what the environment stage resolved.
pub fn supplied_value(matches: &ArgMatches, name: &str, kind: FieldKind) -> Option<FieldValue> {
    // Only ask clap about ids it matched; unknown ids panic in debug builds.
    if !matches.ids().any(|id| id.as_str() == name) {
        return None;
    }
    if matches.value_source(name) != Some(ValueSource::CommandLine) {
        return None;
    }
    match kind {
        FieldKind::Bool => {
            matches.try_get_one::<bool>(name).ok().flatten().map(|_| FieldValue::Bool(true))
        }
        FieldKind::Integer => {
            matches.try_get_one::<i64>(name).ok().flatten().map(|v| FieldValue::Int(*v))
        }
        FieldKind::String => {
            matches.try_get_one::<String>(name).ok().flatten().map(|v| FieldValue::Str(v.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SettingsSchema {
        SettingsSchema::new()
            .string("host_address", "", "Host fqdn/address")
            .string("slack_channel", "#alerts", "Channel")
            .flag("debug", "Sets logging to debug")
            .integer("timeout", 20, "Timeout")
            .flag("print_config", "")
            .exclude(Source::Args, ["print_config"])
    }

    fn parse(args: &[&str]) -> ArgMatches {
        let cmd = schema().augment_command(Command::new("test"));
        cmd.try_get_matches_from(std::iter::once("test").chain(args.iter().copied()))
            .expect("parse")
    }

    #[test]
    fn supplied_string_is_returned() {
        let m = parse(&["--host-address", "10.0.0.5"]);
        assert_eq!(
            supplied_value(&m, "host_address", FieldKind::String),
            Some(FieldValue::Str("10.0.0.5".into()))
        );
    }

    #[test]
    fn clap_defaults_are_not_supplied_values() {
        let m = parse(&[]);
        assert_eq!(supplied_value(&m, "slack_channel", FieldKind::String), None);
        assert_eq!(supplied_value(&m, "timeout", FieldKind::Integer), None);
        assert_eq!(supplied_value(&m, "debug", FieldKind::Bool), None);
    }

    #[test]
    fn flag_presence_is_true() {
        let m = parse(&["--debug"]);
        assert_eq!(supplied_value(&m, "debug", FieldKind::Bool), Some(FieldValue::Bool(true)));
    }

    #[test]
    fn integer_arguments_are_typed() {
        let m = parse(&["--timeout", "5"]);
        assert_eq!(supplied_value(&m, "timeout", FieldKind::Integer), Some(FieldValue::Int(5)));
        let cmd = schema().augment_command(Command::new("test"));
        assert!(cmd.try_get_matches_from(["test", "--timeout", "five"]).is_err());
    }

    #[test]
    fn excluded_fields_get_no_argument() {
        let cmd = schema().augment_command(Command::new("test"));
        assert!(cmd.try_get_matches_from(["test", "--print-config"]).is_err());
    }

    #[test]
    fn unknown_ids_are_not_supplied() {
        let m = parse(&[]);
        assert_eq!(supplied_value(&m, "print_config", FieldKind::Bool), None);
    }
}
