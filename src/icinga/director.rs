//! Icinga Director basket export
//!
//! A basket is the JSON document Director imports to create a notification
//! command, its data fields and the templates users attach to hosts and
//! services.

use super::notification::standard_field;
use crate::config::{FieldKind, SettingsSchema, Source};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fields that only make sense when running the plugin by hand.
pub const BASKET_EXCLUDED_FIELDS: &[&str] = &["print_config", "build_config"];

const DEFAULT_ARGUMENT_ORDER: i32 = 25;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Sanitize a human name into an Icinga object-safe name.
pub fn icinga_safe_name(name: &str) -> String {
    NON_WORD.replace_all(name, "_").to_lowercase()
}

/// Director's `methods_execute` value for notification commands.
pub const NOTIFICATION_METHODS_EXECUTE: &str = "PluginNotification";

/// Object name prefixes.
pub mod prefix {
    pub const COMMAND: &str = "cmd_notification";
    pub const NOTIFICATION_TEMPLATE: &str = "nott";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFieldType {
    Bool,
    Number,
    String,
}

impl DataFieldType {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Bool => "Icinga\\Module\\Director\\DataType\\DataTypeBoolean",
            Self::Number => "Icinga\\Module\\Director\\DataType\\DataTypeNumber",
            Self::String => "Icinga\\Module\\Director\\DataType\\DataTypeString",
        }
    }
}

impl From<FieldKind> for DataFieldType {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => Self::Bool,
            FieldKind::Integer => Self::Number,
            FieldKind::String => Self::String,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandArgument {
    pub description: String,
    pub skip_key: bool,
    pub repeat_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_if: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectorCommand {
    pub arguments: BTreeMap<String, CommandArgument>,
    pub command: String,
    pub disabled: bool,
    pub fields: Vec<TemplateField>,
    pub methods_execute: &'static str,
    pub object_name: String,
    pub object_type: &'static str,
    pub timeout: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateField {
    pub datafield_id: u32,
    pub is_required: &'static str,
    pub var_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectorTemplate {
    pub command: Option<String>,
    pub disabled: bool,
    pub fields: Vec<TemplateField>,
    pub imports: Vec<String>,
    pub object_name: String,
    pub object_type: &'static str,
    pub timeout: Option<String>,
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatafieldSettings {
    pub visibility: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Datafield {
    pub varname: String,
    pub caption: String,
    pub description: Option<String>,
    pub datatype: &'static str,
    pub format: Option<String>,
    pub settings: DatafieldSettings,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectorBasket {
    #[serde(rename = "Command", skip_serializing_if = "BTreeMap::is_empty")]
    commands: BTreeMap<String, DirectorCommand>,
    #[serde(rename = "NotificationTemplate", skip_serializing_if = "BTreeMap::is_empty")]
    notification_templates: BTreeMap<String, DirectorTemplate>,
    #[serde(rename = "Datafield", skip_serializing_if = "BTreeMap::is_empty")]
    datafields: BTreeMap<String, Datafield>,
}

impl DirectorBasket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(
        &mut self,
        command: &str,
        command_name: &str,
        timeout: &str,
    ) {
        self.commands.insert(
            command_name.to_string(),
            DirectorCommand {
                arguments: BTreeMap::new(),
                command: command.to_string(),
                disabled: false,
                fields: Vec::new(),
                methods_execute: NOTIFICATION_METHODS_EXECUTE,
                object_name: command_name.to_string(),
                object_type: "object",
                timeout: timeout.to_string(),
            },
        );
    }

    /// Add an argument to a command added earlier; unknown commands are ignored.
    pub fn command_argument(&mut self, command_name: &str, key: &str, argument: CommandArgument) {
        if let Some(command) = self.commands.get_mut(command_name) {
            command.arguments.insert(key.to_string(), argument);
        }
    }

    pub fn notification_template(&mut self, name: &str, command: Option<&str>, imports: Vec<String>) {
        self.notification_templates.insert(
            name.to_string(),
            DirectorTemplate {
                command: command.map(str::to_string),
                disabled: false,
                fields: Vec::new(),
                imports,
                object_name: name.to_string(),
                object_type: "template",
                timeout: None,
                vars: BTreeMap::new(),
            },
        );
    }

    pub fn template_field(&mut self, template_name: &str, datafield_id: u32) {
        if let Some(template) = self.notification_templates.get_mut(template_name) {
            template.fields.push(TemplateField { datafield_id, is_required: "n", var_filter: None });
        }
    }

    pub fn template_var(&mut self, template_name: &str, var_name: &str, value: &str) {
        if let Some(template) = self.notification_templates.get_mut(template_name) {
            template.vars.insert(var_name.to_string(), value.to_string());
        }
    }

    pub fn datafield(
        &mut self,
        id: u32,
        varname: &str,
        caption: &str,
        description: &str,
        datatype: DataFieldType,
    ) {
        let caption = if caption.is_empty() { varname } else { caption };
        self.datafields.insert(
            id.to_string(),
            Datafield {
                varname: varname.to_string(),
                caption: caption.to_string(),
                description: Some(description.to_string()).filter(|d| !d.is_empty()),
                datatype: datatype.class(),
                format: None,
                settings: DatafieldSettings { visibility: "visible" },
                category: None,
            },
        );
    }

    pub fn commands(&self) -> &BTreeMap<String, DirectorCommand> {
        &self.commands
    }

    pub fn notification_templates(&self) -> &BTreeMap<String, DirectorTemplate> {
        &self.notification_templates
    }

    pub fn datafields(&self) -> &BTreeMap<String, Datafield> {
        &self.datafields
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Inputs for a notification command basket.
#[derive(Debug, Clone)]
pub struct NotificationBasketOptions {
    /// Proper name, e.g. `Enhanced Email`.
    pub name: String,
    /// Command line Director runs, e.g. `/etc/icinga2/scripts/icinga-notify`.
    pub command: String,
    /// Subcommand passed as the first argument, if any.
    pub subcommand: Option<String>,
    /// Prefix for Icinga custom variables. Defaults to the safe name.
    pub var_prefix: Option<String>,
    /// Object name of the command. Defaults to `cmd_notification_<safe name>`.
    pub command_name: Option<String>,
    /// First datafield id.
    pub start_id: u32,
}

/// Build a basket with the notification command, its arguments and data
/// fields, and the base, host and service notification templates.
pub fn notification_basket(
    schema: &SettingsSchema,
    options: &NotificationBasketOptions,
) -> DirectorBasket {
    let safe_name = icinga_safe_name(&options.name);
    let var_prefix = options.var_prefix.clone().unwrap_or_else(|| safe_name.clone());
    let command_name = options
        .command_name
        .clone()
        .unwrap_or_else(|| format!("{}_{}", prefix::COMMAND, safe_name));

    let base_template = format!("{}_{}", prefix::NOTIFICATION_TEMPLATE, safe_name);
    let host_template = format!("{base_template}_host");
    let service_template = format!("{base_template}_service");

    let mut basket = DirectorBasket::new();
    basket.command(&options.command, &command_name, "60");
    if let Some(subcommand) = &options.subcommand {
        basket.command_argument(
            &command_name,
            subcommand,
            CommandArgument {
                description: "Plugin".to_string(),
                skip_key: false,
                repeat_key: false,
                value: None,
                set_if: None,
                order: Some(-1),
            },
        );
    }
    basket.notification_template(&base_template, Some(&command_name), Vec::new());
    basket.notification_template(&host_template, None, vec![base_template.clone()]);
    basket.notification_template(&service_template, None, vec![base_template.clone()]);

    let mut id = options.start_id;
    for field in schema.eligible(Source::Args) {
        if BASKET_EXCLUDED_FIELDS.contains(&field.name.as_str()) {
            tracing::debug!("Skipping argument: {}", field.name);
            continue;
        }
        let standard = standard_field(&field.name);
        let var_name = format!("{var_prefix}_{}", field.name);
        let macro_ref = format!("${var_name}$");
        let is_bool = field.kind() == FieldKind::Bool;
        let description = if field.help.is_empty() {
            standard.map(|s| s.description.to_string()).unwrap_or_default()
        } else {
            field.help.clone()
        };

        basket.command_argument(
            &command_name,
            &schema.arg_flag(field),
            CommandArgument {
                description: description.clone(),
                skip_key: false,
                repeat_key: false,
                value: (!is_bool).then(|| macro_ref.clone()),
                set_if: is_bool.then(|| macro_ref.clone()),
                order: Some(standard.map(|s| s.order as i32).unwrap_or(DEFAULT_ARGUMENT_ORDER)),
            },
        );
        basket.datafield(id, &var_name, &caption(&field.name), &description, field.kind().into());

        let template = if field.name.contains("host_state") || field.name.contains("host_output") {
            &host_template
        } else if field.name.contains("service_") {
            &service_template
        } else {
            &base_template
        };
        basket.template_field(template, id);
        if let Some(value) = standard.map(|s| s.icinga_value).filter(|v| !v.is_empty()) {
            basket.template_var(template, &var_name, value);
        }
        id += 1;
    }
    basket
}

/// `host_name` -> `Host name`
fn caption(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SettingsSchema {
        SettingsSchema::new()
            .flag("debug", "")
            .string("host_name", "", "")
            .string("host_state", "", "")
            .string("service_state", "", "")
            .string("slack_channel", "#alerts", "Slack channel")
            .flag("print_config", "Print the configuration and exit")
    }

    fn options() -> NotificationBasketOptions {
        NotificationBasketOptions {
            name: "Slack Notification".into(),
            command: "/etc/icinga2/scripts/icinga-notify".into(),
            subcommand: Some("slack".into()),
            var_prefix: None,
            command_name: None,
            start_id: 1111,
        }
    }

    #[test]
    fn safe_name_collapses_non_word_runs() {
        assert_eq!(icinga_safe_name("Enhanced Email"), "enhanced_email");
        assert_eq!(icinga_safe_name("Netbox -- Path/Impact"), "netbox_path_impact");
    }

    #[test]
    fn caption_capitalizes_first_word() {
        assert_eq!(caption("host_name"), "Host name");
    }

    #[test]
    fn basket_has_command_and_templates() {
        let basket = notification_basket(&schema(), &options());
        let command = &basket.commands()["cmd_notification_slack_notification"];
        assert_eq!(command.methods_execute, "PluginNotification");
        assert_eq!(command.timeout, "60");
        assert!(command.arguments.contains_key("slack"));

        let templates = basket.notification_templates();
        assert_eq!(
            templates["nott_slack_notification"].command.as_deref(),
            Some("cmd_notification_slack_notification")
        );
        assert_eq!(templates["nott_slack_notification_host"].imports, vec!["nott_slack_notification"]);
        assert_eq!(
            templates["nott_slack_notification_service"].imports,
            vec!["nott_slack_notification"]
        );
    }

    #[test]
    fn arguments_use_value_or_set_if() {
        let basket = notification_basket(&schema(), &options());
        let args = &basket.commands()["cmd_notification_slack_notification"].arguments;
        assert_eq!(args["--host-name"].value.as_deref(), Some("$slack_notification_host_name$"));
        assert_eq!(args["--host-name"].order, Some(10));
        assert_eq!(args["--debug"].set_if.as_deref(), Some("$slack_notification_debug$"));
        assert!(args["--debug"].value.is_none());
        assert_eq!(args["--slack-channel"].order, Some(DEFAULT_ARGUMENT_ORDER));
        assert!(!args.contains_key("--print-config"));
    }

    #[test]
    fn datafields_are_numbered_and_templates_assigned() {
        let basket = notification_basket(&schema(), &options());
        let fields = basket.datafields();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["1111"].varname, "slack_notification_debug");
        assert_eq!(fields["1111"].datatype, DataFieldType::Bool.class());
        assert_eq!(fields["1112"].caption, "Host name");

        let templates = basket.notification_templates();
        let host = &templates["nott_slack_notification_host"];
        assert_eq!(host.fields.len(), 1);
        assert_eq!(host.vars["slack_notification_host_state"], "$host.state$");
        let service = &templates["nott_slack_notification_service"];
        assert_eq!(service.vars["slack_notification_service_state"], "$service.state$");
        let base = &templates["nott_slack_notification"];
        assert_eq!(base.vars["slack_notification_host_name"], "$host.name$");
        assert!(!base.vars.contains_key("slack_notification_slack_channel"));
    }

    #[test]
    fn basket_serializes_with_director_keys() {
        let json = notification_basket(&schema(), &options()).to_json_pretty().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(value.get("Command").is_some());
        assert!(value.get("NotificationTemplate").is_some());
        assert!(value.get("Datafield").is_some());
        assert_eq!(value["Datafield"]["1112"]["settings"]["visibility"], "visible");
    }
}
