//! The notification macros Icinga passes to every plugin

use crate::config::{ResolvedConfig, SettingsError, SettingsSchema};
use serde::Serialize;

/// A well-known field: its Icinga runtime macro, description and basket order.
#[derive(Debug, Clone, Copy)]
pub struct StandardField {
    pub name: &'static str,
    pub icinga_value: &'static str,
    pub description: &'static str,
    pub order: u32,
}

const fn std_field(
    name: &'static str,
    icinga_value: &'static str,
    description: &'static str,
    order: u32,
) -> StandardField {
    StandardField { name, icinga_value, description, order }
}

pub const STANDARD_FIELDS: &[StandardField] = &[
    std_field("debug", "", "Sets logging to debug", 5),
    std_field("disable_log_file", "", "Disables the log file", 5),
    std_field("host_name", "$host.name$", "Host object name", 10),
    std_field("host_displayname", "$host.display_name$", "Host display name", 10),
    std_field("host_address", "$host.address$", "Host fqdn/address", 10),
    std_field("host_state", "$host.state$", "Host state", 10),
    std_field("host_state_last", "$host.last_state$", "Host state before current check run", 10),
    std_field("host_output", "$host.output$", "Host output", 10),
    std_field("service_name", "$service.name$", "Service object name", 15),
    std_field("service_displayname", "$service.display_name$", "Service display name", 15),
    std_field("service_state", "$service.state$", "Service state", 15),
    std_field(
        "service_state_last",
        "$service.last_state$",
        "Service state before current check run",
        15,
    ),
    std_field("service_output", "$service.output$", "Service output", 15),
    std_field("notification_author", "$notification.author$", "Notification Author", 20),
    std_field("notification_comment", "$notification.comment$", "Notification comment", 20),
    std_field("notification_type", "$notification.type$", "Notification type", 20),
    std_field("notification_date_time", "$icinga.long_date_time$", "Notification date and time", 20),
];

pub fn standard_field(name: &str) -> Option<&'static StandardField> {
    STANDARD_FIELDS.iter().find(|f| f.name == name)
}

/// Names of the notification macro fields, in the order plugins declare them.
const NOTIFICATION_FIELD_NAMES: &[&str] = &[
    "host_name",
    "host_displayname",
    "host_address",
    "host_state",
    "host_state_last",
    "host_output",
    "service_name",
    "service_displayname",
    "service_state",
    "service_state_last",
    "service_output",
    "notification_author",
    "notification_comment",
    "notification_type",
    "notification_date_time",
];

/// `debug` and `disable_log_file`, declared by every plugin.
pub fn with_logging_fields(schema: SettingsSchema) -> SettingsSchema {
    schema
        .flag("debug", "Sets logging to debug")
        .flag("disable_log_file", "Disables the log file")
}

/// Declare the notification macro fields on `schema`.
pub fn with_notification_fields(mut schema: SettingsSchema) -> SettingsSchema {
    for name in NOTIFICATION_FIELD_NAMES {
        let description = standard_field(name).map(|f| f.description).unwrap_or_default();
        schema = schema.string(name, "", description);
    }
    schema
}

/// The host/service state change being notified about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub host_name: String,
    pub host_displayname: String,
    pub host_address: String,
    pub host_state: String,
    pub host_state_last: String,
    pub host_output: String,
    pub service_name: String,
    pub service_displayname: String,
    pub service_state: String,
    pub service_state_last: String,
    pub service_output: String,
    pub notification_author: String,
    pub notification_comment: String,
    pub notification_type: String,
    pub notification_date_time: String,
}

impl Notification {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SettingsError> {
        let mut notification = Self {
            host_name: config.string("host_name")?,
            host_displayname: config.string("host_displayname")?,
            host_address: config.string("host_address")?,
            host_state: config.string("host_state")?,
            host_state_last: config.string("host_state_last")?,
            host_output: config.string("host_output")?,
            service_name: config.string("service_name")?,
            service_displayname: config.string("service_displayname")?,
            service_state: config.string("service_state")?,
            service_state_last: config.string("service_state_last")?,
            service_output: config.string("service_output")?,
            notification_author: config.string("notification_author")?,
            notification_comment: config.string("notification_comment")?,
            notification_type: config.string("notification_type")?,
            notification_date_time: config.string("notification_date_time")?,
        };
        notification.apply_fallbacks();
        Ok(notification)
    }

    /// Fill empty identity fields from the ones Icinga always sends.
    pub fn apply_fallbacks(&mut self) {
        if self.host_displayname.is_empty() {
            self.host_displayname = self.host_name.clone();
        }
        if self.host_address.is_empty() {
            self.host_address = self.host_displayname.clone();
        }
        if self.service_displayname.is_empty() {
            self.service_displayname = self.service_name.clone();
        }
    }

    /// A service notification carries a service state.
    pub fn is_service(&self) -> bool {
        !self.service_state.is_empty()
    }

    pub fn state(&self) -> &str {
        if self.is_service() {
            &self.service_state
        } else {
            &self.host_state
        }
    }

    pub fn output(&self) -> &str {
        if self.is_service() {
            &self.service_output
        } else {
            &self.host_output
        }
    }

    /// `host - service` for service notifications, the host otherwise.
    pub fn display_name(&self) -> String {
        if self.is_service() {
            format!("{} - {}", self.host_displayname, self.service_displayname)
        } else {
            self.host_displayname.clone()
        }
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.notification_type == "ACKNOWLEDGEMENT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;

    #[test]
    fn every_notification_field_has_a_standard_entry() {
        for name in NOTIFICATION_FIELD_NAMES {
            assert!(standard_field(name).is_some(), "{name}");
        }
    }

    #[test]
    fn service_state_takes_priority() {
        let n = Notification {
            host_state: "UP".into(),
            host_output: "PING OK".into(),
            service_state: "CRITICAL".into(),
            service_output: "disk full".into(),
            host_displayname: "web01".into(),
            service_displayname: "disk".into(),
            ..Default::default()
        };
        assert!(n.is_service());
        assert_eq!(n.state(), "CRITICAL");
        assert_eq!(n.output(), "disk full");
        assert_eq!(n.display_name(), "web01 - disk");
    }

    #[test]
    fn fallbacks_fill_display_name_and_address() {
        let mut n = Notification { host_name: "web01".into(), ..Default::default() };
        n.apply_fallbacks();
        assert_eq!(n.host_displayname, "web01");
        assert_eq!(n.host_address, "web01");
    }

    #[test]
    fn from_config_reads_declared_fields() {
        let schema = with_notification_fields(SettingsSchema::new().env_prefix("T_"));
        let config = ConfigResolver::new(&schema)
            .resolve(&[("T_HOST_NAME", "db1"), ("T_HOST_STATE", "DOWN")], None)
            .expect("resolve");
        let n = Notification::from_config(&config).expect("notification");
        assert_eq!(n.host_name, "db1");
        assert_eq!(n.state(), "DOWN");
        assert_eq!(n.host_address, "db1");
    }
}
