//! Enhanced email notifications
//!
//! The mail carries the notification summary plus, when configured, Netbox
//! inventory tables and a Grafana graph of the affected service.

pub mod body;
pub mod message;

use super::{base_schema, default_config_file, finish_schema, resolve_section};
use crate::config::{ResolvedConfig, SettingsError, SettingsSchema};
use crate::grafana::{self, GrafanaGraph, GrafanaSettings, PanelQuery};
use crate::icinga::Notification;
use crate::netbox::NetboxClient;
use anyhow::Result;
use self::body::{MailContent, NetboxInfo};
use std::path::Path;

pub fn schema() -> SettingsSchema {
    finish_schema(
        base_schema("NOTIFY_MAIL_", Some(&default_config_file("enhanced-mail")))
            .string("email_to", "", "Recipients, comma separated")
            .string("performance_data", "", "Service performance data")
            .string("service_command", "", "Check command of the service")
            .string("netbox_host_name", "", "Name to search in Netbox, defaults to host_name")
            .string("netbox_host_ip", "", "Address to search in Netbox, defaults to host_address")
            .string("grafana_host_name", "", "Host name used in Grafana, defaults to host_name")
            .string("grafana_panel_id", "", "Grafana panel to render"),
    )
}

pub fn mail_schema() -> SettingsSchema {
    SettingsSchema::section("mail")
        .string("from_address", "icinga@domain.local", "Sender address")
        .string("server", "localhost", "SMTP server, optionally with :port")
        .string("username", "", "SMTP user")
        .secret("password", "", "SMTP password")
}

pub fn icinga_schema() -> SettingsSchema {
    SettingsSchema::section("icinga")
        .string("url", "http://icinga.domain.local/icingaweb2", "Icinga Web 2 base url")
        .string("logo_path", "/usr/share/icingaweb2/public/img/icinga-logo.png", "Logo embedded in the mail")
}

pub fn netbox_schema() -> SettingsSchema {
    SettingsSchema::section("netbox")
        .string("url", "", "Netbox base url, empty disables Netbox")
        .secret("token", "", "Netbox API token")
        .string("api_device", "/api/dcim/devices", "Device API path")
        .string("api_vm", "/api/virtualization/virtual-machines", "Virtual machine API path")
        .string("api_ip", "/api/ipam/ip-addresses", "IP address API path")
}

pub fn sections() -> Vec<SettingsSchema> {
    vec![mail_schema(), icinga_schema(), netbox_schema(), grafana::settings_schema()]
}

/// Mail-only fields with their fallbacks applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailFields {
    pub email_to: String,
    pub performance_data: String,
    pub service_command: String,
    pub netbox_host_name: String,
    pub netbox_host_ip: String,
    pub grafana_host_name: String,
    pub grafana_panel_id: String,
}

impl MailFields {
    pub fn from_config(config: &ResolvedConfig, n: &Notification) -> Result<Self, SettingsError> {
        let or_fallback = |value: String, fallback: &str| if value.is_empty() { fallback.to_string() } else { value };
        Ok(Self {
            email_to: config.string("email_to")?,
            performance_data: config.string("performance_data")?,
            service_command: config.string("service_command")?,
            netbox_host_name: or_fallback(config.string("netbox_host_name")?, &n.host_name),
            netbox_host_ip: or_fallback(config.string("netbox_host_ip")?, &n.host_address),
            grafana_host_name: or_fallback(config.string("grafana_host_name")?, &n.host_name),
            grafana_panel_id: config.string("grafana_panel_id")?,
        })
    }
}

/// Device or VM by name, IP address by name or address.
pub fn lookup_netbox(section: &ResolvedConfig, fields: &MailFields) -> Result<NetboxInfo> {
    let client = NetboxClient::new(&section.string("url")?, &section.string("token")?, "", 0)?;
    if !client.is_enabled() {
        return Ok(NetboxInfo::default());
    }
    let api_device = section.string("api_device")?;
    let api_vm = section.string("api_vm")?;
    let api_ip = section.string("api_ip")?;

    let mut info = NetboxInfo::default();
    if let Some(device) = client.search(&api_device, "name", &fields.netbox_host_name) {
        info.host_url = device.get("id").map(|id| client.object_url(&api_device, id));
        info.host = Some(device);
    } else if let Some(vm) = client.search(&api_vm, "name", &fields.netbox_host_name) {
        info.host_url = vm.get("id").map(|id| client.object_url(&api_vm, id));
        info.host = Some(vm);
    }

    let ip = client
        .search(&api_ip, "address", &fields.netbox_host_name)
        .or_else(|| client.search(&api_ip, "address", &fields.netbox_host_ip));
    if let Some(ip) = ip {
        info.ip_url = ip.get("id").map(|id| client.object_url(&api_ip, id));
        info.ip = Some(ip);
    }
    Ok(info)
}

fn read_logo(path: &Path) -> Option<Vec<u8>> {
    if !path.exists() {
        return None;
    }
    std::fs::read(path)
        .map_err(|e| tracing::warn!("Unable to read logo {}: {e}", path.display()))
        .ok()
}

pub fn run(config: &ResolvedConfig) -> Result<()> {
    let notification = Notification::from_config(config)?;
    let fields = MailFields::from_config(config, &notification)?;

    let mail = resolve_section(config, &mail_schema())?;
    let icinga = resolve_section(config, &icinga_schema())?;
    let grafana_settings = GrafanaSettings::from_config(&resolve_section(config, &grafana::settings_schema())?)?;

    let netbox = lookup_netbox(&resolve_section(config, &netbox_schema())?, &fields).unwrap_or_else(|e| {
        tracing::warn!("Netbox lookup skipped: {e:#}");
        NetboxInfo::default()
    });
    let query = PanelQuery {
        panel_id: &fields.grafana_panel_id,
        host_state: &notification.host_state,
        service_state: &notification.service_state,
        service_displayname: &notification.service_displayname,
        service_name: &notification.service_name,
        service_command: &fields.service_command,
    };
    let graph = GrafanaGraph::fetch(&grafana_settings, &query, &fields.grafana_host_name);
    let logo = read_logo(Path::new(&icinga.string("logo_path")?));

    let icinga_url = icinga.string("url")?;
    let content = MailContent {
        notification: &notification,
        icinga_url: icinga_url.trim_end_matches('/'),
        has_logo: logo.is_some(),
        performance_data: &fields.performance_data,
        netbox: &netbox,
        grafana: &graph,
    };
    let subject = body::subject(&notification);
    let html = body::html(&content);
    tracing::debug!("{html}");

    let email = message::build(
        &mail.string("from_address")?,
        &fields.email_to,
        &subject,
        body::plain_text(&content),
        html,
        logo,
        graph.png.clone(),
    )?;
    message::send(
        &email,
        &mail.string("server")?,
        &mail.string("username")?,
        &mail.string("password")?,
    )?;
    tracing::info!("Sent '{subject}' to {}", fields.email_to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;

    #[test]
    fn host_names_fall_back_to_notification() {
        let schema = schema();
        let env = [
            ("NOTIFY_MAIL_CONFIG_FILE", ""),
            ("NOTIFY_MAIL_HOST_NAME", "web01"),
            ("NOTIFY_MAIL_HOST_ADDRESS", "10.0.0.5"),
            ("NOTIFY_MAIL_GRAFANA_HOST_NAME", "web01.example.com"),
        ];
        let config = ConfigResolver::new(&schema).resolve(&env, None).expect("resolve");
        let n = Notification::from_config(&config).expect("notification");
        let fields = MailFields::from_config(&config, &n).expect("fields");
        assert_eq!(fields.netbox_host_name, "web01");
        assert_eq!(fields.netbox_host_ip, "10.0.0.5");
        assert_eq!(fields.grafana_host_name, "web01.example.com");
    }

    #[test]
    fn netbox_disabled_without_url() {
        let section = ConfigResolver::new(&netbox_schema()).resolve_section(None).expect("section");
        let info = lookup_netbox(&section, &MailFields::default()).expect("lookup");
        assert!(info.is_empty());
    }

    #[test]
    fn sections_have_distinct_keys() {
        let keys: Vec<_> = sections().iter().filter_map(|s| s.nested_key_str().map(str::to_string)).collect();
        assert_eq!(keys, vec!["mail", "icinga", "netbox", "grafana"]);
    }
}
