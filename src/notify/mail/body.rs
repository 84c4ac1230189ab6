//! Subject, plain-text and HTML bodies of the notification mail

use crate::grafana::{GrafanaGraph, HEIGHT, WIDTH};
use crate::icinga::Notification;
use crate::netbox;
use serde_json::Value;
use std::fmt::Write;
use urlencoding::encode;

const COLUMN: u32 = 144;

const STYLE: &str = r#"body {text-align: left; font-family: calibri, sans-serif, verdana; font-size: 10pt; color: #7f7f7f;}
table {margin-left: auto; margin-right: auto;}
a:link {color: #0095bf; text-decoration: none;}
a:visited {color: #0095bf; text-decoration: none;}
a:hover {color: #0095bf; text-decoration: underline;}
a:active {color: #0095bf; text-decoration: underline;}
th {font-family: calibri, sans-serif, verdana; font-size: 10pt; text-align:left; white-space: nowrap; color: #535353;}
th.icinga {background-color: #0095bf; color: #ffffff; margin-left: 7px; margin-top: 5px; margin-bottom: 5px;}
th.perfdata, th.perfdata a:link, th.perfdata a:visited {background-color: #0095bf; color: #ffffff; margin-left: 7px; margin-top: 5px; margin-bottom: 5px; text-align:center;}
td {font-family: calibri, sans-serif, verdana; font-size: 10pt; text-align:left; color: #7f7f7f;}
td.center {text-align:center; white-space: nowrap;}
td.UP {background-color: #44bb77; color: #ffffff; margin-left: 2px;}
td.DOWN {background-color: #ff5566; color: #ffffff; margin-left: 2px;}
td.UNREACHABLE {background-color: #aa44ff; color: #ffffff; margin-left: 2px;}"#;

/// Netbox objects found for the host name and address.
#[derive(Debug, Clone, Default)]
pub struct NetboxInfo {
    pub host: Option<Value>,
    pub host_url: Option<String>,
    pub ip: Option<Value>,
    pub ip_url: Option<String>,
}

impl NetboxInfo {
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.ip.is_none()
    }
}

/// Everything the bodies are rendered from.
#[derive(Debug, Clone, Copy)]
pub struct MailContent<'a> {
    pub notification: &'a Notification,
    pub icinga_url: &'a str,
    pub has_logo: bool,
    pub performance_data: &'a str,
    pub netbox: &'a NetboxInfo,
    pub grafana: &'a GrafanaGraph,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfData {
    pub label: String,
    pub value: String,
    pub warning: String,
    pub critical: String,
    pub min: String,
    pub max: String,
}

/// Parse `label=value;warn;crit;min;max` entries separated by spaces.
/// Entries without `=` are skipped; missing trailing fields are empty.
pub fn parse_perfdata(raw: &str) -> Vec<PerfData> {
    raw.split_whitespace()
        .filter_map(|entry| {
            let (label, data) = entry.split_once('=')?;
            let mut parts = data.split(';').map(str::to_string);
            Some(PerfData {
                label: label.trim_matches('\'').to_string(),
                value: parts.next().unwrap_or_default(),
                warning: parts.next().unwrap_or_default(),
                critical: parts.next().unwrap_or_default(),
                min: parts.next().unwrap_or_default(),
                max: parts.next().unwrap_or_default(),
            })
        })
        .collect()
}

pub fn subject(n: &Notification) -> String {
    if !n.host_state.is_empty() {
        format!("Host {} - {} is {}", n.notification_type, n.host_displayname, n.host_state)
    } else if !n.service_state.is_empty() {
        format!(
            "Service {} - {} service {} is {}",
            n.notification_type, n.host_displayname, n.service_displayname, n.service_state
        )
    } else {
        format!(
            "Unknown {} - {} service {} (no host or service state)",
            n.notification_type, n.host_displayname, n.service_displayname
        )
    }
}

pub fn plain_text(content: &MailContent<'_>) -> String {
    let n = content.notification;
    let mut out = String::from("***** Icinga  *****\n\n");
    let _ = writeln!(out, "Notification Type: {}\n", n.notification_type);
    let _ = writeln!(out, "Host: {}", n.host_name);
    let _ = writeln!(out, "Address: {}", n.host_address);
    let _ = writeln!(out, "Service: {}", n.service_displayname);
    let _ = writeln!(out, "State: {}{}\n", n.host_state, n.service_state);
    let _ = writeln!(out, "Date/Time: {}\n", n.notification_date_time);
    let _ = writeln!(out, "Additional Info: {}{}\n", n.host_output, n.service_output);
    let _ = writeln!(out, "Comment: [{}] {}", n.notification_author, n.notification_comment);
    if let Some(url) = &content.grafana.page_url {
        let _ = writeln!(out, "\nGrafana: {url}");
    }
    if let Some(url) = &content.netbox.host_url {
        let _ = writeln!(out, "\nNetbox Host: {url}");
    }
    if let Some(url) = &content.netbox.ip_url {
        let _ = writeln!(out, "\nNetbox IP: {url}");
    }
    out
}

pub fn html(content: &MailContent<'_>) -> String {
    let n = content.notification;
    let web = content.icinga_url;
    let link = r#"style="color: #0095bf; text-decoration: none;""#;

    let mut out = format!("<html><head><style type=\"text/css\">\n{STYLE}\n</style></head><body>\n");
    let _ = writeln!(out, "<table width={WIDTH}>");
    if content.has_logo {
        let _ = writeln!(
            out,
            r#"<tr><th colspan=2 class=icinga width={WIDTH}><img src="cid:icinga2_logo"></th></tr>"#
        );
    }
    let _ = writeln!(
        out,
        r#"<tr><th>Host:</th><td><a {link} href="{web}/monitoring/host/show?host={}">{}</a></td></tr>"#,
        encode(&n.host_name),
        escape(&n.host_name)
    );
    row(&mut out, "IP Address", &n.host_address);
    row(&mut out, "Status", &format!("{}{}", n.host_state, n.service_state));
    row(&mut out, "Service Name", &n.service_displayname);
    if !n.host_state.is_empty() {
        let _ = writeln!(
            out,
            r#"<tr><th>Service Data:</th><td><a {link} href="{web}/monitoring/host/services?host={}">{}</a></td></tr>"#,
            encode(&n.host_name),
            escape(&n.host_output)
        );
    }
    if !n.service_state.is_empty() {
        let _ = writeln!(
            out,
            r#"<tr><th>Service Data:</th><td><a {link} href="{web}/monitoring/service/show?host={}&service={}">{}</a></td></tr>"#,
            encode(&n.host_name),
            encode(&n.service_name),
            escape(&n.service_output)
        );
    }
    row(&mut out, "Event Time", &n.notification_date_time);
    if !n.notification_author.is_empty() && !n.notification_comment.is_empty() {
        row(
            &mut out,
            "Comment",
            &format!("{} ({})", n.notification_comment, n.notification_author),
        );
    }

    if let Some(host) = &content.netbox.host {
        new_table(&mut out);
        section_header(&mut out, content.netbox.host_url.as_deref(), &n.host_name, 2);
        value_row(&mut out, "Display Name", host, "display_name", None);
        value_row(&mut out, "Name", host, "name", None);
        link_row(&mut out, "Cluster", host, "cluster");
        link_row(&mut out, "Tenant", host, "tenant");
        link_row(&mut out, "Site", host, "site");
        link_row(&mut out, "Rack", host, "rack");
        value_row(&mut out, "Position", host, "position", None);
        value_row(&mut out, "Primary IP", host, "primary_ip", None);
        value_row(&mut out, "Primary IPv4", host, "primary_ip4", None);
        value_row(&mut out, "Primary IPv6", host, "primary_ip6", None);
        link_row(&mut out, "Device Type", host, "device_type");
        value_row(&mut out, "Status", host, "status", Some("label"));
    }

    if let Some(ip) = &content.netbox.ip {
        new_table(&mut out);
        section_header(&mut out, content.netbox.ip_url.as_deref(), &n.host_address, 2);
        value_row(&mut out, "Address", ip, "address", None);
        value_row(&mut out, "Status", ip, "status", Some("label"));
        value_row(&mut out, "Host", ip, "virtual_machine", Some("name"));
        value_row(&mut out, "Host", ip, "device", Some("name"));
    }

    let perfdata = parse_perfdata(content.performance_data);
    if !perfdata.is_empty() || content.grafana.png.is_some() {
        new_table(&mut out);
        let _ = writeln!(out, "<tr><th colspan=6 class=perfdata>Performance Data</th></tr>");
        if perfdata.is_empty() {
            let _ = writeln!(
                out,
                "<tr><th width={COLUMN} colspan=1>Last Value:</th><td width={} colspan=5>none</td></tr>",
                WIDTH - COLUMN
            );
        } else {
            let _ = writeln!(
                out,
                "<tr><th>Label</th><th>Last Value</th><th>Warning</th><th>Critical</th><th>Min</th><th>Max</th></tr>"
            );
            for p in &perfdata {
                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape(&p.label),
                    escape(&p.value),
                    escape(&p.warning),
                    escape(&p.critical),
                    escape(&p.min),
                    escape(&p.max)
                );
            }
        }
        if content.grafana.png.is_some() {
            let _ = writeln!(
                out,
                r#"<tr><td colspan=6><a href="{}"><img src="cid:grafana2_perfdata" width={WIDTH} height={HEIGHT}></a></td></tr>"#,
                content.grafana.page_url.as_deref().unwrap_or_default()
            );
        }
    }

    new_table(&mut out);
    let _ = write!(out, "<tr><td class=center>{}</td></tr>\n</table><br>\n</body></html>\n", footer(content));
    out
}

/// Names the sources whose data made it into the mail.
pub fn footer(content: &MailContent<'_>) -> String {
    let mut footer = String::from("Generated by Icinga 2 with data from Icinga 2");
    if content.grafana.panel_id.is_some() {
        footer.push_str(", Grafana");
    }
    if !content.netbox.is_empty() {
        footer.push_str(", Netbox");
    }
    footer
}

fn new_table(out: &mut String) {
    let _ = writeln!(out, "</table><br>\n<table width={WIDTH}>");
}

fn row(out: &mut String, title: &str, value: &str) {
    let _ = writeln!(out, "<tr><th>{title}:</th><td>{}</td></tr>", escape(value));
}

fn section_header(out: &mut String, url: Option<&str>, name: &str, colspan: u32) {
    let _ = writeln!(
        out,
        r#"<tr><th colspan={colspan} class=perfdata><a href="{}">Netbox Info for {}</a></th></tr>"#,
        url.unwrap_or_default(),
        escape(name)
    );
}

fn value_row(out: &mut String, title: &str, object: &Value, key1: &str, key2: Option<&str>) {
    if let Some(value) = netbox::lookup(object, key1, key2) {
        let _ = writeln!(out, r#"<tr><th width="{COLUMN}">{title}:</th><td>{}</td></tr>"#, escape(&value));
    }
}

fn link_row(out: &mut String, title: &str, object: &Value, key: &str) {
    let Some(value) = netbox::lookup(object, key, Some("name")).or_else(|| netbox::lookup(object, key, Some("model")))
    else {
        return;
    };
    match netbox::ui_link(object, key) {
        Some(url) => {
            let _ = writeln!(
                out,
                r#"<tr><th width="{COLUMN}">{title}:</th><td><a href="{url}">{}</a></td></tr>"#,
                escape(&value)
            );
        }
        None => value_row(out, title, object, key, Some("name")),
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
