//! Slack webhook notifications

use super::{base_schema, default_config_file, finish_schema, resolve_section};
use crate::config::{ResolvedConfig, SettingsError, SettingsSchema};
use crate::icinga::Notification;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use urlencoding::encode;

pub fn schema() -> SettingsSchema {
    finish_schema(
        base_schema("NOTIFY_SLACK_", Some(&default_config_file("slack")))
            .string("slack_channel", "#alerts", "Slack channel to post to"),
    )
}

/// The `slack` config-file section.
pub fn settings_schema() -> SettingsSchema {
    SettingsSchema::section("slack")
        .string("icingaweb2_url", "", "Icinga Web 2 base url used for links")
        .secret("webhook_url", "", "Incoming webhook url")
        .string("botname", "icinga2", "Name the message is posted as")
}

pub fn sections() -> Vec<SettingsSchema> {
    vec![settings_schema()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackSettings {
    pub icingaweb2_url: String,
    pub webhook_url: String,
    pub botname: String,
}

impl SlackSettings {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SettingsError> {
        Ok(Self {
            icingaweb2_url: config.string("icingaweb2_url")?.trim_end_matches('/').to_string(),
            webhook_url: config.string("webhook_url")?,
            botname: config.string("botname")?,
        })
    }
}

/// Attachment colour for a state. Acknowledgements and downtimes are grey
/// whatever the state.
pub fn color(state: &str, notification_type: &str) -> &'static str {
    if matches!(notification_type, "ACKNOWLEDGEMENT" | "DOWNTIMESTART" | "DOWNTIMEEND") {
        return "#7F7F7F";
    }
    match state {
        "CRITICAL" => "#FF5566",
        "WARNING" => "#FFAA44",
        "OK" => "#44BB77",
        "UNKNOWN" => "#800080",
        _ => "",
    }
}

pub fn payload(notification: &Notification, channel: &str, settings: &SlackSettings) -> Value {
    let n = notification;
    let state = n.state();
    let web = &settings.icingaweb2_url;

    let mut fields = vec![
        json!({"title": "Type", "value": n.notification_type, "short": true}),
        json!({"title": "State", "value": state, "short": true}),
        json!({
            "title": "Host",
            "value": format!(
                "<{web}/monitoring/host/services?host={}|{}>",
                encode(&n.host_name),
                n.host_displayname
            ),
            "short": true
        }),
        json!({"title": "Information", "value": n.output(), "short": false}),
    ];
    if n.is_service() {
        fields.push(json!({
            "title": "Service",
            "value": format!(
                "<{web}/monitoring/service/show?host={}&service={}|{}>",
                encode(&n.host_name),
                encode(&n.service_name),
                n.service_displayname
            ),
            "short": true
        }));
    }

    json!({
        "channel": channel,
        "username": settings.botname,
        "attachments": [{
            "fallback": format!("{} - {}: {}", n.notification_type, state, n.display_name()),
            "color": color(state, &n.notification_type),
            "fields": fields,
        }]
    })
}

pub fn post(webhook_url: &str, payload: &Value) -> Result<()> {
    let client = Client::builder().build().context("Failed to create HTTP client")?;
    let response = client
        .post(webhook_url)
        .json(payload)
        .send()
        .with_context(|| format!("Post to slack url {webhook_url} failed"))?;
    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        let text = response.text().unwrap_or_default();
        anyhow::bail!("Post to slack url {webhook_url} failed with {status}: {text}");
    }
    tracing::info!("Successfully posted to Slack");
    Ok(())
}

pub fn run(config: &ResolvedConfig) -> Result<()> {
    let settings = SlackSettings::from_config(&resolve_section(config, &settings_schema())?)?;
    if settings.webhook_url.is_empty() {
        anyhow::bail!("slack.webhook_url is not configured");
    }
    let notification = Notification::from_config(config)?;
    let payload = payload(&notification, &config.string("slack_channel")?, &settings);
    tracing::debug!("{payload}");
    post(&settings.webhook_url, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SlackSettings {
        SlackSettings {
            icingaweb2_url: "https://icinga.local/icingaweb2".into(),
            webhook_url: "https://hooks.slack.invalid/T000".into(),
            botname: "icinga2".into(),
        }
    }

    #[test]
    fn colors_follow_state_and_type() {
        assert_eq!(color("CRITICAL", "PROBLEM"), "#FF5566");
        assert_eq!(color("WARNING", "PROBLEM"), "#FFAA44");
        assert_eq!(color("OK", "RECOVERY"), "#44BB77");
        assert_eq!(color("UNKNOWN", "PROBLEM"), "#800080");
        assert_eq!(color("CRITICAL", "ACKNOWLEDGEMENT"), "#7F7F7F");
        assert_eq!(color("OK", "DOWNTIMEEND"), "#7F7F7F");
        assert_eq!(color("DOWN", "PROBLEM"), "");
    }

    #[test]
    fn host_payload_has_four_fields() {
        let n = Notification {
            host_name: "web01".into(),
            host_displayname: "Web 01".into(),
            host_state: "DOWN".into(),
            host_output: "PING CRITICAL".into(),
            notification_type: "PROBLEM".into(),
            ..Default::default()
        };
        let p = payload(&n, "#ops", &settings());
        assert_eq!(p["channel"], "#ops");
        assert_eq!(p["username"], "icinga2");
        let attachment = &p["attachments"][0];
        assert_eq!(attachment["fallback"], "PROBLEM - DOWN: Web 01");
        let fields = attachment["fields"].as_array().expect("fields");
        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields[2]["value"],
            "<https://icinga.local/icingaweb2/monitoring/host/services?host=web01|Web 01>"
        );
        assert_eq!(fields[3]["value"], "PING CRITICAL");
    }

    #[test]
    fn service_payload_links_the_service() {
        let n = Notification {
            host_name: "web01".into(),
            host_displayname: "web01".into(),
            service_name: "http".into(),
            service_displayname: "HTTP".into(),
            service_state: "CRITICAL".into(),
            service_output: "connection refused".into(),
            notification_type: "PROBLEM".into(),
            ..Default::default()
        };
        let p = payload(&n, "#alerts", &settings());
        let attachment = &p["attachments"][0];
        assert_eq!(attachment["color"], "#FF5566");
        assert_eq!(attachment["fallback"], "PROBLEM - CRITICAL: web01 - HTTP");
        let fields = attachment["fields"].as_array().expect("fields");
        assert_eq!(fields.len(), 5);
        assert_eq!(
            fields[4]["value"],
            "<https://icinga.local/icingaweb2/monitoring/service/show?host=web01&service=http|HTTP>"
        );
    }

    #[test]
    fn link_query_values_are_encoded() {
        let n = Notification {
            host_name: "web 01".into(),
            host_displayname: "web01".into(),
            service_name: "disk /var|tmp".into(),
            service_displayname: "Disk".into(),
            service_state: "WARNING".into(),
            notification_type: "PROBLEM".into(),
            ..Default::default()
        };
        let p = payload(&n, "#alerts", &settings());
        let fields = p["attachments"][0]["fields"].as_array().expect("fields");
        assert_eq!(
            fields[2]["value"],
            "<https://icinga.local/icingaweb2/monitoring/host/services?host=web%2001|web01>"
        );
        assert_eq!(
            fields[4]["value"],
            "<https://icinga.local/icingaweb2/monitoring/service/show?host=web%2001&service=disk%20%2Fvar%7Ctmp|Disk>"
        );
    }
}
