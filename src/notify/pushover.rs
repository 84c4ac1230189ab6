//! Pushover notifications
//!
//! Pushover has no config file: every field comes from the environment or
//! the command line.

use super::{base_schema, finish_schema};
use crate::config::{ResolvedConfig, SettingsSchema};
use crate::icinga::Notification;
use anyhow::{Context, Result};
use reqwest::blocking::Client;

pub const MESSAGES_URL: &str = "https://api.pushover.net/1/messages.json";

pub fn schema() -> SettingsSchema {
    finish_schema(
        base_schema("NOTIFY_PUSHOVER_", None)
            .secret("pushover_token", "", "Pushover application token")
            .string("pushover_user", "", "Pushover user or group key"),
    )
    .exclude_all(["config_file"])
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

pub fn message(n: &Notification) -> String {
    let headline = if n.is_service() {
        format!("{}: {} on {}", title_case(&n.notification_type), n.service_displayname, n.host_displayname)
    } else {
        format!("{}: {}", title_case(&n.notification_type), n.host_displayname)
    };
    format!(
        "{headline}\nState: {}\nAddress: {}\n\nDate/Time: {}\nAdditional Info: {}\nComment: [{}] {}\n",
        n.state(),
        n.host_address,
        n.notification_date_time,
        n.output(),
        n.notification_author,
        n.notification_comment,
    )
}

pub fn send(token: &str, user: &str, message: &str) -> Result<()> {
    tracing::debug!("Sending to {user} message: {message}");
    let client = Client::builder().build().context("Failed to create HTTP client")?;
    let response = client
        .post(MESSAGES_URL)
        .form(&[("token", token), ("user", user), ("message", message)])
        .send()
        .context("Pushover request failed")?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let text = response.text().unwrap_or_default();
        anyhow::bail!("Failed to send notification for user {user}, response ({status}): {text}");
    }
    Ok(())
}

pub fn run(config: &ResolvedConfig) -> Result<()> {
    let notification = Notification::from_config(config)?;
    send(
        &config.string("pushover_token")?,
        &config.string("pushover_user")?,
        &message(&notification),
    )
}
