//! Request Tracker tickets for critical hosts and services
//!
//! The ticket belonging to a host or service is remembered as an Icinga
//! comment written by the API user, `[<rt name> #<id>] - ticket created in RT`.
//! Later notifications read the comment back to find the ticket.

use super::{base_schema, default_config_file, finish_schema, resolve_section};
use crate::config::{ResolvedConfig, SettingsError, SettingsSchema};
use crate::icinga::{Comment, IcingaApi, Notification};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;

static CREATED_TICKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"# Ticket (\w+) created").expect("valid regex"));
static TRACKED_TICKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([0-9]+)\]").expect("valid regex"));

pub fn schema() -> SettingsSchema {
    finish_schema(
        base_schema("NOTIFY_RT_", Some(&default_config_file("request-tracker")))
            .string("rt_requestor", "", "Requestor of created tickets")
            .string("rt_queue", "", "Queue for created tickets, defaults to rt.queue"),
    )
}

pub fn rt_schema() -> SettingsSchema {
    SettingsSchema::section("rt")
        .string("name", "rtInstance", "Name of the RT instance used in Icinga comments")
        .string("queue", "rtqueue", "Default queue")
        .string("url", "https://rt.example.com", "RT base url")
        .string("username", "rtbot", "RT user")
        .secret("password", "", "RT password")
}

pub fn icinga_schema() -> SettingsSchema {
    SettingsSchema::section("icinga")
        .string("url", "https://localhost:5665", "Icinga 2 API url")
        .string("username", "rtnotify", "Icinga 2 API user")
        .secret("password", "", "Icinga 2 API password")
}

pub fn sections() -> Vec<SettingsSchema> {
    vec![rt_schema(), icinga_schema()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtSettings {
    pub name: String,
    pub queue: String,
    pub url: String,
    pub username: String,
    pub password: String,
}

impl RtSettings {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SettingsError> {
        Ok(Self {
            name: config.string("name")?,
            queue: config.string("queue")?,
            url: config.string("url")?.trim_end_matches('/').to_string(),
            username: config.string("username")?,
            password: config.string("password")?,
        })
    }
}

/// What to do in RT for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    Create { subject: String },
    Comment { ticket_id: String },
    Recover { ticket_id: String, subject: String },
    Nothing,
}

pub fn decide(n: &Notification, ticket_id: Option<&str>) -> TicketAction {
    let state = n.state();
    if n.is_acknowledgement() {
        return match ticket_id {
            Some(id) => TicketAction::Comment { ticket_id: id.to_string() },
            None => TicketAction::Nothing,
        };
    }
    match (state, ticket_id) {
        ("CRITICAL" | "DOWN", None) => TicketAction::Create {
            subject: format!("{} {} went {}", n.host_displayname, n.service_displayname, state),
        },
        ("CRITICAL" | "DOWN", Some(id)) => TicketAction::Comment { ticket_id: id.to_string() },
        ("OK" | "UP", Some(id)) => TicketAction::Recover {
            ticket_id: id.to_string(),
            subject: format!("{} {} - Recovered", n.host_displayname, n.service_displayname),
        },
        _ => TicketAction::Nothing,
    }
}

/// Indent every line by two spaces, as RT requires for multi-line values.
pub fn parse_rt_field(value: &str) -> String {
    value.split_inclusive('\n').map(|line| format!("  {line}")).collect()
}

pub fn ticket_message(n: &Notification) -> String {
    format!(
        "Notification Type: {}\n \n Service: {}\n Host: {}\n Address: {}\n State: {}\n \n Additional Info: {}\n \n Comment: [{}] {}\n",
        n.notification_type,
        n.service_displayname,
        n.host_displayname,
        n.host_address,
        n.state(),
        parse_rt_field(n.output()),
        n.notification_author,
        n.notification_comment,
    )
}

pub fn tracking_comment(rt_name: &str, ticket_id: &str) -> String {
    format!("[{rt_name} #{ticket_id}] - ticket created in RT")
}

pub fn tracked_ticket_id(comments: &[Comment]) -> Option<String> {
    let text = &comments.first()?.attrs.text;
    TRACKED_TICKET.captures(text).map(|c| c[1].to_string())
}

pub fn created_ticket_id(response: &str) -> Option<String> {
    CREATED_TICKET.captures(response).map(|c| c[1].to_string())
}

/// RT REST 1.0 client. The session cookie from `login` authenticates the
/// following requests.
pub struct RtClient {
    client: Client,
    url: String,
}

impl RtClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to create RT client")?;
        Ok(Self { client, url: url.trim_end_matches('/').to_string() })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        self.client
            .post(&self.url)
            .form(&[("user", username), ("pass", password)])
            .send()
            .with_context(|| format!("Failed to authenticate with RT at {}", self.url))?;
        Ok(())
    }

    fn post_content(&self, path: &str, content: &str) -> Result<String> {
        let url = format!("{}/REST/1.0/{path}", self.url);
        let text = self
            .client
            .post(&url)
            .header("Referer", self.url.as_str())
            .form(&[("content", content)])
            .send()
            .and_then(|r| r.text())
            .with_context(|| format!("RT request to {url} failed"))?;
        tracing::debug!("RT response from {url}: {text}");
        Ok(text)
    }

    pub fn create_ticket(&self, queue: &str, requestor: &str, subject: &str, text: &str) -> Result<String> {
        let content = format!(
            "id: ticket/new\nQueue: {queue}\nRequestor: {requestor}\nSubject: {subject}\nText: {text}"
        );
        let response = self.post_content("ticket/new", &content)?;
        created_ticket_id(&response)
            .with_context(|| format!("RT did not report a created ticket: {response}"))
    }

    pub fn comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        let content = format!("id: {ticket_id}\nAction: comment\nText: {text}");
        self.post_content(&format!("ticket/{ticket_id}/comment"), &content)?;
        Ok(())
    }

    pub fn set_subject(&self, ticket_id: &str, subject: &str) -> Result<()> {
        self.post_content(&format!("ticket/{ticket_id}/edit"), &format!("Subject: {subject}\n"))?;
        Ok(())
    }

    pub fn set_status(&self, ticket_id: &str, status: &str) -> Result<()> {
        self.post_content(&format!("ticket/{ticket_id}/edit"), &format!("Status: {status}\n"))?;
        Ok(())
    }
}

pub fn run(config: &ResolvedConfig) -> Result<()> {
    let rt = RtSettings::from_config(&resolve_section(config, &rt_schema())?)?;
    let icinga_config = resolve_section(config, &icinga_schema())?;
    let notification = Notification::from_config(config)?;

    let api = IcingaApi::new(
        &icinga_config.string("url")?,
        &icinga_config.string("username")?,
        &icinga_config.string("password")?,
    )?;
    let comments = api
        .comments(&notification.host_name, &notification.service_name)
        .unwrap_or_else(|e| {
            tracing::warn!("Unable to read tracking comments: {e:#}");
            Vec::new()
        });
    let ticket_id = tracked_ticket_id(&comments);

    let action = decide(&notification, ticket_id.as_deref());
    tracing::info!("RT action: {action:?}");
    if action == TicketAction::Nothing {
        return Ok(());
    }

    let client = RtClient::new(&rt.url)?;
    client.login(&rt.username, &rt.password)?;
    let message = ticket_message(&notification);

    match action {
        TicketAction::Create { subject } => {
            let queue = Some(config.string("rt_queue")?)
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| rt.queue.clone());
            let id = client.create_ticket(&queue, &config.string("rt_requestor")?, &subject, &message)?;
            tracing::info!("Created RT ticket {id}");
            if let Err(e) = api.add_comment(
                &notification.host_name,
                &notification.service_name,
                &tracking_comment(&rt.name, &id),
            ) {
                tracing::error!("Failed to record RT ticket {id} in Icinga: {e:#}");
            }
        }
        TicketAction::Comment { ticket_id } => client.comment(&ticket_id, &message)?,
        TicketAction::Recover { ticket_id, subject } => {
            client.comment(&ticket_id, &message)?;
            client.set_subject(&ticket_id, &subject)?;
            client.set_status(&ticket_id, "open")?;
            api.remove_comments(&comments);
        }
        TicketAction::Nothing => {}
    }
    Ok(())
}
