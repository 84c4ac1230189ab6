//! MIME assembly and SMTP delivery

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

pub const LOGO_CID: &str = "icinga2_logo";
pub const GRAPH_CID: &str = "grafana2_perfdata";

/// Comma-separated recipients, blanks dropped.
pub fn recipients(email_to: &str) -> Result<Vec<Mailbox>> {
    email_to
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(|address| address.parse::<Mailbox>().with_context(|| format!("Invalid to address: {address}")))
        .collect()
}

/// `multipart/related` holding the text/HTML alternative and the inline
/// images the HTML references by content id.
pub fn build(
    from: &str,
    email_to: &str,
    subject: &str,
    text: String,
    html: String,
    logo: Option<Vec<u8>>,
    graph: Option<Vec<u8>>,
) -> Result<Message> {
    let to = recipients(email_to)?;
    if to.is_empty() {
        anyhow::bail!("No recipients: email_to is empty");
    }

    let mut builder = Message::builder()
        .from(from.parse::<Mailbox>().with_context(|| format!("Invalid from address: {from}"))?)
        .subject(subject);
    for mailbox in to {
        builder = builder.to(mailbox);
    }

    let png = ContentType::parse("image/png").context("Invalid image content type")?;
    let mut related = MultiPart::related().multipart(MultiPart::alternative_plain_html(text, html));
    if let Some(logo) = logo {
        related = related.singlepart(Attachment::new_inline(LOGO_CID.to_string()).body(logo, png.clone()));
    }
    if let Some(graph) = graph {
        related = related.singlepart(Attachment::new_inline(GRAPH_CID.to_string()).body(graph, png));
    }

    builder.multipart(related).context("Failed to build email")
}

/// `host` or `host:port`.
fn split_server(server: &str) -> (&str, Option<u16>) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}

/// Send over plain SMTP, logging in only when both credentials are set.
pub fn send(message: &Message, server: &str, username: &str, password: &str) -> Result<()> {
    let (host, port) = split_server(server);
    let mut builder = SmtpTransport::builder_dangerous(host);
    if let Some(port) = port {
        builder = builder.port(port);
    }
    if !username.is_empty() && !password.is_empty() {
        builder = builder.credentials(Credentials::new(username.to_string(), password.to_string()));
    }
    builder
        .build()
        .send(message)
        .with_context(|| format!("Cannot send mail using SMTP server '{server}'"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_split_on_commas() {
        let to = recipients("ops@example.com, dba@example.com,,").expect("recipients");
        assert_eq!(to.len(), 2);
        assert_eq!(to[1].email.to_string(), "dba@example.com");
        assert!(recipients("not an address").is_err());
    }

    #[test]
    fn server_port_is_optional() {
        assert_eq!(split_server("localhost"), ("localhost", None));
        assert_eq!(split_server("mail.local:2525"), ("mail.local", Some(2525)));
    }

    #[test]
    fn message_is_related_with_inline_images() {
        let message = build(
            "icinga@example.com",
            "ops@example.com",
            "Host PROBLEM - web01 is DOWN",
            "plain".into(),
            "<html></html>".into(),
            Some(vec![1, 2, 3]),
            Some(vec![4, 5, 6]),
        )
        .expect("message");
        let raw = String::from_utf8(message.formatted()).expect("utf8");
        assert!(raw.contains("Subject: Host PROBLEM - web01 is DOWN"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Content-ID: <icinga2_logo>"));
        assert!(raw.contains("Content-ID: <grafana2_perfdata>"));
    }

    #[test]
    fn message_without_recipients_fails() {
        let err = build("icinga@example.com", " , ", "s", "t".into(), "h".into(), None, None).unwrap_err();
        assert!(err.to_string().contains("email_to"));
    }
}
