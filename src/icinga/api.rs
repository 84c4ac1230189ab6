//! Icinga 2 REST API client (comments)

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub attrs: CommentAttrs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentAttrs {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "__name", default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CommentResults {
    #[serde(default)]
    results: Vec<Comment>,
}

pub struct IcingaApi {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl IcingaApi {
    /// The API usually listens on localhost with a self-signed certificate,
    /// so certificate checks and proxies are skipped.
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()
            .context("Failed to create Icinga API client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
    }

    /// Comments this API user left on the host or service.
    pub fn comments(&self, host_name: &str, service_name: &str) -> Result<Vec<Comment>> {
        let url = format!("{}/v1/objects/comments", self.base_url);
        let body = json!({ "filter": comment_filter(host_name, service_name, &self.username) });
        let response = self
            .request(self.client.get(&url))
            .json(&body)
            .send()
            .with_context(|| format!("Failed to query comments from {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Icinga API returned {status} for {url}");
        }
        let parsed: CommentResults =
            response.json().with_context(|| format!("Invalid comment list from {url}"))?;
        Ok(parsed.results)
    }

    pub fn add_comment(&self, host_name: &str, service_name: &str, text: &str) -> Result<Value> {
        let url = format!("{}/v1/actions/add-comment", self.base_url);
        let mut filter = format!("host.name==\"{host_name}\"");
        let object_type = if service_name.is_empty() {
            "Host"
        } else {
            filter.push_str(&format!("&&service.name==\"{service_name}\""));
            "Service"
        };
        let body = json!({
            "filter": filter,
            "type": object_type,
            "author": self.username,
            "comment": text,
        });
        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .with_context(|| format!("Failed to add comment via {url}"))?;
        response.json().with_context(|| format!("Invalid add-comment response from {url}"))
    }

    /// Remove the given comments, skipping any not authored by this API user.
    pub fn remove_comments(&self, comments: &[Comment]) {
        for comment in comments.iter().filter(|c| c.attrs.author == self.username) {
            let url = format!("{}/v1/actions/remove-comment", self.base_url);
            let result = self
                .request(self.client.post(&url))
                .query(&[("comment", comment.attrs.name.as_str())])
                .send()
                .and_then(|r| r.text());
            match result {
                Ok(text) => tracing::debug!("Removed comment {}: {text}", comment.attrs.name),
                Err(e) => tracing::error!("Failed to remove comment {}: {e}", comment.attrs.name),
            }
        }
    }
}

/// Filter selecting the API user's comments on one host or service.
pub fn comment_filter(host_name: &str, service_name: &str, author: &str) -> String {
    let mut filter = format!("host.name==\"{host_name}\"");
    if service_name.is_empty() {
        filter.push_str("&&comment.service_name==\"\"");
    } else {
        filter.push_str(&format!("&&service.name==\"{service_name}\""));
    }
    filter.push_str(&format!("&&comment.author==\"{author}\""));
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_filter_names_service() {
        assert_eq!(
            comment_filter("web01", "http", "rtnotify"),
            r#"host.name=="web01"&&service.name=="http"&&comment.author=="rtnotify""#
        );
    }

    #[test]
    fn host_filter_excludes_service_comments() {
        assert_eq!(
            comment_filter("web01", "", "rtnotify"),
            r#"host.name=="web01"&&comment.service_name==""&&comment.author=="rtnotify""#
        );
    }

    #[test]
    fn comment_list_deserializes() {
        let raw = r#"{"results":[{"attrs":{"author":"rtnotify","text":"[rt #42] - ticket created in RT","__name":"web01!abc"}}]}"#;
        let parsed: CommentResults = serde_json::from_str(raw).expect("json");
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].attrs.name, "web01!abc");
    }
}
