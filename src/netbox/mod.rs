//! Netbox REST client
//!
//! Netbox is enrichment only: every lookup degrades to "nothing found" and
//! logs the failure instead of aborting the notification.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;


#[derive(Debug, Clone)]
pub struct NetboxClient {
    client: Client,
    url: String,
    token: String,
}

/// A Netbox object reachable through an impacted path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathObject {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub direction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathContact {
    #[serde(default)]
    pub email: String,
}

/// One path returned by the impact assessment plugin endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImpactedPath {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<PathObject>,
    #[serde(default)]
    pub contacts: Vec<PathContact>,
}

impl NetboxClient {
    /// `proxy` and `timeout_secs` are optional: empty proxy means direct,
    /// zero timeout means the reqwest default.
    pub fn new(url: &str, token: &str, proxy: &str, timeout_secs: u64) -> Result<Self> {
        let mut builder = Client::builder();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        if !proxy.is_empty() {
            builder = builder
                .proxy(reqwest::Proxy::all(proxy).with_context(|| format!("Invalid proxy: {proxy}"))?);
        }
        let client = builder.build().context("Failed to create Netbox client")?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// A client with no base URL does nothing.
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut request = self.client.get(url).query(query).header("Accept", "application/json");
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Token {}", self.token));
        }
        tracing::debug!("Netbox request to url: {url}");
        let response = request.send().with_context(|| format!("Netbox request to {url} failed"))?;
        let value: Value = response
            .json()
            .with_context(|| format!("Netbox response from {url} is not JSON"))?;
        tracing::debug!("Netbox result: {value}");
        Ok(value)
    }

    /// Query `<base><api_path>/?<key>=<value>` and return the object when
    /// exactly one matches.
    pub fn search(&self, api_path: &str, key: &str, value: &str) -> Option<Value> {
        if !self.is_enabled() || value.is_empty() {
            return None;
        }
        let url = format!("{}{}/", self.url, api_path);
        match self.get_json(&url, &[(key, value)]) {
            Ok(result) => single_result(result),
            Err(e) => {
                tracing::error!("Error getting netbox data: {e:#}");
                None
            }
        }
    }

    /// Paths impacted by object `id` of `object_type` (e.g. `dcim.devices`).
    pub fn impact_assessment(&self, api_impact: &str, id: &str, object_type: &str) -> Vec<ImpactedPath> {
        let url = format!("{}{}", self.url, api_impact);
        let result = self
            .get_json(&url, &[("id", id), ("type", object_type)])
            .and_then(|v| {
                serde_json::from_value::<Vec<ImpactedPath>>(v).context("Unexpected impact assessment shape")
            });
        match result {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!("Error getting impact assessment from {url}: {e:#}");
                Vec::new()
            }
        }
    }

    /// Web UI link for an object id under `api_path`.
    pub fn object_url(&self, api_path: &str, id: &Value) -> String {
        let ui_path = ui_path(api_path);
        format!("{}{}/{}/", self.url, ui_path.trim_end_matches('/'), id_string(id))
    }
}

fn single_result(result: Value) -> Option<Value> {
    if result.get("count").and_then(Value::as_u64) != Some(1) {
        return None;
    }
    result.get("results")?.as_array()?.first().cloned()
}

/// Render a JSON id (number or string) without quotes.
pub fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Value at `key1` (or `key1.key2` when the first is an object), as display text.
pub fn lookup(object: &Value, key1: &str, key2: Option<&str>) -> Option<String> {
    let first = object.get(key1)?;
    let value = match key2 {
        Some(k) if first.get(k).is_some() => first.get(k)?,
        _ => first,
    };
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("display")
            .or_else(|| map.get("address"))
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        other => Some(other.to_string()),
    }
}

/// UI link for a nested object: its `url` with the `/api/` segment dropped.
pub fn ui_link(object: &Value, key: &str) -> Option<String> {
    let url = object.get(key)?.get("url")?.as_str()?;
    Some(ui_path(url))
}

/// API url or path to its web UI counterpart: the first `/api/` becomes `/`.
pub fn ui_path(api: &str) -> String {
    api.replacen("/api/", "/", 1)
}
