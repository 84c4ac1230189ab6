//! Grafana panel lookup and PNG rendering for notification mails

pub mod ini;

use crate::config::{ResolvedConfig, SettingsError, SettingsSchema};
use anyhow::{Context, Result};
use self::ini::IniDocument;
use regex::Regex;
use reqwest::blocking::Client;
use std::path::PathBuf;
use urlencoding::encode;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 321;

/// The `grafana` section of a plugin config file.
pub fn settings_schema() -> SettingsSchema {
    SettingsSchema::section("grafana")
        .string("url", "", "Grafana base url without trailing slash")
        .secret("api_key", "", "Grafana API key used to render panels")
        .string("dashboard", "icinga2-with-influxdb", "Dashboard slug")
        .string(
            "icingaweb2_ini",
            "/etc/icingaweb2/modules/grafana/graphs.ini",
            "icingaweb2 grafana module graph definitions",
        )
        .string("var_hostname", "var-hostname", "Dashboard variable holding the host name")
        .string("theme", "light", "Render theme")
        .string("default_panel_id", "2", "Panel for host notifications")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafanaSettings {
    pub url: String,
    pub api_key: String,
    pub dashboard: String,
    pub icingaweb2_ini: PathBuf,
    pub var_hostname: String,
    pub theme: String,
    pub default_panel_id: String,
}

impl GrafanaSettings {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SettingsError> {
        Ok(Self {
            url: config.string("url")?.trim_end_matches('/').to_string(),
            api_key: config.string("api_key")?,
            dashboard: config.string("dashboard")?,
            icingaweb2_ini: PathBuf::from(config.string("icingaweb2_ini")?),
            var_hostname: config.string("var_hostname")?,
            theme: config.string("theme")?,
            default_panel_id: config.string("default_panel_id")?,
        })
    }

    pub fn page_url(&self, panel_id: &str, host_name: &str) -> String {
        format!(
            "{}/dashboard/db/{}?fullscreen&panelId={}&{}={}",
            self.url,
            self.dashboard,
            encode(panel_id),
            self.var_hostname,
            encode(host_name)
        )
    }

    pub fn png_url(&self, panel_id: &str, host_name: &str) -> String {
        format!(
            "{}/render/dashboard-solo/db/{}?panelId={}&{}={}&theme={}&width={WIDTH}&height={HEIGHT}",
            self.url,
            self.dashboard,
            encode(panel_id),
            self.var_hostname,
            encode(host_name),
            self.theme
        )
    }
}

/// What the notification knows about the checked object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelQuery<'a> {
    pub panel_id: &'a str,
    pub host_state: &'a str,
    pub service_state: &'a str,
    pub service_displayname: &'a str,
    pub service_name: &'a str,
    pub service_command: &'a str,
}

/// Pick the panel to render.
///
/// Service notifications prefer the explicit panel id, then the graphs.ini
/// section matching the service. Host notifications fall back to the
/// default panel.
pub fn select_panel_id(
    settings: &GrafanaSettings,
    ini: Option<&IniDocument>,
    query: &PanelQuery<'_>,
) -> Option<String> {
    if !query.service_state.is_empty() {
        if !query.panel_id.is_empty() {
            return Some(query.panel_id.to_string());
        }
        let Some(ini) = ini else {
            tracing::warn!(
                "Unable to get panel id for service: no panel id given and {} is not readable",
                settings.icingaweb2_ini.display()
            );
            return None;
        };
        return find_ini_panel_id(
            ini,
            query.service_displayname,
            query.service_name,
            query.service_command,
        );
    }
    if !query.host_state.is_empty() {
        if !query.panel_id.is_empty() {
            return Some(query.panel_id.to_string());
        }
        return Some(settings.default_panel_id.clone()).filter(|id| !id.is_empty());
    }
    None
}

/// `panelId` of the single section matching the first non-empty of display
/// name, name, command. Patterns are anchored at the start of the section name.
pub fn find_ini_panel_id(
    ini: &IniDocument,
    display_name: &str,
    name: &str,
    command: &str,
) -> Option<String> {
    let pattern = [display_name, name, command].into_iter().find(|p| !p.is_empty())?;
    let regex = Regex::new(&format!("^(?:{pattern})"))
        .or_else(|_| Regex::new(&format!("^{}", regex::escape(pattern))))
        .ok()?;

    let matches: Vec<_> = ini.sections().filter(|s| regex.is_match(&s.name)).collect();
    tracing::debug!(
        "Grafana ini pattern {pattern} matched {:?}",
        matches.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
    );
    match matches.as_slice() {
        [section] => section.get("panelId").map(|id| id.replace('"', "")),
        _ => None,
    }
}

/// Rendered graph, when one could be produced.
#[derive(Debug, Clone, Default)]
pub struct GrafanaGraph {
    pub panel_id: Option<String>,
    pub page_url: Option<String>,
    pub png: Option<Vec<u8>>,
}

impl GrafanaGraph {
    /// Look up the panel, build the links and fetch the PNG. Every failure
    /// is logged and leaves the corresponding part empty.
    pub fn fetch(settings: &GrafanaSettings, query: &PanelQuery<'_>, host_name: &str) -> Self {
        let ini = if settings.icingaweb2_ini.exists() {
            IniDocument::load(&settings.icingaweb2_ini)
                .map_err(|e| tracing::warn!("Unable to parse grafana ini file: {e:#}"))
                .ok()
        } else {
            None
        };

        let panel_id = select_panel_id(settings, ini.as_ref(), query);
        let mut graph = Self { panel_id: panel_id.clone(), ..Self::default() };
        let Some(panel_id) = panel_id.filter(|_| !settings.url.is_empty()) else {
            return graph;
        };

        graph.page_url = Some(settings.page_url(&panel_id, host_name));
        let png_url = settings.png_url(&panel_id, host_name);
        match fetch_png(&png_url, &settings.api_key) {
            Ok(png) => graph.png = Some(png),
            Err(e) => tracing::warn!("Error getting png: {e:#}"),
        }
        graph
    }
}

pub fn fetch_png(url: &str, api_key: &str) -> Result<Vec<u8>> {
    tracing::debug!("PNG url: {url}");
    let client = Client::builder().build().context("Failed to create Grafana client")?;
    let response = client
        .get(url)
        .header("Authorization", format!("Bearer {api_key}"))
        .send()
        .with_context(|| format!("Grafana request to {url} failed"))?;
    let status = response.status();
    tracing::debug!("PNG get status code: {status}");
    if !status.is_success() {
        anyhow::bail!("Grafana returned {status} for {url}");
    }
    let bytes = response.bytes().context("Failed to read PNG body")?;
    Ok(bytes.to_vec())
}
