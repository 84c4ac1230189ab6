//! Minimal INI reader for the icingaweb2 grafana module `graphs.ini`
//!
//! Only sections and `key = value` pairs are understood. Values keep
//! everything after the first `=` with surrounding whitespace trimmed.

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<IniSection> = Vec::new();
        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.push(IniSection { name: name.trim().to_string(), entries: Vec::new() });
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!("Ignoring ini line without '=': {line}");
                continue;
            };
            match sections.last_mut() {
                Some(section) => {
                    section.entries.push((key.trim().to_string(), value.trim().to_string()))
                }
                None => tracing::debug!("Ignoring ini key outside of a section: {line}"),
            }
        }
        Self { sections }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ini file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GRAPHS_INI: &str = r#"
; icingaweb2 grafana module
[ping4]
dashboard = "icinga2-default"
panelId = "2"

[disk]
panelId = "5"
customVars = "&var-disk=$disk_name$"
"#;

    #[test]
    fn parses_sections_and_keys() {
        let doc = IniDocument::parse(GRAPHS_INI);
        let names: Vec<_> = doc.sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ping4", "disk"]);
        assert_eq!(doc.section("disk").and_then(|s| s.get("panelId")), Some("\"5\""));
        assert_eq!(
            doc.section("disk").and_then(|s| s.get("customVars")),
            Some("\"&var-disk=$disk_name$\"")
        );
    }

    #[test]
    fn keys_before_first_section_are_ignored() {
        let doc = IniDocument::parse("orphan = 1\n[a]\nb = 2\n");
        assert_eq!(doc.sections().count(), 1);
        assert_eq!(doc.section("a").and_then(|s| s.get("b")), Some("2"));
    }

    #[test]
    fn load_reports_missing_file() {
        let tmp = TempDir::new().expect("tmp");
        let err = IniDocument::load(&tmp.path().join("graphs.ini")).unwrap_err();
        assert!(err.to_string().contains("graphs.ini"));

        let path = tmp.path().join("present.ini");
        fs::write(&path, GRAPHS_INI).expect("write");
        assert!(IniDocument::load(&path).is_ok());
    }
}
