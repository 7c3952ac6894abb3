//! Compose manifest summary.
//!
//! Only the pieces the launcher needs to pick a readiness strategy are read
//! here; `docker compose config` stays the authority on validity.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    services: BTreeMap<String, RawService>,
}

#[derive(Debug, Default, Deserialize)]
struct RawService {
    image: Option<String>,
    healthcheck: Option<RawHealthcheck>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHealthcheck {
    #[serde(default)]
    disable: bool,
    test: Option<serde_yaml::Value>,
}

impl RawHealthcheck {
    fn is_active(&self) -> bool {
        if self.disable {
            return false;
        }
        match self.test {
            Some(serde_yaml::Value::Sequence(ref parts)) => {
                parts.first().and_then(|v| v.as_str()) != Some("NONE")
            }
            Some(serde_yaml::Value::String(ref s)) => !s.trim().is_empty() && s.trim() != "NONE",
            // healthcheck block without test inherits the image's HEALTHCHECK
            _ => true,
        }
    }
}

/// One service of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    pub name: String,
    pub image: Option<String>,
    pub has_healthcheck: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub services: Vec<ServiceSummary>,
}

impl ManifestSummary {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawManifest = serde_yaml::from_str(content)?;
        let services = raw
            .services
            .into_iter()
            .map(|(name, svc)| ServiceSummary {
                name,
                image: svc.image,
                has_healthcheck: svc.healthcheck.map(|h| h.is_active()).unwrap_or(false),
            })
            .collect();
        Ok(Self { services })
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn declares_healthchecks(&self) -> bool {
        self.services.iter().any(|s| s.has_healthcheck)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_services() {
        let yaml = r#"
services:
  caddy:
    image: caddy:2-alpine
    ports: ["80:80", "443:443"]
  filebrowser:
    image: filebrowser/filebrowser:latest
    healthcheck:
      test: ["CMD", "wget", "-qO-", "http://localhost/health"]
      interval: 10s
"#;
        let summary = ManifestSummary::parse(yaml).unwrap();
        assert_eq!(summary.service_names(), vec!["caddy", "filebrowser"]);
        assert!(!summary.services[0].has_healthcheck);
        assert!(summary.services[1].has_healthcheck);
        assert!(summary.declares_healthchecks());
    }

    #[test]
    fn test_disabled_healthchecks_do_not_count() {
        let yaml = r#"
services:
  a:
    image: alpine
    healthcheck:
      disable: true
  b:
    image: alpine
    healthcheck:
      test: ["NONE"]
"#;
        let summary = ManifestSummary::parse(yaml).unwrap();
        assert!(!summary.declares_healthchecks());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(ManifestSummary::parse("services: [unterminated").is_err());
    }
}
