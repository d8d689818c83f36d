//! Declarations file (`devhub.toml`)
//!
//! ```toml
//! [provider]
//! host = "https://devhub.example.com"
//!
//! [database.main]
//! name = "main"
//! adapter = "POSTGRES"
//! # ...
//! ```
//!
//! One table per resource kind, keyed by a local name that becomes the
//! instance address. Every declaration is checked against its kind's schema
//! and has schema defaults filled in before it reaches the engine. Empty
//! optional strings count as unset, the same way the remote reports them.

use anyhow::{Context, Result, bail};
use declarative::schema::REDACTED;
use devhub_client::{ClientConfig, DEFAULT_HOST};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::resource::Kind;

/// Environment variable overriding `provider.host`
pub const ENV_HOST: &str = "DEVHUB_HOST";

/// Environment variable overriding `provider.api_key`
pub const ENV_API_KEY: &str = "DEVHUB_API_KEY";

// ============================================================================
// File Format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationsFile {
    #[serde(default)]
    provider: ProviderSection,
    #[serde(default)]
    workflow: BTreeMap<String, toml::Table>,
    #[serde(default)]
    dashboard: BTreeMap<String, toml::Table>,
    #[serde(default)]
    database: BTreeMap<String, toml::Table>,
    #[serde(default)]
    workspace: BTreeMap<String, toml::Table>,
}

impl DeclarationsFile {
    fn tables(self) -> [(Kind, BTreeMap<String, toml::Table>); 4] {
        [
            (Kind::Workflow, self.workflow),
            (Kind::Dashboard, self.dashboard),
            (Kind::Database, self.database),
            (Kind::Workspace, self.workspace),
        ]
    }
}

/// The `[provider]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    pub host: Option<String>,
    pub api_key: Option<String>,
}

// ============================================================================
// Provider Settings
// ============================================================================

/// Resolved connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("api_key", &REDACTED)
            .finish()
    }
}

impl ProviderConfig {
    /// Settings from the file, overridden by the environment.
    pub fn resolve(section: &ProviderSection) -> Result<Self> {
        Self::from_parts(
            section,
            std::env::var(ENV_HOST).ok(),
            std::env::var(ENV_API_KEY).ok(),
        )
    }

    fn from_parts(
        section: &ProviderSection,
        env_host: Option<String>,
        env_api_key: Option<String>,
    ) -> Result<Self> {
        let host = env_host
            .or_else(|| section.host.clone())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let Some(api_key) = env_api_key
            .or_else(|| section.api_key.clone())
            .filter(|k| !k.is_empty())
        else {
            bail!("No API key configured. Set {ENV_API_KEY} or provider.api_key");
        };

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.host.clone(), self.api_key.clone())
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// One declared resource instance
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: Kind,
    pub name: String,
    /// Validated declaration with defaults applied
    pub state: Value,
}

/// Everything in a declarations file
#[derive(Debug, Default)]
pub struct Declarations {
    pub provider: ProviderSection,
    /// Keyed by address, e.g. `devhub_workflow.deploy`
    pub resources: BTreeMap<String, Declaration>,
}

impl Declarations {
    /// Load and validate a declarations file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read declarations file: {}", path.display()))?;
        let declarations = Self::parse(&content)
            .with_context(|| format!("Invalid declarations file: {}", path.display()))?;

        log::debug!(
            "Loaded {} declarations from {}",
            declarations.resources.len(),
            path.display()
        );
        Ok(declarations)
    }

    /// Like [`Declarations::load`], but a missing file declares nothing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Declarations file {} does not exist", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: DeclarationsFile = toml::from_str(content)?;
        let provider = file.provider.clone();

        let mut resources = BTreeMap::new();
        let mut problems = Vec::new();
        for (kind, table) in file.tables() {
            let schema = kind.schema();
            for (name, declaration) in table {
                let address = kind.address(&name);
                let mut state = serde_json::to_value(&declaration)
                    .with_context(|| format!("{address}: not representable as JSON"))?;

                schema.clear_empty(&mut state);
                let violations = schema.validate(&state);
                if !violations.is_empty() {
                    problems.extend(violations.iter().map(|v| format!("{address}: {v}")));
                    continue;
                }

                schema.apply_defaults(&mut state);
                resources.insert(address, Declaration { kind, name, state });
            }
        }

        if !problems.is_empty() {
            bail!(
                "{} invalid:\n  {}",
                crate::ui::count(problems.len(), "attribute"),
                problems.join("\n  ")
            );
        }

        Ok(Self {
            provider,
            resources,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DECLARATIONS: &str = r#"
[provider]
host = "https://devhub.example.com/"

[dashboard.ops]
name = "Ops"

[[dashboard.ops.panels]]
title = "Signups"
query_details = { query = "select 1", credential_id = "c-1" }

[database.main]
name = "main"
adapter = "POSTGRES"
hostname = "db.internal"
database = "app"

[[database.main.credentials]]
username = "reader"
password = "hunter2"
reviews_required = 0
"#;

    #[test]
    fn test_parse_addresses_and_defaults() {
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        let addresses: Vec<_> = declarations.resources.keys().cloned().collect();
        assert_eq!(
            addresses,
            vec!["devhub_dashboard.ops", "devhub_querydesk_database.main"]
        );

        let main = &declarations.resources["devhub_querydesk_database.main"];
        assert_eq!(main.kind, Kind::Database);
        assert_eq!(main.name, "main");
        assert_eq!(main.state["restrict_access"], true);
        assert_eq!(main.state["ssl"], false);
        assert!(main.state.get("port").is_none());
    }

    #[test]
    fn test_parse_treats_empty_optional_strings_as_unset() {
        let content = r#"
[database.main]
name = "main"
adapter = "POSTGRES"
hostname = "db.internal"
database = "app"
group = ""
agent_id = ""

[[database.main.credentials]]
username = "reader"
password = "hunter2"
hostname = ""
reviews_required = 0
"#;
        let declarations = Declarations::parse(content).unwrap();
        let main = &declarations.resources["devhub_querydesk_database.main"].state;
        assert!(main["group"].is_null());
        assert!(main["agent_id"].is_null());
        assert!(main["credentials"][0]["hostname"].is_null());
        assert_eq!(main["credentials"][0]["password"], "hunter2");
    }

    #[test]
    fn test_parse_reports_every_violation() {
        let content = r#"
[database.main]
name = "main"
adapter = "postgres"
id = "db-1"

[workflow.deploy]
name = "Deploy"
steps = [{ name = "nothing" }]
"#;
        let err = Declarations::parse(content).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("devhub_querydesk_database.main: adapter"));
        assert!(message.contains("devhub_querydesk_database.main: id: computed"));
        assert!(message.contains("devhub_querydesk_database.main: credentials"));
        assert!(message.contains("devhub_workflow.deploy: steps[0]"));
    }

    #[test]
    fn test_parse_rejects_unknown_tables() {
        assert!(Declarations::parse("[pipeline.x]\nname = \"x\"\n").is_err());
        assert!(Declarations::parse("[provider]\ntoken = \"x\"\n").is_err());
    }

    #[test]
    fn test_empty_file() {
        let declarations = Declarations::parse("").unwrap();
        assert!(declarations.resources.is_empty());
        assert_eq!(declarations.provider, ProviderSection::default());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devhub.toml");
        fs::write(&path, DECLARATIONS).unwrap();

        let declarations = Declarations::load(&path).unwrap();
        assert_eq!(declarations.resources.len(), 2);
        assert_eq!(
            declarations.provider.host.as_deref(),
            Some("https://devhub.example.com/")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Declarations::load(&path).is_err());
        assert!(Declarations::load_or_default(&path).unwrap().resources.is_empty());
    }

    #[test]
    fn test_provider_env_overrides_file() {
        let section = ProviderSection {
            host: Some("https://file.example.com/".to_string()),
            api_key: Some("from-file".to_string()),
        };

        let config = ProviderConfig::from_parts(&section, None, None).unwrap();
        assert_eq!(config.host, "https://file.example.com");
        assert_eq!(config.api_key, "from-file");

        let config = ProviderConfig::from_parts(
            &section,
            Some("https://env.example.com".to_string()),
            Some("from-env".to_string()),
        )
        .unwrap();
        assert_eq!(config.host, "https://env.example.com");
        assert_eq!(config.api_key, "from-env");
    }

    #[test]
    fn test_provider_defaults_and_missing_key() {
        let section = ProviderSection::default();
        assert!(ProviderConfig::from_parts(&section, None, None).is_err());
        assert!(ProviderConfig::from_parts(&section, None, Some(String::new())).is_err());

        let config = ProviderConfig::from_parts(&section, None, Some("k".to_string())).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.client_config().api_key, "k");
    }

    #[test]
    fn test_provider_debug_hides_key() {
        let config = ProviderConfig {
            host: DEFAULT_HOST.to_string(),
            api_key: "very-secret".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains(REDACTED));
    }
}
