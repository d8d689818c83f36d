//! `devhub_querydesk_database`: a QueryDesk connection and its credentials.
//!
//! Credentials are matched by username across updates. `credential_ids` is
//! derived from the credential list every time the state is rebuilt and is
//! never read back from anywhere else.

use std::collections::BTreeMap;

use declarative::binder::{self, Identified};
use declarative::schema::REDACTED;
use declarative::{Attr, AttrType, Attribute, Presence, ResourceKind, Result, Schema, Whitelist};
use devhub_client::{Database, DatabaseCredential};
use serde::{Deserialize, Serialize};

const KIND: &str = "devhub_querydesk_database";

pub const ADAPTERS: Whitelist = Whitelist::new("adapter", &["POSTGRES", "MYSQL", "CLICKHOUSE"]);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseState {
    pub id: Attr<String>,
    pub name: String,
    pub adapter: String,
    pub hostname: String,
    pub port: Attr<i64>,
    pub database: String,
    pub ssl: bool,
    pub restrict_access: bool,
    pub enable_data_protection: bool,
    pub cacertfile: Attr<String>,
    pub keyfile: Attr<String>,
    pub certfile: Attr<String>,
    pub group: Attr<String>,
    pub slack_channel: Attr<String>,
    pub agent_id: Attr<String>,
    pub credentials: Vec<CredentialBlock>,
    pub credential_ids: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialBlock {
    pub id: Attr<String>,
    pub username: String,
    pub password: Attr<String>,
    pub hostname: Attr<String>,
    pub reviews_required: i64,
    pub default_credential: Attr<bool>,
}

impl Identified for CredentialBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

pub struct DatabaseKind;

fn credential_ids(credentials: &[CredentialBlock]) -> BTreeMap<String, String> {
    binder::index_ids(credentials, |c| c.username.clone())
}

/// Write-only value of the prior credential with the same id.
fn prior_password(prior: Option<&DatabaseState>, id: &str) -> Attr<String> {
    prior
        .and_then(|p| p.credentials.iter().find(|c| c.id.as_str() == Some(id)))
        .map(|c| c.password.clone())
        .unwrap_or_default()
}

fn mask(value: &mut String) {
    if !value.is_empty() {
        *value = REDACTED.to_string();
    }
}

impl ResourceKind for DatabaseKind {
    const TYPE_NAME: &'static str = KIND;

    type State = DatabaseState;
    type Remote = Database;

    fn schema() -> Schema {
        let credential = Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("username", AttrType::String),
            Attribute::required("password", AttrType::String).write_only(),
            Attribute::optional("hostname", AttrType::String)
                .describe("Overrides the database hostname for this credential."),
            Attribute::required("reviews_required", AttrType::Int),
            Attribute::optional_computed("default_credential", AttrType::Bool),
        ]);

        Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("name", AttrType::String),
            Attribute::required("adapter", AttrType::String).one_of(ADAPTERS.values),
            Attribute::required("hostname", AttrType::String),
            Attribute::optional("port", AttrType::Int),
            Attribute::required("database", AttrType::String),
            Attribute::optional_computed("ssl", AttrType::Bool).default_value(false),
            Attribute::optional_computed("restrict_access", AttrType::Bool).default_value(true),
            Attribute::optional_computed("enable_data_protection", AttrType::Bool)
                .default_value(false),
            Attribute::optional("cacertfile", AttrType::String).write_only(),
            Attribute::optional("keyfile", AttrType::String).write_only(),
            Attribute::optional("certfile", AttrType::String).write_only(),
            Attribute::optional("group", AttrType::String),
            Attribute::optional("slack_channel", AttrType::String),
            Attribute::optional("agent_id", AttrType::String),
            Attribute::block_list("credentials", Presence::Required, credential),
            Attribute::computed("credential_ids", AttrType::StringMap)
                .describe("Credential id by username."),
        ])
        .describe("A QueryDesk database connection.")
    }

    fn state_id(state: &DatabaseState) -> Option<&str> {
        state.id.as_str()
    }

    fn remote_id(remote: &Database) -> &str {
        &remote.id
    }

    fn to_remote(desired: &DatabaseState) -> Result<Database> {
        let adapter = ADAPTERS.to_wire(KIND, &desired.adapter)?;

        Ok(Database {
            id: desired.id.to_wire(),
            name: desired.name.clone(),
            adapter,
            hostname: desired.hostname.clone(),
            port: desired.port.known().copied(),
            database: desired.database.clone(),
            ssl: desired.ssl,
            cacertfile: desired.cacertfile.to_wire(),
            keyfile: desired.keyfile.to_wire(),
            certfile: desired.certfile.to_wire(),
            restrict_access: desired.restrict_access,
            enable_data_protection: desired.enable_data_protection,
            group: desired.group.to_wire(),
            slack_channel: desired.slack_channel.to_wire(),
            agent_id: desired.agent_id.to_wire(),
            credentials: desired
                .credentials
                .iter()
                .map(|c| DatabaseCredential {
                    id: c.id.to_wire(),
                    username: c.username.clone(),
                    password: c.password.to_wire(),
                    hostname: c.hostname.to_wire(),
                    reviews_required: c.reviews_required,
                    default_credential: c.default_credential.value_or(false),
                })
                .collect(),
        })
    }

    fn absorb(desired: &DatabaseState, response: &Database) -> Result<DatabaseState> {
        let credentials = binder::bind(
            KIND,
            "credentials",
            &desired.credentials,
            &response.credentials,
            |_, credential, remote| {
                Ok(CredentialBlock {
                    id: Attr::from_wire(remote.id.as_str()),
                    default_credential: Attr::Known(remote.default_credential),
                    ..credential.clone()
                })
            },
        )?;

        Ok(DatabaseState {
            id: Attr::from_wire(response.id.as_str()),
            credential_ids: credential_ids(&credentials),
            credentials,
            ..desired.clone()
        })
    }

    fn refresh(prior: Option<&DatabaseState>, remote: &Database) -> Result<DatabaseState> {
        let credentials: Vec<CredentialBlock> = remote
            .credentials
            .iter()
            .map(|c| CredentialBlock {
                id: Attr::from_wire(c.id.as_str()),
                username: c.username.clone(),
                password: prior_password(prior, &c.id),
                hostname: Attr::from_wire(c.hostname.as_str()),
                reviews_required: c.reviews_required,
                default_credential: Attr::Known(c.default_credential),
            })
            .collect();

        let (cacertfile, keyfile, certfile) = match prior {
            Some(p) => (p.cacertfile.clone(), p.keyfile.clone(), p.certfile.clone()),
            None => Default::default(),
        };

        Ok(DatabaseState {
            id: Attr::from_wire(remote.id.as_str()),
            name: remote.name.clone(),
            adapter: ADAPTERS.from_wire(KIND, &remote.adapter)?,
            hostname: remote.hostname.clone(),
            port: remote.port.into(),
            database: remote.database.clone(),
            ssl: remote.ssl,
            restrict_access: remote.restrict_access,
            enable_data_protection: remote.enable_data_protection,
            cacertfile,
            keyfile,
            certfile,
            group: Attr::from_wire(remote.group.as_str()),
            slack_channel: Attr::from_wire(remote.slack_channel.as_str()),
            agent_id: Attr::from_wire(remote.agent_id.as_str()),
            credential_ids: credential_ids(&credentials),
            credentials,
        })
    }

    fn carry_identity(desired: &DatabaseState, tracked: &DatabaseState) -> DatabaseState {
        let mut credentials =
            binder::carry_ids_by_key(&desired.credentials, &tracked.credentials, |c| {
                c.username.clone()
            });

        for credential in &mut credentials {
            if credential.default_credential.is_known() {
                continue;
            }
            if let Some(prior) = tracked
                .credentials
                .iter()
                .find(|p| p.id.is_known() && p.id == credential.id)
            {
                credential.default_credential = prior.default_credential.clone();
            }
        }

        DatabaseState {
            id: desired.id.clone().or(tracked.id.clone()),
            credential_ids: credential_ids(&credentials),
            credentials,
            ..desired.clone()
        }
    }

    fn redact(remote: &Database) -> Database {
        let mut redacted = remote.clone();
        mask(&mut redacted.cacertfile);
        mask(&mut redacted.keyfile);
        mask(&mut redacted.certfile);
        for credential in &mut redacted.credentials {
            mask(&mut credential.password);
        }
        redacted
    }
}
