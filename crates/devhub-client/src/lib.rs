//! # devhub-client
//!
//! Blocking client for the devhub REST API.
//!
//! This crate provides:
//! - Wire models for workflows, dashboards, QueryDesk databases and
//!   TerraDesk workspaces, plus user and role lookups
//! - A [`Transport`](transport::Transport) seam with an HTTP implementation
//!   and an in-memory mock
//! - A typed [`Client`] that plugs into the `declarative` engine as its
//!   remote store
//!
//! ## Example
//!
//! ```no_run
//! use devhub_client::{Client, ClientConfig, Dashboard};
//!
//! let client = Client::new(&ClientConfig::new("http://localhost:4000", "secret"));
//! let dashboard: Dashboard = client.get("dash-1").expect("lookup failed");
//! println!("{} has {} panels", dashboard.name, dashboard.panels.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod transport;
pub mod types;

use std::time::Duration;

use log::debug;

pub use error::{Error, ErrorCategory, Result};
pub use transport::MockTransport;
pub use types::{
    ApiHeader, Dashboard, DashboardPanel, DashboardPanelDetails, DashboardPanelInput, Database,
    DatabaseCredential, EnvVar, Permission, RemoteObject, Role, Secret, TriggerLinearLabel, User,
    UserLookup, WorkloadIdentity, Workflow, WorkflowInput, WorkflowStep, WorkflowStepAction,
    Workspace,
};

pub use transport::http::DEFAULT_HOST;

use transport::Transport;
use transport::http::{DEFAULT_TIMEOUT, HttpTransport};

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host, e.g. `https://devhub.example.com`.
    pub host: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for `host` with the default timeout.
    #[must_use]
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, String::new())
    }
}

/// High-level client for devhub API operations.
///
/// One client is shared by every resource instance; it holds no per-object
/// state.
pub struct Client {
    transport: Box<dyn Transport>,
}

impl Client {
    /// Create a client with the HTTP transport.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            transport: Box::new(HttpTransport::new(
                config.host.clone(),
                config.api_key.clone(),
                config.timeout,
            )),
        }
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Create an object; returns it with server-assigned identifiers.
    pub fn create<T: RemoteObject>(&self, object: &T) -> Result<T> {
        let response = self.transport.create(T::COLLECTION, &to_body(object)?)?;
        from_body(response)
    }

    /// Fetch an object by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the id is unknown.
    pub fn get<T: RemoteObject>(&self, id: &str) -> Result<T> {
        from_body(self.transport.get(T::COLLECTION, id)?)
    }

    /// Replace an object; returns it with server-assigned identifiers.
    pub fn update<T: RemoteObject>(&self, id: &str, object: &T) -> Result<T> {
        let response = self
            .transport
            .update(T::COLLECTION, id, &to_body(object)?)?;
        from_body(response)
    }

    /// Delete an object by id.
    pub fn delete<T: RemoteObject>(&self, id: &str) -> Result<()> {
        self.transport.delete(T::COLLECTION, id)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Look up a user by email or name.
    pub fn get_user(&self, lookup: &UserLookup) -> Result<User> {
        debug!("looking up user by {}", lookup.field());
        from_body(
            self.transport
                .lookup("users", lookup.field(), lookup.value())?,
        )
    }

    /// Look up a role by name.
    pub fn get_role(&self, name: &str) -> Result<Role> {
        debug!("looking up role {name}");
        from_body(self.transport.lookup("roles", "name", name)?)
    }
}

fn to_body<T: RemoteObject>(object: &T) -> Result<serde_json::Value> {
    serde_json::to_value(object).map_err(|e| Error::Serialize(e.to_string()))
}

fn from_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(body)?)
}

impl<T: RemoteObject> declarative::RemoteStore<T> for Client {
    type Error = Error;

    fn create(&self, object: &T) -> Result<T> {
        Client::create(self, object)
    }

    fn get(&self, id: &str) -> Result<T> {
        Client::get(self, id)
    }

    fn update(&self, id: &str, object: &T) -> Result<T> {
        Client::update(self, id, object)
    }

    fn delete(&self, id: &str) -> Result<()> {
        Client::delete::<T>(self, id)
    }
}
