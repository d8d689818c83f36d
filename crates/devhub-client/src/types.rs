//! Wire models for the devhub REST API.
//!
//! Every model mirrors the JSON the API sends and accepts. Missing fields
//! deserialize to their zero value; mapping zero values to "unset" is the
//! caller's concern.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A remote object stored in one REST collection.
pub trait RemoteObject: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// Collection path below `/api/v1/`.
    const COLLECTION: &'static str;

    /// Server-assigned identifier, empty before creation.
    fn id(&self) -> &str;
}

macro_rules! remote_object {
    ($ty:ty, $collection:literal) => {
        impl RemoteObject for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

macro_rules! remote_child {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl declarative::RemoteChild for $ty {
                fn remote_id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

remote_child!(
    WorkflowStep,
    Permission,
    DashboardPanel,
    DatabaseCredential,
    EnvVar,
    Secret,
);

// =============================================================================
// Workflows
// =============================================================================

/// A workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workflow {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Linear label that triggers the workflow.
    pub trigger_linear_label: TriggerLinearLabel,
    /// Inputs requested when the workflow runs.
    pub inputs: Vec<WorkflowInput>,
    /// Ordered steps.
    pub steps: Vec<WorkflowStep>,
}

/// Linear label trigger; an empty name means no trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerLinearLabel {
    /// Label name.
    pub name: String,
}

/// A workflow input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowInput {
    /// Input key.
    pub key: String,
    /// Free-text description.
    pub description: String,
    /// One of `string`, `float`, `integer`, `boolean`.
    #[serde(rename = "type")]
    pub input_type: String,
}

/// A workflow step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowStep {
    /// Identifier.
    pub id: String,
    /// Optional step name.
    pub name: String,
    /// Flattened action payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<WorkflowStepAction>,
    /// Approval permissions, only used by `approval` actions.
    pub permissions: Vec<Permission>,
}

/// Flattened step action: a `type` tag plus every action's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowStepAction {
    /// Discriminant: `api`, `approval`, `query`, `slack` or `slack_reply`.
    #[serde(rename = "type")]
    pub action_type: String,
    /// `api`: request URL.
    pub endpoint: String,
    /// `api`: HTTP method.
    pub method: String,
    /// `api`: request headers.
    pub headers: Vec<ApiHeader>,
    /// `api`: request body.
    pub body: String,
    /// `api`: expected response status.
    pub expected_status_code: i64,
    /// `api`: attach a devhub JWT.
    pub include_devhub_jwt: bool,
    /// `approval`: number of approvals needed.
    pub reviews_required: i64,
    /// `query`: timeout in seconds.
    pub timeout: i64,
    /// `query`: SQL text.
    pub query: String,
    /// `query`: database credential.
    pub credential_id: String,
    /// `slack`: channel.
    pub slack_channel: String,
    /// `slack` and `slack_reply`: message text.
    pub message: String,
    /// `slack`: link text.
    pub link_text: String,
    /// `slack_reply`: name of the step whose message to reply to.
    pub reply_to_step_name: String,
}

/// An API action header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiHeader {
    /// Header name.
    pub key: String,
    /// Header value.
    pub value: String,
}

/// An approval permission granted to a role or an organization user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permission {
    /// Identifier.
    pub id: String,
    /// Permission name, e.g. `approve`.
    pub permission: String,
    /// Role grantee.
    pub role_id: String,
    /// User grantee.
    pub organization_user_id: String,
}

remote_object!(Workflow, "workflows");

// =============================================================================
// Dashboards
// =============================================================================

/// A dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Server-normalized access flag.
    pub restricted_access: bool,
    /// Ordered panels.
    pub panels: Vec<DashboardPanel>,
}

/// A dashboard panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardPanel {
    /// Identifier.
    pub id: String,
    /// Panel title.
    pub title: String,
    /// Panel inputs.
    pub inputs: Vec<DashboardPanelInput>,
    /// Flattened panel details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DashboardPanelDetails>,
}

/// A dashboard panel input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardPanelInput {
    /// Input key.
    pub key: String,
    /// Free-text description.
    pub description: String,
}

/// Flattened panel details: a `type` tag plus every case's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardPanelDetails {
    /// Discriminant: `query`.
    #[serde(rename = "type")]
    pub details_type: String,
    /// `query`: SQL text.
    pub query: String,
    /// `query`: database credential.
    pub credential_id: String,
}

remote_object!(Dashboard, "dashboards");

// =============================================================================
// QueryDesk databases
// =============================================================================

/// A QueryDesk database connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lower-case engine name.
    pub adapter: String,
    /// Server hostname.
    pub hostname: String,
    /// Port; never sent when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Database name.
    pub database: String,
    /// Use TLS.
    pub ssl: bool,
    /// CA certificate (write-only).
    pub cacertfile: String,
    /// Client key (write-only).
    pub keyfile: String,
    /// Client certificate (write-only).
    pub certfile: String,
    /// Restrict access to explicit grants.
    pub restrict_access: bool,
    /// Mask sensitive columns.
    pub enable_data_protection: bool,
    /// Group label.
    pub group: String,
    /// Slack channel for notifications.
    pub slack_channel: String,
    /// Execution agent.
    pub agent_id: String,
    /// Ordered credentials.
    pub credentials: Vec<DatabaseCredential>,
}

/// A database credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseCredential {
    /// Identifier.
    pub id: String,
    /// Username.
    pub username: String,
    /// Password (write-only).
    pub password: String,
    /// Hostname override.
    pub hostname: String,
    /// Approvals needed before queries run.
    pub reviews_required: i64,
    /// Server-normalized default flag.
    pub default_credential: bool,
}

remote_object!(Database, "querydesk/databases");

// =============================================================================
// TerraDesk workspaces
// =============================================================================

/// A TerraDesk workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Repository, `owner/name`.
    pub repository: String,
    /// Extra `terraform init` arguments.
    pub init_args: String,
    /// Path inside the repository.
    pub path: String,
    /// Plan automatically on push.
    pub run_plans_automatically: bool,
    /// Approvals needed before apply.
    pub required_approvals: i64,
    /// Runner image.
    pub docker_image: String,
    /// CPU request, e.g. `100m`.
    pub cpu_requests: String,
    /// Memory request, e.g. `512M`.
    pub memory_requests: String,
    /// Execution agent.
    pub agent_id: String,
    /// Cloud workload identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_identity: Option<WorkloadIdentity>,
    /// Environment variables; always sent, possibly empty.
    pub env_vars: Vec<EnvVar>,
    /// Secrets; always sent, possibly empty. Values are never returned.
    pub secrets: Vec<Secret>,
}

/// Workload identity settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadIdentity {
    /// Enabled flag.
    pub enabled: bool,
    /// Service account to impersonate.
    pub service_account_email: String,
    /// Identity provider.
    pub provider: String,
}

impl WorkloadIdentity {
    /// Whether every field has its zero value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// A workspace environment variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVar {
    /// Identifier.
    pub id: String,
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// A workspace secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    /// Identifier.
    pub id: String,
    /// Secret name.
    pub name: String,
    /// Secret value (write-only).
    pub value: String,
}

remote_object!(Workspace, "terradesk/workspaces");

// =============================================================================
// Lookups
// =============================================================================

/// An organization user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// A role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    /// Identifier.
    pub id: String,
    /// Role name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Managed by devhub rather than the organization.
    pub managed: bool,
}

/// How to look up a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// By email address.
    Email(String),
    /// By display name.
    Name(String),
}

impl UserLookup {
    /// Build a lookup from optional inputs. The name wins when both are set.
    #[must_use]
    pub fn from_parts(email: Option<String>, name: Option<String>) -> Option<Self> {
        match (email, name) {
            (_, Some(name)) if !name.is_empty() => Some(Self::Name(name)),
            (Some(email), _) if !email.is_empty() => Some(Self::Email(email)),
            _ => None,
        }
    }

    /// Query parameter name.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Name(_) => "name",
        }
    }

    /// Query parameter value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Email(value) | Self::Name(value) => value,
        }
    }
}
