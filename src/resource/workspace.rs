//! `devhub_terradesk_workspace`: a TerraDesk workspace with its environment.

use declarative::binder::{self, Identified};
use declarative::schema::REDACTED;
use declarative::{Attr, AttrType, Attribute, Presence, ResourceKind, Result, Schema};
use devhub_client::{EnvVar, Secret, WorkloadIdentity, Workspace};
use serde::{Deserialize, Serialize};

const KIND: &str = "devhub_terradesk_workspace";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceState {
    pub id: Attr<String>,
    pub name: String,
    pub repository: String,
    pub init_args: Attr<String>,
    pub path: Attr<String>,
    pub run_plans_automatically: bool,
    pub required_approvals: i64,
    pub docker_image: String,
    pub cpu_requests: String,
    pub memory_requests: String,
    pub agent_id: Attr<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_identity: Option<WorkloadIdentityBlock>,
    pub env_vars: Vec<EnvVarBlock>,
    pub secrets: Vec<SecretBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadIdentityBlock {
    pub enabled: bool,
    pub service_account_email: Attr<String>,
    pub provider: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVarBlock {
    pub id: Attr<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretBlock {
    pub id: Attr<String>,
    pub name: String,
    pub value: Attr<String>,
}

impl WorkloadIdentityBlock {
    /// A block with nothing set reads back from the remote as no block at all.
    fn is_zero(&self) -> bool {
        !self.enabled
            && self.service_account_email.as_str().unwrap_or_default().is_empty()
            && self.provider.as_str().unwrap_or_default().is_empty()
    }
}

fn declared_identity(block: Option<&WorkloadIdentityBlock>) -> Option<WorkloadIdentityBlock> {
    block.filter(|w| !w.is_zero()).cloned()
}

impl Identified for EnvVarBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

impl Identified for SecretBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

pub struct WorkspaceKind;

impl ResourceKind for WorkspaceKind {
    const TYPE_NAME: &'static str = KIND;

    type State = WorkspaceState;
    type Remote = Workspace;

    fn schema() -> Schema {
        Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("name", AttrType::String),
            Attribute::required("repository", AttrType::String).describe("`owner/name` on GitHub."),
            Attribute::optional("init_args", AttrType::String),
            Attribute::optional("path", AttrType::String)
                .describe("Path inside the repository. Defaults to the root."),
            Attribute::optional_computed("run_plans_automatically", AttrType::Bool)
                .default_value(false),
            Attribute::optional_computed("required_approvals", AttrType::Int).default_value(0),
            Attribute::required("docker_image", AttrType::String),
            Attribute::optional_computed("cpu_requests", AttrType::String).default_value("100m"),
            Attribute::optional_computed("memory_requests", AttrType::String)
                .default_value("512M"),
            Attribute::optional("agent_id", AttrType::String),
            Attribute::block(
                "workload_identity",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::optional_computed("enabled", AttrType::Bool).default_value(false),
                    Attribute::optional("service_account_email", AttrType::String),
                    Attribute::optional("provider", AttrType::String),
                ]),
            ),
            Attribute::block_list(
                "env_vars",
                Presence::OptionalComputed,
                Schema::new(vec![
                    Attribute::computed("id", AttrType::String),
                    Attribute::required("name", AttrType::String),
                    Attribute::required("value", AttrType::String),
                ]),
            )
            .default_value(serde_json::Value::Array(Vec::new())),
            Attribute::block_list(
                "secrets",
                Presence::OptionalComputed,
                Schema::new(vec![
                    Attribute::computed("id", AttrType::String),
                    Attribute::required("name", AttrType::String),
                    Attribute::required("value", AttrType::String).write_only(),
                ]),
            )
            .default_value(serde_json::Value::Array(Vec::new())),
        ])
        .describe("A TerraDesk workspace.")
    }

    fn state_id(state: &WorkspaceState) -> Option<&str> {
        state.id.as_str()
    }

    fn remote_id(remote: &Workspace) -> &str {
        &remote.id
    }

    fn to_remote(desired: &WorkspaceState) -> Result<Workspace> {
        Ok(Workspace {
            id: desired.id.to_wire(),
            name: desired.name.clone(),
            repository: desired.repository.clone(),
            init_args: desired.init_args.to_wire(),
            path: desired.path.to_wire(),
            run_plans_automatically: desired.run_plans_automatically,
            required_approvals: desired.required_approvals,
            docker_image: desired.docker_image.clone(),
            cpu_requests: desired.cpu_requests.clone(),
            memory_requests: desired.memory_requests.clone(),
            agent_id: desired.agent_id.to_wire(),
            workload_identity: desired.workload_identity.as_ref().map(|w| WorkloadIdentity {
                enabled: w.enabled,
                service_account_email: w.service_account_email.to_wire(),
                provider: w.provider.to_wire(),
            }),
            env_vars: desired
                .env_vars
                .iter()
                .map(|v| EnvVar {
                    id: v.id.to_wire(),
                    name: v.name.clone(),
                    value: v.value.clone(),
                })
                .collect(),
            secrets: desired
                .secrets
                .iter()
                .map(|s| Secret {
                    id: s.id.to_wire(),
                    name: s.name.clone(),
                    value: s.value.to_wire(),
                })
                .collect(),
        })
    }

    fn absorb(desired: &WorkspaceState, response: &Workspace) -> Result<WorkspaceState> {
        Ok(WorkspaceState {
            id: Attr::from_wire(response.id.as_str()),
            workload_identity: declared_identity(desired.workload_identity.as_ref()),
            env_vars: binder::bind_ids(KIND, "env_vars", &desired.env_vars, &response.env_vars)?,
            secrets: binder::bind_ids(KIND, "secrets", &desired.secrets, &response.secrets)?,
            ..desired.clone()
        })
    }

    fn refresh(prior: Option<&WorkspaceState>, remote: &Workspace) -> Result<WorkspaceState> {
        let secrets = remote
            .secrets
            .iter()
            .map(|s| SecretBlock {
                id: Attr::from_wire(s.id.as_str()),
                name: s.name.clone(),
                value: prior
                    .and_then(|p| p.secrets.iter().find(|c| c.id.as_str() == Some(s.id.as_str())))
                    .map(|c| c.value.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(WorkspaceState {
            id: Attr::from_wire(remote.id.as_str()),
            name: remote.name.clone(),
            repository: remote.repository.clone(),
            init_args: Attr::from_wire(remote.init_args.as_str()),
            path: Attr::from_wire(remote.path.as_str()),
            run_plans_automatically: remote.run_plans_automatically,
            required_approvals: remote.required_approvals,
            docker_image: remote.docker_image.clone(),
            cpu_requests: remote.cpu_requests.clone(),
            memory_requests: remote.memory_requests.clone(),
            agent_id: Attr::from_wire(remote.agent_id.as_str()),
            workload_identity: remote
                .workload_identity
                .as_ref()
                .filter(|w| !w.is_zero())
                .map(|w| WorkloadIdentityBlock {
                    enabled: w.enabled,
                    service_account_email: Attr::from_wire(w.service_account_email.as_str()),
                    provider: Attr::from_wire(w.provider.as_str()),
                }),
            env_vars: remote
                .env_vars
                .iter()
                .map(|v| EnvVarBlock {
                    id: Attr::from_wire(v.id.as_str()),
                    name: v.name.clone(),
                    value: v.value.clone(),
                })
                .collect(),
            secrets,
        })
    }

    fn carry_identity(desired: &WorkspaceState, tracked: &WorkspaceState) -> WorkspaceState {
        WorkspaceState {
            id: desired.id.clone().or(tracked.id.clone()),
            workload_identity: declared_identity(desired.workload_identity.as_ref()),
            env_vars: binder::carry_ids_by_key(&desired.env_vars, &tracked.env_vars, |v| {
                v.name.clone()
            }),
            secrets: binder::carry_ids_by_key(&desired.secrets, &tracked.secrets, |s| {
                s.name.clone()
            }),
            ..desired.clone()
        }
    }

    fn redact(remote: &Workspace) -> Workspace {
        let mut redacted = remote.clone();
        for secret in &mut redacted.secrets {
            if !secret.value.is_empty() {
                secret.value = REDACTED.to_string();
            }
        }
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, Change, Controller, ReadOutcome};
    use devhub_client::transport::Method;
    use devhub_client::{Client, MockTransport};
    use serde_json::json;

    fn mock_client() -> (MockTransport, Client) {
        let mock = MockTransport::new();
        let client = Client::with_transport(Box::new(mock.clone()));
        (mock, client)
    }

    fn workspace() -> WorkspaceState {
        WorkspaceState {
            name: "infra".to_string(),
            repository: "acme/infra".to_string(),
            docker_image: "hashicorp/terraform:1.9".to_string(),
            cpu_requests: "100m".to_string(),
            memory_requests: "512M".to_string(),
            ..WorkspaceState::default()
        }
    }

    fn env(name: &str, value: &str) -> EnvVarBlock {
        EnvVarBlock {
            name: name.to_string(),
            value: value.to_string(),
            ..EnvVarBlock::default()
        }
    }

    fn secret(name: &str) -> SecretBlock {
        SecretBlock {
            name: name.to_string(),
            value: Attr::Known(format!("{name}-value")),
            ..SecretBlock::default()
        }
    }

    #[test]
    fn test_empty_collections_are_sent() {
        let (mock, client) = mock_client();
        Controller::<WorkspaceKind, _>::new(&client)
            .create(&workspace())
            .unwrap();

        let sent = mock.calls()[0].body.clone().unwrap();
        assert_eq!(sent["env_vars"], json!([]));
        assert_eq!(sent["secrets"], json!([]));
        assert!(sent.get("workload_identity").is_none());
    }

    #[test]
    fn test_zero_workload_identity_reads_as_null() {
        let (mock, client) = mock_client();
        mock.insert(
            "terradesk/workspaces",
            json!({
                "id": "ws-1",
                "name": "infra",
                "init_args": "",
                "path": "",
                "workload_identity": { "enabled": false, "service_account_email": "", "provider": "" }
            }),
        );
        mock.insert(
            "terradesk/workspaces",
            json!({
                "id": "ws-2",
                "name": "gcp",
                "path": "envs/prod",
                "workload_identity": { "enabled": true, "service_account_email": "tf@acme.iam", "provider": "" }
            }),
        );

        let zero = Controller::<WorkspaceKind, _>::new(&client)
            .import("ws-1")
            .unwrap();
        assert!(zero.workload_identity.is_none());
        assert!(zero.init_args.is_null());
        assert!(zero.path.is_null());

        let set = Controller::<WorkspaceKind, _>::new(&client)
            .import("ws-2")
            .unwrap();
        let identity = set.workload_identity.unwrap();
        assert!(identity.enabled);
        assert!(identity.provider.is_null());
        assert_eq!(set.path, Attr::Known("envs/prod".to_string()));
    }

    #[test]
    fn test_declared_zero_workload_identity_converges() {
        let (mock, client) = mock_client();
        let mut desired = workspace();
        desired.workload_identity = Some(WorkloadIdentityBlock::default());

        let created = Controller::<WorkspaceKind, _>::new(&client)
            .create(&desired)
            .unwrap();
        assert!(created.workload_identity.is_none());

        let outcome = Controller::<WorkspaceKind, _>::tracking(&client)
            .read(&created)
            .unwrap();
        let ReadOutcome::Refreshed { state, drifted } = outcome else {
            panic!("expected the workspace to exist");
        };
        assert!(!drifted);

        let change =
            Change::plan::<WorkspaceKind>("devhub_terradesk_workspace.infra", Some(&desired), Some(&state));
        assert_eq!(change.action, Action::NoOp);
        assert_eq!(mock.count(Method::Patch), 0);

        desired.workload_identity = Some(WorkloadIdentityBlock {
            provider: Attr::Known("gcp".to_string()),
            ..WorkloadIdentityBlock::default()
        });
        let change =
            Change::plan::<WorkspaceKind>("devhub_terradesk_workspace.infra", Some(&desired), Some(&state));
        assert_eq!(change.action, Action::Update);
    }

    #[test]
    fn test_secret_values_survive_refresh() {
        let (mock, client) = mock_client();
        let mut desired = workspace();
        desired.env_vars = vec![env("TF_LOG", "info")];
        desired.secrets = vec![secret("AWS_SECRET_ACCESS_KEY")];

        let created = Controller::<WorkspaceKind, _>::new(&client)
            .create(&desired)
            .unwrap();
        mock.set_hook(|method, body| {
            if method == Method::Get {
                if let Some(secrets) = body["secrets"].as_array_mut() {
                    for secret in secrets {
                        secret["value"] = json!("");
                    }
                }
            }
        });

        let outcome = Controller::<WorkspaceKind, _>::tracking(&client)
            .read(&created)
            .unwrap();
        let ReadOutcome::Refreshed { state, drifted } = outcome else {
            panic!("expected the workspace to exist");
        };
        assert!(!drifted);
        assert_eq!(state.secrets[0].value, desired.secrets[0].value);
    }

    #[test]
    fn test_update_matches_children_by_name() {
        let (_mock, client) = mock_client();
        let mut desired = workspace();
        desired.env_vars = vec![env("A", "1"), env("B", "2")];
        desired.secrets = vec![secret("TOKEN")];
        let created = Controller::<WorkspaceKind, _>::new(&client)
            .create(&desired)
            .unwrap();

        let mut reordered = workspace();
        reordered.env_vars = vec![env("B", "3"), env("C", "4"), env("A", "1")];
        reordered.secrets = Vec::new();
        let updated = Controller::<WorkspaceKind, _>::tracking(&client)
            .update(&reordered, &created)
            .unwrap();

        assert_eq!(updated.env_vars[0].id, created.env_vars[1].id);
        assert_eq!(updated.env_vars[2].id, created.env_vars[0].id);
        assert!(updated.env_vars[1].id.is_known());
        assert_ne!(updated.env_vars[1].id, created.env_vars[0].id);
        assert!(updated.secrets.is_empty());
    }

    #[test]
    fn test_redact_masks_secret_values() {
        let mut desired = workspace();
        desired.env_vars = vec![env("TF_LOG", "info")];
        desired.secrets = vec![secret("TOKEN")];

        let redacted = WorkspaceKind::redact(&WorkspaceKind::to_remote(&desired).unwrap());
        assert_eq!(redacted.secrets[0].value, REDACTED);
        assert_eq!(redacted.env_vars[0].value, "info");
    }

    #[test]
    fn test_schema_defaults() {
        let mut declaration = json!({
            "name": "infra",
            "repository": "acme/infra",
            "docker_image": "hashicorp/terraform:1.9",
            "workload_identity": { "provider": "gcp" }
        });
        let schema = WorkspaceKind::schema();
        assert!(schema.validate(&declaration).is_empty());

        schema.apply_defaults(&mut declaration);
        assert_eq!(declaration["cpu_requests"], "100m");
        assert_eq!(declaration["memory_requests"], "512M");
        assert_eq!(declaration["env_vars"], json!([]));
        assert_eq!(declaration["workload_identity"]["enabled"], false);

        let state: WorkspaceState = serde_json::from_value(declaration).unwrap();
        assert_eq!(state.required_approvals, 0);
        assert!(state.secrets.is_empty());
    }
}
