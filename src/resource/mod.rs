//! devhub resource kinds and their kind-erased dispatch
//!
//! Each kind is a `declarative::ResourceKind` mapping table. The CLI holds
//! declarations and tracked state as JSON values keyed by address
//! (`devhub_workflow.deploy`); the helpers here decode them into the typed
//! state of the right kind, drive a controller, and encode the result back.

pub mod dashboard;
pub mod database;
pub mod lookup;
pub mod workflow;
pub mod workspace;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use declarative::{
    Action, ApplyResult, Change, Controller, DeleteOutcome, ReadOutcome, RemoteStore,
    ResourceKind, Schema, Task,
};
use devhub_client::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The resource kinds the provider manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Workflow,
    Dashboard,
    Database,
    Workspace,
}

/// Run `$body` with `$k` bound to the `ResourceKind` of `$kind`.
macro_rules! with_kind {
    ($kind:expr, $k:ident => $body:expr) => {
        match $kind {
            Kind::Workflow => {
                type $k = workflow::WorkflowKind;
                $body
            }
            Kind::Dashboard => {
                type $k = dashboard::DashboardKind;
                $body
            }
            Kind::Database => {
                type $k = database::DatabaseKind;
                $body
            }
            Kind::Workspace => {
                type $k = workspace::WorkspaceKind;
                $body
            }
        }
    };
}

impl Kind {
    pub const ALL: [Kind; 4] = [
        Kind::Workflow,
        Kind::Dashboard,
        Kind::Database,
        Kind::Workspace,
    ];

    /// Orchestrator-facing type name, e.g. `devhub_querydesk_database`.
    pub fn type_name(self) -> &'static str {
        with_kind!(self, K => K::TYPE_NAME)
    }

    /// Table name in the declarations file, e.g. `[database.main]`.
    pub fn table(self) -> &'static str {
        match self {
            Kind::Workflow => "workflow",
            Kind::Dashboard => "dashboard",
            Kind::Database => "database",
            Kind::Workspace => "workspace",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Kind> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// Instance address for a local name.
    pub fn address(self, name: &str) -> String {
        format!("{}.{name}", self.type_name())
    }

    pub fn schema(self) -> Schema {
        with_kind!(self, K => K::schema())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn decode<K: ResourceKind>(value: &Value) -> Result<K::State> {
    serde_json::from_value(value.clone())
        .with_context(|| format!("Invalid {} state", K::TYPE_NAME))
}

fn encode<K: ResourceKind>(state: &K::State) -> Result<Value> {
    serde_json::to_value(state).with_context(|| format!("Failed to encode {} state", K::TYPE_NAME))
}

/// Remote id of a tracked state.
pub fn state_id(kind: Kind, state: &Value) -> Result<String> {
    with_kind!(kind, K => {
        let state = decode::<K>(state)?;
        K::state_id(&state)
            .map(str::to_string)
            .with_context(|| format!("{} state has no id", K::TYPE_NAME))
    })
}

/// Plan one address from its declaration and tracked state.
pub fn plan(
    kind: Kind,
    address: &str,
    desired: Option<&Value>,
    tracked: Option<&Value>,
) -> Result<Change> {
    with_kind!(kind, K => {
        let desired = desired.map(decode::<K>).transpose()?;
        let tracked = tracked.map(decode::<K>).transpose()?;
        Ok(Change::plan::<K>(address, desired.as_ref(), tracked.as_ref()))
    })
}

/// Read a tracked object back from the remote.
pub fn refresh(kind: Kind, client: &Client, tracked: &Value) -> Result<ReadOutcome<Value>> {
    with_kind!(kind, K => {
        let tracked = decode::<K>(tracked)?;
        let outcome = match Controller::<K, _>::tracking(client).read(&tracked)? {
            ReadOutcome::Refreshed { state, drifted } => ReadOutcome::Refreshed {
                state: encode::<K>(&state)?,
                drifted,
            },
            ReadOutcome::Gone => ReadOutcome::Gone,
        };
        Ok(outcome)
    })
}

/// Start tracking an existing remote object.
pub fn import(kind: Kind, client: &Client, id: &str) -> Result<Value> {
    with_kind!(kind, K => {
        let state = Controller::<K, _>::new(client).import(id)?;
        encode::<K>(&state)
    })
}

/// Build the apply task for one planned change.
pub fn task(
    kind: Kind,
    change: &Change,
    desired: Option<Value>,
    tracked: Option<Value>,
    client: Arc<Client>,
) -> Box<dyn Task> {
    with_kind!(kind, K => {
        let task: Box<dyn Task> = Box::new(ControllerTask::<K> {
            address: change.address.clone(),
            action: change.action,
            desired,
            tracked,
            client,
            kind: PhantomData,
        });
        task
    })
}

/// One create, update or delete, run on the executor pool.
struct ControllerTask<K> {
    address: String,
    action: Action,
    desired: Option<Value>,
    tracked: Option<Value>,
    client: Arc<Client>,
    kind: PhantomData<fn() -> K>,
}

impl<K> ControllerTask<K>
where
    K: ResourceKind,
    Client: RemoteStore<K::Remote>,
{
    fn desired(&self) -> Result<K::State> {
        decode::<K>(self.desired.as_ref().context("No declaration")?)
    }

    fn tracked(&self) -> Result<K::State> {
        decode::<K>(self.tracked.as_ref().context("No tracked state")?)
    }

    fn reconcile(&self) -> Result<ApplyResult> {
        let client = self.client.as_ref();
        match self.action {
            Action::Create => {
                let state = Controller::<K, _>::new(client).create(&self.desired()?)?;
                Ok(ApplyResult::Created {
                    state: encode::<K>(&state)?,
                })
            }
            Action::Update => {
                let state =
                    Controller::<K, _>::tracking(client).update(&self.desired()?, &self.tracked()?)?;
                Ok(ApplyResult::Updated {
                    state: encode::<K>(&state)?,
                })
            }
            Action::Delete => match Controller::<K, _>::tracking(client).delete(&self.tracked()?)? {
                DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => Ok(ApplyResult::Deleted),
            },
            Action::NoOp => Ok(ApplyResult::NoChange),
        }
    }
}

impl<K> Task for ControllerTask<K>
where
    K: ResourceKind,
    Client: RemoteStore<K::Remote>,
{
    fn address(&self) -> &str {
        &self.address
    }

    fn action(&self) -> Action {
        self.action
    }

    fn run(&self) -> ApplyResult {
        self.reconcile().unwrap_or_else(|err| {
            log::debug!("{}: {err:#}", self.address);
            ApplyResult::Failed {
                error: format!("{err:#}"),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
