//! `devhub_workflow`: ordered steps, each carrying exactly one action.
//!
//! Step actions are a closed union. Declarations spell them as one optional
//! block per case; the wire carries a single flat action record with a
//! `type` tag. Approval permissions travel beside the flat action, on the
//! step itself, and are bound one level deep.

use declarative::binder::{self, Identified};
use declarative::codec::{self, VariantCodec};
use declarative::normalize::child_path;
use declarative::{Attr, AttrType, Attribute, Presence, ResourceKind, Result, Schema};
use devhub_client::{
    ApiHeader, Permission, TriggerLinearLabel, Workflow, WorkflowInput, WorkflowStep,
    WorkflowStepAction,
};
use serde::{Deserialize, Serialize};

const KIND: &str = "devhub_workflow";

const INPUT_TYPES: &[&str] = &["string", "float", "integer", "boolean"];

const ACTION_BLOCKS: &[&str] = &[
    "api_action",
    "approval_action",
    "query_action",
    "slack_action",
    "slack_reply_action",
];

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub id: Attr<String>,
    pub name: String,
    pub trigger_linear_label_name: Attr<String>,
    pub inputs: Vec<InputBlock>,
    pub steps: Vec<StepBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBlock {
    pub key: String,
    pub description: Attr<String>,
    #[serde(rename = "type")]
    pub input_type: String,
}

/// A step as declared: one optional block per action case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepBlock {
    pub id: Attr<String>,
    pub name: Attr<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_action: Option<ApiAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_action: Option<ApprovalAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_action: Option<QueryAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_action: Option<SlackAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_reply_action: Option<SlackReplyAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiAction {
    pub endpoint: String,
    pub method: String,
    pub headers: Vec<HeaderBlock>,
    pub body: Attr<String>,
    pub expected_status_code: i64,
    pub include_devhub_jwt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderBlock {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalAction {
    pub reviews_required: i64,
    pub permissions: Vec<PermissionBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionBlock {
    pub id: Attr<String>,
    pub permission: String,
    pub role_id: Attr<String>,
    pub organization_user_id: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAction {
    pub timeout: i64,
    pub query: String,
    pub credential_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackAction {
    pub slack_channel: String,
    pub message: String,
    pub link_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackReplyAction {
    pub reply_to_step_name: String,
    pub message: String,
}

impl Identified for StepBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

impl Identified for PermissionBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

// ============================================================================
// Step actions
// ============================================================================

/// The one populated action of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Api(ApiAction),
    Approval(ApprovalAction),
    Query(QueryAction),
    Slack(SlackAction),
    SlackReply(SlackReplyAction),
}

impl StepBlock {
    /// Collapse the declared action blocks into the single populated case.
    pub fn action(&self, index: usize) -> Result<StepAction> {
        codec::exactly_one(
            KIND,
            &child_path("steps", index, ""),
            [
                ("api_action", self.api_action.clone().map(StepAction::Api)),
                (
                    "approval_action",
                    self.approval_action.clone().map(StepAction::Approval),
                ),
                ("query_action", self.query_action.clone().map(StepAction::Query)),
                ("slack_action", self.slack_action.clone().map(StepAction::Slack)),
                (
                    "slack_reply_action",
                    self.slack_reply_action.clone().map(StepAction::SlackReply),
                ),
            ],
        )
    }

    fn with_action(id: Attr<String>, name: Attr<String>, action: StepAction) -> Self {
        let mut step = Self {
            id,
            name,
            ..Self::default()
        };
        match action {
            StepAction::Api(api) => step.api_action = Some(api),
            StepAction::Approval(approval) => step.approval_action = Some(approval),
            StepAction::Query(query) => step.query_action = Some(query),
            StepAction::Slack(slack) => step.slack_action = Some(slack),
            StepAction::SlackReply(reply) => step.slack_reply_action = Some(reply),
        }
        step
    }
}

impl VariantCodec for StepAction {
    type Flat = WorkflowStep;

    const TAGS: &'static [&'static str] = &["api", "approval", "query", "slack", "slack_reply"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Api(_) => "api",
            Self::Approval(_) => "approval",
            Self::Query(_) => "query",
            Self::Slack(_) => "slack",
            Self::SlackReply(_) => "slack_reply",
        }
    }

    fn to_flat(&self) -> WorkflowStep {
        let mut action = WorkflowStepAction {
            action_type: self.tag().to_string(),
            ..WorkflowStepAction::default()
        };
        let mut permissions = Vec::new();

        match self {
            Self::Api(api) => {
                action.endpoint = api.endpoint.clone();
                action.method = api.method.clone();
                action.headers = api
                    .headers
                    .iter()
                    .map(|h| ApiHeader {
                        key: h.key.clone(),
                        value: h.value.clone(),
                    })
                    .collect();
                action.body = api.body.to_wire();
                action.expected_status_code = api.expected_status_code;
                action.include_devhub_jwt = api.include_devhub_jwt;
            }
            Self::Approval(approval) => {
                action.reviews_required = approval.reviews_required;
                permissions = approval
                    .permissions
                    .iter()
                    .map(|p| Permission {
                        id: p.id.to_wire(),
                        permission: p.permission.clone(),
                        role_id: p.role_id.to_wire(),
                        organization_user_id: p.organization_user_id.to_wire(),
                    })
                    .collect();
            }
            Self::Query(query) => {
                action.timeout = query.timeout;
                action.query = query.query.clone();
                action.credential_id = query.credential_id.clone();
            }
            Self::Slack(slack) => {
                action.slack_channel = slack.slack_channel.clone();
                action.message = slack.message.clone();
                action.link_text = slack.link_text.clone();
            }
            Self::SlackReply(reply) => {
                action.reply_to_step_name = reply.reply_to_step_name.clone();
                action.message = reply.message.clone();
            }
        }

        WorkflowStep {
            action: Some(action),
            permissions,
            ..WorkflowStep::default()
        }
    }

    fn from_flat(flat: &WorkflowStep) -> Option<Self> {
        let action = flat.action.as_ref()?;
        let decoded = match action.action_type.as_str() {
            "api" => Self::Api(ApiAction {
                endpoint: action.endpoint.clone(),
                method: action.method.clone(),
                headers: action
                    .headers
                    .iter()
                    .map(|h| HeaderBlock {
                        key: h.key.clone(),
                        value: h.value.clone(),
                    })
                    .collect(),
                body: Attr::from_wire(action.body.as_str()),
                expected_status_code: action.expected_status_code,
                include_devhub_jwt: action.include_devhub_jwt,
            }),
            "approval" => Self::Approval(ApprovalAction {
                reviews_required: action.reviews_required,
                permissions: flat
                    .permissions
                    .iter()
                    .map(|p| PermissionBlock {
                        id: Attr::from_wire(p.id.as_str()),
                        permission: p.permission.clone(),
                        role_id: Attr::from_wire(p.role_id.as_str()),
                        organization_user_id: Attr::from_wire(p.organization_user_id.as_str()),
                    })
                    .collect(),
            }),
            "query" => Self::Query(QueryAction {
                timeout: action.timeout,
                query: action.query.clone(),
                credential_id: action.credential_id.clone(),
            }),
            "slack" => Self::Slack(SlackAction {
                slack_channel: action.slack_channel.clone(),
                message: action.message.clone(),
                link_text: action.link_text.clone(),
            }),
            "slack_reply" => Self::SlackReply(SlackReplyAction {
                reply_to_step_name: action.reply_to_step_name.clone(),
                message: action.message.clone(),
            }),
            _ => return None,
        };
        Some(decoded)
    }

    fn flat_tag(flat: &WorkflowStep) -> &str {
        flat.action.as_ref().map_or("", |a| a.action_type.as_str())
    }
}

// ============================================================================
// Mapping
// ============================================================================

pub struct WorkflowKind;

fn step_to_remote(index: usize, step: &StepBlock) -> Result<WorkflowStep> {
    let action = step.action(index)?;

    if let StepAction::Approval(approval) = &action {
        for (p, permission) in approval.permissions.iter().enumerate() {
            codec::exactly_one(
                KIND,
                &format!("steps[{index}].approval_action.permissions[{p}]"),
                [
                    ("role_id", permission.role_id.known()),
                    (
                        "organization_user_id",
                        permission.organization_user_id.known(),
                    ),
                ],
            )?;
        }
    }

    let mut remote = codec::encode(&action);
    remote.id = step.id.to_wire();
    remote.name = step.name.to_wire();
    Ok(remote)
}

fn step_from_remote(index: usize, remote: &WorkflowStep) -> Result<StepBlock> {
    let action = codec::decode(KIND, &child_path("steps", index, "action"), remote)?;
    Ok(StepBlock::with_action(
        Attr::from_wire(remote.id.as_str()),
        Attr::from_wire(remote.name.as_str()),
        action,
    ))
}

fn permission_key(permission: &PermissionBlock) -> (String, Option<String>, Option<String>) {
    (
        permission.permission.clone(),
        permission.role_id.known().cloned(),
        permission.organization_user_id.known().cloned(),
    )
}

impl ResourceKind for WorkflowKind {
    const TYPE_NAME: &'static str = KIND;

    type State = WorkflowState;
    type Remote = Workflow;

    fn schema() -> Schema {
        let header = Schema::new(vec![
            Attribute::required("key", AttrType::String),
            Attribute::required("value", AttrType::String),
        ]);

        let permission = Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("permission", AttrType::String).describe("Permission name, e.g. `approve`."),
            Attribute::optional("role_id", AttrType::String),
            Attribute::optional("organization_user_id", AttrType::String),
        ])
        .exactly_one_of(&["role_id", "organization_user_id"]);

        let step = Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::optional("name", AttrType::String),
            Attribute::block(
                "api_action",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("endpoint", AttrType::String),
                    Attribute::required("method", AttrType::String),
                    Attribute::block_list("headers", Presence::Optional, header),
                    Attribute::optional("body", AttrType::String),
                    Attribute::required("expected_status_code", AttrType::Int),
                    Attribute::required("include_devhub_jwt", AttrType::Bool),
                ]),
            ),
            Attribute::block(
                "approval_action",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("reviews_required", AttrType::Int),
                    Attribute::block_list("permissions", Presence::Optional, permission),
                ]),
            ),
            Attribute::block(
                "query_action",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("timeout", AttrType::Int).describe("Timeout in seconds."),
                    Attribute::required("query", AttrType::String),
                    Attribute::required("credential_id", AttrType::String),
                ]),
            ),
            Attribute::block(
                "slack_action",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("slack_channel", AttrType::String),
                    Attribute::required("message", AttrType::String),
                    Attribute::required("link_text", AttrType::String),
                ]),
            ),
            Attribute::block(
                "slack_reply_action",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("reply_to_step_name", AttrType::String),
                    Attribute::required("message", AttrType::String),
                ]),
            ),
        ])
        .exactly_one_of(ACTION_BLOCKS);

        Schema::new(vec![
            Attribute::computed("id", AttrType::String).describe("Workflow id."),
            Attribute::required("name", AttrType::String),
            Attribute::optional("trigger_linear_label_name", AttrType::String)
                .describe("Linear label that triggers the workflow."),
            Attribute::block_list(
                "inputs",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("key", AttrType::String),
                    Attribute::optional("description", AttrType::String),
                    Attribute::required("type", AttrType::String).one_of(INPUT_TYPES),
                ]),
            ),
            Attribute::block_list("steps", Presence::Required, step),
        ])
        .describe("A devhub workflow.")
    }

    fn state_id(state: &WorkflowState) -> Option<&str> {
        state.id.as_str()
    }

    fn remote_id(remote: &Workflow) -> &str {
        &remote.id
    }

    fn to_remote(desired: &WorkflowState) -> Result<Workflow> {
        let steps = desired
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| step_to_remote(index, step))
            .collect::<Result<Vec<_>>>()?;

        Ok(Workflow {
            id: desired.id.to_wire(),
            name: desired.name.clone(),
            trigger_linear_label: TriggerLinearLabel {
                name: desired.trigger_linear_label_name.to_wire(),
            },
            inputs: desired
                .inputs
                .iter()
                .map(|input| WorkflowInput {
                    key: input.key.clone(),
                    description: input.description.to_wire(),
                    input_type: input.input_type.clone(),
                })
                .collect(),
            steps,
        })
    }

    fn absorb(desired: &WorkflowState, response: &Workflow) -> Result<WorkflowState> {
        let steps = binder::bind(KIND, "steps", &desired.steps, &response.steps, |i, step, remote| {
            let mut bound = step.clone();
            bound.set_id(Attr::from_wire(remote.id.as_str()));
            if let Some(approval) = &step.approval_action {
                let permissions = binder::bind_ids(
                    KIND,
                    &format!("steps[{i}].approval_action.permissions"),
                    &approval.permissions,
                    &remote.permissions,
                )?;
                bound.approval_action = Some(ApprovalAction {
                    permissions,
                    ..approval.clone()
                });
            }
            Ok(bound)
        })?;

        Ok(WorkflowState {
            id: Attr::from_wire(response.id.as_str()),
            steps,
            ..desired.clone()
        })
    }

    fn refresh(_prior: Option<&WorkflowState>, remote: &Workflow) -> Result<WorkflowState> {
        let steps = remote
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| step_from_remote(index, step))
            .collect::<Result<Vec<_>>>()?;

        Ok(WorkflowState {
            id: Attr::from_wire(remote.id.as_str()),
            name: remote.name.clone(),
            trigger_linear_label_name: Attr::from_wire(remote.trigger_linear_label.name.as_str()),
            inputs: remote
                .inputs
                .iter()
                .map(|input| InputBlock {
                    key: input.key.clone(),
                    description: Attr::from_wire(input.description.as_str()),
                    input_type: input.input_type.clone(),
                })
                .collect(),
            steps,
        })
    }

    fn carry_identity(desired: &WorkflowState, tracked: &WorkflowState) -> WorkflowState {
        let mut steps = binder::carry_ids_by_position(&desired.steps, &tracked.steps);

        for (step, prior) in steps.iter_mut().zip(&tracked.steps) {
            if let (Some(approval), Some(prior)) = (&mut step.approval_action, &prior.approval_action)
            {
                approval.permissions =
                    binder::carry_ids_by_key(&approval.permissions, &prior.permissions, permission_key);
            }
        }

        WorkflowState {
            id: desired.id.clone().or(tracked.id.clone()),
            steps,
            ..desired.clone()
        }
    }
}
