//! `devhub_dashboard`: ordered panels with a single-case details union.

use declarative::binder::{self, Identified};
use declarative::codec::{self, VariantCodec};
use declarative::normalize::child_path;
use declarative::{Attr, AttrType, Attribute, Presence, ResourceKind, Result, Schema};
use devhub_client::{Dashboard, DashboardPanel, DashboardPanelDetails, DashboardPanelInput};
use serde::{Deserialize, Serialize};

const KIND: &str = "devhub_dashboard";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardState {
    pub id: Attr<String>,
    pub name: String,
    pub restricted_access: Attr<bool>,
    pub panels: Vec<PanelBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelBlock {
    pub id: Attr<String>,
    pub title: String,
    pub inputs: Vec<PanelInputBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_details: Option<QueryDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelInputBlock {
    pub key: String,
    pub description: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDetails {
    pub query: String,
    pub credential_id: String,
}

impl Identified for PanelBlock {
    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: Attr<String>) {
        self.id = id;
    }
}

/// What a panel shows. Only queries exist today.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelDetails {
    Query(QueryDetails),
}

impl PanelBlock {
    pub fn details(&self, index: usize) -> Result<PanelDetails> {
        codec::exactly_one(
            KIND,
            &child_path("panels", index, ""),
            [(
                "query_details",
                self.query_details.clone().map(PanelDetails::Query),
            )],
        )
    }
}

impl VariantCodec for PanelDetails {
    type Flat = DashboardPanelDetails;

    const TAGS: &'static [&'static str] = &["query"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
        }
    }

    fn to_flat(&self) -> DashboardPanelDetails {
        match self {
            Self::Query(query) => DashboardPanelDetails {
                details_type: self.tag().to_string(),
                query: query.query.clone(),
                credential_id: query.credential_id.clone(),
            },
        }
    }

    fn from_flat(flat: &DashboardPanelDetails) -> Option<Self> {
        match flat.details_type.as_str() {
            "query" => Some(Self::Query(QueryDetails {
                query: flat.query.clone(),
                credential_id: flat.credential_id.clone(),
            })),
            _ => None,
        }
    }

    fn flat_tag(flat: &DashboardPanelDetails) -> &str {
        &flat.details_type
    }
}

pub struct DashboardKind;

fn panel_to_remote(index: usize, panel: &PanelBlock) -> Result<DashboardPanel> {
    let details = panel.details(index)?;
    Ok(DashboardPanel {
        id: panel.id.to_wire(),
        title: panel.title.clone(),
        inputs: panel
            .inputs
            .iter()
            .map(|input| DashboardPanelInput {
                key: input.key.clone(),
                description: input.description.to_wire(),
            })
            .collect(),
        details: Some(codec::encode(&details)),
    })
}

fn panel_from_remote(index: usize, remote: &DashboardPanel) -> Result<PanelBlock> {
    // A panel without details decodes as an empty tag.
    let flat = remote.details.clone().unwrap_or_default();
    let PanelDetails::Query(query) =
        codec::decode::<PanelDetails>(KIND, &child_path("panels", index, "details"), &flat)?;

    Ok(PanelBlock {
        id: Attr::from_wire(remote.id.as_str()),
        title: remote.title.clone(),
        inputs: remote
            .inputs
            .iter()
            .map(|input| PanelInputBlock {
                key: input.key.clone(),
                description: Attr::from_wire(input.description.as_str()),
            })
            .collect(),
        query_details: Some(query),
    })
}

impl ResourceKind for DashboardKind {
    const TYPE_NAME: &'static str = KIND;

    type State = DashboardState;
    type Remote = Dashboard;

    fn schema() -> Schema {
        let panel = Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("title", AttrType::String),
            Attribute::block_list(
                "inputs",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("key", AttrType::String),
                    Attribute::optional("description", AttrType::String),
                ]),
            ),
            Attribute::block(
                "query_details",
                Presence::Optional,
                Schema::new(vec![
                    Attribute::required("query", AttrType::String),
                    Attribute::required("credential_id", AttrType::String),
                ]),
            ),
        ])
        .exactly_one_of(&["query_details"]);

        Schema::new(vec![
            Attribute::computed("id", AttrType::String),
            Attribute::required("name", AttrType::String),
            Attribute::optional_computed("restricted_access", AttrType::Bool)
                .describe("Normalized by the server."),
            Attribute::block_list("panels", Presence::Optional, panel),
        ])
        .describe("A devhub dashboard.")
    }

    fn state_id(state: &DashboardState) -> Option<&str> {
        state.id.as_str()
    }

    fn remote_id(remote: &Dashboard) -> &str {
        &remote.id
    }

    fn to_remote(desired: &DashboardState) -> Result<Dashboard> {
        let panels = desired
            .panels
            .iter()
            .enumerate()
            .map(|(index, panel)| panel_to_remote(index, panel))
            .collect::<Result<Vec<_>>>()?;

        Ok(Dashboard {
            id: desired.id.to_wire(),
            name: desired.name.clone(),
            restricted_access: desired.restricted_access.value_or(false),
            panels,
        })
    }

    fn absorb(desired: &DashboardState, response: &Dashboard) -> Result<DashboardState> {
        Ok(DashboardState {
            id: Attr::from_wire(response.id.as_str()),
            restricted_access: Attr::Known(response.restricted_access),
            panels: binder::bind_ids(KIND, "panels", &desired.panels, &response.panels)?,
            ..desired.clone()
        })
    }

    fn refresh(_prior: Option<&DashboardState>, remote: &Dashboard) -> Result<DashboardState> {
        Ok(DashboardState {
            id: Attr::from_wire(remote.id.as_str()),
            name: remote.name.clone(),
            restricted_access: Attr::Known(remote.restricted_access),
            panels: remote
                .panels
                .iter()
                .enumerate()
                .map(|(index, panel)| panel_from_remote(index, panel))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    fn carry_identity(desired: &DashboardState, tracked: &DashboardState) -> DashboardState {
        DashboardState {
            id: desired.id.clone().or(tracked.id.clone()),
            restricted_access: desired
                .restricted_access
                .clone()
                .or(tracked.restricted_access.clone()),
            panels: binder::carry_ids_by_position(&desired.panels, &tracked.panels),
            ..desired.clone()
        }
    }
}
