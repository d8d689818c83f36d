//! Change planning between declared and tracked state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::ResourceKind;

/// What reconciliation would do to one resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    NoOp,
}

impl Action {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
            Self::NoOp => " ",
        }
    }
}

/// A planned change for one address, e.g. `devhub_workflow.deploy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub address: String,
    pub kind: String,
    pub action: Action,
    /// Redacted tracked state
    pub before: Option<Value>,
    /// Redacted desired state, with identity carried from `before`
    pub after: Option<Value>,
}

impl Change {
    /// Plan one instance.
    ///
    /// An update is only planned when the declaration, with identifiers and
    /// server-normalized values carried over from tracked state, differs from
    /// what is tracked.
    pub fn plan<K: ResourceKind>(
        address: impl Into<String>,
        desired: Option<&K::State>,
        tracked: Option<&K::State>,
    ) -> Self {
        let (action, after) = match (desired, tracked) {
            (Some(desired), None) => (Action::Create, Some(desired.clone())),
            (None, Some(_)) => (Action::Delete, None),
            (Some(desired), Some(tracked)) => {
                let carried = K::carry_identity(desired, tracked);
                if carried == *tracked {
                    (Action::NoOp, Some(carried))
                } else {
                    (Action::Update, Some(carried))
                }
            }
            (None, None) => (Action::NoOp, None),
        };

        Self {
            address: address.into(),
            kind: K::TYPE_NAME.to_string(),
            action,
            before: tracked.map(redacted::<K>),
            after: after.as_ref().map(redacted::<K>),
        }
    }

    pub fn is_change(&self) -> bool {
        self.action != Action::NoOp
    }
}

fn redacted<K: ResourceKind>(state: &K::State) -> Value {
    let mut value = serde_json::to_value(state).unwrap_or(Value::Null);
    K::schema().redact(&mut value);
    value
}

/// Plan summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub to_create: usize,
    pub to_update: usize,
    pub to_delete: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action {
                Action::Create => summary.to_create += 1,
                Action::Update => summary.to_update += 1,
                Action::Delete => summary.to_delete += 1,
                Action::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.to_create + self.to_update + self.to_delete
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group changes by resource kind
pub fn group_by_kind(changes: &[Change]) -> BTreeMap<&str, Vec<&Change>> {
    let mut groups: BTreeMap<&str, Vec<&Change>> = BTreeMap::new();
    for change in changes {
        groups.entry(change.kind.as_str()).or_default().push(change);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attr;
    use crate::error::Result;
    use crate::schema::{AttrType, Attribute, Schema};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Secret {
        id: Attr<String>,
        name: String,
        value: String,
    }

    struct SecretKind;

    impl ResourceKind for SecretKind {
        const TYPE_NAME: &'static str = "test_secret";
        type State = Secret;
        type Remote = Secret;

        fn schema() -> Schema {
            Schema::new(vec![
                Attribute::computed("id", AttrType::String),
                Attribute::required("name", AttrType::String),
                Attribute::required("value", AttrType::String).sensitive(),
            ])
        }

        fn state_id(state: &Secret) -> Option<&str> {
            state.id.as_str()
        }

        fn remote_id(remote: &Secret) -> &str {
            remote.id.as_str().unwrap_or_default()
        }

        fn to_remote(desired: &Secret) -> Result<Secret> {
            Ok(desired.clone())
        }

        fn absorb(_desired: &Secret, response: &Secret) -> Result<Secret> {
            Ok(response.clone())
        }

        fn refresh(_prior: Option<&Secret>, remote: &Secret) -> Result<Secret> {
            Ok(remote.clone())
        }

        fn carry_identity(desired: &Secret, tracked: &Secret) -> Secret {
            Secret {
                id: desired.id.clone().or(tracked.id.clone()),
                ..desired.clone()
            }
        }
    }

    fn secret(id: Attr<String>, value: &str) -> Secret {
        Secret {
            id,
            name: "token".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_plan_actions() {
        let declared = secret(Attr::Unknown, "a");
        let tracked = secret(Attr::Known("s1".to_string()), "a");
        let changed = secret(Attr::Unknown, "b");

        let create = Change::plan::<SecretKind>("x", Some(&declared), None);
        assert_eq!(create.action, Action::Create);

        let noop = Change::plan::<SecretKind>("x", Some(&declared), Some(&tracked));
        assert_eq!(noop.action, Action::NoOp);
        assert!(!noop.is_change());

        let update = Change::plan::<SecretKind>("x", Some(&changed), Some(&tracked));
        assert_eq!(update.action, Action::Update);

        let delete = Change::plan::<SecretKind>("x", None, Some(&tracked));
        assert_eq!(delete.action, Action::Delete);
        assert!(delete.after.is_none());
    }

    #[test]
    fn test_plan_redacts_sensitive_values() {
        let tracked = secret(Attr::Known("s1".to_string()), "hunter2");
        let change = Change::plan::<SecretKind>("x", None, Some(&tracked));
        let before = change.before.unwrap();
        assert_eq!(before["value"], crate::schema::REDACTED);
        assert_eq!(before["id"], "s1");
    }

    #[test]
    fn test_summary_and_grouping() {
        let tracked = secret(Attr::Known("s1".to_string()), "a");
        let changes = vec![
            Change::plan::<SecretKind>("a", Some(&secret(Attr::Unknown, "a")), None),
            Change::plan::<SecretKind>("b", None, Some(&tracked)),
            Change::plan::<SecretKind>("c", Some(&secret(Attr::Unknown, "a")), Some(&tracked)),
        ];

        let summary = PlanSummary::from_changes(&changes);
        assert_eq!(summary.to_create, 1);
        assert_eq!(summary.to_delete, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 2);
        assert!(summary.has_changes());

        let groups = group_by_kind(&changes);
        assert_eq!(groups["test_secret"].len(), 3);
    }
}
