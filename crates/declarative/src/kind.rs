//! Per-kind mapping seam.
//!
//! A resource kind is a mapping table between three shapes:
//! the declared state, the tracked state (same shape, computed fields
//! resolved) and the remote domain object. The controller is generic over
//! this trait, so lifecycle logic exists once for every kind.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::schema::Schema;

pub trait ResourceKind {
    /// Orchestrator-facing type name, e.g. `devhub_workflow`.
    const TYPE_NAME: &'static str;

    /// Declared and tracked state. Both share one shape.
    type State: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;

    /// The remote domain object.
    type Remote: Clone + Debug + Send + Sync;

    /// Attribute declarations for validation and tooling.
    fn schema() -> Schema;

    /// The remote identifier of a tracked object.
    fn state_id(state: &Self::State) -> Option<&str>;

    fn remote_id(remote: &Self::Remote) -> &str;

    /// Build the create/update request. Must fail before anything is sent
    /// when the declaration is not representable on the wire.
    fn to_remote(desired: &Self::State) -> Result<Self::Remote>;

    /// Re-absorb a write response: bind server-assigned identifiers onto the
    /// desired child lists and take server-normalized fields.
    fn absorb(desired: &Self::State, response: &Self::Remote) -> Result<Self::State>;

    /// Synthesize tracked state from a read response.
    ///
    /// `prior` is the last tracked state, or `None` on import. Write-only
    /// values are carried over from `prior`, since the remote never returns
    /// them.
    fn refresh(prior: Option<&Self::State>, remote: &Self::Remote) -> Result<Self::State>;

    /// Use prior values for unknowns.
    ///
    /// Pre-populates identifiers of children that already exist remotely and
    /// carries computed or server-normalized values the declaration leaves
    /// unset, so an update request keeps every existing child's identity and
    /// a refreshed state compares equal to an unchanged declaration.
    fn carry_identity(desired: &Self::State, tracked: &Self::State) -> Self::State {
        let _ = tracked;
        desired.clone()
    }

    /// Copy of a remote object safe to log.
    fn redact(remote: &Self::Remote) -> Self::Remote {
        remote.clone()
    }
}
