//! Reconciliation controller.
//!
//! Drives one resource instance through Create, Read, Update, Delete and
//! Import. Every operation performs at most one remote call. Tracked state
//! is only ever produced from a successful call; on failure the caller keeps
//! the state it already had.
//!
//! ```text
//!            create                 delete
//!   Absent ─────────▶ Creating ──▶ Present ─────────▶ Deleting ──▶ Absent
//!      ▲                 │          │  ▲  │                │
//!      └──── failure ────┘   update │  │  │ read (gone)    └─ failure ─▶ Present
//!                                   ▼  │  ▼
//!                               Updating Absent
//! ```

use std::fmt;
use std::marker::PhantomData;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCategory, Result};
use crate::kind::ResourceKind;
use crate::remote::{RemoteError, RemoteStore};

/// Lifecycle phase of one resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl Phase {
    /// `Absent` and `Present` are the only phases that outlive an operation.
    pub fn is_stable(self) -> bool {
        matches!(self, Self::Absent | Self::Present)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Present => "present",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        };
        write!(f, "{name}")
    }
}

/// Phases reachable from `from`.
pub fn allowed_transitions(from: Phase) -> &'static [Phase] {
    use Phase::{Absent, Creating, Deleting, Present, Updating};
    match from {
        // Import goes straight to Present.
        Absent => &[Creating, Present],
        Creating => &[Present, Absent],
        Present => &[Present, Absent, Updating, Deleting],
        Updating => &[Present],
        Deleting => &[Absent, Present],
    }
}

pub fn validate_transition(kind: &'static str, from: Phase, to: Phase) -> Result<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(Error::IllegalTransition { kind, from, to })
    }
}

/// Lifecycle entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        };
        write!(f, "{name}")
    }
}

/// Result of reading a tracked object.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<S> {
    /// The object exists; `drifted` is true when it no longer matches the
    /// previously tracked state.
    Refreshed { state: S, drifted: bool },
    /// The object was deleted outside of this engine. Stop tracking it.
    Gone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object was already gone, which is the goal state.
    AlreadyGone,
}

/// Controller for a single resource instance.
///
/// Holds no state besides the instance's phase; independent instances get
/// their own controller and may run in parallel over a shared store.
pub struct Controller<'a, K, S> {
    store: &'a S,
    phase: Phase,
    kind: PhantomData<fn() -> K>,
}

impl<'a, K, S> Controller<'a, K, S>
where
    K: ResourceKind,
    S: RemoteStore<K::Remote>,
{
    /// Controller for an instance that is not tracked yet.
    pub fn new(store: &'a S) -> Self {
        Self::with_phase(store, Phase::Absent)
    }

    /// Controller for an instance with tracked state.
    pub fn tracking(store: &'a S) -> Self {
        Self::with_phase(store, Phase::Present)
    }

    pub fn with_phase(store: &'a S, phase: Phase) -> Self {
        Self {
            store,
            phase,
            kind: PhantomData,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, to: Phase) -> Result<()> {
        validate_transition(K::TYPE_NAME, self.phase, to)?;
        debug!("{}: {} -> {}", K::TYPE_NAME, self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Leave a transient phase: `success` on `Ok`, `failure` on `Err`.
    fn settle<T>(&mut self, result: Result<T>, success: Phase, failure: Phase) -> Result<T> {
        let to = if result.is_ok() { success } else { failure };
        self.transition(to)?;
        result
    }

    /// Create the remote object. Nothing is tracked unless this succeeds.
    pub fn create(&mut self, desired: &K::State) -> Result<K::State> {
        self.transition(Phase::Creating)?;
        let result = self.write(Operation::Create, None, desired);
        let state = self.settle(result, Phase::Present, Phase::Absent)?;
        info!(
            "{}: created {}",
            K::TYPE_NAME,
            K::state_id(&state).unwrap_or_default()
        );
        Ok(state)
    }

    /// Re-fetch a tracked object.
    pub fn read(&mut self, tracked: &K::State) -> Result<ReadOutcome<K::State>> {
        let id = Self::id_of(tracked)?;
        if self.phase != Phase::Present {
            return Err(Error::IllegalTransition {
                kind: K::TYPE_NAME,
                from: self.phase,
                to: Phase::Present,
            });
        }

        let remote = match self.store.get(id) {
            Ok(remote) => remote,
            Err(err) if err.is_not_found() => {
                warn!("{}: {id} no longer exists, dropping it", K::TYPE_NAME);
                self.transition(Phase::Absent)?;
                return Ok(ReadOutcome::Gone);
            }
            Err(err) => return Err(Error::transport(K::TYPE_NAME, Operation::Read, err)),
        };

        let state = K::refresh(Some(tracked), &remote)
            .inspect_err(|err| Self::report(err, None, &remote))?;
        let drifted = state != *tracked;
        if drifted {
            debug!("{}: {id} drifted from tracked state", K::TYPE_NAME);
        }
        self.transition(Phase::Present)?;
        Ok(ReadOutcome::Refreshed { state, drifted })
    }

    /// Update a tracked object to the desired state. All-or-nothing.
    pub fn update(&mut self, desired: &K::State, tracked: &K::State) -> Result<K::State> {
        let id = Self::id_of(tracked)?.to_string();
        self.transition(Phase::Updating)?;
        let desired = K::carry_identity(desired, tracked);
        let result = self.write(Operation::Update, Some(&id), &desired);
        let state = self.settle(result, Phase::Present, Phase::Present)?;
        info!("{}: updated {id}", K::TYPE_NAME);
        Ok(state)
    }

    /// Delete a tracked object. A remote not-found counts as success.
    pub fn delete(&mut self, tracked: &K::State) -> Result<DeleteOutcome> {
        let id = Self::id_of(tracked)?;
        self.transition(Phase::Deleting)?;

        let result = match self.store.delete(id) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(err) if err.is_not_found() => {
                warn!("{}: {id} was already deleted", K::TYPE_NAME);
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(err) => Err(Error::transport(K::TYPE_NAME, Operation::Delete, err)),
        };

        let outcome = self.settle(result, Phase::Absent, Phase::Present)?;
        info!("{}: deleted {id}", K::TYPE_NAME);
        Ok(outcome)
    }

    /// Start tracking an existing remote object known only by its id.
    pub fn import(&mut self, id: &str) -> Result<K::State> {
        if self.phase != Phase::Absent {
            return Err(Error::IllegalTransition {
                kind: K::TYPE_NAME,
                from: self.phase,
                to: Phase::Present,
            });
        }

        let remote = match self.store.get(id) {
            Ok(remote) => remote,
            Err(err) if err.is_not_found() => {
                return Err(Error::NotFound {
                    kind: K::TYPE_NAME,
                    id: id.to_string(),
                });
            }
            Err(err) => return Err(Error::transport(K::TYPE_NAME, Operation::Import, err)),
        };

        let state =
            K::refresh(None, &remote).inspect_err(|err| Self::report(err, None, &remote))?;
        self.transition(Phase::Present)?;
        info!("{}: imported {id}", K::TYPE_NAME);
        Ok(state)
    }

    /// Map, send and absorb one create or update.
    fn write(&self, operation: Operation, id: Option<&str>, desired: &K::State) -> Result<K::State> {
        let request = K::to_remote(desired)?;

        let response = match id {
            None => self.store.create(&request),
            Some(id) => self.store.update(id, &request),
        }
        .map_err(|err| Error::transport(K::TYPE_NAME, operation, err))?;

        debug!(
            "{}: {operation} returned {}",
            K::TYPE_NAME,
            K::remote_id(&response)
        );

        K::absorb(desired, &response).inspect_err(|err| Self::report(err, Some(&request), &response))
    }

    fn id_of(tracked: &K::State) -> Result<&str> {
        K::state_id(tracked)
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingId { kind: K::TYPE_NAME })
    }

    /// Log contract violations with the full exchange.
    fn report(err: &Error, request: Option<&K::Remote>, response: &K::Remote) {
        if err.category() != ErrorCategory::Integration {
            return;
        }
        match request {
            Some(request) => error!(
                "{err}\n  request: {:?}\n  response: {:?}",
                K::redact(request),
                K::redact(response)
            ),
            None => error!("{err}\n  response: {:?}", K::redact(response)),
        }
    }
}
