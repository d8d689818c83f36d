//! # Declarative
//!
//! A reconciliation engine for declaratively managed remote resources.
//!
//! Users declare the desired shape of a remote object; the engine creates,
//! reads, updates, deletes and imports it through a transport collaborator,
//! keeping tracked state faithful to what the remote actually holds.
//!
//! ## Core Concepts
//!
//! - **Attr**: a field value that is unknown (computed later), null or known
//! - **VariantCodec**: maps tagged unions to flat wire payloads and back
//! - **Binder**: assigns server identifiers to nested child lists
//! - **ResourceKind**: the per-kind mapping table between declared state and
//!   the remote object
//! - **Controller**: the generic Create/Read/Update/Delete/Import lifecycle
//! - **Executor**: runs planned changes for many instances in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Controller, ReadOutcome};
//!
//! let mut controller = Controller::<WorkflowKind, _>::new(&client);
//! let tracked = controller.create(&desired)?;
//!
//! let mut controller = Controller::<WorkflowKind, _>::tracking(&client);
//! match controller.read(&tracked)? {
//!     ReadOutcome::Refreshed { state, drifted } => { /* persist state */ }
//!     ReadOutcome::Gone => { /* stop tracking */ }
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteStore`]: create/get/update/delete against one remote collection
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on a specific
//! HTTP client or UI framework.

pub mod attr;
pub mod binder;
pub mod codec;
pub mod context;
pub mod controller;
pub mod error;
pub mod executor;
pub mod kind;
pub mod normalize;
pub mod plan;
pub mod remote;
pub mod schema;

// Re-export main types at crate root
pub use attr::Attr;
pub use binder::{Identified, RemoteChild};
pub use codec::VariantCodec;
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use controller::{Controller, DeleteOutcome, Operation, Phase, ReadOutcome};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{execute, ApplyResult, ExecuteOptions, ExecuteReport, ExecuteSummary, Task};
pub use kind::ResourceKind;
pub use normalize::Whitelist;
pub use plan::{group_by_kind, Action, Change, PlanSummary};
pub use remote::{RemoteError, RemoteStore};
pub use schema::{AttrType, Attribute, Presence, Schema, Violation};
