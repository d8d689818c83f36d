//! Child-list identity binder.
//!
//! After a write the remote returns every child with its server-assigned
//! identifier. Children are matched to the desired list by position, so the
//! two lists must have the same length; anything else means the remote
//! reordered, dropped or added children and the binding is refused.

use std::collections::{BTreeMap, HashSet};

use crate::attr::Attr;
use crate::error::{Error, Result};

/// A declared child record carrying a (possibly unknown) identifier.
pub trait Identified {
    fn id(&self) -> &Attr<String>;
    fn set_id(&mut self, id: Attr<String>);
}

/// A remote child record with its server-assigned identifier.
pub trait RemoteChild {
    fn remote_id(&self) -> &str;
}

/// Check the length precondition shared by every binding.
pub fn check_len(kind: &'static str, field: &str, desired: usize, remote: usize) -> Result<()> {
    if desired == remote {
        Ok(())
    } else {
        Err(Error::ChildCountMismatch {
            kind,
            field: field.to_string(),
            desired,
            remote,
        })
    }
}

/// Merge a remote child list onto the desired list, position by position.
///
/// `merge` receives the index, the desired child and its remote counterpart
/// and returns the bound child; it may itself call `bind` for nested lists.
/// Inputs are never modified. Nothing is bound unless the lengths match.
pub fn bind<D, R>(
    kind: &'static str,
    field: &str,
    desired: &[D],
    remote: &[R],
    mut merge: impl FnMut(usize, &D, &R) -> Result<D>,
) -> Result<Vec<D>> {
    check_len(kind, field, desired.len(), remote.len())?;

    desired
        .iter()
        .zip(remote)
        .enumerate()
        .map(|(index, (d, r))| merge(index, d, r))
        .collect()
}

/// Bind only identifiers: element `i` takes `remote[i]`'s id.
pub fn bind_ids<D, R>(kind: &'static str, field: &str, desired: &[D], remote: &[R]) -> Result<Vec<D>>
where
    D: Identified + Clone,
    R: RemoteChild,
{
    bind(kind, field, desired, remote, |_, d, r| {
        let mut bound = d.clone();
        bound.set_id(Attr::from_wire(r.remote_id()));
        Ok(bound)
    })
}

/// Fill missing identifiers from a prior list, matching by business key.
///
/// Each prior child is claimed at most once, so duplicated keys still map
/// one-to-one. Children without a prior counterpart keep their unknown id
/// and will receive a fresh one from the remote.
pub fn carry_ids_by_key<D, K>(desired: &[D], prior: &[D], key: impl Fn(&D) -> K) -> Vec<D>
where
    D: Identified + Clone,
    K: PartialEq,
{
    let mut claimed = HashSet::new();

    // Ids the declaration already names are never handed to another child.
    for child in desired {
        if let Some(id) = child.id().known() {
            claimed.insert(id.clone());
        }
    }

    desired
        .iter()
        .map(|child| {
            let mut carried = child.clone();
            if child.id().is_known() {
                return carried;
            }
            let wanted = key(child);
            let found = prior.iter().find(|p| {
                p.id()
                    .known()
                    .is_some_and(|id| !claimed.contains(id) && key(p) == wanted)
            });
            if let Some(p) = found {
                if let Some(id) = p.id().known() {
                    claimed.insert(id.clone());
                }
                carried.set_id(p.id().clone());
            }
            carried
        })
        .collect()
}

/// Fill missing identifiers from a prior list by position.
///
/// For children that have no business key. Extra desired children beyond
/// the prior list keep their unknown id.
pub fn carry_ids_by_position<D>(desired: &[D], prior: &[D]) -> Vec<D>
where
    D: Identified + Clone,
{
    desired
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let mut carried = child.clone();
            if !child.id().is_known() {
                if let Some(p) = prior.get(index) {
                    carried.set_id(p.id().clone());
                }
            }
            carried
        })
        .collect()
}

/// Build a derived `key -> id` map from a child list.
///
/// Derived maps are never stored on their own; they are rebuilt from the
/// current list on every reconciliation. Children without a known id are
/// skipped.
pub fn index_ids<D: Identified>(
    children: &[D],
    key: impl Fn(&D) -> String,
) -> BTreeMap<String, String> {
    children
        .iter()
        .filter_map(|child| child.id().known().map(|id| (key(child), id.clone())))
        .collect()
}
