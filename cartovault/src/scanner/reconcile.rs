//! Reconciliation of the local index against a fresh scan.
//!
//! For every in-scope entry of the index:
//!
//! | Scan result | Lock count | Action |
//! |---|---|---|
//! | same file | any | keep; clear pending-removal |
//! | changed file | 0 | replace with fresh entry |
//! | changed file | > 0 | keep old entry until released |
//! | missing | 0 | remove |
//! | missing | > 0 | keep, mark pending removal |
//!
//! Candidates with no index entry are added. Pending entries are retried on
//! every pass, so a released resource whose file is gone disappears on the
//! next pass. Running a pass twice without filesystem changes mutates
//! nothing the second time.

use crate::catalog::LocalIndex;
use crate::resource::{LocalKind, LocalResource};

/// Which index entries a pass may remove or replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Every local entry (full rescan).
    All,
    /// Only entries of one kind (e.g. rescanning unmanaged roots).
    Kind(LocalKind),
}

impl ReconcileScope {
    fn includes(&self, resource: &LocalResource) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => resource.kind() == *kind,
        }
    }
}

/// Ids affected by one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Entries kept because consumers hold them open.
    pub deferred: Vec<String>,
}

impl ReconcileReport {
    /// True if the pass changed the index.
    pub fn changed_index(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }

    fn sort(&mut self) {
        self.added.sort();
        self.updated.sort();
        self.removed.sort();
        self.deferred.sort();
    }
}

/// Apply a scan's candidates to the index.
///
/// The caller must hold the local index write lock for the whole pass.
pub fn reconcile(
    index: &mut LocalIndex,
    mut candidates: LocalIndex,
    scope: ReconcileScope,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let in_scope: Vec<String> = index
        .iter()
        .filter(|(_, res)| scope.includes(res))
        .map(|(id, _)| id.clone())
        .collect();

    for id in in_scope {
        let Some(existing) = index.get(&id).cloned() else {
            continue;
        };
        match candidates.remove(&id) {
            Some(fresh) if existing.same_file_as(&fresh) => {
                if existing.is_pending_removal() {
                    tracing::debug!(id = %id, "Pending resource reappeared");
                    existing.set_pending_removal(false);
                }
            }
            Some(fresh) => {
                if existing.is_locked() {
                    report.deferred.push(id);
                } else {
                    index.insert(id.clone(), fresh);
                    report.updated.push(id);
                }
            }
            None => {
                if existing.is_locked() {
                    if !existing.is_pending_removal() {
                        tracing::info!(
                            id = %id,
                            lock_count = existing.lock_count(),
                            "Resource file removed while in use; removal deferred"
                        );
                        existing.set_pending_removal(true);
                    }
                    report.deferred.push(id);
                } else {
                    index.remove(&id);
                    report.removed.push(id);
                }
            }
        }
    }

    for (id, fresh) in candidates {
        if index.contains_key(&id) {
            // Out-of-scope entry already owns this id.
            continue;
        }
        index.insert(id.clone(), fresh);
        report.added.push(id);
    }

    report.sort();
    report
}
