//! Orphan reconciliation between the object store and the file registry.
//!
//! Upload writes the object first and the registry row second. If the second
//! step fails and the compensating delete also fails, the object is left with
//! no registry row. This pass finds and removes such objects.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::{FileError, FileRegistry};
use crate::storage::{ObjectSummary, StorageResolver};

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Objects seen under the key prefix.
    pub scanned: usize,
    /// Objects with no registry row older than the grace period.
    pub orphaned: usize,
    /// Orphans successfully deleted.
    pub deleted: usize,
}

/// Select objects that have no registry entry and were last modified before
/// `now - grace`. Objects without a modification time are never selected.
pub fn find_orphans<'a>(
    objects: &'a [ObjectSummary],
    registered_keys: &HashSet<&str>,
    now: DateTime<Utc>,
    grace: Duration,
) -> Vec<&'a ObjectSummary> {
    let cutoff = now - grace;
    objects
        .iter()
        .filter(|o| !registered_keys.contains(o.key.as_str()))
        .filter(|o| o.last_modified.is_some_and(|t| t < cutoff))
        .collect()
}

/// Delete stored objects that no file record references.
pub async fn reconcile_orphans(
    registry: &dyn FileRegistry,
    resolver: &StorageResolver,
    grace: Duration,
) -> Result<ReconcileReport, FileError> {
    let objects = resolver.list_stored().await?;
    let paths = registry.list_paths().await?;
    let registered: HashSet<&str> = paths.iter().map(|p| resolver.resolve_key(p)).collect();

    let orphans = find_orphans(&objects, &registered, Utc::now(), grace);
    let mut report = ReconcileReport {
        scanned: objects.len(),
        orphaned: orphans.len(),
        deleted: 0,
    };

    for orphan in orphans {
        match resolver.delete(&orphan.key).await {
            Ok(()) => report.deleted += 1,
            Err(e) => warn!(key = %orphan.key, error = %e, "failed to delete orphaned object"),
        }
    }

    info!(
        scanned = report.scanned,
        orphaned = report.orphaned,
        deleted = report.deleted,
        "orphan reconciliation finished"
    );
    Ok(report)
}
