//! Draft lifecycle coordination for the import workflow.
//!
//! An import targeting a new geofeed creates it in draft state before any
//! CSV is parsed, so accepted rows have somewhere to land. The draft is
//! finalized by the commit executor (`finalize=true`) or deleted when the
//! caller abandons the flow. Abandonment is best-effort and idempotent:
//! cancelling twice, or after the draft is already gone, is a no-op.

use uuid::Uuid;

use crate::import::ImportError;
use crate::models::{Geofeed, GeofeedRow};
use crate::store::{GeofeedStore, RequestContext};

/// Where an import lands: a freshly created draft or an existing geofeed.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    New { name: String },
    Existing { geofeed_id: Uuid },
}

/// Resolved import target plus the stored-row snapshot used for preview
/// reconciliation.
#[derive(Debug)]
pub struct ImportSession {
    pub geofeed: Geofeed,
    pub existing_rows: Vec<GeofeedRow>,
}

/// Enter the import workflow against `target`.
///
/// A `New` target creates the draft row immediately; an `Existing` target
/// verifies ownership and snapshots its current rows. Either way the
/// caller can proceed to previewing, or walk away — an unfinished draft is
/// cleaned up by [`abandon_import`].
pub async fn begin_import(
    store: &GeofeedStore<'_>,
    ctx: &RequestContext,
    target: ImportTarget,
) -> Result<ImportSession, ImportError> {
    match target {
        ImportTarget::New { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ImportError::EmptyName);
            }
            let geofeed = store.create_geofeed(ctx, name, true).await?;
            log::info!("created draft geofeed {} for import", geofeed.id);
            Ok(ImportSession {
                geofeed,
                existing_rows: Vec::new(),
            })
        }
        ImportTarget::Existing { geofeed_id } => {
            let geofeed = store
                .get_geofeed(ctx, geofeed_id)
                .await?
                .ok_or(ImportError::GeofeedNotFound)?;
            let existing_rows = store.list_rows(ctx, geofeed_id).await?;
            Ok(ImportSession {
                geofeed,
                existing_rows,
            })
        }
    }
}

/// Abandon an import, deleting the draft geofeed and any rows already
/// committed to it.
///
/// Only drafts are deleted: cancelling an import into a finalized geofeed
/// leaves it untouched. Failures are logged and swallowed so a broken
/// cleanup never blocks the caller from retrying the workflow.
pub async fn abandon_import(store: &GeofeedStore<'_>, ctx: &RequestContext, geofeed_id: Uuid) {
    match store.delete_draft_geofeed(ctx, geofeed_id).await {
        Ok(0) => log::debug!("abandon import: draft geofeed {geofeed_id} already absent"),
        Ok(_) => log::info!("deleted abandoned draft geofeed {geofeed_id}"),
        Err(err) => log::warn!("failed to delete abandoned draft geofeed {geofeed_id}: {err}"),
    }
}
