//! Commit execution for a reviewed import batch.
//!
//! The caller submits the rows it selected during preview; the executor
//! re-validates and re-deduplicates every one of them against a fresh
//! storage snapshot before writing, because storage may have changed
//! between preview and commit. Partial success is the normal case: the
//! outcome reports what landed, what was skipped, and why, per row.

use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::ImportError;
use crate::import::alpha2::{is_valid_alpha2, normalize_alpha2};
use crate::import::cidr::is_valid_cidr;
use crate::import::key::RowKey;
use crate::import::parser::RowIssue;
use crate::models::NewGeofeedRow;
use crate::store::{GeofeedStore, RequestContext};

/// One row submitted for commit, as selected by the caller during preview.
/// Deserialized at the HTTP boundary so the executor only ever sees typed
/// values.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRow {
    pub network: String,
    pub country_code: String,
    #[serde(default)]
    pub subdivision: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    /// Source line text, echoed back in per-row errors.
    #[serde(default)]
    pub original: String,
}

/// A row rejected at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// Position of the row in the submitted batch.
    pub index: usize,
    pub reason: String,
    /// The offending source line, so the caller can fix and resubmit it.
    pub value: String,
}

/// What the commit did, row by row and in aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported_count: u64,
    pub error_count: usize,
    pub skipped_count: usize,
    pub conflict_count: usize,
    pub errors: Vec<RowError>,
}

/// Persist the accepted subset of `rows` into `geofeed_id`.
///
/// Rejects the whole request with [`ImportError::NoRowsProvided`] or
/// [`ImportError::NoValidRows`] before any write. Otherwise inserts each
/// surviving row; the storage uniqueness constraint absorbs rows a
/// concurrent commit landed first, and the difference is reported as
/// skips. When `finalize` is set the geofeed's draft flag is cleared in
/// the same request.
pub async fn execute(
    store: &GeofeedStore<'_>,
    ctx: &RequestContext,
    geofeed_id: Uuid,
    rows: &[SubmittedRow],
    finalize: bool,
) -> Result<ImportOutcome, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::NoRowsProvided);
    }

    store
        .get_geofeed(ctx, geofeed_id)
        .await?
        .ok_or(ImportError::GeofeedNotFound)?;

    let existing = store.list_rows(ctx, geofeed_id).await?;
    let existing_keys: HashSet<RowKey> = existing.iter().map(RowKey::from).collect();
    let mut existing_by_network: HashMap<&str, Vec<RowKey>> = HashMap::new();
    for row in &existing {
        existing_by_network
            .entry(row.network.trim())
            .or_default()
            .push(RowKey::from(row));
    }

    let mut errors = Vec::new();
    let mut accepted: Vec<NewGeofeedRow> = Vec::new();
    let mut seen_in_batch: HashSet<RowKey> = HashSet::new();
    let mut skipped = 0usize;
    let mut conflicts = 0usize;
    let mut valid_count = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let network = row.network.trim().to_string();
        let country_code = normalize_alpha2(&row.country_code);

        if network.is_empty() || !is_valid_cidr(&network) {
            errors.push(RowError {
                index,
                reason: RowIssue::InvalidCidr.to_string(),
                value: row.original.clone(),
            });
            continue;
        }
        if !is_valid_alpha2(&country_code) {
            errors.push(RowError {
                index,
                reason: RowIssue::InvalidCountryCode.to_string(),
                value: row.original.clone(),
            });
            continue;
        }
        valid_count += 1;

        let key = RowKey::new(
            &network,
            &country_code,
            &row.subdivision,
            &row.city,
            &row.postal_code,
        );

        if seen_in_batch.contains(&key) {
            skipped += 1;
            errors.push(RowError {
                index,
                reason: RowIssue::DuplicateInBatch.to_string(),
                value: row.original.clone(),
            });
            continue;
        }
        seen_in_batch.insert(key.clone());

        if existing_keys.contains(&key) {
            skipped += 1;
            errors.push(RowError {
                index,
                reason: RowIssue::DuplicateOfExisting.to_string(),
                value: row.original.clone(),
            });
            continue;
        }

        if existing_by_network
            .get(key.network())
            .is_some_and(|keys| keys.iter().any(|existing| *existing != key))
        {
            conflicts += 1;
        }

        accepted.push(NewGeofeedRow {
            network,
            country_code,
            subdivision: row.subdivision.trim().to_string(),
            city: row.city.trim().to_string(),
            postal_code: row.postal_code.trim().to_string(),
        });
    }

    if valid_count == 0 {
        return Err(ImportError::NoValidRows);
    }

    let imported = if accepted.is_empty() {
        0
    } else {
        store.insert_rows(ctx, geofeed_id, &accepted).await?
    };

    // Anything the uniqueness constraint absorbed lost a race with a
    // concurrent commit; report it as skipped rather than imported.
    let raced = accepted.len() as u64 - imported;
    if raced > 0 {
        log::info!("import into geofeed {geofeed_id}: {raced} rows lost a duplicate race");
        skipped += raced as usize;
    }

    if finalize {
        store.set_draft_flag(ctx, geofeed_id, false).await?;
    }

    Ok(ImportOutcome {
        imported_count: imported,
        error_count: errors.len(),
        skipped_count: skipped,
        conflict_count: conflicts,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_row_deserializes_with_missing_optionals() {
        let row: SubmittedRow = serde_json::from_str(
            r#"{"network":"192.0.2.0/24","countryCode":"US","original":"192.0.2.0/24,US,,,"}"#,
        )
        .expect("payload should deserialize");
        assert_eq!(row.network, "192.0.2.0/24");
        assert_eq!(row.subdivision, "");
        assert_eq!(row.city, "");
        assert_eq!(row.postal_code, "");
    }
}
