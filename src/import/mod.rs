//! CSV import reconciliation engine.
//!
//! This module is the core of the geofeed manager: it turns an
//! externally-sourced CSV into a reviewed, deduplicated, safely committed
//! set of stored rows.
//!
//! # Pipeline
//!
//! 1. **`parser`**: raw text → candidate rows with per-line validity
//!    verdicts (`cidr` and `alpha2` supply the format checks, `key` the
//!    canonical row identity)
//! 2. **`reconcile`**: candidates + stored-row snapshot → annotated merge
//!    plan (duplicates, conflicts, default selection)
//! 3. caller selection → **`commit`**: re-validated, race-checked
//!    persistence with per-row error reporting
//!
//! **`draft`** wraps the pipeline in the create-draft → preview →
//! commit-or-discard lifecycle, and **`fetch`** retrieves feed bodies for
//! import-by-URL.
//!
//! Each import request is handled independently and synchronously: one
//! storage read for the snapshot, one write pass for the commit, no shared
//! in-memory state between concurrent imports. The storage uniqueness
//! constraint on the reconciliation key is the authoritative guard against
//! racing commits; the in-memory checks exist for user feedback.

pub mod alpha2;
pub mod cidr;
pub mod commit;
pub mod draft;
pub mod fetch;
pub mod key;
pub mod parser;
pub mod reconcile;

use rocket_db_pools::sqlx;
use thiserror::Error;

pub use commit::{ImportOutcome, RowError, SubmittedRow};
pub use draft::{ImportSession, ImportTarget};
pub use key::RowKey;
pub use parser::{ImportCandidateRow, RowIssue};
pub use reconcile::{ImportPlan, PlanCounts};

/// Request-level import failures. These short-circuit before any storage
/// write, in contrast to [`RowIssue`] values which are collected per row.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no rows provided")]
    NoRowsProvided,
    #[error("no valid rows to import")]
    NoValidRows,
    #[error("geofeed not found")]
    GeofeedNotFound,
    #[error("geofeed name is required")]
    EmptyName,
    #[error("import source must be an http(s) URL")]
    InvalidSourceUrl,
    #[error("feed source exceeds the size limit")]
    FeedTooLarge,
    #[error("failed to fetch feed source: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
