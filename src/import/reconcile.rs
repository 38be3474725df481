//! Duplicate and conflict reconciliation for an import batch.
//!
//! Classifies each candidate against the stored row set for the target
//! geofeed and against earlier candidates in the same batch, producing a
//! merge plan the caller can review and prune before committing. The
//! engine is pure with respect to its two inputs: callers supply the
//! stored-row snapshot and receive a plan, never a direct mutation.
//!
//! Classification precedence, per candidate in file order:
//!
//! 1. invalid (from parsing) — passes through unchanged, never checked
//!    against storage
//! 2. duplicate of an earlier candidate in this batch (first occurrence
//!    wins)
//! 3. duplicate of a stored row (exact reconciliation-key match)
//! 4. conflict — same network as a stored row, differing attributes; a
//!    warning, not a hard block
//! 5. new

use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::import::key::RowKey;
use crate::import::parser::{ImportCandidateRow, RowIssue};
use crate::models::GeofeedRow;

/// Aggregate classification counts over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanCounts {
    pub valid: usize,
    pub invalid: usize,
    pub duplicate: usize,
    pub conflict: usize,
}

/// The annotated batch plus its aggregate counts.
#[derive(Debug)]
pub struct ImportPlan {
    pub rows: Vec<ImportCandidateRow>,
    pub counts: PlanCounts,
}

/// Annotate `candidates` against `existing`, in file order.
///
/// Every valid candidate's key enters the batch-local seen set regardless
/// of its classification, so a later identical line is always caught as a
/// batch duplicate. Duplicates are deselected; conflicts stay selected
/// because they are warnings the caller may accept.
pub fn reconcile(candidates: Vec<ImportCandidateRow>, existing: &[GeofeedRow]) -> ImportPlan {
    let existing_keys: HashSet<RowKey> = existing.iter().map(RowKey::from).collect();

    let mut existing_by_network: HashMap<&str, Vec<RowKey>> = HashMap::new();
    for row in existing {
        existing_by_network
            .entry(row.network.trim())
            .or_default()
            .push(RowKey::from(row));
    }

    let mut seen_in_batch: HashSet<RowKey> = HashSet::new();
    let mut counts = PlanCounts::default();
    let mut rows = Vec::with_capacity(candidates.len());

    for mut row in candidates {
        if !row.valid {
            counts.invalid += 1;
            rows.push(row);
            continue;
        }
        counts.valid += 1;

        let key = row.key();
        if seen_in_batch.contains(&key) {
            row.duplicate = true;
            row.issue = Some(RowIssue::DuplicateInBatch);
        } else if existing_keys.contains(&key) {
            row.duplicate = true;
            row.issue = Some(RowIssue::DuplicateOfExisting);
        } else if existing_by_network
            .get(key.network())
            .is_some_and(|keys| keys.iter().any(|existing| *existing != key))
        {
            row.conflict = true;
        }

        if row.duplicate {
            counts.duplicate += 1;
        }
        if row.conflict {
            counts.conflict += 1;
        }

        row.selected = row.valid && !row.duplicate;
        seen_in_batch.insert(key);
        rows.push(row);
    }

    ImportPlan { rows, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parser::parse_feed_text;
    use chrono::Utc;
    use uuid::Uuid;

    fn stored_row(
        network: &str,
        country: &str,
        subdivision: &str,
        city: &str,
        postal: &str,
    ) -> GeofeedRow {
        GeofeedRow {
            id: Uuid::new_v4(),
            geofeed_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            network: network.to_string(),
            country_code: country.to_string(),
            subdivision: subdivision.to_string(),
            city: city.to_string(),
            postal_code: postal.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_rows_are_selected_by_default() {
        let plan = reconcile(parse_feed_text("192.0.2.0/24,US,,,"), &[]);
        assert_eq!(plan.counts.valid, 1);
        assert_eq!(plan.counts.duplicate, 0);
        assert!(plan.rows[0].selected);
        assert!(!plan.rows[0].duplicate);
        assert!(!plan.rows[0].conflict);
    }

    #[test]
    fn exact_storage_match_is_marked_duplicate() {
        let existing = vec![stored_row("192.0.2.0/24", "US", "", "", "")];
        // Case and whitespace differences only: same reconciliation key.
        let plan = reconcile(parse_feed_text("192.0.2.0/24, us ,,,"), &existing);
        let row = &plan.rows[0];
        assert!(row.duplicate);
        assert!(!row.conflict);
        assert!(!row.selected);
        assert_eq!(row.issue, Some(RowIssue::DuplicateOfExisting));
        assert_eq!(plan.counts.duplicate, 1);
    }

    #[test]
    fn second_occurrence_in_batch_is_batch_local_duplicate() {
        let text = "192.0.2.0/24,US,,,\n192.0.2.0/24,US,,,";
        let plan = reconcile(parse_feed_text(text), &[]);
        assert!(!plan.rows[0].duplicate);
        assert!(plan.rows[0].selected);
        assert!(plan.rows[1].duplicate);
        assert!(!plan.rows[1].selected);
        assert_eq!(plan.rows[1].issue, Some(RowIssue::DuplicateInBatch));
    }

    #[test]
    fn same_network_differing_attributes_is_conflict_not_duplicate() {
        let existing = vec![stored_row("10.0.0.0/24", "US", "CA", "", "")];
        let plan = reconcile(parse_feed_text("10.0.0.0/24,US,NY,,"), &existing);
        let row = &plan.rows[0];
        assert!(row.conflict);
        assert!(!row.duplicate);
        // Conflicts are warnings: still selectable, still selected.
        assert!(row.selected);
        assert_eq!(plan.counts.conflict, 1);
    }

    #[test]
    fn duplicate_takes_precedence_over_conflict() {
        let existing = vec![
            stored_row("10.0.0.0/24", "US", "CA", "", ""),
            stored_row("10.0.0.0/24", "US", "NY", "", ""),
        ];
        // Exact match of the first stored row even though the network also
        // carries a second, differing row.
        let plan = reconcile(parse_feed_text("10.0.0.0/24,US,CA,,"), &existing);
        let row = &plan.rows[0];
        assert!(row.duplicate);
        assert!(!row.conflict);
    }

    #[test]
    fn invalid_rows_pass_through_unchanged() {
        let existing = vec![stored_row("192.0.2.0/24", "US", "", "", "")];
        let plan = reconcile(parse_feed_text("192.0.2.0/24,ZZ,,,"), &existing);
        let row = &plan.rows[0];
        assert!(!row.valid);
        assert!(!row.duplicate);
        assert!(!row.conflict);
        assert!(!row.selected);
        assert_eq!(row.issue, Some(RowIssue::InvalidCountryCode));
        assert_eq!(plan.counts.invalid, 1);
        assert_eq!(plan.counts.valid, 0);
    }

    #[test]
    fn later_batch_duplicate_of_a_conflicting_row_is_still_caught() {
        let existing = vec![stored_row("10.0.0.0/24", "US", "CA", "", "")];
        let text = "10.0.0.0/24,US,NY,,\n10.0.0.0/24,US,NY,,";
        let plan = reconcile(parse_feed_text(text), &existing);
        assert!(plan.rows[0].conflict);
        assert!(!plan.rows[0].duplicate);
        assert!(plan.rows[1].duplicate);
        assert_eq!(plan.rows[1].issue, Some(RowIssue::DuplicateInBatch));
    }

    #[test]
    fn counts_accumulate_across_the_batch() {
        let existing = vec![stored_row("192.0.2.0/24", "US", "", "", "")];
        let text = "192.0.2.0/24,US,,,\n198.51.100.0/24,ZZ,,,\n203.0.113.0/24,FR,,,";
        let plan = reconcile(parse_feed_text(text), &existing);
        assert_eq!(
            plan.counts,
            PlanCounts {
                valid: 2,
                invalid: 1,
                duplicate: 1,
                conflict: 0,
            }
        );
    }
}
