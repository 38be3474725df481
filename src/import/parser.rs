//! CSV row parsing for feed imports.
//!
//! Turns raw feed text (an uploaded file body or an HTTP-fetched body) into
//! candidate rows. The expected wire format is RFC 8805 without comments or
//! header: one record per line, exactly five comma-separated fields in
//! `network,country,subdivision,city,postal` order, empty optionals present
//! as empty strings.
//!
//! Parsing is side-effect-free and never consults storage; duplicate and
//! conflict classification happens later in [`crate::import::reconcile`].

use thiserror::Error;

use crate::import::alpha2::{is_valid_alpha2, normalize_alpha2};
use crate::import::cidr::is_valid_cidr;
use crate::import::key::RowKey;

/// Field count of a well-formed record.
const EXPECTED_FIELD_COUNT: usize = 5;

/// Per-row diagnostic attached to a candidate during parsing or
/// reconciliation. Row-level issues never abort the batch; they are
/// collected and reported alongside any successful partial import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("invalid CIDR network")]
    InvalidCidr,
    #[error("invalid alpha2 country code")]
    InvalidCountryCode,
    #[error("expected 5 comma-separated values")]
    WrongFieldCount,
    #[error("duplicate in import batch")]
    DuplicateInBatch,
    #[error("duplicate of existing range")]
    DuplicateOfExisting,
}

/// A parsed input line, annotated through the import pipeline.
///
/// Transient: candidates are surfaced to the caller for selection and are
/// never persisted in this form.
#[derive(Debug, Clone)]
pub struct ImportCandidateRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub network: String,
    pub country_code: String,
    pub subdivision: String,
    pub city: String,
    pub postal_code: String,
    /// The untouched source line, kept for display and audit.
    pub original: String,
    pub valid: bool,
    pub issue: Option<RowIssue>,
    pub duplicate: bool,
    pub conflict: bool,
    pub selected: bool,
}

impl ImportCandidateRow {
    /// Reconciliation key over the normalized fields.
    pub fn key(&self) -> RowKey {
        RowKey::new(
            &self.network,
            &self.country_code,
            &self.subdivision,
            &self.city,
            &self.postal_code,
        )
    }

    fn malformed(line: usize, original: &str, issue: RowIssue) -> Self {
        Self {
            line,
            network: String::new(),
            country_code: String::new(),
            subdivision: String::new(),
            city: String::new(),
            postal_code: String::new(),
            original: original.to_string(),
            valid: false,
            issue: Some(issue),
            duplicate: false,
            conflict: false,
            selected: false,
        }
    }
}

/// Parse raw feed text into candidate rows.
///
/// Splits on CRLF or LF, skips blank lines, and emits one candidate per
/// non-blank line with its 1-based line number. A line with the wrong field
/// count is reported as such and receives no further validation; otherwise
/// the CIDR check runs before the country check and the first failure wins.
pub fn parse_feed_text(text: &str) -> Vec<ImportCandidateRow> {
    let mut rows = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != EXPECTED_FIELD_COUNT {
            rows.push(ImportCandidateRow::malformed(
                line_number,
                raw_line,
                RowIssue::WrongFieldCount,
            ));
            continue;
        }

        let network = fields[0].trim().to_string();
        let country_code = normalize_alpha2(fields[1]);
        let subdivision = fields[2].trim().to_string();
        let city = fields[3].trim().to_string();
        let postal_code = fields[4].trim().to_string();

        let issue = if network.is_empty() || !is_valid_cidr(&network) {
            Some(RowIssue::InvalidCidr)
        } else if !is_valid_alpha2(&country_code) {
            Some(RowIssue::InvalidCountryCode)
        } else {
            None
        };

        rows.push(ImportCandidateRow {
            line: line_number,
            network,
            country_code,
            subdivision,
            city,
            postal_code,
            original: raw_line.to_string(),
            valid: issue.is_none(),
            issue,
            duplicate: false,
            conflict: false,
            selected: false,
        });
    }

    rows
}
