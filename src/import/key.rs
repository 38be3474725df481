//! Reconciliation-key normalization.
//!
//! Two rows with the same normalized five-field tuple are the same row for
//! import purposes, no matter which storage id they carry. The key is a
//! struct rather than a delimiter-joined string so a field that happens to
//! contain the delimiter cannot collide with a different tuple.

use std::fmt;

use crate::import::alpha2::normalize_alpha2;
use crate::models::GeofeedRow;

/// Canonical identity of a geofeed row: the normalized
/// (network, country, subdivision, city, postal) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    network: String,
    country_code: String,
    subdivision: String,
    city: String,
    postal_code: String,
}

impl RowKey {
    /// Build a key from raw fields: whitespace is trimmed on every field,
    /// the country code is uppercased via the reference table, and empty
    /// strings stand in for absent optionals.
    pub fn new(
        network: &str,
        country_code: &str,
        subdivision: &str,
        city: &str,
        postal_code: &str,
    ) -> Self {
        Self {
            network: network.trim().to_string(),
            country_code: normalize_alpha2(country_code),
            subdivision: subdivision.trim().to_string(),
            city: city.trim().to_string(),
            postal_code: postal_code.trim().to_string(),
        }
    }

    /// The bare network field, used for conflict grouping.
    pub fn network(&self) -> &str {
        &self.network
    }
}

impl From<&GeofeedRow> for RowKey {
    fn from(row: &GeofeedRow) -> Self {
        Self::new(
            &row.network,
            &row.country_code,
            &row.subdivision,
            &row.city,
            &row.postal_code,
        )
    }
}

impl fmt::Display for RowKey {
    /// Pipe-joined rendering for logs and diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.network, self.country_code, self.subdivision, self.city, self.postal_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_fields_after_normalization_compare_equal() {
        let a = RowKey::new("10.0.0.0/24", "us", " CA ", "San Jose", "95113");
        let b = RowKey::new("  10.0.0.0/24 ", "US", "CA", " San Jose ", " 95113");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_and_absent_optionals_are_equivalent() {
        let a = RowKey::new("10.0.0.0/24", "US", "", "", "");
        let b = RowKey::new("10.0.0.0/24", "US", "  ", "  ", "  ");
        assert_eq!(a, b);
    }

    #[test]
    fn differing_attributes_produce_distinct_keys() {
        let a = RowKey::new("10.0.0.0/24", "US", "CA", "", "");
        let b = RowKey::new("10.0.0.0/24", "US", "NY", "", "");
        assert_ne!(a, b);
        assert_eq!(a.network(), b.network());
    }

    #[test]
    fn display_renders_the_joined_form() {
        let key = RowKey::new("192.0.2.0/24", "de", "BE", "Berlin", "");
        assert_eq!(key.to_string(), "192.0.2.0/24|DE|BE|Berlin|");
    }

    #[test]
    fn delimiter_inside_a_field_cannot_collide() {
        // With a joined-string key these two would be identical.
        let a = RowKey::new("10.0.0.0/24", "US", "a|b", "", "");
        let b = RowKey::new("10.0.0.0/24", "US", "a", "b", "");
        assert_ne!(a, b);
    }
}
