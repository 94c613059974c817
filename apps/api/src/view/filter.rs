use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::view::Tabular;

/// Columns that support set-membership filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Status,
    Assignee,
    JobId,
    Client,
}

/// `column ∈ values`. An empty value set leaves the filter switched off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: Column,
    values: BTreeSet<String>,
}

impl ColumnFilter {
    pub fn new<I, S>(column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            column,
            values: values
                .into_iter()
                .map(|v| v.as_ref().trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated query parameter.
    pub fn from_csv(column: Column, raw: &str) -> Self {
        Self::new(column, raw.split(','))
    }

    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn matches<R: Tabular>(&self, record: &R) -> bool {
        if !self.is_active() {
            return true;
        }
        record
            .column_value(self.column)
            .is_some_and(|v| self.values.contains(&v.trim().to_lowercase()))
    }
}

/// Normalises a global search query: trimmed, lower-cased.
pub fn normalise_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Substring match over every searchable field. `needle` must already be
/// normalised; an empty needle matches everything.
pub fn matches_search<R: Tabular>(record: &R, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Global search AND every active column filter.
pub fn matches_all<R: Tabular>(record: &R, needle: &str, columns: &[ColumnFilter]) -> bool {
    matches_search(record, needle) && columns.iter().all(|f| f.matches(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::testing::{row, Row};

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(matches_search(&row("1", "Ann Lee", "pending"), ""));
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let r = row("1", "John Smith", "approved");
        assert!(matches_search(&r, &normalise_query("  SMITH ")));
        assert!(!matches_search(&r, "smyth"));
    }

    #[test]
    fn test_search_covers_list_fields() {
        let mut r = row("1", "Ann Lee", "pending");
        r.skills = vec!["Kubernetes".into()];
        assert!(matches_search(&r, "kube"));
    }

    #[test]
    fn test_column_filter_membership() {
        let filter = ColumnFilter::from_csv(Column::Status, "approved, Pending");
        assert!(filter.matches(&row("1", "A", "pending")));
        assert!(!filter.matches(&row("2", "B", "rejected")));
    }

    #[test]
    fn test_inactive_filter_passes() {
        let filter = ColumnFilter::from_csv(Column::Status, " , ");
        assert!(!filter.is_active());
        assert!(filter.matches(&row("1", "A", "rejected")));
    }

    #[test]
    fn test_missing_column_value_fails_active_filter() {
        let filter = ColumnFilter::new(Column::Assignee, ["u1"]);
        assert!(!filter.matches(&row("1", "A", "pending")));
    }

    #[test]
    fn test_search_and_columns_are_anded() {
        let smith: Row = row("1", "John Smith", "approved");
        let rejected_only = [ColumnFilter::new(Column::Status, ["rejected"])];
        assert!(!matches_all(&smith, "smith", &rejected_only));
        assert!(matches_all(&row("2", "Jane Smith", "rejected"), "smith", &rejected_only));
    }
}
