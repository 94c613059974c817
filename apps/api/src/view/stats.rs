use serde::Serialize;

use crate::view::{StatusBucket, Tabular};

/// Counts over the filtered rows. Buckets are not exhaustive: records with a
/// status outside the three buckets only count towards `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

pub fn compute<R: Tabular>(rows: &[&R]) -> ViewStats {
    rows.iter().fold(
        ViewStats {
            total: rows.len(),
            ..ViewStats::default()
        },
        |mut stats, row| {
            match row.status_bucket() {
                StatusBucket::Approved => stats.approved += 1,
                StatusBucket::Rejected => stats.rejected += 1,
                StatusBucket::Pending => stats.pending += 1,
                StatusBucket::Other => {}
            }
            stats
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::testing::{row, Row};

    #[test]
    fn test_buckets_never_exceed_total() {
        let data = [
            row("1", "a", "approved"),
            row("2", "b", "rejected"),
            row("3", "c", "pending"),
            row("4", "d", "withdrawn"),
        ];
        let rows: Vec<&Row> = data.iter().collect();
        let stats = compute(&rows);
        assert_eq!(stats.total, 4);
        assert_eq!((stats.approved, stats.rejected, stats.pending), (1, 1, 1));
        assert!(stats.approved + stats.rejected + stats.pending <= stats.total);
    }
}
