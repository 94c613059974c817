use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::view::Tabular;

/// The sort menu. The last selection wins; there is no secondary key beyond
/// the stable order of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    NameAsc,
    NameDesc,
    DateNewest,
    DateOldest,
    StatusAsc,
    JobIdAsc,
}

fn by_name<R: Tabular>(a: &R, b: &R) -> Ordering {
    a.display_name()
        .to_lowercase()
        .cmp(&b.display_name().to_lowercase())
}

/// Undated records sort last in both directions.
fn by_date<R: Tabular>(a: &R, b: &R, newest_first: bool) -> Ordering {
    match (a.sort_date(), b.sort_date()) {
        (Some(x), Some(y)) if newest_first => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_rows<R: Tabular>(rows: &mut [&R], key: SortKey) {
    match key {
        SortKey::NameAsc => rows.sort_by(|a, b| by_name(*a, *b)),
        SortKey::NameDesc => rows.sort_by(|a, b| by_name(*b, *a)),
        SortKey::DateNewest => rows.sort_by(|a, b| by_date(*a, *b, true)),
        SortKey::DateOldest => rows.sort_by(|a, b| by_date(*a, *b, false)),
        SortKey::StatusAsc => rows.sort_by(|a, b| a.status_label().cmp(b.status_label())),
        SortKey::JobIdAsc => rows.sort_by(|a, b| {
            a.job_id()
                .unwrap_or_default()
                .cmp(b.job_id().unwrap_or_default())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::testing::{row, Row};
    use chrono::{TimeZone, Utc};

    fn names(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_name_sorts_case_insensitively() {
        let data = [row("1", "bob", "x"), row("2", "Alice", "x"), row("3", "carl", "x")];
        let mut rows: Vec<&Row> = data.iter().collect();
        sort_rows(&mut rows, SortKey::NameAsc);
        assert_eq!(names(&rows), ["Alice", "bob", "carl"]);
        sort_rows(&mut rows, SortKey::NameDesc);
        assert_eq!(names(&rows), ["carl", "bob", "Alice"]);
    }

    #[test]
    fn test_date_sorts_put_undated_last() {
        let mut a = row("1", "a", "x");
        a.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut b = row("2", "b", "x");
        b.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let c = row("3", "c", "x");
        let data = [a, b, c];
        let mut rows: Vec<&Row> = data.iter().collect();

        sort_rows(&mut rows, SortKey::DateNewest);
        assert_eq!(names(&rows), ["b", "a", "c"]);
        sort_rows(&mut rows, SortKey::DateOldest);
        assert_eq!(names(&rows), ["a", "b", "c"]);
    }

    #[test]
    fn test_status_sort_is_stable() {
        let data = [
            row("1", "first", "pending"),
            row("2", "second", "approved"),
            row("3", "third", "pending"),
        ];
        let mut rows: Vec<&Row> = data.iter().collect();
        sort_rows(&mut rows, SortKey::StatusAsc);
        assert_eq!(names(&rows), ["second", "first", "third"]);
    }
}
