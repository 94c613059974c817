//! Derived views: filter → sort → paginate over a working set, never
//! mutating it. Stats are computed from the filtered rows so they track the
//! active filters.

pub mod filter;
pub mod paginate;
pub mod sort;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use filter::{Column, ColumnFilter};
use paginate::PageSize;
use sort::SortKey;
use stats::ViewStats;

/// Coarse status grouping used by the stats row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Approved,
    Rejected,
    Pending,
    Other,
}

/// A record that can be shown in a table view.
pub trait Tabular {
    /// Stringified fields the global search looks at.
    fn search_fields(&self) -> Vec<&str>;
    fn column_value(&self, column: Column) -> Option<&str>;
    fn display_name(&self) -> &str;
    fn sort_date(&self) -> Option<DateTime<Utc>>;
    fn status_label(&self) -> &str;
    fn job_id(&self) -> Option<&str>;
    fn status_bucket(&self) -> StatusBucket;
}

/// Query string accepted by the table endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub job_id: Option<String>,
    pub client: Option<String>,
    pub sort: Option<SortKey>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub search: String,
    pub columns: Vec<ColumnFilter>,
    pub sort: Option<SortKey>,
    pub page: usize,
    pub page_size: PageSize,
}

impl TryFrom<ViewParams> for ViewQuery {
    type Error = String;

    fn try_from(params: ViewParams) -> Result<Self, Self::Error> {
        let page_size = match params.page_size {
            Some(size) => PageSize::try_from(size)?,
            None => PageSize::default(),
        };
        let columns = [
            (Column::Status, params.status),
            (Column::Assignee, params.assignee),
            (Column::JobId, params.job_id),
            (Column::Client, params.client),
        ]
        .into_iter()
        .filter_map(|(column, raw)| raw.map(|raw| ColumnFilter::from_csv(column, &raw)))
        .filter(ColumnFilter::is_active)
        .collect();

        Ok(ViewQuery {
            search: filter::normalise_query(params.q.as_deref().unwrap_or_default()),
            columns,
            sort: params.sort,
            page: params.page.unwrap_or(0),
            page_size,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewPage<R> {
    pub rows: Vec<R>,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_records: usize,
    pub total_filtered: usize,
    pub stats: ViewStats,
}

pub fn derive_view<R: Tabular + Clone>(records: &[R], query: &ViewQuery) -> ViewPage<R> {
    let mut rows: Vec<&R> = records
        .iter()
        .filter(|r| filter::matches_all(*r, &query.search, &query.columns))
        .collect();

    if let Some(key) = query.sort {
        sort::sort_rows(&mut rows, key);
    }

    let stats = stats::compute(&rows);
    let (start, end) = paginate::page_bounds(rows.len(), query.page, query.page_size);

    ViewPage {
        rows: rows[start..end].iter().map(|r| (*r).clone()).collect(),
        page: query.page,
        page_size: query.page_size.get(),
        page_count: paginate::page_count(rows.len(), query.page_size),
        total_records: records.len(),
        total_filtered: rows.len(),
        stats,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, Utc};

    use super::filter::Column;
    use super::{StatusBucket, Tabular};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Row {
        pub id: String,
        pub name: String,
        pub status: String,
        pub assignee: Option<String>,
        pub job_id: Option<String>,
        pub skills: Vec<String>,
        pub created_at: Option<DateTime<Utc>>,
    }

    pub fn row(id: &str, name: &str, status: &str) -> Row {
        Row {
            id: id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            assignee: None,
            job_id: None,
            skills: Vec::new(),
            created_at: None,
        }
    }

    impl Tabular for Row {
        fn search_fields(&self) -> Vec<&str> {
            let mut fields = vec![self.name.as_str(), self.status.as_str()];
            fields.extend(self.skills.iter().map(String::as_str));
            fields
        }

        fn column_value(&self, column: Column) -> Option<&str> {
            match column {
                Column::Status => Some(self.status.as_str()),
                Column::Assignee => self.assignee.as_deref(),
                Column::JobId => self.job_id.as_deref(),
                Column::Client => None,
            }
        }

        fn display_name(&self) -> &str {
            &self.name
        }

        fn sort_date(&self) -> Option<DateTime<Utc>> {
            self.created_at
        }

        fn status_label(&self) -> &str {
            &self.status
        }

        fn job_id(&self) -> Option<&str> {
            self.job_id.as_deref()
        }

        fn status_bucket(&self) -> StatusBucket {
            match self.status.as_str() {
                "approved" => StatusBucket::Approved,
                "rejected" => StatusBucket::Rejected,
                "pending" => StatusBucket::Pending,
                _ => StatusBucket::Other,
            }
        }
    }
}
