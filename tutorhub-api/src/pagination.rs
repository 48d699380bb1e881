//! Listing query parameters shared by paginated endpoints
//!
//! Every listing accepts `pageNumber`, `search`, `status`, `orderBy` and
//! `sort`. Column names are never taken from the request: `orderBy` is
//! matched against a per-endpoint whitelist.

use serde::Deserialize;
use tutorhub_common::api::Pagination;
use tutorhub_common::db::ApprovalStatus;

use crate::error::{ApiError, ApiResult};
use tutorhub_common::resources::keys;

/// Common listing parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page_number: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub order_by: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    /// Requested page, 1 when absent
    pub fn page(&self) -> i64 {
        self.page_number.unwrap_or(1)
    }

    /// Trimmed search text, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// `LIKE` pattern for the search text
    pub fn search_pattern(&self) -> Option<String> {
        self.search_term().map(|s| format!("%{}%", s))
    }

    /// Approval status filter; `ALL` or absent means no filter
    pub fn approval_status(&self) -> ApiResult<Option<ApprovalStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request_with(keys::INVALID_STATUS, &[s])),
        }
    }

    /// `ORDER BY` clause built from the whitelist
    ///
    /// `allowed` maps request names to SQL expressions; the first entry is the
    /// default. Ties are broken by `id_column`. Sort defaults to descending.
    pub fn order_clause(&self, allowed: &[(&str, &'static str)], id_column: &str) -> String {
        let column = self
            .order_by
            .as_deref()
            .and_then(|requested| {
                allowed
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(requested))
            })
            .or_else(|| allowed.first())
            .map(|(_, column)| *column)
            .unwrap_or("id");

        let direction = match self.sort.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("asc") => "ASC",
            _ => "DESC",
        };

        format!(
            "ORDER BY {} {}, {} {}",
            column, direction, id_column, direction
        )
    }
}

/// Page metadata for `total` rows at the configured page size
pub fn page_for(total: i64, query: &ListQuery, page_size: i64) -> Pagination {
    Pagination::calculate(total, query.page(), page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("price", "price_per_hour")];

    #[test]
    fn test_order_clause_whitelist() {
        let query = ListQuery {
            order_by: Some("price".to_string()),
            sort: Some("asc".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_clause(ORDER, "t.user_id"),
            "ORDER BY price_per_hour ASC, t.user_id ASC");
    }

    #[test]
    fn test_order_clause_rejects_unknown_column() {
        let query = ListQuery {
            order_by: Some("password_hash; DROP TABLE users".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.order_clause(ORDER, "id"),
            "ORDER BY created_date DESC, id DESC"
        );
    }

    #[test]
    fn test_status_filter() {
        let mut query = ListQuery::default();
        assert_eq!(query.approval_status().unwrap(), None);

        query.status = Some("all".to_string());
        assert_eq!(query.approval_status().unwrap(), None);

        query.status = Some("pending".to_string());
        assert_eq!(query.approval_status().unwrap(), Some(ApprovalStatus::Pending));

        query.status = Some("whatever".to_string());
        assert!(query.approval_status().is_err());
    }

    #[test]
    fn test_search_pattern_ignores_blank() {
        let mut query = ListQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_pattern(), None);

        query.search = Some(" anna ".to_string());
        assert_eq!(query.search_pattern().as_deref(), Some("%anna%"));
    }
}
