//! Response envelope types
//!
//! Every response body, success or failure, is an [`ApiResponse`]:
//!
//! ```json
//! {
//!   "isSuccess": true,
//!   "statusCode": 200,
//!   "result": { ... },
//!   "errorMessages": [],
//!   "pagination": { "pageNumber": 1, "pageSize": 10, "total": 42 }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Uniform response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    pub status_code: u16,
    pub result: Option<T>,
    pub error_messages: Vec<String>,
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `result`
    pub fn success(status_code: u16, result: T) -> Self {
        Self {
            is_success: true,
            status_code,
            result: Some(result),
            error_messages: Vec::new(),
            pagination: None,
        }
    }

    /// Successful paginated response
    pub fn paged(result: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::success(200, result)
        }
    }

    /// Failed response with error messages
    pub fn failure(status_code: u16, messages: Vec<String>) -> Self {
        Self {
            is_success: false,
            status_code,
            result: None,
            error_messages: messages,
            pagination: None,
        }
    }
}

/// Page metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page_number: i64,
    pub page_size: i64,
    /// Total matching rows across all pages
    pub total: i64,
}

impl Pagination {
    /// Calculate page metadata from the total and the requested page
    ///
    /// The requested page is clamped to `[1, last_page]`.
    ///
    /// ```
    /// use tutorhub_common::api::Pagination;
    ///
    /// // 25 rows at 10 per page = 3 pages
    /// let p = Pagination::calculate(25, 2, 10);
    /// assert_eq!(p.page_number, 2);
    /// assert_eq!(p.offset(), 10);
    ///
    /// // Out-of-bounds page is clamped to the last page
    /// let p = Pagination::calculate(25, 99, 10);
    /// assert_eq!(p.page_number, 3);
    /// ```
    pub fn calculate(total: i64, requested_page: i64, page_size: i64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = (total + page_size - 1) / page_size;
        let page_number = requested_page.max(1).min(total_pages.max(1));
        Self {
            page_number,
            page_size,
            total,
        }
    }

    /// Row offset for `LIMIT ... OFFSET ...`
    pub fn offset(&self) -> i64 {
        (self.page_number - 1) * self.page_size
    }

    pub fn total_pages(&self) -> i64 {
        (self.total + self.page_size - 1) / self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = Pagination::calculate(250, 2, 100);
        assert_eq!(p.page_number, 2);
        assert_eq!(p.total_pages(), 3);
        assert_eq!(p.offset(), 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = Pagination::calculate(150, 0, 100);
        assert_eq!(p.page_number, 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Pagination::calculate(0, 5, 10);
        assert_eq!(p.page_number, 1);
        assert_eq!(p.total_pages(), 0);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = Pagination::calculate(20, 2, 10);
        assert_eq!(p.page_number, 2);
        assert_eq!(p.total_pages(), 2);
        assert_eq!(p.offset(), 10);
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let body = ApiResponse::paged(vec![1, 2], Pagination::calculate(2, 1, 10));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["isSuccess"], true);
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["pagination"]["pageSize"], 10);
        assert!(json["errorMessages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_failure_has_no_result() {
        let body: ApiResponse<()> = ApiResponse::failure(404, vec!["missing".to_string()]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["isSuccess"], false);
        assert!(json["result"].is_null());
        assert_eq!(json["errorMessages"][0], "missing");
    }
}
