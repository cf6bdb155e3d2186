pub mod audit;
pub mod bulk;
pub mod notifications;
pub mod products;
pub mod reports;
pub mod stock;
pub mod users;

use serde::Deserialize;
use utoipa::ToSchema;

/// Page number (1-based) and size, already clamped by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Pages past the end are clamped so the row offset always fits a SQL `BIGINT`.
    pub fn new(page: Option<u64>, limit: u64) -> Self {
        let limit = limit.max(1);
        let last_page = i64::MAX as u64 / limit;
        Self {
            page: page.unwrap_or(1).clamp(1, last_page),
            limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl From<SortOrder> for sea_orm::Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => sea_orm::Order::Asc,
            SortOrder::Desc => sea_orm::Order::Desc,
        }
    }
}

/// Trim an optional string, mapping blank input to `None`
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_never_goes_below_one() {
        let page = PageRequest::new(Some(0), 0);
        assert_eq!(page, PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), 25).page, 3);
    }

    #[test]
    fn huge_page_numbers_keep_the_offset_in_range() {
        for limit in [1, 2, 20, 100] {
            let page = PageRequest::new(Some(u64::MAX), limit);
            let offset = (page.page - 1).checked_mul(page.limit).unwrap();
            assert!(offset <= i64::MAX as u64, "limit {limit}");
        }
    }

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Tools ".into())), Some("Tools".into()));
        assert_eq!(non_blank(None), None);
    }
}
