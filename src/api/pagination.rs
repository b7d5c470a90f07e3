use serde::Deserialize;

use crate::api::errors::ApiError;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default)]
    pub(crate) page: Option<i64>,
    #[serde(default)]
    pub(crate) page_size: Option<i64>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) sort: Option<String>,
    #[serde(default)]
    pub(crate) order: Option<SortOrder>,
}

impl PageParams {
    pub(crate) fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub(crate) fn page_size(&self, max_page_size: i64) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max_page_size)
    }

    pub(crate) fn offset(&self, max_page_size: i64) -> i64 {
        (self.page() - 1) * self.page_size(max_page_size)
    }

    pub(crate) fn order(&self) -> SortOrder {
        self.order.unwrap_or(SortOrder::Desc)
    }

    /// Resolve the sort field against a per-resource whitelist; anything
    /// off-list is rejected rather than interpolated into SQL.
    pub(crate) fn sort_column(&self, allowed: &[&'static str]) -> Result<&'static str, ApiError> {
        let Some(requested) = self.sort.as_deref() else {
            return Ok("created_at");
        };

        allowed.iter().find(|candidate| **candidate == requested).copied().ok_or_else(|| {
            ApiError::Validation(format!("Unsupported sort field '{requested}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, page_size: Option<i64>) -> PageParams {
        PageParams { page, page_size, search: None, sort: None, order: None }
    }

    #[test]
    fn defaults_apply() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(100), 10);
        assert_eq!(p.offset(100), 0);
        assert_eq!(p.order(), SortOrder::Desc);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(params(None, Some(0)).page_size(100), 1);
        assert_eq!(params(None, Some(500)).page_size(100), 100);
        assert_eq!(params(Some(0), None).page(), 1);
        assert_eq!(params(Some(-5), None).page(), 1);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(params(Some(3), Some(20)).offset(100), 40);
    }

    #[test]
    fn sort_column_is_whitelisted() {
        let mut p = params(None, None);
        assert_eq!(p.sort_column(&["created_at", "action"]).unwrap(), "created_at");

        p.sort = Some("action".to_string());
        assert_eq!(p.sort_column(&["created_at", "action"]).unwrap(), "action");

        p.sort = Some("password_hash".to_string());
        assert!(p.sort_column(&["created_at", "action"]).is_err());
    }
}
