use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) success: bool,
    pub(crate) data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub(crate) fn new(data: T) -> Self {
        Self { success: true, data, message: None }
    }

    pub(crate) fn with_message(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data, message: Some(message.into()) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Pagination {
    pub(crate) page: i64,
    pub(crate) page_size: i64,
    pub(crate) total: i64,
    pub(crate) total_pages: i64,
}

impl Pagination {
    pub(crate) fn new(page: i64, page_size: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + page_size - 1) / page_size };
        Self { page, page_size, total, total_pages }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) success: bool,
    pub(crate) data: Vec<T>,
    pub(crate) pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { success: true, data, pagination }
    }
}
