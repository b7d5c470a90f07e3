use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::envelope::{PaginatedResponse, Pagination};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::api::pagination::PageParams;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::audit::{AuditListQuery, AuditLogResponse};
use crate::schemas::parse_datetime_flexible;

const SORTABLE: &[&str] = &["created_at", "action", "resource"];

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

async fn list_audit_logs(
    Query(query): Query<AuditListQuery>,
    Query(page_params): Query<PageParams>,
    State(state): State<AppState>,
    CurrentStaff(_current): CurrentStaff,
) -> Result<Json<PaginatedResponse<AuditLogResponse>>, ApiError> {
    let from = match query.from.as_deref() {
        Some(raw) => Some(
            parse_datetime_flexible(raw)
                .ok_or_else(|| ApiError::Validation(format!("invalid 'from' datetime: {raw}")))?,
        ),
        None => None,
    };
    let to = match query.to.as_deref() {
        Some(raw) => Some(
            parse_datetime_flexible(raw)
                .ok_or_else(|| ApiError::Validation(format!("invalid 'to' datetime: {raw}")))?,
        ),
        None => None,
    };

    let filter = repositories::audit::AuditFilter {
        user_id: query.user_id.as_deref(),
        resource: query.resource.as_deref(),
        resource_id: query.resource_id.as_deref(),
        action: query.action.as_deref(),
        search: page_params.search.as_deref(),
        from,
        to,
    };

    let sort = page_params.sort_column(SORTABLE)?;
    let order = page_params.order().as_sql();
    let max_page_size = state.settings().server().max_page_size;
    let page = page_params.page();
    let page_size = page_params.page_size(max_page_size);
    let offset = page_params.offset(max_page_size);

    let total = repositories::audit::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::db(e, "Failed to count audit logs"))?;

    let logs = repositories::audit::list(state.db(), &filter, sort, order, offset, page_size)
        .await
        .map_err(|e| ApiError::db(e, "Failed to list audit logs"))?;

    let data = logs.into_iter().map(AuditLogResponse::from_db).collect();
    Ok(Json(PaginatedResponse::new(data, Pagination::new(page, page_size, total))))
}

#[cfg(test)]
mod tests;
