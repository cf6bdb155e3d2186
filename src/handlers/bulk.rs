use crate::{
    auth::AuthUser,
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    services::bulk::{BulkService, ImportSummary},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;
use utoipa::ToSchema;

const UPLOAD_FIELD: &str = "file";

/// Multipart body of `POST /api/bulk/import`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImportUpload {
    /// CSV file with a header row; see `/api/bulk/template`
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge("uploaded file exceeds the size limit".to_string())
    } else {
        ServiceError::BadRequest(err.body_text())
    }
}

fn csv_attachment(body: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Upsert products by SKU from an uploaded CSV file
#[utoipa::path(
    post,
    path = "/api/bulk/import",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import finished; failed rows are listed", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Missing file or unreadable CSV", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Bulk"
)]
pub async fn import_products(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ImportSummary> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }

    let data = upload.ok_or_else(|| {
        ServiceError::BadRequest(format!("multipart field '{UPLOAD_FIELD}' is required"))
    })?;
    if data.len() > state.config.max_upload_bytes {
        warn!(bytes = data.len(), "Rejected oversized CSV upload");
        return Err(ServiceError::PayloadTooLarge(format!(
            "uploaded file exceeds {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let summary = state
        .services
        .bulk
        .import_csv(&data, user.user_id)
        .await?;
    let message = format!(
        "{} created, {} updated, {} failed",
        summary.created, summary.updated, summary.failed
    );
    Ok(Json(ApiResponse::success(summary).with_message(message)))
}

#[utoipa::path(
    get,
    path = "/api/bulk/export",
    responses(
        (status = 200, description = "Every product as CSV", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "Bulk"
)]
pub async fn export_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let csv = state.services.bulk.export_csv().await?;
    let filename = format!("products-{}.csv", chrono::Utc::now().format("%Y%m%d"));
    Ok(csv_attachment(csv, &filename))
}

#[utoipa::path(
    get,
    path = "/api/bulk/template",
    responses(
        (status = 200, description = "Import template", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "Bulk"
)]
pub async fn import_template() -> Result<Response, ServiceError> {
    let csv = BulkService::template()?;
    Ok(csv_attachment(csv, "products-template.csv"))
}
