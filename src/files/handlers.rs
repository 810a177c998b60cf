use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{FileListQuery, StatsQuery, StorageStats};
use super::repo::FileRecord;
use super::services::{self, UploadItem};
use crate::auth::extractors::AuthUser;
use crate::error::AppError;
use crate::response::{ApiResponse, PaginationQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(upload))
        .route("/files/upload/multiple", post(upload_multiple))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .route("/files/download/*key", get(download))
        .route("/files/view/*key", get(view))
        .route("/files/list", get(list))
        .route("/files/stats", get(stats))
        .route("/files/info/:id", get(info))
        .route("/files/:id", delete(remove))
}

async fn read_upload_items(mut multipart: Multipart, field_names: &[&str]) -> Result<Vec<UploadItem>, AppError> {
    let mut items = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::Validation(vec![format!("Failed to read multipart data: {e}")])
    })? {
        let name = field.name().unwrap_or("").to_string();
        if !field_names.contains(&name.as_str()) {
            continue;
        }
        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let body = field.bytes().await.map_err(|e| {
            AppError::Validation(vec![format!("Failed to read file data: {e}")])
        })?;
        items.push(UploadItem {
            original_name,
            content_type,
            body,
        });
    }
    Ok(items)
}

#[instrument(skip(state, multipart))]
async fn upload(
    State(state): State<AppState>,
    caller: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileRecord>>), AppError> {
    let mut items = read_upload_items(multipart, &["file"]).await?;
    let item = items
        .pop()
        .ok_or_else(|| AppError::Validation(vec!["file field is required".to_string()]))?;

    let record = services::upload(&state, caller.id, item).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

#[instrument(skip(state, multipart))]
async fn upload_multiple(
    State(state): State<AppState>,
    caller: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FileRecord>>>), AppError> {
    let items = read_upload_items(multipart, &["files", "files[]"]).await?;
    if items.is_empty() {
        return Err(AppError::Validation(vec![
            "files[] field is required".to_string(),
        ]));
    }

    let records = services::upload_many(&state, caller.id, items).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(records))))
}

async fn serve_object(
    state: &AppState,
    key: &str,
    disposition: &str,
) -> Result<Response, AppError> {
    let object = services::fetch(state, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No object stored at '{key}'")))?;

    let filename = key.rsplit('/').next().unwrap_or(key).to_string();
    let content_type = object
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{filename}\""),
            ),
        ],
        object.body,
    )
        .into_response())
}

#[instrument(skip(state))]
async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    serve_object(&state, &key, "attachment").await
}

#[instrument(skip(state))]
async fn view(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    serve_object(&state, &key, "inline").await
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<FileListQuery>,
) -> Result<Json<ApiResponse<Vec<FileRecord>>>, AppError> {
    let owner_id = if caller.is_admin() {
        query.user_id.unwrap_or(caller.id)
    } else {
        caller.id
    };
    let page = PaginationQuery {
        page: query.page,
        limit: query.limit,
    };
    let (records, meta) = services::list(&state, owner_id, &page).await?;
    Ok(Json(ApiResponse::page(records, meta)))
}

#[instrument(skip(state))]
async fn info(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileRecord>>, AppError> {
    let record = services::info(&state, id, &caller).await?;
    Ok(Json(ApiResponse::ok(record)))
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    services::delete(&state, id, &caller).await?;
    Ok(Json(ApiResponse::ok_with((), "File deleted")))
}

#[instrument(skip(state))]
async fn stats(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StorageStats>>, AppError> {
    let scope = if caller.is_admin() {
        query.user_id
    } else {
        Some(caller.id)
    };
    let stats = services::stats(&state, scope).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
