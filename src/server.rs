//! HTTP routes: translate requests into [`FileManager`] calls and render
//! JSON responses.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::error::{Error, ErrorKind, Result};
use crate::manager::{FileManager, ListQuery};
use crate::storage::constants::DEFAULT_CONTENT_TYPE;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Error response: a status code and a JSON body with an `error` message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message.into() }),
        }
    }

    /// Map a manager error onto its status code. Backend failures report
    /// `failure` as the message, with the cause in `detail`.
    fn from_error(err: Error, failure: &str) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let partial_move = err.is_partial_move();
            if partial_move {
                log::error!("{failure}: {err} (object left under both keys)");
            } else {
                log::error!("{failure}: {err}");
            }
            json!({
                "error": failure,
                "detail": err.to_string(),
                "partial_move": partial_move,
            })
        } else {
            log::debug!("{failure}: {err}");
            json!({ "error": err.to_string() })
        };
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct RenamePayload {
    #[serde(default)]
    old_name: Option<String>,
    #[serde(default)]
    new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFilePayload {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// All routes, open to cross-origin callers.
pub fn router(manager: FileManager) -> Router {
    Router::new()
        .route("/", get(|| async { "filedeck ok" }))
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/delete/{name}", delete(soft_delete))
        .route("/restore/{name}", put(restore))
        .route("/trash", get(list_trash))
        .route("/delete-permanent/{name}", delete(delete_permanently))
        .route("/rename", put(rename))
        .route("/download/{name}", get(download))
        .route("/create-file", post(create_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(manager)
}

pub async fn serve(listener: TcpListener, manager: FileManager) -> Result<()> {
    axum::serve(listener, router(manager)).await?;
    Ok(())
}

async fn upload(
    State(manager): State<FileManager>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;
        let Some(field) = field else {
            return Err(ApiError::bad_request("No file uploaded"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;

        manager
            .upload(&name, data.to_vec(), content_type.as_deref())
            .await
            .map_err(|e| ApiError::from_error(e, "Failed to upload file"))?;

        return Ok((
            StatusCode::CREATED,
            Json(json!({ "message": format!("{name} uploaded successfully") })),
        ));
    }
}

async fn list_files(
    State(manager): State<FileManager>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let files = manager
        .list_files(&query)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to list files"))?;
    Ok(Json(files))
}

async fn list_trash(
    State(manager): State<FileManager>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let files = manager
        .list_trash(&query)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to list trash"))?;
    Ok(Json(files))
}

async fn soft_delete(
    State(manager): State<FileManager>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    manager
        .soft_delete(&name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to move file to trash"))?;
    Ok(Json(json!({
        "message": format!("{name} moved to trash."),
        "status": "deleted",
    })))
}

async fn restore(
    State(manager): State<FileManager>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    manager
        .restore(&name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to restore file"))?;
    Ok(Json(json!({
        "message": format!("{name} restored successfully."),
        "status": "restored",
    })))
}

async fn delete_permanently(
    State(manager): State<FileManager>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    manager
        .delete_permanently(&name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to permanently delete file"))?;
    Ok(Json(json!({ "message": format!("{name} permanently deleted.") })))
}

async fn rename(
    State(manager): State<FileManager>,
    Json(payload): Json<RenamePayload>,
) -> ApiResult<impl IntoResponse> {
    let (Some(old_name), Some(new_name)) = (payload.old_name, payload.new_name) else {
        return Err(ApiError::bad_request(
            "Both old and new file names are required",
        ));
    };
    manager
        .rename(&old_name, &new_name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to rename file"))?;
    Ok(Json(json!({
        "message": format!("File renamed from {old_name} to {new_name}"),
    })))
}

async fn download(
    State(manager): State<FileManager>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let file = manager
        .download(&name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to download file"))?;
    let disposition = format!("attachment; filename=\"{}\"", disposition_name(&file.name));
    Ok((
        [
            (header::CONTENT_TYPE, DEFAULT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    ))
}

async fn create_file(
    State(manager): State<FileManager>,
    Json(payload): Json<CreateFilePayload>,
) -> ApiResult<impl IntoResponse> {
    let Some(filename) = payload
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
    else {
        return Err(ApiError::bad_request("Filename is required"));
    };
    manager
        .create_file(&filename, payload.content.as_deref().unwrap_or_default())
        .await
        .map_err(|e| ApiError::from_error(e, "Error creating file"))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "File created successfully!" })),
    ))
}

/// Quote-safe filename for a Content-Disposition header.
fn disposition_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
