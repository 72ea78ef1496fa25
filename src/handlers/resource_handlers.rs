//! HTTP handlers for single resources: info, delete, download, move, search
//! and upload. Bodies are streamed in both directions; every storage concern
//! is delegated to `ResourceService`.

use crate::{
    errors::AppError,
    handlers::user::CurrentUser,
    models::resource::ResourceDescriptor,
    services::resource_service::ResourceService,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::io;
use tokio_util::io::ReaderStream;

// Missing parameters deserialize as "" so the path validator reports them
// as blank instead of the extractor rejecting the request.

/// `?path=` parameter shared by resource and directory endpoints.
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveQuery {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// `GET /api/resource?path=`: describe a file or directory.
pub async fn get_resource(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
) -> Result<Json<ResourceDescriptor>, AppError> {
    Ok(Json(service.get_resource(user, &q.path).await?))
}

/// `DELETE /api/resource?path=`: delete a file or a whole directory.
pub async fn delete_resource(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
) -> Result<StatusCode, AppError> {
    service.delete_resource(user, &q.path).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/resource/download?path=`: stream a file's content.
pub async fn download_resource(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
) -> Result<Response, AppError> {
    let download = service.download_file(user, &q.path).await?;
    let body = Body::from_stream(ReaderStream::new(download.reader));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_download_headers(response.headers_mut(), &download.resource);
    Ok(response)
}

/// `GET /api/resource/move?from=&to=`: move or rename a resource.
pub async fn move_resource(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MoveQuery>,
) -> Result<Json<ResourceDescriptor>, AppError> {
    Ok(Json(service.move_resource(user, &q.from, &q.to).await?))
}

/// `GET /api/resource/search?query=`: find resources by name.
pub async fn search_resources(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<ResourceDescriptor>>, AppError> {
    Ok(Json(service.search_resources(user, &q.query).await?))
}

/// `POST /api/resource?path=`: upload multipart files into a directory.
///
/// Each part's filename is taken as the file path relative to `path`, so
/// folder uploads recreate their sub-directories. Parts without a filename
/// are skipped.
pub async fn upload_resources(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut uploaded = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let stream = field.map(|chunk| chunk.map_err(io::Error::other)).boxed();
        let resource = service.upload_file(user, &q.path, &filename, stream).await?;
        uploaded.push(resource);
    }

    if uploaded.is_empty() {
        return Err(AppError::bad_request("upload contained no files"));
    }
    Ok((StatusCode::CREATED, Json(uploaded)))
}

fn set_download_headers(headers: &mut HeaderMap, resource: &ResourceDescriptor) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    if let Some(size) = resource.size {
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&size.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("0")),
        );
    }

    let disposition = format!(
        "attachment; filename=\"{}\"",
        resource.name.replace(['"', '\\'], "_")
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}
