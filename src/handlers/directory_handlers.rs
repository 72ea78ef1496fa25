//! HTTP handlers for directories: listing and creation.

use crate::{
    errors::AppError,
    handlers::{resource_handlers::PathQuery, user::CurrentUser},
    models::resource::ResourceDescriptor,
    services::resource_service::ResourceService,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

/// `GET /api/directory?path=`: list the direct children of a directory.
pub async fn list_directory(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
) -> Result<Json<Vec<ResourceDescriptor>>, AppError> {
    Ok(Json(service.list_directory(user, &q.path).await?))
}

/// `POST /api/directory?path=`: create an empty directory.
///
/// The parent must already exist; 409 when the directory is already there.
pub async fn create_directory(
    State(service): State<ResourceService>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PathQuery>,
) -> Result<(StatusCode, Json<ResourceDescriptor>), AppError> {
    let created = service.create_directory(user, &q.path).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
