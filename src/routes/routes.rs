//! Defines routes for the drive's resource and directory operations.
//!
//! ## Structure
//! - **Resource endpoints** (`?path=` is user-relative, `/` is the root)
//!   - `GET    /api/resource`          - describe a file or directory
//!   - `POST   /api/resource`          - multipart upload into a directory
//!   - `DELETE /api/resource`          - delete a file or directory
//!   - `GET    /api/resource/download` - stream a file
//!   - `GET    /api/resource/move`     - move or rename (`?from=&to=`)
//!   - `GET    /api/resource/search`   - search by name (`?query=`)
//!
//! - **Directory endpoints**
//!   - `GET    /api/directory`         - list direct children
//!   - `POST   /api/directory`         - create an empty directory
//!
//! Every `/api` route requires the `X-User-Id` header.

use crate::{
    handlers::{
        directory_handlers::{create_directory, list_directory},
        health_handlers::{healthz, readyz},
        resource_handlers::{
            delete_resource, download_resource, get_resource, move_resource, search_resources,
            upload_resources,
        },
    },
    services::resource_service::ResourceService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};

/// Build and return the router for all drive routes.
///
/// The router carries shared state (`ResourceService`) to all handlers.
/// Upload bodies are streamed, so axum's default body limit is lifted.
pub fn routes() -> Router<ResourceService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Resource routes
        .route(
            "/api/resource",
            get(get_resource)
                .post(upload_resources)
                .delete(delete_resource),
        )
        .route("/api/resource/download", get(download_resource))
        .route("/api/resource/move", get(move_resource))
        .route("/api/resource/search", get(search_resources))
        // Directory routes
        .route(
            "/api/directory",
            get(list_directory).post(create_directory),
        )
        .layer(DefaultBodyLimit::disable())
}
