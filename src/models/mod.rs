//! Core data models for the per-user cloud drive.
//!
//! `bucket` and `object` map to the disk store's SQLite tables via
//! `sqlx::FromRow`; `resource` is the user-facing projection serialized as
//! JSON by the HTTP layer.

pub mod bucket;
pub mod object;
pub mod resource;
