//! Per-user cloud drive over a flat, S3-style object store.
//!
//! Hierarchical paths (`docs/2024/report.pdf`, `docs/`) are mapped onto flat
//! keys under a per-user root segment, and directory operations are
//! translated into prefix operations on the store.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod paths;
pub mod routes;
pub mod services;
pub mod storage;
