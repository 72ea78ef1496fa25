//! Resource paths: grammar, validation and the per-user key namespace.

pub mod grammar;
pub mod namespace;
pub mod validator;
