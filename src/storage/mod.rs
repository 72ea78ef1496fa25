//! Object storage: the store capability, its implementations, and the
//! gateway that gives flat keys directory semantics.

pub mod client;
pub mod disk;
pub mod gateway;
pub mod listing;
pub mod memory;
