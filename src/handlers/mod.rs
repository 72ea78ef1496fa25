pub mod directory_handlers;
pub mod health_handlers;
pub mod resource_handlers;
pub mod user;
