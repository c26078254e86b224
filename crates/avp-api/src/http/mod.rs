//! HTTP surface over the workflow adapter.

pub mod handlers;
pub mod monitoring;
pub mod routes;

pub use routes::create_router;
