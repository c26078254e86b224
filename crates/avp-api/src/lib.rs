//! # AVP API
//!
//! Project-level facade over the workflow and test execution crates.
//!
//! [`ProjectWorkflowManager`] creates projects through a
//! [`ProjectManager`](avp_protocols::ProjectManager), runs their validation
//! workflow with pipeline handlers bound to real collaborators, and keeps
//! per-project state in a [`CoordinationStore`]. [`WorkflowApi`] exposes the
//! manager as JSON-in/JSON-out operations, and the `http` module serves those
//! over axum.

pub mod coordination;
pub mod error;
pub mod handlers;
pub mod http;
pub mod integration;
pub mod manager;
pub mod project;
pub mod server;
pub mod services;
pub mod state;

pub use coordination::{CoordinationStore, MemoryCoordinationStore};
pub use error::ApiError;
pub use integration::WorkflowApi;
pub use manager::{ProjectWorkflowManager, ProjectWorkflowResult};
pub use project::MemoryProjectManager;
pub use server::ApiServer;
pub use services::PipelineServices;
pub use state::AppState;
