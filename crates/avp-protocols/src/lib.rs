//! # AVP Protocols
//!
//! Domain types and collaborator interfaces shared by the validation
//! platform crates. Contains value objects and traits only; concrete
//! collaborators live in the crates that own them.
//!
//! ## Core Traits
//!
//! - [`ProjectManager`] - Project persistence and video assignment
//! - [`TestSessionRepository`] - Read access to test session rows

pub mod criteria;
pub mod error;
pub mod latency;
pub mod project;
pub mod session;

pub use criteria::{CriteriaOutcome, PassFailCriteria};
pub use error::ProtocolError;
pub use latency::{LatencyLevel, LatencyThreshold};
pub use project::{ProjectData, ProjectManager, VideoAssignment};
pub use session::{TestMetrics, TestSession, TestSessionRepository, TestSessionStatus};
