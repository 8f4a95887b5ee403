//! Business logic services.

pub mod query;
pub mod report;
pub mod user;

use serde::Serialize;

pub use query::{DashboardStats, NearbyReport, QueryService, UserStats};
pub use report::{CreateReportInput, ReportService, ToggleOutcome, TransitionInput};
pub use user::{LoginInput, RegisterInput, UserService};

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows, across all pages.
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}
