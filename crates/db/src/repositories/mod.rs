//! Database repositories.

pub mod report;
pub mod report_history;
pub mod stats;
pub mod upvote;
pub mod user;

pub use report::{ReportFilters, ReportRepository};
pub use report_history::ReportHistoryRepository;
pub use stats::StatsRepository;
pub use upvote::UpvoteRepository;
pub use user::UserRepository;
