//! Database entities.

pub mod report;
pub mod report_history;
pub mod upvote;
pub mod user;

pub use report::Entity as Report;
pub use report_history::Entity as ReportHistory;
pub use upvote::Entity as Upvote;
pub use user::Entity as User;
