pub mod admin;
pub mod cache;
pub mod category;
pub mod complaint;
pub mod complaint_state;
pub mod duplicate;
pub mod leaderboard;
pub mod points;
pub mod profile;
pub mod quota;
pub mod retry;

pub use complaint::{ComplaintService, DuplicatePolicy};
pub use complaint_state::{Actor, ComplaintDraft, ComplaintStateMachine};
pub use leaderboard::LeaderboardService;
pub use points::PointsLedgerService;
pub use profile::ProfileService;
pub use quota::QuotaTracker;
