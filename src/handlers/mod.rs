pub mod admin;
pub mod category;
pub mod complaint;
pub mod leaderboard;
pub mod user;
