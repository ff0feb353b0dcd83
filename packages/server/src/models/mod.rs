pub mod access;
pub mod auth;
pub mod leaderboard;
pub mod round3;
pub mod session;
