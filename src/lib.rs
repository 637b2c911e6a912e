// Library crate for the dartball league backend
// This file exposes the public API for integration tests

pub mod league;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use league::models::{PlayerModel, TeamModel};
pub use league::repository::{InMemoryLeagueRepository, LeagueRepository};
pub use league::{router, LeagueService};
pub use shared::{AppError, AppState};
