use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for the teams table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TeamModel {
    pub id: i64,
    pub name: String,
    pub wins: i64,
    pub losses: i64,
    /// Legacy rows may hold a 0-1 fraction here; new writes use the 0-100 scale.
    /// Read paths go through `aggregate::normalize_win_pct`.
    pub win_pct: f64,
    pub games_behind: f64,
    /// NULL on rows written before the column existed; resolved to
    /// wins + losses at read time.
    pub games_played: Option<i64>,
}

impl TeamModel {
    /// Creates a fresh team with all counters zeroed
    pub fn new(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            wins: 0,
            losses: 0,
            win_pct: 0.0,
            games_behind: 0.0,
            games_played: Some(0),
        }
    }
}

/// Database model for the players table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PlayerModel {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub singles: i64,
    pub doubles: i64,
    pub triples: i64,
    /// "Dimes" on the wire
    pub walks: i64,
    pub home_runs: i64,
    pub at_bats: i64,
    pub hits: i64,
    pub batting_average: f64,
    pub games_played: i64,
}

impl PlayerModel {
    /// Creates a fresh player with all counters zeroed
    pub fn new(id: i64, name: String, team_id: i64) -> Self {
        Self {
            id,
            name,
            team_id,
            singles: 0,
            doubles: 0,
            triples: 0,
            walks: 0,
            home_runs: 0,
            at_bats: 0,
            hits: 0,
            batting_average: 0.0,
            games_played: 0,
        }
    }
}

/// Database model for the results table.
///
/// One externally-scored game between two teams. Declared for the schema;
/// no in-scope endpoint mutates it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct GameResultModel {
    pub id: i64,
    pub date: NaiveDate,
    pub game_number: i64,
    pub team1_id: i64,
    pub team2_id: i64,
    pub team1_score: i64,
    pub team2_score: i64,
}
