use serde::{Deserialize, Serialize};

use super::aggregate::{self, PlayerStatDeltas, TeamRecordDeltas};
use super::models::{PlayerModel, TeamModel};

/// Request body for creating a team
#[derive(Debug, Clone, Deserialize)]
pub struct AddTeamRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for creating a player
#[derive(Debug, Clone, Deserialize)]
pub struct AddPlayerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub team_id: Option<i64>,
}

/// Request body for the per-game player stat update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePlayerRequest {
    #[serde(default)]
    pub player_id: Option<i64>,
    #[serde(flatten)]
    pub deltas: PlayerStatDeltas,
}

/// Request body for the team record update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTeamRecordRequest {
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(flatten)]
    pub deltas: TeamRecordDeltas,
}

/// Request body for team deletion
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteTeamRequest {
    #[serde(default)]
    pub team_id: Option<i64>,
}

/// Query parameters for the player listing/search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayersQuery {
    pub team_id: Option<i64>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Team as serialized for API responses, with the win percentage
/// normalized onto the 0-100 scale and games played resolved for
/// legacy rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResponse {
    pub id: i64,
    pub name: String,
    pub wins: i64,
    pub losses: i64,
    pub win_pct: f64,
    pub games_behind: f64,
    pub games_played: i64,
}

impl From<TeamModel> for TeamResponse {
    fn from(team: TeamModel) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            wins: team.wins,
            losses: team.losses,
            win_pct: aggregate::normalize_win_pct(team.win_pct),
            games_behind: team.games_behind,
            games_played: aggregate::resolve_games_played(&team),
        }
    }
}

/// Player as serialized for API responses; field names follow the
/// original league JSON ("Dimes" are walks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    #[serde(rename = "Singles")]
    pub singles: i64,
    #[serde(rename = "Doubles")]
    pub doubles: i64,
    #[serde(rename = "Triples")]
    pub triples: i64,
    #[serde(rename = "Dimes")]
    pub walks: i64,
    #[serde(rename = "HRs")]
    pub home_runs: i64,
    pub hits: i64,
    #[serde(rename = "Avg")]
    pub batting_average: f64,
    #[serde(rename = "GP")]
    pub games_played: i64,
    #[serde(rename = "AtBats")]
    pub at_bats: i64,
}

impl From<PlayerModel> for PlayerResponse {
    fn from(player: PlayerModel) -> Self {
        Self {
            id: player.id,
            name: player.name,
            team_id: player.team_id,
            singles: player.singles,
            doubles: player.doubles,
            triples: player.triples,
            walks: player.walks,
            home_runs: player.home_runs,
            hits: player.hits,
            batting_average: player.batting_average,
            games_played: player.games_played,
            at_bats: player.at_bats,
        }
    }
}

/// Response body for the db_status connectivity probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStatusResponse {
    pub status: String,
    pub backend: String,
    pub teams: i64,
    pub players: i64,
}
