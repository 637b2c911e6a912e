use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    aggregate::{PlayerStatDeltas, TeamRecordDeltas},
    repository::LeagueRepository,
    types::{PlayerResponse, TeamResponse},
};
use crate::shared::AppError;

/// Default cap for player search results
const DEFAULT_SEARCH_LIMIT: i64 = 200;

/// Service for league record orchestration: validates input, drives the
/// repository, and maps outcomes onto typed errors.
pub struct LeagueService {
    repository: Arc<dyn LeagueRepository>,
}

impl LeagueService {
    pub fn new(repository: Arc<dyn LeagueRepository>) -> Self {
        Self { repository }
    }

    /// Creates a team with all counters zeroed
    #[instrument(skip(self))]
    pub async fn add_team(&self, name: Option<String>) -> Result<TeamResponse, AppError> {
        let name = require_text(name, "Team name is required")?;

        let team = self.repository.create_team(&name).await?;
        info!(team_id = team.id, name = %team.name, "Team created");

        Ok(TeamResponse::from(team))
    }

    /// Creates a player on a team with all counters zeroed.
    ///
    /// The team reference is not verified; a dangling team_id is a
    /// documented gap of the current system.
    #[instrument(skip(self))]
    pub async fn add_player(
        &self,
        name: Option<String>,
        team_id: Option<i64>,
    ) -> Result<PlayerResponse, AppError> {
        let name = require_text(name, "Player name and team are required")?;
        let team_id =
            team_id.ok_or_else(|| AppError::Validation("Player name and team are required".to_string()))?;

        let player = self.repository.create_player(&name, team_id).await?;
        info!(player_id = player.id, team_id, name = %player.name, "Player created");

        Ok(PlayerResponse::from(player))
    }

    /// Applies one game's worth of stat deltas to a player
    #[instrument(skip(self, deltas))]
    pub async fn update_player_stats(
        &self,
        player_id: Option<i64>,
        deltas: &PlayerStatDeltas,
    ) -> Result<PlayerResponse, AppError> {
        let player_id =
            player_id.ok_or_else(|| AppError::Validation("player_id is required".to_string()))?;

        let updated = self
            .repository
            .update_player_stats(player_id, deltas)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        info!(
            player_id,
            hits = updated.hits,
            at_bats = updated.at_bats,
            games_played = updated.games_played,
            "Player stats updated"
        );
        Ok(PlayerResponse::from(updated))
    }

    /// Applies a win/loss record delta to a team
    #[instrument(skip(self, deltas))]
    pub async fn update_team_record(
        &self,
        team_id: Option<i64>,
        deltas: &TeamRecordDeltas,
    ) -> Result<TeamResponse, AppError> {
        let team_id =
            team_id.ok_or_else(|| AppError::Validation("team_id is required".to_string()))?;

        let updated = self
            .repository
            .update_team_record(team_id, deltas)
            .await?
            .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

        info!(
            team_id,
            wins = updated.wins,
            losses = updated.losses,
            "Team record updated"
        );
        Ok(TeamResponse::from(updated))
    }

    /// Removes a team and, best-effort, its roster.
    ///
    /// A failure of the player cascade is logged and swallowed; the team
    /// removal itself still goes through. Returns the deleted team id.
    #[instrument(skip(self))]
    pub async fn delete_team(&self, team_id: Option<i64>) -> Result<i64, AppError> {
        let team_id =
            team_id.ok_or_else(|| AppError::Validation("team_id is required".to_string()))?;

        self.repository
            .get_team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

        match self.repository.delete_players_by_team(team_id).await {
            Ok(removed) => debug!(team_id, removed, "Roster removed with team"),
            Err(err) => {
                warn!(team_id, error = %err, "Player cascade failed; removing team anyway")
            }
        }

        if !self.repository.delete_team(team_id).await? {
            // Lost a race with another deletion
            return Err(AppError::NotFound("Team not found".to_string()));
        }

        info!(team_id, "Team deleted");
        Ok(team_id)
    }

    /// Lists teams with win percentage and games played normalized for output
    #[instrument(skip(self))]
    pub async fn list_teams(&self) -> Result<Vec<TeamResponse>, AppError> {
        let teams = self.repository.list_teams().await?;
        Ok(teams.into_iter().map(TeamResponse::from).collect())
    }

    /// Lists players, optionally restricted to one team
    #[instrument(skip(self))]
    pub async fn list_players(
        &self,
        team_id: Option<i64>,
    ) -> Result<Vec<PlayerResponse>, AppError> {
        let players = self.repository.list_players(team_id).await?;
        Ok(players.into_iter().map(PlayerResponse::from).collect())
    }

    /// Case-insensitive substring search on player names, ordered by id
    /// ascending and capped at `limit` (default 200)
    #[instrument(skip(self))]
    pub async fn search_players(
        &self,
        query: &str,
        team_id: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<PlayerResponse>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let players = self.repository.search_players(query, team_id, limit).await?;
        Ok(players.into_iter().map(PlayerResponse::from).collect())
    }
}

fn require_text(value: Option<String>, message: &str) -> Result<String, AppError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::Validation(message.to_string())),
    }
}
