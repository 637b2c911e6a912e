use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::aggregate::{self, PlayerStatDeltas, TeamRecordDeltas};
use super::models::{PlayerModel, TeamModel};
use crate::shared::AppError;

/// Trait for league storage operations.
///
/// The two `update_*` methods own the read-modify-write step: an
/// implementation must serialize concurrent updates to the same row so
/// that no delta is silently lost.
#[async_trait]
pub trait LeagueRepository: Send + Sync {
    async fn create_team(&self, name: &str) -> Result<TeamModel, AppError>;
    async fn get_team(&self, id: i64) -> Result<Option<TeamModel>, AppError>;
    async fn list_teams(&self) -> Result<Vec<TeamModel>, AppError>;
    async fn delete_team(&self, id: i64) -> Result<bool, AppError>;

    async fn create_player(&self, name: &str, team_id: i64) -> Result<PlayerModel, AppError>;
    async fn get_player(&self, id: i64) -> Result<Option<PlayerModel>, AppError>;
    async fn list_players(&self, team_id: Option<i64>) -> Result<Vec<PlayerModel>, AppError>;
    async fn search_players(
        &self,
        query: &str,
        team_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PlayerModel>, AppError>;
    async fn delete_players_by_team(&self, team_id: i64) -> Result<u64, AppError>;

    /// Atomically folds the deltas into the stored player aggregate.
    /// Returns `None` when the player does not exist.
    async fn update_player_stats(
        &self,
        id: i64,
        deltas: &PlayerStatDeltas,
    ) -> Result<Option<PlayerModel>, AppError>;

    /// Atomically folds the deltas into the stored team record.
    /// Returns `None` when the team does not exist.
    async fn update_team_record(
        &self,
        id: i64,
        deltas: &TeamRecordDeltas,
    ) -> Result<Option<TeamModel>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
    async fn count_teams(&self) -> Result<i64, AppError>;
    async fn count_players(&self) -> Result<i64, AppError>;
    fn backend_name(&self) -> &'static str;
}

#[derive(Default)]
struct InMemoryState {
    teams: HashMap<i64, TeamModel>,
    players: HashMap<i64, PlayerModel>,
    next_team_id: i64,
    next_player_id: i64,
}

/// In-memory implementation of LeagueRepository for development and testing
///
/// This provides a realistic implementation that can be used without a
/// real database connection. Data is stored in memory and lost when the
/// process exits. A single mutex around the whole state serializes every
/// read-modify-write, which is the atomicity the trait requires.
pub struct InMemoryLeagueRepository {
    state: Mutex<InMemoryState>,
}

impl Default for InMemoryLeagueRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLeagueRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
        }
    }
}

#[async_trait]
impl LeagueRepository for InMemoryLeagueRepository {
    #[instrument(skip(self))]
    async fn create_team(&self, name: &str) -> Result<TeamModel, AppError> {
        let mut state = self.state.lock().unwrap();
        state.next_team_id += 1;
        let team = TeamModel::new(state.next_team_id, name.to_string());
        state.teams.insert(team.id, team.clone());

        debug!(team_id = team.id, "Team created in memory");
        Ok(team)
    }

    #[instrument(skip(self))]
    async fn get_team(&self, id: i64) -> Result<Option<TeamModel>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.teams.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_teams(&self) -> Result<Vec<TeamModel>, AppError> {
        let state = self.state.lock().unwrap();
        let mut teams: Vec<TeamModel> = state.teams.values().cloned().collect();
        teams.sort_by_key(|t| t.id);
        Ok(teams)
    }

    #[instrument(skip(self))]
    async fn delete_team(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let removed = state.teams.remove(&id).is_some();
        if !removed {
            warn!(team_id = id, "Team not found for deletion in memory");
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn create_player(&self, name: &str, team_id: i64) -> Result<PlayerModel, AppError> {
        let mut state = self.state.lock().unwrap();
        state.next_player_id += 1;
        let player = PlayerModel::new(state.next_player_id, name.to_string(), team_id);
        state.players.insert(player.id, player.clone());

        debug!(player_id = player.id, team_id, "Player created in memory");
        Ok(player)
    }

    #[instrument(skip(self))]
    async fn get_player(&self, id: i64) -> Result<Option<PlayerModel>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.players.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_players(&self, team_id: Option<i64>) -> Result<Vec<PlayerModel>, AppError> {
        let state = self.state.lock().unwrap();
        let mut players: Vec<PlayerModel> = state
            .players
            .values()
            .filter(|p| team_id.map(|id| p.team_id == id).unwrap_or(true))
            .cloned()
            .collect();
        players.sort_by_key(|p| p.id);
        Ok(players)
    }

    #[instrument(skip(self))]
    async fn search_players(
        &self,
        query: &str,
        team_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let needle = query.to_lowercase();
        let state = self.state.lock().unwrap();
        let mut players: Vec<PlayerModel> = state
            .players
            .values()
            .filter(|p| team_id.map(|id| p.team_id == id).unwrap_or(true))
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        players.sort_by_key(|p| p.id);
        players.truncate(limit.max(0) as usize);
        Ok(players)
    }

    #[instrument(skip(self))]
    async fn delete_players_by_team(&self, team_id: i64) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        let before = state.players.len();
        state.players.retain(|_, p| p.team_id != team_id);
        let removed = (before - state.players.len()) as u64;

        debug!(team_id, removed, "Players removed with their team");
        Ok(removed)
    }

    #[instrument(skip(self, deltas))]
    async fn update_player_stats(
        &self,
        id: i64,
        deltas: &PlayerStatDeltas,
    ) -> Result<Option<PlayerModel>, AppError> {
        // The lock is held across read, compute and write
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.players.get(&id) else {
            return Ok(None);
        };
        let next = aggregate::apply_player_deltas(current, deltas);
        state.players.insert(id, next.clone());

        debug!(player_id = id, games_played = next.games_played, "Player stats updated in memory");
        Ok(Some(next))
    }

    #[instrument(skip(self, deltas))]
    async fn update_team_record(
        &self,
        id: i64,
        deltas: &TeamRecordDeltas,
    ) -> Result<Option<TeamModel>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.teams.get(&id) else {
            return Ok(None);
        };
        let next = aggregate::apply_team_deltas(current, deltas);
        state.teams.insert(id, next.clone());

        debug!(team_id = id, wins = next.wins, losses = next.losses, "Team record updated in memory");
        Ok(Some(next))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn count_teams(&self) -> Result<i64, AppError> {
        Ok(self.state.lock().unwrap().teams.len() as i64)
    }

    async fn count_players(&self) -> Result<i64, AppError> {
        Ok(self.state.lock().unwrap().players.len() as i64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

const TEAM_COLUMNS: &str = "id, name, wins, losses, win_pct, games_behind, games_played";
const PLAYER_COLUMNS: &str = "id, name, team_id, singles, doubles, triples, walks, home_runs, \
                              at_bats, hits, batting_average, games_played";

/// PostgreSQL implementation of the league repository
pub struct PostgresLeagueRepository {
    pool: PgPool,
}

impl PostgresLeagueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(query: &str) -> String {
    // % and _ are wildcards inside ILIKE patterns
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl LeagueRepository for PostgresLeagueRepository {
    #[instrument(skip(self))]
    async fn create_team(&self, name: &str) -> Result<TeamModel, AppError> {
        let team = sqlx::query_as::<_, TeamModel>(
            "INSERT INTO teams (name, wins, losses, win_pct, games_behind, games_played) \
             VALUES ($1, 0, 0, 0, 0, 0) \
             RETURNING id, name, wins, losses, win_pct, games_behind, games_played",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create team in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(team_id = team.id, "Team created in database");
        Ok(team)
    }

    #[instrument(skip(self))]
    async fn get_team(&self, id: i64) -> Result<Option<TeamModel>, AppError> {
        sqlx::query_as::<_, TeamModel>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, team_id = id, "Failed to fetch team from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn list_teams(&self) -> Result<Vec<TeamModel>, AppError> {
        sqlx::query_as::<_, TeamModel>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list teams from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn delete_team(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, team_id = id, "Failed to delete team from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn create_player(&self, name: &str, team_id: i64) -> Result<PlayerModel, AppError> {
        let player = sqlx::query_as::<_, PlayerModel>(&format!(
            "INSERT INTO players (name, team_id) VALUES ($1, $2) RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(name)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create player in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(player_id = player.id, team_id, "Player created in database");
        Ok(player)
    }

    #[instrument(skip(self))]
    async fn get_player(&self, id: i64) -> Result<Option<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = id, "Failed to fetch player from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn list_players(&self, team_id: Option<i64>) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players \
             WHERE ($1::BIGINT IS NULL OR team_id = $1) ORDER BY id"
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list players from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn search_players(
        &self,
        query: &str,
        team_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players \
             WHERE name ILIKE $1 AND ($2::BIGINT IS NULL OR team_id = $2) \
             ORDER BY id LIMIT $3"
        ))
        .bind(like_pattern(query))
        .bind(team_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to search players in database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn delete_players_by_team(&self, team_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM players WHERE team_id = $1")
            .bind(team_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, team_id, "Failed to delete players for team");
                AppError::DatabaseError(e.to_string())
            })?;

        debug!(team_id, removed = result.rows_affected(), "Players removed with their team");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, deltas))]
    async fn update_player_stats(
        &self,
        id: i64,
        deltas: &PlayerStatDeltas,
    ) -> Result<Option<PlayerModel>, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to begin player update transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        // Row lock serializes concurrent delta updates to the same player
        let current = sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = id, "Failed to lock player row");
            AppError::DatabaseError(e.to_string())
        })?;

        let Some(current) = current else {
            return Ok(None);
        };
        let next = aggregate::apply_player_deltas(&current, deltas);

        sqlx::query(
            "UPDATE players SET name = $2, singles = $3, doubles = $4, triples = $5, \
             walks = $6, home_runs = $7, at_bats = $8, hits = $9, batting_average = $10, \
             games_played = $11 WHERE id = $1",
        )
        .bind(next.id)
        .bind(&next.name)
        .bind(next.singles)
        .bind(next.doubles)
        .bind(next.triples)
        .bind(next.walks)
        .bind(next.home_runs)
        .bind(next.at_bats)
        .bind(next.hits)
        .bind(next.batting_average)
        .bind(next.games_played)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = id, "Failed to write player aggregate");
            AppError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, player_id = id, "Failed to commit player update");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(player_id = id, games_played = next.games_played, "Player stats updated in database");
        Ok(Some(next))
    }

    #[instrument(skip(self, deltas))]
    async fn update_team_record(
        &self,
        id: i64,
        deltas: &TeamRecordDeltas,
    ) -> Result<Option<TeamModel>, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to begin team update transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        let current = sqlx::query_as::<_, TeamModel>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, team_id = id, "Failed to lock team row");
            AppError::DatabaseError(e.to_string())
        })?;

        let Some(current) = current else {
            return Ok(None);
        };
        let next = aggregate::apply_team_deltas(&current, deltas);

        sqlx::query(
            "UPDATE teams SET wins = $2, losses = $3, win_pct = $4, games_behind = $5, \
             games_played = $6 WHERE id = $1",
        )
        .bind(next.id)
        .bind(next.wins)
        .bind(next.losses)
        .bind(next.win_pct)
        .bind(next.games_behind)
        .bind(next.games_played)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, team_id = id, "Failed to write team aggregate");
            AppError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, team_id = id, "Failed to commit team update");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(team_id = id, wins = next.wins, losses = next.losses, "Team record updated in database");
        Ok(Some(next))
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database ping failed");
                AppError::DatabaseError(e.to_string())
            })?;
        Ok(())
    }

    async fn count_teams(&self) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    async fn count_players(&self) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
