//! Versioned startup migrations for the canonical league schema.
//!
//! Each migration runs exactly once, tracked in a `schema_migrations`
//! table. This replaces the old deployment's ad-hoc column guessing
//! (`games_played` vs `GP` vs `games`) with one canonical set of columns;
//! only the win_pct scale normalization survives as a read-time shim
//! because legacy 0-1 rows may still exist.

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::shared::AppError;

/// Ordered migration steps. Never edit a released step; append a new one.
const MIGRATIONS: &[(i32, &[&str])] = &[
    (
        1,
        &[
            "CREATE TABLE IF NOT EXISTS teams ( \
                id BIGSERIAL PRIMARY KEY, \
                name TEXT NOT NULL, \
                wins BIGINT NOT NULL DEFAULT 0, \
                losses BIGINT NOT NULL DEFAULT 0, \
                win_pct DOUBLE PRECISION NOT NULL DEFAULT 0, \
                games_behind DOUBLE PRECISION NOT NULL DEFAULT 0, \
                games_played BIGINT \
            )",
            "CREATE TABLE IF NOT EXISTS players ( \
                id BIGSERIAL PRIMARY KEY, \
                name TEXT NOT NULL, \
                team_id BIGINT NOT NULL, \
                singles BIGINT NOT NULL DEFAULT 0, \
                doubles BIGINT NOT NULL DEFAULT 0, \
                triples BIGINT NOT NULL DEFAULT 0, \
                walks BIGINT NOT NULL DEFAULT 0, \
                home_runs BIGINT NOT NULL DEFAULT 0, \
                at_bats BIGINT NOT NULL DEFAULT 0, \
                hits BIGINT NOT NULL DEFAULT 0, \
                batting_average DOUBLE PRECISION NOT NULL DEFAULT 0, \
                games_played BIGINT NOT NULL DEFAULT 0 \
            )",
            "CREATE TABLE IF NOT EXISTS results ( \
                id BIGSERIAL PRIMARY KEY, \
                date DATE NOT NULL, \
                game_number BIGINT NOT NULL, \
                team1_id BIGINT NOT NULL, \
                team2_id BIGINT NOT NULL, \
                team1_score BIGINT NOT NULL DEFAULT 0, \
                team2_score BIGINT NOT NULL DEFAULT 0 \
            )",
            "CREATE INDEX IF NOT EXISTS players_team_id_idx ON players (team_id)",
        ],
    ),
    // Rows imported before the hits column existed carry hits = 0
    (
        2,
        &[
            "UPDATE players SET hits = singles + doubles + triples + home_runs \
             WHERE hits = 0 AND singles + doubles + triples + home_runs > 0",
        ],
    ),
];

/// Runs all pending migrations. Called once at startup before the pool is
/// handed to the repository.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations ( \
            version INT PRIMARY KEY, \
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now() \
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| {
        warn!(error = %e, "Failed to create schema_migrations table");
        AppError::DatabaseError(e.to_string())
    })?;

    for (version, statements) in MIGRATIONS {
        let applied: Option<i32> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = $1")
                .bind(version)
                .fetch_optional(pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if applied.is_some() {
            debug!(version, "Migration already applied");
            continue;
        }

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for statement in *statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                warn!(error = %e, version, "Migration statement failed");
                AppError::DatabaseError(e.to_string())
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        info!(version, "Applied schema migration");
    }

    Ok(())
}
