use std::sync::Arc;

use dartball_backend::league::repository::{
    InMemoryLeagueRepository, LeagueRepository, PostgresLeagueRepository,
};
use dartball_backend::league::{router, schema};
use dartball_backend::shared::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dartball_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dartball league backend");

    let repository: Arc<dyn LeagueRepository> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            schema::run_migrations(&pool)
                .await
                .expect("Failed to run schema migrations");
            info!("Connected to Postgres");
            Arc::new(PostgresLeagueRepository::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryLeagueRepository::new())
        }
    };

    let status_token = std::env::var("STATUS_TOKEN").ok();
    let app = router(AppState::new(repository, status_token));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap();
    info!(port, "Server running");
    axum::serve(listener, app).await.unwrap();
}
