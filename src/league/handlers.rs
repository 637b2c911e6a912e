use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use super::{
    service::LeagueService,
    types::{
        AddPlayerRequest, AddTeamRequest, DbStatusResponse, DeleteTeamRequest, PlayerResponse,
        PlayersQuery, TeamResponse, UpdatePlayerRequest, UpdateTeamRecordRequest,
    },
};
use crate::shared::{AppError, AppState};

/// Builds the full application router. Paths keep the original `/routes`
/// prefix the deployed frontend expects.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/routes/teams", get(get_teams))
        .route("/routes/players", get(get_players))
        .route("/routes/admin/login", post(admin_login))
        .route("/routes/admin/add_team", post(add_team))
        .route("/routes/admin/add_player", post(add_player))
        .route("/routes/admin/update_player", post(update_player))
        .route("/routes/admin/record", post(update_team_record))
        .route("/routes/admin/delete_team", delete(delete_team))
        .route("/routes/admin/db_status", get(db_status))
        .layer(TraceLayer::new_for_http())
        // The browser frontend is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /routes/teams
///
/// Lists teams with win percentage normalized onto the 0-100 scale and
/// games played resolved for legacy rows.
#[instrument(name = "get_teams", skip(state))]
pub async fn get_teams(
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamResponse>>, AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let teams = service.list_teams().await?;

    info!(team_count = teams.len(), "Teams listed");
    Ok(Json(teams))
}

/// GET /routes/players?team_id=&q=&limit=
///
/// Lists players, or searches by name when `q` is present. An unknown
/// team yields an empty array; a non-numeric team_id is rejected with 400
/// by the query extractor.
#[instrument(name = "get_players", skip(state))]
pub async fn get_players(
    State(state): State<AppState>,
    Query(params): Query<PlayersQuery>,
) -> Result<Json<Vec<PlayerResponse>>, AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));

    let players = match params.q.as_deref().filter(|q| !q.is_empty()) {
        Some(query) => {
            service
                .search_players(query, params.team_id, params.limit)
                .await?
        }
        None => service.list_players(params.team_id).await?,
    };

    info!(player_count = players.len(), "Players listed");
    Ok(Json(players))
}

/// POST /routes/admin/login
///
/// Stub kept from the original backend; real authentication was never
/// implemented there either.
pub async fn admin_login() -> Json<Value> {
    Json(json!({ "message": "Login successful" }))
}

/// POST /routes/admin/add_team
#[instrument(name = "add_team", skip(state, request))]
pub async fn add_team(
    State(state): State<AppState>,
    Json(request): Json<AddTeamRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let team = service.add_team(request.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Team added successfully", "team": team })),
    ))
}

/// POST /routes/admin/add_player
#[instrument(name = "add_player", skip(state, request))]
pub async fn add_player(
    State(state): State<AppState>,
    Json(request): Json<AddPlayerRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let player = service.add_player(request.name, request.team_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Player added successfully", "player": player })),
    ))
}

/// POST /routes/admin/update_player
///
/// Applies per-game stat deltas to one player and returns the updated
/// aggregate.
#[instrument(name = "update_player", skip(state, request))]
pub async fn update_player(
    State(state): State<AppState>,
    Json(request): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let player = service
        .update_player_stats(request.player_id, &request.deltas)
        .await?;

    Ok(Json(player))
}

/// POST /routes/admin/record
///
/// Applies win/loss deltas (and an optional absolute games_behind) to one
/// team and returns the updated record.
#[instrument(name = "update_team_record", skip(state, request))]
pub async fn update_team_record(
    State(state): State<AppState>,
    Json(request): Json<UpdateTeamRecordRequest>,
) -> Result<Json<TeamResponse>, AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let team = service
        .update_team_record(request.team_id, &request.deltas)
        .await?;

    Ok(Json(team))
}

/// DELETE /routes/admin/delete_team
#[instrument(name = "delete_team", skip(state, request))]
pub async fn delete_team(
    State(state): State<AppState>,
    Json(request): Json<DeleteTeamRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LeagueService::new(Arc::clone(&state.league_repository));
    let deleted = service.delete_team(request.team_id).await?;

    Ok(Json(json!({
        "message": "Team deleted successfully",
        "deleted": deleted
    })))
}

/// GET /routes/admin/db_status
///
/// Connectivity probe. When STATUS_TOKEN is configured, the caller must
/// present it in the X-Download-Token header.
#[instrument(name = "db_status", skip(state, headers))]
pub async fn db_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DbStatusResponse>, AppError> {
    if let Some(expected) = &state.status_token {
        let provided = headers
            .get("x-download-token")
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(AppError::Forbidden("Invalid download token".to_string()));
        }
    }

    let repository = &state.league_repository;
    repository.ping().await?;

    Ok(Json(DbStatusResponse {
        status: "ok".to_string(),
        backend: repository.backend_name().to_string(),
        teams: repository.count_teams().await?,
        players: repository.count_players().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::repository::InMemoryLeagueRepository;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        app_with_token(None)
    }

    fn app_with_token(status_token: Option<&str>) -> Router {
        let repository = Arc::new(InMemoryLeagueRepository::new());
        let state = AppState::new(repository, status_token.map(str::to_string));
        router(state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn add_team_returns_created_team() {
        let app = app();
        let request = json_request(
            Method::POST,
            "/routes/admin/add_team",
            json!({"name": "Tigers"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response_json(response).await;
        assert_eq!(body["team"]["name"], "Tigers");
        assert_eq!(body["team"]["wins"], 0);
        assert_eq!(body["team"]["games_played"], 0);
    }

    #[tokio::test]
    async fn add_team_missing_name_is_bad_request() {
        let app = app();
        let request = json_request(Method::POST, "/routes/admin/add_team", json!({}));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["message"], "Team name is required");
    }

    #[tokio::test]
    async fn add_player_missing_fields_is_bad_request() {
        let app = app();
        let request = json_request(
            Method::POST,
            "/routes/admin/add_player",
            json!({"name": "Alice"}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_player_unknown_id_is_not_found() {
        let app = app();
        let request = json_request(
            Method::POST,
            "/routes/admin/update_player",
            json!({"player_id": 42, "Singles": 1}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_player_missing_id_is_bad_request() {
        let app = app();
        let request = json_request(
            Method::POST,
            "/routes/admin/update_player",
            json!({"Singles": 1}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_player_coerces_junk_deltas_to_zero() {
        let app = app();

        let created = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/routes/admin/add_team",
                json!({"name": "Tigers"}),
            ))
            .await
            .unwrap();
        let team = response_json(created).await;

        let created = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/routes/admin/add_player",
                json!({"name": "Alice", "team_id": team["team"]["id"]}),
            ))
            .await
            .unwrap();
        let player = response_json(created).await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/routes/admin/update_player",
                json!({
                    "player_id": player["player"]["id"],
                    "Singles": "junk",
                    "AtBats": [1, 2]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["Singles"], 0);
        assert_eq!(body["AtBats"], 0);
        // One call still counts as one game
        assert_eq!(body["GP"], 1);
    }

    #[tokio::test]
    async fn record_update_returns_normalized_team() {
        let app = app();

        let created = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/routes/admin/add_team",
                json!({"name": "Tigers"}),
            ))
            .await
            .unwrap();
        let team = response_json(created).await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/routes/admin/record",
                json!({
                    "team_id": team["team"]["id"],
                    "wins": 1,
                    "losses": 1,
                    "games_behind": 2.0
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["wins"], 1);
        assert_eq!(body["losses"], 1);
        assert_eq!(body["games_played"], 2);
        assert_eq!(body["win_pct"], 50.0);
        assert_eq!(body["games_behind"], 2.0);
    }

    #[tokio::test]
    async fn record_update_missing_team_id_is_bad_request() {
        let app = app();
        let request = json_request(Method::POST, "/routes/admin/record", json!({"wins": 1}));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_players_rejects_non_numeric_team_id() {
        let app = app();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/routes/players?team_id=abc")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_players_unknown_team_returns_empty_array() {
        let app = app();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/routes/players?team_id=123")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn delete_team_unknown_id_is_not_found() {
        let app = app();
        let request = json_request(
            Method::DELETE,
            "/routes/admin/delete_team",
            json!({"team_id": 5}),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_login_stub_succeeds() {
        let app = app();
        let request = json_request(Method::POST, "/routes/admin/login", json!({}));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["message"], "Login successful");
    }

    #[tokio::test]
    async fn db_status_without_configured_token_is_open() {
        let app = app();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/routes/admin/db_status")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["teams"], 0);
    }

    #[tokio::test]
    async fn db_status_rejects_missing_or_wrong_token() {
        let app = app_with_token(Some("sekrit"));

        let no_header = Request::builder()
            .method(Method::GET)
            .uri("/routes/admin/db_status")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(no_header).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let wrong = Request::builder()
            .method(Method::GET)
            .uri("/routes/admin/db_status")
            .header("x-download-token", "nope")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let right = Request::builder()
            .method(Method::GET)
            .uri("/routes/admin/db_status")
            .header("x-download-token", "sekrit")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(right).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
