//! JSON API for queue management, predictions, pairing and player lookups
//!
//! Every response uses the same `{ success, message, data }` envelope.

use crate::directory::{PagedQuery, PagedResult, PlayerDirectory};
use crate::error::MatchmakingError;
use crate::service::app::AppState;
use crate::types::{MatchCriteria, MatchOutcome, PlayerId, PlayerRecord, QueueEntry};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Response envelope shared by every API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Error returned from a handler, rendered as a failed envelope
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match MatchmakingError::find(&self.0) {
            Some(MatchmakingError::UnknownPlayer { .. })
            | Some(MatchmakingError::NotInQueue { .. }) => StatusCode::NOT_FOUND,
            Some(MatchmakingError::InvalidCriteria { .. })
            | Some(MatchmakingError::InvalidQuery { .. }) => StatusCode::BAD_REQUEST,
            Some(MatchmakingError::AlreadyQueued { .. }) => StatusCode::CONFLICT,
            Some(MatchmakingError::OracleUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API request failed: {:#}", self.0);
        } else {
            debug!("API request rejected: {}", self.0);
        }

        (status, Json(ApiResponse::<()>::failure(self.0.to_string()))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub size: usize,
    pub players: Vec<QueueEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub player_1: PlayerId,
    pub player_2: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub player_1: PlayerId,
    pub player_2: PlayerId,
    /// Probability that `player_1` wins
    pub win_probability: f64,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequest {
    pub player_id: PlayerId,
    pub target: Option<f64>,
    pub tolerance: Option<f64>,
}

/// Routes under `/api`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/matchmaking/queue", get(queue_status).post(enqueue))
        .route("/api/matchmaking/queue/remove", post(dequeue))
        .route("/api/matchmaking/predict", post(predict))
        .route("/api/matchmaking/pair", post(pair))
        .route("/api/players", get(list_players))
        .route("/api/players/{id}", get(get_player))
}

async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueueRequest>,
) -> ApiResult<QueueStatus> {
    let matchmaker = state.matchmaker();
    matchmaker.enqueue(request.player_id).await?;

    let players = matchmaker.queue_entries().await;
    Ok(Json(ApiResponse::ok(
        format!("Player {} added to queue", request.player_id),
        QueueStatus {
            size: players.len(),
            players,
        },
    )))
}

async fn dequeue(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueueRequest>,
) -> ApiResult<QueueEntry> {
    let entry = state.matchmaker().dequeue(request.player_id).await?;
    Ok(Json(ApiResponse::ok(
        format!("Player {} removed from queue", request.player_id),
        entry,
    )))
}

async fn queue_status(State(state): State<Arc<AppState>>) -> ApiResult<QueueStatus> {
    let players = state.matchmaker().queue_entries().await;
    Ok(Json(ApiResponse::ok(
        format!("{} players waiting", players.len()),
        QueueStatus {
            size: players.len(),
            players,
        },
    )))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Prediction> {
    let matchmaker = state.matchmaker();
    let win_probability = matchmaker
        .predict(request.player_1, request.player_2)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Prediction computed",
        Prediction {
            player_1: request.player_1,
            player_2: request.player_2,
            win_probability,
            model_version: matchmaker.oracle().model_version(),
        },
    )))
}

async fn pair(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PairRequest>,
) -> Result<Response, ApiError> {
    let matchmaker = state.matchmaker();
    let defaults = matchmaker.config().criteria;
    let criteria = MatchCriteria::new(
        request.target.unwrap_or(defaults.target),
        request.tolerance.unwrap_or(defaults.tolerance),
    );

    let response = match matchmaker.find_match_with(request.player_id, criteria).await? {
        MatchOutcome::Matched(result) => Json(ApiResponse::ok(
            format!(
                "Player {} matched with player {}",
                result.requester.profile_id, result.opponent.profile_id
            ),
            result,
        ))
        .into_response(),
        // Valid request, nobody suitable waiting
        MatchOutcome::NoMatchAvailable { reason } => {
            Json(ApiResponse::<()>::failure(reason)).into_response()
        }
    };
    Ok(response)
}

async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<PlayerId>,
) -> ApiResult<PlayerRecord> {
    let record = state
        .matchmaker()
        .directory()
        .get_player(player_id)
        .cloned()
        .ok_or(MatchmakingError::UnknownPlayer { player_id })?;

    Ok(Json(ApiResponse::ok(
        format!("Player {} found", player_id),
        record,
    )))
}

async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PagedQuery>,
) -> ApiResult<PagedResult<PlayerRecord>> {
    let page = state.matchmaker().directory().list_players(&query)?;
    Ok(Json(ApiResponse::ok(
        format!("{} players match", page.items_count),
        page,
    )))
}
