//! Tournament API handlers.
//!
//! This module provides the REST endpoints over the bracket engine:
//! - Creating a tournament with a seeded bracket
//! - Submitting a match result (called by the game subsystem after a
//!   match has actually been played)
//! - Reading the bracket and the standings
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:4242/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Friday Cup", "owner_id": 1, "entrants": [{"alias": "ada"}, {"alias": "grace"}, {"alias": "alan"}]}'
//! ```
//!
//! Submit a result:
//! ```bash
//! curl -X POST http://localhost:4242/api/v1/matches/7/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"winner_id": 3, "score_a": 11, "score_b": 6}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pong_arena::tournament::{
    BracketKind, BracketView, CreateTournament, InviteState, Match, MatchId, MatchSlot,
    NewParticipant, Participant, StandingsEntry, Tournament, TournamentError, TournamentId,
    TournamentStatus, UserId,
};

use super::AppState;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct EntrantPayload {
    pub alias: String,
    pub user_id: Option<UserId>,
    /// Defaults to a locally-entered participant
    pub invite_state: Option<InviteState>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub owner_id: UserId,
    /// Seed order: the first entrant is seed 1
    pub entrants: Vec<EntrantPayload>,
    /// Defaults to single elimination, the only supported kind
    pub kind: Option<BracketKind>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateTournamentResponse {
    pub tournament: Tournament,
    pub participants: Vec<Participant>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    pub winner_id: i64,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PropagationTarget {
    pub match_id: MatchId,
    pub slot: MatchSlot,
}

#[derive(Debug, Serialize)]
pub struct SubmitResultResponse {
    pub finished: Match,
    pub propagated_to: Option<PropagationTarget>,
    pub bracket_complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListTournamentsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map engine errors onto the HTTP surface: unknown ids are 404, stale
/// submissions 409, bad input 400, engine bugs a logged 500.
fn error_response(err: TournamentError) -> ApiError {
    let status = match &err {
        TournamentError::TournamentNotFound(_) | TournamentError::MatchNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        TournamentError::AlreadyFinished(_) | TournamentError::MatchNotReady(_) => {
            StatusCode::CONFLICT
        }
        TournamentError::Database(_) | TournamentError::Construction(_) => {
            tracing::error!(error = %err, "Internal tournament engine error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Create a tournament and generate its bracket.
///
/// The entrant list is taken as the seed order. Returns `201 Created`
/// with the stored tournament, all participants (including synthetic
/// ones), and the full match set.
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(payload): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<CreateTournamentResponse>), ApiError> {
    // The request-validation layer owns the participant cap; the engine
    // enforces its own 64-entrant bracket limit underneath.
    if payload.entrants.len() > state.max_participants {
        return Err(bad_request(format!(
            "Too many entrants: {} (max {})",
            payload.entrants.len(),
            state.max_participants
        )));
    }

    let entrants = payload
        .entrants
        .into_iter()
        .map(|e| NewParticipant {
            alias: e.alias,
            user_id: e.user_id,
            invite_state: e.invite_state.unwrap_or(InviteState::Local),
        })
        .collect();

    let created = state
        .manager
        .create_tournament(CreateTournament {
            name: payload.name,
            owner_id: payload.owner_id,
            kind: payload.kind.unwrap_or(BracketKind::SingleElimination),
            entrants,
            scheduled_at: payload.scheduled_at,
        })
        .await
        .map_err(error_response)?;

    metrics::tournaments_created_total();

    Ok((
        StatusCode::CREATED,
        Json(CreateTournamentResponse {
            tournament: created.tournament,
            participants: created.participants,
            matches: created.matches,
        }),
    ))
}

/// Submit the final result of a played match.
///
/// Both scores are required. On success the winner is advanced into the
/// next round; when the final is decided the tournament is marked
/// completed.
pub async fn submit_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<Json<SubmitResultResponse>, ApiError> {
    let outcome = state
        .manager
        .submit_result(
            match_id,
            payload.winner_id,
            payload.score_a,
            payload.score_b,
        )
        .await
        .map_err(|err| {
            metrics::match_results_total(false);
            error_response(err)
        })?;

    metrics::match_results_total(true);

    if outcome.bracket_complete {
        metrics::brackets_completed_total();
        // The engine only reports completion; flipping the status is this
        // layer's policy decision.
        if let Err(err) = state
            .manager
            .set_status(outcome.finished.tournament_id, TournamentStatus::Completed)
            .await
        {
            tracing::error!(
                tournament_id = outcome.finished.tournament_id,
                error = %err,
                "Failed to mark tournament completed"
            );
        }
    }

    Ok(Json(SubmitResultResponse {
        propagated_to: outcome
            .propagated_to
            .map(|(match_id, slot)| PropagationTarget { match_id, slot }),
        bracket_complete: outcome.bracket_complete,
        finished: outcome.finished,
    }))
}

/// List tournaments, optionally filtered by status.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListTournamentsQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some("draft") => Some(TournamentStatus::Draft),
        Some("ready") => Some(TournamentStatus::Ready),
        Some("running") => Some(TournamentStatus::Running),
        Some("completed") => Some(TournamentStatus::Completed),
        Some(other) => return Err(bad_request(format!("Unknown status filter: {other:?}"))),
    };

    let tournaments = state
        .manager
        .list_tournaments(status)
        .await
        .map_err(error_response)?;
    Ok(Json(tournaments))
}

/// Get the full bracket of a tournament: participants ordered by seed,
/// matches ordered by round, each slot resolved to its occupant.
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketView>, ApiError> {
    let bracket = state
        .manager
        .bracket(tournament_id)
        .await
        .map_err(error_response)?;
    Ok(Json(bracket))
}

/// Get the standings of a tournament.
pub async fn get_standings(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<StandingsEntry>>, ApiError> {
    let standings = state
        .manager
        .standings(tournament_id)
        .await
        .map_err(error_response)?;
    Ok(Json(standings))
}
