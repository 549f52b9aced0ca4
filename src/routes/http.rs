//! HTTP endpoint handlers. Thin wrappers that forward to the core
//! progress/ledger/analytics operations and project domain types to DTOs.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, instrument};

use crate::analytics;
use crate::domain::{AttemptId, HintId, SequenceId, StageId, StudentId};
use crate::error::CoreError;
use crate::ledger::{self, HintOutcome};
use crate::progress;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

/// Sequence progress view. Missing records are initialized on read (first
/// stage unlocked, the rest locked), matching how students enter a sequence.
#[instrument(level = "info", skip(state))]
pub async fn http_sequence_progress(
  State(state): State<Arc<AppState>>,
  Path((student_id, sequence_id)): Path<(StudentId, SequenceId)>,
) -> impl IntoResponse {
  let records = progress::initialize_sequence(&state, student_id, sequence_id).await;
  let stages = state.content.sequence_stages(sequence_id);
  // initialize_sequence walks the same ordinal order, so the two line up.
  let out: Vec<StageProgressOut> = stages
    .iter()
    .zip(records.iter())
    .map(|(stage, record)| stage_progress_to_out(stage, record))
    .collect();
  Json(out)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path((student_id, stage_id)): Path<(StudentId, StageId)>,
) -> impl IntoResponse {
  match state.get_progress(student_id, stage_id).await {
    Some(record) => Json(progress_to_out(&record)),
    None => Json(absent_progress_to_out(student_id, stage_id)),
  }
}

#[instrument(level = "info", skip(state, body), fields(successful = body.successful))]
pub async fn http_record_attempt(
  State(state): State<Arc<AppState>>,
  Path((student_id, stage_id)): Path<(StudentId, StageId)>,
  Json(body): Json<AttemptIn>,
) -> Result<Json<AttemptOut>, CoreError> {
  let attempt = ledger::record_attempt(
    &state,
    student_id,
    stage_id,
    body.successful,
    body.time_spent_seconds,
    body.error_payload,
  )
  .await?;
  info!(target: "ledger", student_id, stage_id, attempt_number = attempt.attempt_number, "HTTP attempt recorded");
  Ok(Json(attempt_to_out(&attempt)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_complete_stage(
  State(state): State<Arc<AppState>>,
  Path((student_id, stage_id)): Path<(StudentId, StageId)>,
) -> Result<Json<ProgressOut>, CoreError> {
  let record = progress::complete_stage(&state, student_id, stage_id).await?;
  info!(target: "progress", student_id, stage_id, "HTTP stage completed");
  Ok(Json(progress_to_out(&record)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_view_hint(
  State(state): State<Arc<AppState>>,
  Path((attempt_id, hint_id)): Path<(AttemptId, HintId)>,
) -> Result<Response, CoreError> {
  let outcome = ledger::view_hint(&state, attempt_id, hint_id).await?;
  let status = match outcome {
    HintOutcome::Viewed(_) => StatusCode::OK,
    HintOutcome::LimitReached { .. } => StatusCode::CONFLICT,
  };
  Ok((status, Json(hint_outcome_to_out(&outcome))).into_response())
}

#[instrument(level = "info", skip(state))]
pub async fn http_stage_hints(
  State(state): State<Arc<AppState>>,
  Path(stage_id): Path<StageId>,
) -> Result<Json<Vec<HintOut>>, CoreError> {
  if state.content.stage(stage_id).is_none() {
    return Err(CoreError::StageNotFound(stage_id));
  }
  let hints: Vec<HintOut> = state.content.stage_hints(stage_id).iter().map(hint_to_out).collect();
  Ok(Json(hints))
}

#[instrument(level = "info", skip(state))]
pub async fn http_stage_analytics(
  State(state): State<Arc<AppState>>,
  Path(stage_id): Path<StageId>,
) -> impl IntoResponse {
  Json(analytics::get_stage_analytics(&state, stage_id).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_difficult_stages(
  State(state): State<Arc<AppState>>,
  Query(q): Query<RankQuery>,
) -> impl IntoResponse {
  let limit = q.limit.unwrap_or(5).max(1);
  Json(analytics::rank_difficult_stages(&state, limit).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_dashboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<DashboardQuery>,
) -> impl IntoResponse {
  Json(analytics::dashboard_summary(&state, q.owner_id).await)
}
