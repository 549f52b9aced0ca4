//! Error taxonomy for the core.
//!
//! Only genuine failures live here: missing references and policy
//! violations. An exhausted hint budget is a normal, user-facing condition
//! and is modeled as a typed outcome (`ledger::HintOutcome::LimitReached`)
//! so the boundary can render "no more hints" instead of a generic 4xx.
//! Nothing in this taxonomy is retryable.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::{AttemptId, HintId, StageId, StudentId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
  #[error("stage {0} not found")]
  StageNotFound(StageId),
  #[error("attempt {0} not found")]
  AttemptNotFound(AttemptId),
  #[error("hint {0} not found")]
  HintNotFound(HintId),
  #[error("stage {stage_id} is locked for student {student_id}")]
  StageLocked { student_id: StudentId, stage_id: StageId },
}

impl CoreError {
  fn status(&self) -> StatusCode {
    match self {
      CoreError::StageNotFound(_)
      | CoreError::AttemptNotFound(_)
      | CoreError::HintNotFound(_) => StatusCode::NOT_FOUND,
      CoreError::StageLocked { .. } => StatusCode::FORBIDDEN,
    }
  }
}

impl IntoResponse for CoreError {
  fn into_response(self) -> Response {
    (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
  }
}
