//! Public DTOs for the HTTP API.
//! Internal progress state stays tagged (`StageState`); the boolean
//! unlock/completion flags clients expect exist only in this projection
//! layer, so the invalid "completed but locked" combination cannot leak in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
  Attempt, AttemptId, HintDefinition, HintId, HintView, OwnerId, ProgressRecord, Stage, StageId,
  StudentId,
};
use crate::ledger::HintOutcome;

/// Progress for one (student, stage), projected to flags.
#[derive(Debug, Serialize)]
pub struct ProgressOut {
  pub student_id: StudentId,
  pub stage_id: StageId,
  pub is_unlocked: bool,
  pub is_completed: bool,
}

pub fn progress_to_out(record: &ProgressRecord) -> ProgressOut {
  ProgressOut {
    student_id: record.student_id,
    stage_id: record.stage_id,
    is_unlocked: record.state.is_unlocked(),
    is_completed: record.state.is_completed(),
  }
}

/// A missing record projects as locked.
pub fn absent_progress_to_out(student_id: StudentId, stage_id: StageId) -> ProgressOut {
  ProgressOut { student_id, stage_id, is_unlocked: false, is_completed: false }
}

/// One row of the sequence progress view: stage info joined with the
/// student's flags, in ordinal order.
#[derive(Debug, Serialize)]
pub struct StageProgressOut {
  pub stage_id: StageId,
  pub ordinal: u32,
  pub title: String,
  pub is_unlocked: bool,
  pub is_completed: bool,
}

pub fn stage_progress_to_out(stage: &Stage, record: &ProgressRecord) -> StageProgressOut {
  StageProgressOut {
    stage_id: stage.id,
    ordinal: stage.ordinal,
    title: stage.title.clone(),
    is_unlocked: record.state.is_unlocked(),
    is_completed: record.state.is_completed(),
  }
}

#[derive(Debug, Deserialize)]
pub struct AttemptIn {
  pub successful: bool,
  #[serde(default)]
  pub time_spent_seconds: Option<u32>,
  #[serde(default)]
  pub error_payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct AttemptOut {
  pub id: AttemptId,
  pub student_id: StudentId,
  pub stage_id: StageId,
  pub attempt_number: u32,
  pub successful: bool,
  pub hints_viewed: u32,
  pub time_spent_seconds: Option<u32>,
  pub error_payload: Option<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

pub fn attempt_to_out(a: &Attempt) -> AttemptOut {
  AttemptOut {
    id: a.id,
    student_id: a.student_id,
    stage_id: a.stage_id,
    attempt_number: a.attempt_number,
    successful: a.successful,
    hints_viewed: a.hints_viewed,
    time_spent_seconds: a.time_spent_seconds,
    error_payload: a.error_payload.clone(),
    created_at: a.created_at,
  }
}

/// Result of a hint request. `limit_reached` goes out with HTTP 409 so
/// clients can render "no more hints" instead of a generic error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HintViewOut {
  Viewed { attempt_id: AttemptId, hint_id: HintId, viewed_at: DateTime<Utc> },
  LimitReached { hints_viewed: u32, max_hints_per_attempt: u32 },
}

pub fn hint_outcome_to_out(outcome: &HintOutcome) -> HintViewOut {
  match outcome {
    HintOutcome::Viewed(HintView { attempt_id, hint_id, viewed_at }) => HintViewOut::Viewed {
      attempt_id: *attempt_id,
      hint_id: *hint_id,
      viewed_at: *viewed_at,
    },
    HintOutcome::LimitReached { hints_viewed, max_hints_per_attempt } => {
      HintViewOut::LimitReached {
        hints_viewed: *hints_viewed,
        max_hints_per_attempt: *max_hints_per_attempt,
      }
    }
  }
}

/// Hint definition as shown to students browsing a stage's hint list.
#[derive(Debug, Serialize)]
pub struct HintOut {
  pub id: HintId,
  pub stage_id: StageId,
  pub sequence_order: u32,
  pub title: String,
  pub text: String,
  pub media_url: Option<String>,
  pub max_hints_per_attempt: Option<u32>,
}

pub fn hint_to_out(h: &HintDefinition) -> HintOut {
  HintOut {
    id: h.id,
    stage_id: h.stage_id,
    sequence_order: h.sequence_order,
    title: h.title.clone(),
    text: h.text.clone(),
    media_url: h.media_url.clone(),
    max_hints_per_attempt: h.max_hints_per_attempt,
  }
}

//
// Query parameters
//

#[derive(Debug, Deserialize)]
pub struct RankQuery {
  pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
  #[serde(rename = "ownerId")]
  pub owner_id: Option<OwnerId>,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
