//! Domain models for the progressive-unlock core: stages, per-student
//! progress, attempts, hint definitions/views, and derived analytics rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type StudentId = i64;
pub type StageId = i64;
pub type SequenceId = i64;
pub type OwnerId = i64;
pub type AttemptId = i64;
pub type HintId = i64;

/// A learning stage. Owned by the content collaborator, read-only here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stage {
  pub id: StageId,
  pub sequence_id: SequenceId,
  /// 1-based position within the sequence; drives unlock order.
  pub ordinal: u32,
  pub title: String,
  /// Professor who authored the stage; scopes retention/risk analytics.
  #[serde(default)]
  pub owner_id: Option<OwnerId>,
  pub active: bool,
}

/// Unlock/completion state for one (student, stage) pair.
///
/// `Completed` is terminal; nothing ever re-locks a stage. The boundary
/// projects this to `is_unlocked`/`is_completed` flags, which keeps the
/// invalid combination "completed but locked" unrepresentable here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
  Locked,
  Unlocked,
  Completed,
}

impl StageState {
  pub fn is_unlocked(self) -> bool {
    matches!(self, StageState::Unlocked | StageState::Completed)
  }

  pub fn is_completed(self) -> bool {
    matches!(self, StageState::Completed)
  }

  /// Unlock without downgrading a completed stage.
  pub fn unlock(self) -> Self {
    match self {
      StageState::Locked => StageState::Unlocked,
      other => other,
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressRecord {
  pub student_id: StudentId,
  pub stage_id: StageId,
  pub state: StageState,
}

/// One submission by a student against a stage. Immutable once written,
/// except for `hints_viewed`, which only the hint budget enforcer increments.
#[derive(Clone, Debug, Serialize)]
pub struct Attempt {
  pub id: AttemptId,
  pub student_id: StudentId,
  pub stage_id: StageId,
  /// 1-based and gap-free within (student, stage).
  pub attempt_number: u32,
  pub successful: bool,
  pub hints_viewed: u32,
  pub time_spent_seconds: Option<u32>,
  pub error_payload: Option<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

/// Scaffolded hint configured for a stage (content collaborator data).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HintDefinition {
  pub id: HintId,
  pub stage_id: StageId,
  /// Display order among the stage's hints; unrelated to stage ordinals.
  pub sequence_order: u32,
  pub title: String,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub media_url: Option<String>,
  /// Budget ceiling per attempt; `None` means unlimited.
  #[serde(default)]
  pub max_hints_per_attempt: Option<u32>,
  pub active: bool,
}

/// At most one record per (attempt, hint) pair; repeat views return this
/// record unchanged instead of creating a new one.
#[derive(Clone, Debug, Serialize)]
pub struct HintView {
  pub attempt_id: AttemptId,
  pub hint_id: HintId,
  pub viewed_at: DateTime<Utc>,
}

/// Derived per-stage difficulty metrics. Never a source of truth: the whole
/// row is recomputable from the attempt ledger at any time.
#[derive(Clone, Debug, Serialize)]
pub struct StageAnalytics {
  pub stage_id: StageId,
  pub total_attempts: u64,
  pub failed_attempts: u64,
  pub successful_attempts: u64,
  /// Percentage 0..=100, one decimal; 0.0 when there are no attempts.
  pub success_rate: f64,
  pub avg_hints_used: f64,
  pub max_hints_used: u32,
  pub avg_time_seconds: Option<f64>,
  pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
  High,
  Medium,
  Inactive,
}

#[derive(Clone, Debug, Serialize)]
pub struct AtRiskStudent {
  pub student_id: StudentId,
  pub level: RiskLevel,
  /// Percentage of failed attempts, one decimal.
  pub failure_rate: f64,
  pub total_attempts: u64,
  pub last_attempt_at: DateTime<Utc>,
}

/// Admin dashboard roll-up over an optional owner scope.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardSummary {
  pub completion_rate: f64,
  pub retention_rate: f64,
  pub failure_rate: f64,
  pub avg_time_seconds: Option<f64>,
  pub at_risk_students: Vec<AtRiskStudent>,
  pub difficult_stages: Vec<StageAnalytics>,
}
