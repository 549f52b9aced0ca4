//! Attempt ledger and hint budget enforcement.
//!
//! Attempts are append-only. `attempt_number` is assigned under the ledger
//! write lock, so concurrent submissions for the same (student, stage) can
//! neither duplicate nor gap the numbering. Hint views are idempotent per
//! (attempt, hint) pair, and the budget check plus counter increment happen
//! in one locked step.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::analytics;
use crate::domain::{Attempt, AttemptId, HintId, HintView, StageId, StudentId};
use crate::error::CoreError;
use crate::progress;
use crate::state::AppState;

/// Outcome of a hint request: either the (possibly pre-existing) view, or a
/// budget refusal. `LimitReached` is an expected condition, not a fault, so
/// it is not part of `CoreError`.
#[derive(Clone, Debug)]
pub enum HintOutcome {
  Viewed(HintView),
  LimitReached { hints_viewed: u32, max_hints_per_attempt: u32 },
}

/// Append an attempt for (student, stage).
///
/// Recording never checks unlock state; boundary callers are expected to
/// gate submissions on the progress view. A successful attempt completes
/// the stage, which in turn unlocks the successor. If the stage turns out
/// to be locked, the completion is skipped but the attempt stays recorded.
#[instrument(level = "info", skip(state, error_payload))]
pub async fn record_attempt(
  state: &AppState,
  student_id: StudentId,
  stage_id: StageId,
  successful: bool,
  time_spent_seconds: Option<u32>,
  error_payload: Option<serde_json::Value>,
) -> Result<Attempt, CoreError> {
  if state.content.stage(stage_id).is_none() {
    return Err(CoreError::StageNotFound(stage_id));
  }

  let attempt = {
    let mut ledger = state.attempts.write().await;
    let attempt_number = ledger.max_attempt_number(student_id, stage_id) + 1;
    let id = ledger.next_id();
    let attempt = Attempt {
      id,
      student_id,
      stage_id,
      attempt_number,
      successful,
      hints_viewed: 0,
      time_spent_seconds,
      error_payload,
      created_at: Utc::now(),
    };
    ledger.by_id.insert(id, attempt.clone());
    attempt
  };
  info!(
    target: "ledger",
    student_id, stage_id,
    attempt_id = attempt.id,
    attempt_number = attempt.attempt_number,
    successful,
    "Attempt recorded"
  );

  // The attempt is committed at this point; the aggregator sees it even if
  // the completion side effect below is rejected.
  analytics::recompute_stage(state, stage_id).await;

  if successful {
    match progress::complete_stage(state, student_id, stage_id).await {
      Ok(_) => {}
      // The attempt is already part of the record; a locked stage only
      // suppresses the completion side effect.
      Err(CoreError::StageLocked { .. }) => {
        warn!(target: "ledger", student_id, stage_id, "Successful attempt on a locked stage; completion skipped");
      }
      Err(e) => return Err(e),
    }
  }

  Ok(attempt)
}

/// Record that a hint was viewed within an attempt, enforcing the budget.
///
/// A repeat request for the same (attempt, hint) pair returns the original
/// view and consumes nothing. Once viewed, a hint cannot be spent back.
#[instrument(level = "info", skip(state))]
pub async fn view_hint(
  state: &AppState,
  attempt_id: AttemptId,
  hint_id: HintId,
) -> Result<HintOutcome, CoreError> {
  let hint = state
    .content
    .hint(hint_id)
    .cloned()
    .ok_or(CoreError::HintNotFound(hint_id))?;

  let (view, stage_id) = {
    // Lock order: ledger before views, everywhere.
    let mut ledger = state.attempts.write().await;
    let mut views = state.hint_views.write().await;
    let attempt = ledger
      .by_id
      .get_mut(&attempt_id)
      .ok_or(CoreError::AttemptNotFound(attempt_id))?;

    if let Some(existing) = views.get(&(attempt_id, hint_id)) {
      return Ok(HintOutcome::Viewed(existing.clone()));
    }

    if let Some(max) = hint.max_hints_per_attempt {
      if attempt.hints_viewed >= max {
        info!(
          target: "ledger",
          attempt_id, hint_id,
          hints_viewed = attempt.hints_viewed,
          max,
          "Hint budget exhausted"
        );
        return Ok(HintOutcome::LimitReached {
          hints_viewed: attempt.hints_viewed,
          max_hints_per_attempt: max,
        });
      }
    }

    let view = HintView { attempt_id, hint_id, viewed_at: Utc::now() };
    views.insert((attempt_id, hint_id), view.clone());
    attempt.hints_viewed += 1;
    (view, attempt.stage_id)
  };
  info!(target: "ledger", attempt_id, hint_id, "Hint view recorded");

  // hints_viewed feeds avg/max hint metrics, so refresh the stage row.
  analytics::recompute_stage(state, stage_id).await;

  Ok(HintOutcome::Viewed(view))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::StageState;
  use crate::progress::{initialize_sequence, stage_state};
  use crate::state::testing::three_stage_state;

  async fn fail_once(state: &AppState, student_id: StudentId, stage_id: StageId) -> Attempt {
    record_attempt(state, student_id, stage_id, false, Some(30), None)
      .await
      .expect("record attempt")
  }

  #[tokio::test]
  async fn attempt_numbers_are_sequential_and_gap_free() {
    let state = three_stage_state();
    for expected in 1..=3u32 {
      let attempt = fail_once(&state, 100, 1).await;
      assert_eq!(attempt.attempt_number, expected);
      assert_eq!(attempt.hints_viewed, 0);
    }
    // Another student starts its own numbering.
    assert_eq!(fail_once(&state, 200, 1).await.attempt_number, 1);
  }

  #[tokio::test]
  async fn recording_against_an_unknown_stage_is_not_found() {
    let state = three_stage_state();
    let err = record_attempt(&state, 100, 42, false, None, None)
      .await
      .expect_err("unknown stage");
    assert_eq!(err, CoreError::StageNotFound(42));
  }

  #[tokio::test]
  async fn successful_attempt_completes_the_stage_and_unlocks_the_successor() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;

    let attempt = record_attempt(&state, 100, 1, true, Some(120), None)
      .await
      .expect("successful attempt");
    assert!(attempt.successful);
    assert_eq!(stage_state(&state, 100, 1).await, StageState::Completed);
    assert_eq!(stage_state(&state, 100, 2).await, StageState::Unlocked);
    assert_eq!(stage_state(&state, 100, 3).await, StageState::Locked);
  }

  #[tokio::test]
  async fn successful_attempt_on_a_locked_stage_is_kept_without_completing() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;

    // Stage 2 is still locked; the attempt must land anyway and the stage
    // must stay locked rather than the caller seeing an error.
    let attempt = record_attempt(&state, 100, 2, true, Some(40), None)
      .await
      .expect("attempt on a locked stage");
    assert_eq!(attempt.attempt_number, 1);
    assert_eq!(state.attempts.read().await.by_id.len(), 1);
    assert_eq!(stage_state(&state, 100, 2).await, StageState::Locked);
    assert_eq!(stage_state(&state, 100, 3).await, StageState::Locked);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn concurrent_submissions_never_duplicate_or_gap_numbers() {
    let state = three_stage_state();
    let mut handles = Vec::new();
    for _ in 0..10 {
      let state = state.clone();
      handles.push(tokio::spawn(async move {
        record_attempt(&state, 100, 1, false, None, None).await.expect("attempt")
      }));
    }

    let mut numbers: Vec<u32> = Vec::new();
    for handle in handles {
      numbers.push(handle.await.expect("join").attempt_number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
  }

  #[tokio::test]
  async fn hint_budget_allows_up_to_the_ceiling_then_refuses() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;
    let attempt = fail_once(&state, 100, 1).await;

    // Hints 10..=12 all carry max_hints_per_attempt = 2.
    let first = view_hint(&state, attempt.id, 10).await.expect("hint 10");
    assert!(matches!(first, HintOutcome::Viewed(_)));
    let second = view_hint(&state, attempt.id, 11).await.expect("hint 11");
    assert!(matches!(second, HintOutcome::Viewed(_)));

    let third = view_hint(&state, attempt.id, 12).await.expect("hint 12");
    match third {
      HintOutcome::LimitReached { hints_viewed, max_hints_per_attempt } => {
        assert_eq!(hints_viewed, 2);
        assert_eq!(max_hints_per_attempt, 2);
      }
      HintOutcome::Viewed(_) => panic!("third distinct hint must hit the budget"),
    }

    let counted = state.attempts.read().await.by_id[&attempt.id].hints_viewed;
    assert_eq!(counted, 2);
  }

  #[tokio::test]
  async fn repeat_views_return_the_original_record_without_consuming_budget() {
    let state = three_stage_state();
    let attempt = fail_once(&state, 100, 1).await;

    let first = match view_hint(&state, attempt.id, 10).await.expect("view") {
      HintOutcome::Viewed(v) => v,
      HintOutcome::LimitReached { .. } => panic!("budget untouched"),
    };
    view_hint(&state, attempt.id, 11).await.expect("second hint");

    // Budget is now exhausted, but re-requesting the first hint still
    // returns the existing view, not a refusal.
    let repeat = match view_hint(&state, attempt.id, 10).await.expect("repeat") {
      HintOutcome::Viewed(v) => v,
      HintOutcome::LimitReached { .. } => panic!("repeat view must not be refused"),
    };
    assert_eq!(repeat.viewed_at, first.viewed_at);
    assert_eq!(state.attempts.read().await.by_id[&attempt.id].hints_viewed, 2);
  }

  #[tokio::test]
  async fn absent_budget_means_unlimited() {
    let state = three_stage_state();
    let attempt = fail_once(&state, 100, 2).await;
    // Hint 13 has no ceiling; piling views on never refuses.
    let outcome = view_hint(&state, attempt.id, 13).await.expect("hint 13");
    assert!(matches!(outcome, HintOutcome::Viewed(_)));
  }

  #[tokio::test]
  async fn missing_attempt_or_hint_is_not_found() {
    let state = three_stage_state();
    let attempt = fail_once(&state, 100, 1).await;

    let err = view_hint(&state, 999, 10).await.expect_err("unknown attempt");
    assert_eq!(err, CoreError::AttemptNotFound(999));
    let err = view_hint(&state, attempt.id, 999).await.expect_err("unknown hint");
    assert_eq!(err, CoreError::HintNotFound(999));
  }

  #[tokio::test]
  async fn end_to_end_progression_keeps_analytics_in_step() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;

    record_attempt(&state, 100, 1, true, Some(60), None).await.expect("pass stage 1");
    assert_eq!(stage_state(&state, 100, 2).await, StageState::Unlocked);
    assert_eq!(stage_state(&state, 100, 3).await, StageState::Locked);

    record_attempt(&state, 100, 2, false, Some(90), None).await.expect("fail stage 2");
    let row = analytics::get_stage_analytics(&state, 2).await;
    assert_eq!(row.total_attempts, 1);
    assert_eq!(row.success_rate, 0.0);

    record_attempt(&state, 100, 2, true, Some(45), None).await.expect("pass stage 2");
    assert_eq!(stage_state(&state, 100, 3).await, StageState::Unlocked);
    let row = analytics::get_stage_analytics(&state, 2).await;
    assert_eq!(row.total_attempts, 2);
    assert_eq!(row.success_rate, 50.0);
  }
}
