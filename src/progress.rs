//! Sequence initialization and the per-(student, stage) progress state
//! machine.
//!
//! States: Locked (no record, or a record that was never unlocked),
//! Unlocked, Completed. Completed is terminal. A stage unlocks only through
//! sequence initialization (lowest-ordinal stage) or by completion of its
//! immediate predecessor; there is no re-lock transition.

use tracing::{info, instrument, warn};

use crate::domain::{ProgressRecord, SequenceId, StageId, StageState, StudentId};
use crate::error::CoreError;
use crate::state::AppState;

/// Ensure a progress record exists for every active stage of the sequence.
///
/// Only the first stage in ordinal order starts unlocked; existing records
/// are left untouched and included in the result. Idempotent, so it is safe
/// to call on every read of a sequence's progress view. A sequence with no
/// active stages yields an empty list.
#[instrument(level = "debug", skip(state))]
pub async fn initialize_sequence(
  state: &AppState,
  student_id: StudentId,
  sequence_id: SequenceId,
) -> Vec<ProgressRecord> {
  let stages = state.content.sequence_stages(sequence_id);
  let mut progress = state.progress.write().await;

  let mut created = 0usize;
  let mut records = Vec::with_capacity(stages.len());
  for (idx, stage) in stages.iter().enumerate() {
    let record = progress.entry((student_id, stage.id)).or_insert_with(|| {
      created += 1;
      ProgressRecord {
        student_id,
        stage_id: stage.id,
        state: if idx == 0 { StageState::Unlocked } else { StageState::Locked },
      }
    });
    records.push(record.clone());
  }

  if created > 0 {
    info!(target: "progress", student_id, sequence_id, created, "Initialized sequence progress");
  }
  records
}

/// Current unlock state for (student, stage). A missing record is Locked.
#[cfg(test)]
pub async fn stage_state(state: &AppState, student_id: StudentId, stage_id: StageId) -> StageState {
  state
    .progress
    .read()
    .await
    .get(&(student_id, stage_id))
    .map(|r| r.state)
    .unwrap_or(StageState::Locked)
}

/// Mark a stage completed and unlock its successor.
///
/// Completing an already-completed stage is a no-op that returns the same
/// terminal record; completing a locked stage is a policy violation. The
/// successor unlock is a set-unlocked upsert that never downgrades a
/// successor the student already completed on an earlier pass.
#[instrument(level = "info", skip(state))]
pub async fn complete_stage(
  state: &AppState,
  student_id: StudentId,
  stage_id: StageId,
) -> Result<ProgressRecord, CoreError> {
  let stage = state
    .content
    .stage(stage_id)
    .cloned()
    .ok_or(CoreError::StageNotFound(stage_id))?;
  let successor = state.content.successor(&stage);

  // The whole transition runs under one write lock, which makes retries
  // idempotent and keeps the successor unlock atomic with the completion.
  let mut progress = state.progress.write().await;

  let current = match progress.get_mut(&(student_id, stage_id)) {
    Some(record) if record.state.is_unlocked() => record,
    _ => {
      warn!(target: "progress", student_id, stage_id, "Refusing to complete a locked stage");
      return Err(CoreError::StageLocked { student_id, stage_id });
    }
  };
  let already_completed = current.state.is_completed();
  current.state = StageState::Completed;
  let completed = current.clone();

  if let Some(next) = successor {
    let entry = progress
      .entry((student_id, next.id))
      .or_insert_with(|| ProgressRecord {
        student_id,
        stage_id: next.id,
        state: StageState::Locked,
      });
    entry.state = entry.state.unlock();
    if !already_completed {
      info!(target: "progress", student_id, stage_id, next_stage = next.id, "Stage completed; successor unlocked");
    }
  } else if !already_completed {
    info!(target: "progress", student_id, stage_id, "Stage completed; end of sequence");
  }

  Ok(completed)
}
