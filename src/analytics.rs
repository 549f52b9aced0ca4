//! Derived analytics: per-stage difficulty metrics, the difficulty ranking,
//! and the admin dashboard with its at-risk student list.
//!
//! Everything here is a pure derivation over the attempt ledger and the
//! progress store. `recompute_stage` re-derives a whole row and upserts it,
//! so analytics can always be rebuilt from source data and never drift.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::domain::{
  AtRiskStudent, Attempt, DashboardSummary, OwnerId, RiskLevel, StageAnalytics, StageId, StudentId,
};
use crate::state::AppState;
use crate::util::{percentage, round1};

/// Stages with fewer attempts than this never enter the difficulty ranking;
/// below it a success rate is statistically unreliable.
pub const MIN_RANKING_ATTEMPTS: u64 = 5;
/// Failure-rate thresholds in percent; both boundaries are exclusive.
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;
/// A student whose last attempt is older than this counts as inactive.
pub const INACTIVE_AFTER_DAYS: i64 = 7;
/// Dashboard caps: at-risk list size and difficulty list size.
pub const RISK_LIST_CAP: usize = 10;
pub const DASHBOARD_DIFFICULTY_CAP: usize = 3;

/// Pure derivation of one stage's analytics row from its attempts.
pub fn derive_stage_analytics(
  stage_id: StageId,
  attempts: &[Attempt],
  now: DateTime<Utc>,
) -> StageAnalytics {
  let total = attempts.len() as u64;
  let successful = attempts.iter().filter(|a| a.successful).count() as u64;
  let failed = total - successful;

  let avg_hints = if attempts.is_empty() {
    0.0
  } else {
    attempts.iter().map(|a| f64::from(a.hints_viewed)).sum::<f64>() / attempts.len() as f64
  };
  let max_hints = attempts.iter().map(|a| a.hints_viewed).max().unwrap_or(0);

  let times: Vec<f64> = attempts
    .iter()
    .filter_map(|a| a.time_spent_seconds)
    .map(f64::from)
    .collect();
  let avg_time = if times.is_empty() {
    None
  } else {
    Some(round1(times.iter().sum::<f64>() / times.len() as f64))
  };

  StageAnalytics {
    stage_id,
    total_attempts: total,
    failed_attempts: failed,
    successful_attempts: successful,
    success_rate: percentage(successful, total),
    avg_hints_used: round1(avg_hints),
    max_hints_used: max_hints,
    avg_time_seconds: avg_time,
    last_updated: now,
  }
}

/// Re-derive the stage's row from the ledger and upsert it.
#[instrument(level = "debug", skip(state))]
pub async fn recompute_stage(state: &AppState, stage_id: StageId) -> StageAnalytics {
  let attempts = { state.attempts.read().await.stage_attempts(stage_id) };
  let row = derive_stage_analytics(stage_id, &attempts, Utc::now());
  state.analytics.write().await.insert(stage_id, row.clone());
  debug!(
    target: "analytics",
    stage_id,
    total = row.total_attempts,
    success_rate = row.success_rate,
    "Stage analytics recomputed"
  );
  row
}

/// Cached row if one exists, recomputed on first read otherwise.
pub async fn get_stage_analytics(state: &AppState, stage_id: StageId) -> StageAnalytics {
  if let Some(row) = state.analytics.read().await.get(&stage_id).cloned() {
    return row;
  }
  recompute_stage(state, stage_id).await
}

/// Hardest stages first: lowest success rate wins, more attempts break ties
/// (more evidence wins), stage id keeps the order total. Stages below
/// `MIN_RANKING_ATTEMPTS` are excluded outright.
#[instrument(level = "debug", skip(state))]
pub async fn rank_difficult_stages(state: &AppState, limit: usize) -> Vec<StageAnalytics> {
  rank_difficult_stages_scoped(state, None, limit).await
}

async fn rank_difficult_stages_scoped(
  state: &AppState,
  owner: Option<OwnerId>,
  limit: usize,
) -> Vec<StageAnalytics> {
  let scope = state.content.scoped_stage_ids(owner);
  let now = Utc::now();

  let mut rows: Vec<StageAnalytics> = {
    let ledger = state.attempts.read().await;
    let stage_ids: HashSet<StageId> = ledger
      .by_id
      .values()
      .map(|a| a.stage_id)
      .filter(|id| scope.contains(id))
      .collect();
    stage_ids
      .into_iter()
      .map(|id| derive_stage_analytics(id, &ledger.stage_attempts(id), now))
      .filter(|row| row.total_attempts >= MIN_RANKING_ATTEMPTS)
      .collect()
  };

  rows.sort_by(|a, b| {
    a.success_rate
      .partial_cmp(&b.success_rate)
      .unwrap_or(Ordering::Equal)
      .then(b.total_attempts.cmp(&a.total_attempts))
      .then(a.stage_id.cmp(&b.stage_id))
  });
  rows.truncate(limit);
  rows
}

/// Classify one student's attempts over the scoped stage set.
///
/// High failure beats medium, both beat inactivity; students matching no
/// criterion are not at risk and return None.
pub fn classify_student_risk(
  student_id: StudentId,
  attempts: &[Attempt],
  now: DateTime<Utc>,
) -> Option<AtRiskStudent> {
  let total = attempts.len() as u64;
  let failed = attempts.iter().filter(|a| !a.successful).count() as u64;
  // Thresholds compare the raw ratio; rounding happens only on the way out,
  // so a rate just past a boundary is not rounded back under it.
  let raw_failure_rate = if total == 0 { 0.0 } else { failed as f64 / total as f64 * 100.0 };
  let last_attempt_at = attempts.iter().map(|a| a.created_at).max()?;

  let level = if raw_failure_rate > HIGH_RISK_THRESHOLD {
    RiskLevel::High
  } else if raw_failure_rate > MEDIUM_RISK_THRESHOLD {
    RiskLevel::Medium
  } else if now - last_attempt_at > Duration::days(INACTIVE_AFTER_DAYS) {
    RiskLevel::Inactive
  } else {
    return None;
  };

  Some(AtRiskStudent {
    student_id,
    level,
    failure_rate: round1(raw_failure_rate),
    total_attempts: total,
    last_attempt_at,
  })
}

/// Admin dashboard over an optional owner scope.
///
/// Completion rate is system-wide; retention restricts the same ratio to the
/// owner's stage set (the two coincide when no scope is given). Failure
/// rate and the risk list are computed over the scoped attempts; average
/// time is the mean over the scoped attempts that passed.
#[instrument(level = "info", skip(state))]
pub async fn dashboard_summary(state: &AppState, owner: Option<OwnerId>) -> DashboardSummary {
  let now = Utc::now();
  let scope = state.content.scoped_stage_ids(owner);

  let (completed_all, total_all, completed_scoped, total_scoped) = {
    let progress = state.progress.read().await;
    let mut counts = (0u64, 0u64, 0u64, 0u64);
    for record in progress.values() {
      counts.1 += 1;
      let completed = record.state.is_completed();
      if completed {
        counts.0 += 1;
      }
      if scope.contains(&record.stage_id) {
        counts.3 += 1;
        if completed {
          counts.2 += 1;
        }
      }
    }
    counts
  };

  let scoped_attempts: Vec<Attempt> = {
    let ledger = state.attempts.read().await;
    ledger
      .by_id
      .values()
      .filter(|a| scope.contains(&a.stage_id))
      .cloned()
      .collect()
  };
  let total_attempts = scoped_attempts.len() as u64;
  let failed_attempts = scoped_attempts.iter().filter(|a| !a.successful).count() as u64;

  // The dashboard figure is time-to-pass: only successful attempts count.
  let times: Vec<f64> = scoped_attempts
    .iter()
    .filter(|a| a.successful)
    .filter_map(|a| a.time_spent_seconds)
    .map(f64::from)
    .collect();
  let avg_time_seconds = if times.is_empty() {
    None
  } else {
    Some(round1(times.iter().sum::<f64>() / times.len() as f64))
  };

  let mut per_student: HashMap<StudentId, Vec<Attempt>> = HashMap::new();
  for attempt in scoped_attempts {
    per_student.entry(attempt.student_id).or_default().push(attempt);
  }
  let mut at_risk: Vec<AtRiskStudent> = per_student
    .iter()
    .filter_map(|(student_id, attempts)| classify_student_risk(*student_id, attempts, now))
    .collect();
  at_risk.sort_by(|a, b| {
    let a_high = a.level == RiskLevel::High;
    let b_high = b.level == RiskLevel::High;
    b_high
      .cmp(&a_high)
      .then(b.failure_rate.partial_cmp(&a.failure_rate).unwrap_or(Ordering::Equal))
      .then(a.student_id.cmp(&b.student_id))
  });
  at_risk.truncate(RISK_LIST_CAP);

  let difficult_stages =
    rank_difficult_stages_scoped(state, owner, DASHBOARD_DIFFICULTY_CAP).await;

  DashboardSummary {
    completion_rate: percentage(completed_all, total_all),
    retention_rate: percentage(completed_scoped, total_scoped),
    failure_rate: percentage(failed_attempts, total_attempts),
    avg_time_seconds,
    at_risk_students: at_risk,
    difficult_stages,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::ContentStore;
  use crate::ledger::record_attempt;
  use crate::progress::initialize_sequence;
  use crate::state::testing::{stage, three_stage_state};

  fn attempt(
    id: i64,
    student_id: StudentId,
    stage_id: StageId,
    successful: bool,
    hints_viewed: u32,
    time_spent_seconds: Option<u32>,
    age_days: i64,
  ) -> Attempt {
    Attempt {
      id,
      student_id,
      stage_id,
      attempt_number: id as u32,
      successful,
      hints_viewed,
      time_spent_seconds,
      error_payload: None,
      created_at: Utc::now() - Duration::days(age_days),
    }
  }

  #[test]
  fn derivation_counts_and_rates_add_up() {
    let attempts = vec![
      attempt(1, 100, 2, true, 0, Some(60), 0),
      attempt(2, 100, 2, false, 2, Some(90), 0),
      attempt(3, 200, 2, false, 3, None, 0),
      attempt(4, 200, 2, true, 1, Some(30), 0),
    ];
    let row = derive_stage_analytics(2, &attempts, Utc::now());
    assert_eq!(row.total_attempts, 4);
    assert_eq!(row.successful_attempts, 2);
    assert_eq!(row.failed_attempts, 2);
    assert_eq!(row.success_rate, 50.0);
    assert_eq!(row.avg_hints_used, 1.5);
    assert_eq!(row.max_hints_used, 3);
    assert_eq!(row.avg_time_seconds, Some(60.0));
  }

  #[test]
  fn empty_stage_derives_zeros() {
    let row = derive_stage_analytics(9, &[], Utc::now());
    assert_eq!(row.total_attempts, 0);
    assert_eq!(row.success_rate, 0.0);
    assert_eq!(row.avg_hints_used, 0.0);
    assert_eq!(row.avg_time_seconds, None);
  }

  #[tokio::test]
  async fn thin_samples_never_enter_the_ranking() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;
    // Stage 1: five attempts, 40% success. Stage 2: three failures (0%),
    // which would top the ranking if the sample-size floor did not apply.
    for successful in [true, true, false, false, false] {
      record_attempt(&state, 100, 1, successful, None, None).await.expect("attempt");
    }
    for _ in 0..3 {
      record_attempt(&state, 100, 2, false, None, None).await.expect("attempt");
    }

    let ranked = rank_difficult_stages(&state, 10).await;
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].stage_id, 1);
    assert_eq!(ranked[0].success_rate, 40.0);
  }

  #[tokio::test]
  async fn ranking_orders_by_success_rate_then_evidence() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;
    // Stage 1: 5 attempts at 40%. Stage 2: 10 attempts at 40%.
    // Stage 3: 5 attempts at 20% -- hardest.
    for successful in [true, true, false, false, false] {
      record_attempt(&state, 100, 1, successful, None, None).await.expect("attempt");
    }
    for i in 0..10 {
      record_attempt(&state, 100, 2, i < 4, None, None).await.expect("attempt");
    }
    for successful in [true, false, false, false, false] {
      record_attempt(&state, 100, 3, successful, None, None).await.expect("attempt");
    }

    let ranked = rank_difficult_stages(&state, 2).await;
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].stage_id, 3);
    // Equal rates: the better-evidenced stage ranks first.
    assert_eq!(ranked[1].stage_id, 2);
  }

  #[test]
  fn seventy_percent_failure_is_high_risk() {
    let attempts: Vec<Attempt> = (0..10)
      .map(|i| attempt(i, 100, 1, i >= 7, 0, None, 0))
      .collect();
    let risk = classify_student_risk(100, &attempts, Utc::now()).expect("at risk");
    assert_eq!(risk.level, RiskLevel::High);
    assert_eq!(risk.failure_rate, 70.0);
  }

  #[test]
  fn forty_percent_failure_is_not_medium() {
    // Boundary is exclusive: 2 failures in 5 is exactly 40%.
    let attempts: Vec<Attempt> = (0..5)
      .map(|i| attempt(i, 100, 1, i >= 2, 0, None, 0))
      .collect();
    assert!(classify_student_risk(100, &attempts, Utc::now()).is_none());

    // The same record counts as inactive once it goes stale.
    let stale: Vec<Attempt> = (0..5)
      .map(|i| attempt(i, 100, 1, i >= 2, 0, None, 8))
      .collect();
    let risk = classify_student_risk(100, &stale, Utc::now()).expect("inactive");
    assert_eq!(risk.level, RiskLevel::Inactive);
  }

  #[test]
  fn exactly_sixty_percent_failure_is_medium_not_high() {
    let attempts: Vec<Attempt> = (0..5)
      .map(|i| attempt(i, 100, 1, i >= 3, 0, None, 0))
      .collect();
    let risk = classify_student_risk(100, &attempts, Utc::now()).expect("at risk");
    assert_eq!(risk.level, RiskLevel::Medium);
    assert_eq!(risk.failure_rate, 60.0);
  }

  #[test]
  fn risk_threshold_compares_the_unrounded_rate() {
    // 2401 failures in 4000 is 60.025%: past the high boundary, but it
    // rounds to 60.0, which on its own would read as medium.
    let attempts: Vec<Attempt> = (0..4000)
      .map(|i| attempt(i, 100, 1, i >= 2401, 0, None, 0))
      .collect();
    let risk = classify_student_risk(100, &attempts, Utc::now()).expect("at risk");
    assert_eq!(risk.level, RiskLevel::High);
    assert_eq!(risk.failure_rate, 60.0);
  }

  #[test]
  fn high_failure_takes_precedence_over_inactivity() {
    let attempts: Vec<Attempt> = (0..10)
      .map(|i| attempt(i, 100, 1, i >= 7, 0, None, 30))
      .collect();
    let risk = classify_student_risk(100, &attempts, Utc::now()).expect("at risk");
    assert_eq!(risk.level, RiskLevel::High);
  }

  #[tokio::test]
  async fn dashboard_rolls_up_completion_failure_and_risk() {
    let state = three_stage_state();
    initialize_sequence(&state, 100, 1).await;
    initialize_sequence(&state, 200, 1).await;

    // Student 100 passes stage 1 first try; student 200 fails seven times
    // and then passes.
    record_attempt(&state, 100, 1, true, Some(60), None).await.expect("attempt");
    for _ in 0..7 {
      record_attempt(&state, 200, 1, false, Some(100), None).await.expect("attempt");
    }
    record_attempt(&state, 200, 1, true, Some(80), None).await.expect("attempt");

    let summary = dashboard_summary(&state, None).await;
    // 2 of 6 progress records completed (stage 1 for both students, and
    // both stage-2 unlocks remain incomplete).
    assert_eq!(summary.completion_rate, 33.3);
    assert_eq!(summary.retention_rate, 33.3);
    // 7 failures out of 9 attempts.
    assert_eq!(summary.failure_rate, 77.8);
    // Average time counts only the two passing attempts (60s and 80s);
    // the seven 100-second failures stay out of it.
    assert_eq!(summary.avg_time_seconds, Some(70.0));

    assert_eq!(summary.at_risk_students.len(), 1);
    let risky = &summary.at_risk_students[0];
    assert_eq!(risky.student_id, 200);
    assert_eq!(risky.level, RiskLevel::High);

    // Stage 1 has 9 attempts and makes the cut; nothing else does.
    assert_eq!(summary.difficult_stages.len(), 1);
    assert_eq!(summary.difficult_stages[0].stage_id, 1);
  }

  #[tokio::test]
  async fn owner_scope_restricts_retention_and_risk() {
    // Two owners: stages 1-2 belong to owner 1, stage 5 to owner 2.
    let mut other = stage(5, 2, 1);
    other.owner_id = Some(2);
    let state = AppState::with_content(ContentStore::from_parts(
      vec![stage(1, 1, 1), stage(2, 1, 2), other],
      vec![],
    ));
    initialize_sequence(&state, 100, 1).await;
    initialize_sequence(&state, 100, 2).await;

    record_attempt(&state, 100, 1, true, None, None).await.expect("attempt");
    for _ in 0..5 {
      record_attempt(&state, 100, 5, false, None, None).await.expect("attempt");
    }

    let summary = dashboard_summary(&state, Some(1)).await;
    // Owner 1's stages: stage 1 completed, stage 2 unlocked-but-incomplete.
    assert_eq!(summary.retention_rate, 50.0);
    // Owner 1's attempts are the single success on stage 1.
    assert_eq!(summary.failure_rate, 0.0);
    assert!(summary.at_risk_students.is_empty());

    let summary = dashboard_summary(&state, Some(2)).await;
    assert_eq!(summary.failure_rate, 100.0);
    assert_eq!(summary.at_risk_students.len(), 1);
    assert_eq!(summary.at_risk_students[0].level, RiskLevel::High);
  }
}
