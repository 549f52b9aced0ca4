//! Application state: the read-only content catalog plus the mutable
//! progress, attempt, hint-view, and analytics stores.
//!
//! Every mutable store sits behind a `tokio::sync::RwLock`. Write-lock
//! scopes are the mutual-exclusion boundary the core's ordering guarantees
//! rely on:
//!   - attempt numbering runs entirely under the ledger write lock
//!   - progress transitions run under the progress write lock
//!   - the hint budget check-and-increment holds the ledger and view-store
//!     locks together (ledger first, views second — keep that order)

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::config::load_content_config_from_env;
use crate::content::ContentStore;
use crate::domain::{
  Attempt, AttemptId, HintId, HintView, ProgressRecord, StageAnalytics, StageId, StudentId,
};

/// Append-only attempt store plus its id counter.
#[derive(Default)]
pub struct AttemptLedger {
  pub by_id: HashMap<AttemptId, Attempt>,
  next_id: AttemptId,
}

impl AttemptLedger {
  pub fn next_id(&mut self) -> AttemptId {
    self.next_id += 1;
    self.next_id
  }

  /// Highest attempt_number recorded for (student, stage); 0 when none.
  /// Only meaningful while the caller holds the ledger write lock.
  pub fn max_attempt_number(&self, student_id: StudentId, stage_id: StageId) -> u32 {
    self
      .by_id
      .values()
      .filter(|a| a.student_id == student_id && a.stage_id == stage_id)
      .map(|a| a.attempt_number)
      .max()
      .unwrap_or(0)
  }

  pub fn stage_attempts(&self, stage_id: StageId) -> Vec<Attempt> {
    self
      .by_id
      .values()
      .filter(|a| a.stage_id == stage_id)
      .cloned()
      .collect()
  }
}

#[derive(Clone)]
pub struct AppState {
  pub content: ContentStore,
  pub progress: Arc<RwLock<HashMap<(StudentId, StageId), ProgressRecord>>>,
  pub attempts: Arc<RwLock<AttemptLedger>>,
  pub hint_views: Arc<RwLock<HashMap<(AttemptId, HintId), HintView>>>,
  pub analytics: Arc<RwLock<HashMap<StageId, StageAnalytics>>>,
}

impl AppState {
  /// Build state from env: load the content catalog, start with empty stores.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    Self::with_content(ContentStore::new(load_content_config_from_env()))
  }

  /// Build state over an explicit catalog (tests go through this).
  pub fn with_content(content: ContentStore) -> Self {
    Self {
      content,
      progress: Arc::new(RwLock::new(HashMap::new())),
      attempts: Arc::new(RwLock::new(AttemptLedger::default())),
      hint_views: Arc::new(RwLock::new(HashMap::new())),
      analytics: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  /// Progress record for one (student, stage), if any exists yet.
  pub async fn get_progress(
    &self,
    student_id: StudentId,
    stage_id: StageId,
  ) -> Option<ProgressRecord> {
    self.progress.read().await.get(&(student_id, stage_id)).cloned()
  }
}
