//! Read-only directory of stages and hint definitions.
//!
//! The core never mutates content; it only needs id lookup, per-sequence
//! ordinal ordering, and successor lookup. Built once at startup from the
//! TOML catalog plus built-in seeds, then shared immutably.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::config::ContentConfig;
use crate::domain::{HintDefinition, HintId, OwnerId, SequenceId, Stage, StageId};
use crate::seeds::{seed_hints, seed_stages};

#[derive(Clone, Default)]
pub struct ContentStore {
  stages: HashMap<StageId, Stage>,
  hints: HashMap<HintId, HintDefinition>,
}

impl ContentStore {
  /// Build from the optional TOML catalog. Seeds fill in afterwards without
  /// overwriting configured ids.
  pub fn new(cfg: Option<ContentConfig>) -> Self {
    let mut store = ContentStore::default();
    if let Some(cfg) = cfg {
      for s in cfg.stages {
        store.insert_stage(s.into_stage());
      }
      for h in cfg.hints {
        store.insert_hint(h.into_hint());
      }
    }
    for s in seed_stages() {
      store.stages.entry(s.id).or_insert(s);
    }
    for h in seed_hints() {
      store.hints.entry(h.id).or_insert(h);
    }

    for h in store.hints.values() {
      if !store.stages.contains_key(&h.stage_id) {
        warn!(target: "edupractica_backend", hint_id = h.id, stage_id = h.stage_id, "Hint references an unknown stage");
      }
    }
    info!(
      target: "edupractica_backend",
      stages = store.stages.len(),
      hints = store.hints.len(),
      "Content catalog ready"
    );
    store
  }

  /// Build over explicit data; tests use this.
  pub fn from_parts(stages: Vec<Stage>, hints: Vec<HintDefinition>) -> Self {
    let mut store = ContentStore::default();
    for s in stages {
      store.insert_stage(s);
    }
    for h in hints {
      store.insert_hint(h);
    }
    store
  }

  fn insert_stage(&mut self, s: Stage) {
    if self.stages.insert(s.id, s).is_some() {
      warn!(target: "edupractica_backend", "Duplicate stage id in catalog; keeping the later entry");
    }
  }

  fn insert_hint(&mut self, h: HintDefinition) {
    if self.hints.insert(h.id, h).is_some() {
      warn!(target: "edupractica_backend", "Duplicate hint id in catalog; keeping the later entry");
    }
  }

  pub fn stage(&self, id: StageId) -> Option<&Stage> {
    self.stages.get(&id)
  }

  pub fn hint(&self, id: HintId) -> Option<&HintDefinition> {
    self.hints.get(&id)
  }

  /// Active stages of a sequence, ordered by (ordinal, id).
  pub fn sequence_stages(&self, sequence_id: SequenceId) -> Vec<Stage> {
    let mut stages: Vec<Stage> = self
      .stages
      .values()
      .filter(|s| s.sequence_id == sequence_id && s.active)
      .cloned()
      .collect();
    stages.sort_by_key(|s| (s.ordinal, s.id));
    stages
  }

  /// Successor of a stage: the smallest active ordinal strictly greater than
  /// the current one within the same sequence. Duplicate ordinals are a
  /// data-integrity gap in the catalog; the lowest stage id wins so the
  /// lookup stays deterministic.
  pub fn successor(&self, current: &Stage) -> Option<Stage> {
    self
      .stages
      .values()
      .filter(|s| s.sequence_id == current.sequence_id && s.active && s.ordinal > current.ordinal)
      .min_by_key(|s| (s.ordinal, s.id))
      .cloned()
  }

  /// Active hints configured for a stage, in display order.
  pub fn stage_hints(&self, stage_id: StageId) -> Vec<HintDefinition> {
    let mut hints: Vec<HintDefinition> = self
      .hints
      .values()
      .filter(|h| h.stage_id == stage_id && h.active)
      .cloned()
      .collect();
    hints.sort_by_key(|h| (h.sequence_order, h.id));
    hints
  }

  /// Stage ids visible to an analytics scope: one owner's stages, or the
  /// whole catalog when no owner is given.
  pub fn scoped_stage_ids(&self, owner: Option<OwnerId>) -> HashSet<StageId> {
    self
      .stages
      .values()
      .filter(|s| owner.is_none() || s.owner_id == owner)
      .map(|s| s.id)
      .collect()
  }
}
