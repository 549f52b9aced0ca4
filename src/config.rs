//! Loading the content catalog (stages + hint definitions) from TOML.
//!
//! Content is externally owned and read-only to the core; this loader is the
//! stand-in for that collaborator. See `ContentConfig` for the expected
//! schema. The path comes from `CONTENT_CONFIG_PATH`.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{HintDefinition, HintId, OwnerId, SequenceId, Stage, StageId};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentConfig {
  #[serde(default)]
  pub stages: Vec<StageCfg>,
  #[serde(default)]
  pub hints: Vec<HintCfg>,
}

/// Stage entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct StageCfg {
  pub id: StageId,
  pub sequence_id: SequenceId,
  pub ordinal: u32,
  pub title: String,
  #[serde(default)]
  pub owner_id: Option<OwnerId>,
  #[serde(default = "default_true")]
  pub active: bool,
}

/// Hint entry accepted in TOML configuration.
/// `max_hints_per_attempt` left out means the hint budget is unlimited.
#[derive(Clone, Debug, Deserialize)]
pub struct HintCfg {
  pub id: HintId,
  pub stage_id: StageId,
  #[serde(default = "default_sequence_order")]
  pub sequence_order: u32,
  pub title: String,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub media_url: Option<String>,
  #[serde(default)]
  pub max_hints_per_attempt: Option<u32>,
  #[serde(default = "default_true")]
  pub active: bool,
}

fn default_true() -> bool {
  true
}

fn default_sequence_order() -> u32 {
  1
}

impl StageCfg {
  pub fn into_stage(self) -> Stage {
    Stage {
      id: self.id,
      sequence_id: self.sequence_id,
      ordinal: self.ordinal,
      title: self.title,
      owner_id: self.owner_id,
      active: self.active,
    }
  }
}

impl HintCfg {
  pub fn into_hint(self) -> HintDefinition {
    HintDefinition {
      id: self.id,
      stage_id: self.stage_id,
      sequence_order: self.sequence_order,
      title: self.title,
      text: self.text,
      media_url: self.media_url,
      max_hints_per_attempt: self.max_hints_per_attempt,
      active: self.active,
    }
  }
}

/// Attempt to load `ContentConfig` from CONTENT_CONFIG_PATH.
/// On any parsing/IO error, returns None.
pub fn load_content_config_from_env() -> Option<ContentConfig> {
  let path = std::env::var("CONTENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ContentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "edupractica_backend", %path, "Loaded content catalog (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "edupractica_backend", %path, error = %e, "Failed to parse TOML content catalog");
        None
      }
    },
    Err(e) => {
      error!(target: "edupractica_backend", %path, error = %e, "Failed to read TOML content catalog file");
      None
    }
  }
}
