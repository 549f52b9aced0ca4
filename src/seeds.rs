//! Seed catalog: a small built-in sequence so the server is useful even
//! without external content configuration.

use crate::domain::{HintDefinition, Stage};

/// Three-stage demo sequence. Only stage 1 is unlocked for a fresh student.
pub fn seed_stages() -> Vec<Stage> {
  vec![
    Stage {
      id: 1,
      sequence_id: 1,
      ordinal: 1,
      title: "Fractions: naming the parts".into(),
      owner_id: Some(1),
      active: true,
    },
    Stage {
      id: 2,
      sequence_id: 1,
      ordinal: 2,
      title: "Fractions: comparing halves and quarters".into(),
      owner_id: Some(1),
      active: true,
    },
    Stage {
      id: 3,
      sequence_id: 1,
      ordinal: 3,
      title: "Fractions: adding with a common denominator".into(),
      owner_id: Some(1),
      active: true,
    },
  ]
}

/// Scaffolded hints for the demo sequence. Each attempt on stage 1 may
/// consume at most three of them.
pub fn seed_hints() -> Vec<HintDefinition> {
  vec![
    HintDefinition {
      id: 1,
      stage_id: 1,
      sequence_order: 1,
      title: "Look at the denominator".into(),
      text: "The bottom number tells you how many equal parts the whole is split into.".into(),
      media_url: None,
      max_hints_per_attempt: Some(3),
      active: true,
    },
    HintDefinition {
      id: 2,
      stage_id: 1,
      sequence_order: 2,
      title: "Count the shaded parts".into(),
      text: "The top number counts the parts you actually have.".into(),
      media_url: None,
      max_hints_per_attempt: Some(3),
      active: true,
    },
    HintDefinition {
      id: 3,
      stage_id: 1,
      sequence_order: 3,
      title: "Worked example".into(),
      text: "Three shaded parts out of four equal parts is 3/4.".into(),
      media_url: None,
      max_hints_per_attempt: Some(3),
      active: true,
    },
    HintDefinition {
      id: 4,
      stage_id: 2,
      sequence_order: 1,
      title: "Same whole, different cuts".into(),
      text: "Draw both fractions over the same rectangle before comparing.".into(),
      media_url: None,
      max_hints_per_attempt: Some(2),
      active: true,
    },
  ]
}
