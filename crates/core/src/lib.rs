pub mod content;
pub mod evaluator;
pub mod math;
pub mod narration;
pub mod quiz;
pub mod sample;
pub mod segmenter;
pub mod session;

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Ages the content service generates material for.
///
/// Callers are expected to check this before starting a session transition;
/// the session itself forwards whatever age it is given.
pub const SUPPORTED_AGES: RangeInclusive<u8> = 4..=12;

/// The single learning activity a session is engaged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    None,
    Story,
    DailyRoutine,
    Quiz,
    Math,
}
