//! Fasting stage classification.
//!
//! Elapsed fasting time falls into one of six contiguous bands. Bands are
//! half-open with an inclusive lower bound, so exactly 4h is stage 1.

use serde::Serialize;

const HOUR: u64 = 3600;

/// Lower bounds of stages 1 through 5, in seconds
pub const STAGE_THRESHOLDS_SECS: [u64; 5] = [4 * HOUR, 12 * HOUR, 16 * HOUR, 24 * HOUR, 36 * HOUR];

/// Descriptive metadata for one stage
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct FastingStage {
    pub title: &'static str,
    pub description: &'static str,
    pub label: &'static str,
}

pub const FASTING_STAGES: [FastingStage; 6] = [
    FastingStage {
        title: "Digesting & Storing",
        description: "Your body is processing your last meal, and insulin levels are elevated.",
        label: "0-4 hours",
    },
    FastingStage {
        title: "Blood Sugar Falling",
        description: "Insulin levels are declining. Your body will soon tap into glycogen for energy.",
        label: "4-12 hours",
    },
    FastingStage {
        title: "Fat Burning Begins",
        description: "Glycogen stores are depleting. Your body is starting to burn fat for fuel.",
        label: "12-16 hours",
    },
    FastingStage {
        title: "Ketosis & Cleanup",
        description: "Deeper fat burning is active. Autophagy, the cellular repair process, is beginning.",
        label: "16-24 hours",
    },
    FastingStage {
        title: "Deep Ketosis",
        description: "Fat burning is significant. Autophagy is ramping up, clearing out old cells.",
        label: "24-36 hours",
    },
    FastingStage {
        title: "Growth Hormone Boost",
        description: "HGH levels rise. Continued autophagy and immune cell regeneration.",
        label: "36+ hours",
    },
];

/// Map elapsed seconds to a stage index in `0..=5`
pub fn classify(elapsed_secs: u64) -> usize {
    STAGE_THRESHOLDS_SECS
        .iter()
        .take_while(|&&threshold| elapsed_secs >= threshold)
        .count()
}

/// Metadata for a stage index, clamped to the last stage
pub fn stage(index: usize) -> &'static FastingStage {
    &FASTING_STAGES[index.min(FASTING_STAGES.len() - 1)]
}

/// Percentage of `goal_hours` covered by `elapsed_secs`, capped at 100
pub fn progress_percent(elapsed_secs: u64, goal_hours: u32) -> f64 {
    let goal_secs = u64::from(goal_hours) * HOUR;
    if goal_secs == 0 {
        return 100.0;
    }
    (elapsed_secs as f64 / goal_secs as f64 * 100.0).min(100.0)
}
