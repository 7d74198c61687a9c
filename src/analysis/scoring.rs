use serde::Serialize;

use crate::config::AnalyzerConfig;

use super::{
    segments::Segment,
    switches::{DeathLoop, LoopVerdict},
};

/// Final scores of the analysis period, each inside [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub productivity_score: f64,
    pub focus_score: f64,
    pub combined_score: f64,
}

impl ScoreResult {
    pub fn zero() -> Self {
        Self {
            productivity_score: 0.,
            focus_score: 0.,
            combined_score: 0.,
        }
    }
}

/// Productivity is the duration weighted average of positive category
/// weights. Negative weight time contributes duration but no credit, so it
/// drags the score through proportion alone. Focus starts at 100 and loses a
/// fixed penalty per non exempt death loop occurrence.
pub fn score(segments: &[Segment], death_loops: &[DeathLoop], config: &AnalyzerConfig) -> ScoreResult {
    let total_seconds: f64 = segments
        .iter()
        .map(|v| v.duration().num_seconds() as f64)
        .sum();
    if total_seconds <= 0. {
        return ScoreResult::zero();
    }

    let credited: f64 = segments
        .iter()
        .map(|v| v.duration().num_seconds() as f64 * v.weight.clamp(0., 1.))
        .sum();
    let productivity_score = (credited / total_seconds * 100.).clamp(0., 100.);

    let penalized_occurrences: f64 = death_loops
        .iter()
        .filter(|v| v.verdict != LoopVerdict::AiAssisted)
        .map(|v| v.count as f64)
        .sum();
    let focus_score = (100. - penalized_occurrences * config.switch_penalty).clamp(0., 100.);

    let combined_score = ((productivity_score * config.productivity_weight
        + focus_score * config.focus_weight)
        / (config.productivity_weight + config.focus_weight))
        .round()
        .clamp(0., 100.);

    ScoreResult {
        productivity_score,
        focus_score,
        combined_score,
    }
}

pub fn interpretation(combined_score: f64) -> &'static str {
    if combined_score >= 80. {
        "Excellent"
    } else if combined_score >= 60. {
        "Good"
    } else if combined_score >= 40. {
        "Moderate"
    } else {
        "Needs improvement"
    }
}
