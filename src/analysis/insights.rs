use std::sync::Arc;

use serde::Serialize;

use crate::config::DEEP_WORK_WEIGHT;

use super::{
    breakdown::{CategoryBreakdown, HourlyBreakdown},
    scoring::ScoreResult,
    switches::{DeathLoop, LoopVerdict},
};

/// A category called out as helping or hurting the week.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryImpact {
    pub category: Arc<str>,
    pub hours: f64,
    pub impact: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub top_insight: String,
    pub productivity_drivers: Vec<CategoryImpact>,
    pub productivity_drains: Vec<CategoryImpact>,
    pub schedule_recommendations: Vec<String>,
    pub one_change: String,
}

const DRIVER_FLOOR_HOURS: f64 = 1.0;
const DRAIN_FLOOR_HOURS: f64 = 0.5;

/// Condenses the computed breakdowns into advisory text. Candidate rules are
/// ranked by expected score improvement and evaluated in a fixed order, so
/// identical inputs always produce the same advice.
pub fn recommend(
    categories: &[CategoryBreakdown],
    hourly: &[HourlyBreakdown],
    death_loops: &[DeathLoop],
    scores: ScoreResult,
) -> Insights {
    if categories.is_empty() {
        return Insights {
            top_insight: "Insufficient data - nothing was tracked in this period".into(),
            productivity_drivers: vec![],
            productivity_drains: vec![],
            schedule_recommendations: vec![],
            one_change: "Collect at least one full day of tracking data".into(),
        };
    }

    let productivity_drivers = categories
        .iter()
        .filter(|v| v.weight >= DEEP_WORK_WEIGHT && v.hours > DRIVER_FLOOR_HOURS)
        .map(|v| CategoryImpact {
            category: v.category.clone(),
            hours: v.hours,
            impact: "positive",
        })
        .collect();

    let productivity_drains: Vec<CategoryImpact> = categories
        .iter()
        .filter(|v| v.weight < 0. && v.hours > DRAIN_FLOOR_HOURS)
        .map(|v| CategoryImpact {
            category: v.category.clone(),
            hours: v.hours,
            impact: "negative",
        })
        .collect();

    let mut schedule_recommendations = vec![];
    if let Some(peak) = hourly
        .iter()
        .max_by(|a, b| a.productive_pct.partial_cmp(&b.productive_pct).expect("percentages are finite"))
    {
        schedule_recommendations.push(format!(
            "Schedule deep work around {:02}:00-{:02}:00 (your most productive hours)",
            peak.hour,
            (peak.hour + 2) % 24
        ));
    }
    if let Some(danger) = hourly.iter().max_by_key(|v| v.switches) {
        if danger.switches > 0 && (danger.hour < 6 || danger.hour >= 23) {
            schedule_recommendations.push(format!(
                "Late night work ({:02}:00) shows heavy context switching - consider ending earlier",
                danger.hour
            ));
        }
    }

    Insights {
        top_insight: top_insight(scores),
        one_change: one_change(categories, hourly, death_loops),
        productivity_drivers,
        productivity_drains,
        schedule_recommendations,
    }
}

fn top_insight(scores: ScoreResult) -> String {
    if scores.focus_score < 50. {
        "High context switching is fragmenting your attention".into()
    } else if scores.productivity_score < 50. {
        "Distraction time is eating into productive hours".into()
    } else if scores.productivity_score >= 70. && scores.focus_score >= 70. {
        "Strong productivity patterns - focus on maintaining consistency".into()
    } else {
        "Mixed patterns - small improvements in focus will compound".into()
    }
}

/// The single highest value intervention. Death loops are the cheapest fix,
/// then the biggest negative weight time sink, then the most switch heavy
/// hour. Ties fall to whichever candidate ranks first, matching the order
/// the rules are declared in.
fn one_change(
    categories: &[CategoryBreakdown],
    hourly: &[HourlyBreakdown],
    death_loops: &[DeathLoop],
) -> String {
    // Loops arrive sorted by count, so the first non exempt one is the worst.
    if let Some(worst) = death_loops
        .iter()
        .find(|v| v.verdict != LoopVerdict::AiAssisted)
    {
        return format!(
            "{} ({} \u{2194} {}, {} times)",
            worst.suggestion, worst.apps.0, worst.apps.1, worst.count
        );
    }

    if let Some(drain) = categories
        .iter()
        .filter(|v| v.weight < 0. && v.hours > 0.)
        .max_by(|a, b| a.hours.partial_cmp(&b.hours).expect("hours are finite"))
    {
        return format!(
            "Cut down on {} - it took {:.1}h this period",
            drain.category, drain.hours
        );
    }

    if let Some(danger) = hourly.iter().filter(|v| v.switches > 0).max_by_key(|v| v.switches) {
        return format!(
            "Protect {:02}:00-{:02}:00 - your most switch heavy hour",
            danger.hour,
            (danger.hour + 1) % 24
        );
    }

    "Protect your peak hours by blocking notifications".into()
}
