pub mod agent;
pub mod breakdown;
pub mod category;
pub mod insights;
pub mod scoring;
pub mod segments;
pub mod switches;

use chrono::{Duration, FixedOffset};
use serde::Serialize;

use crate::{
    config::AnalyzerConfig,
    ingest::{LoadStats, RawEvent},
    utils::{percentage::Percentage, time::duration_hours},
};

use self::{
    agent::tag_ai_segments,
    breakdown::{
        agent_usage, browser_titles, categories, daily, hourly, switch_stats, top_apps,
        AgentUsage, AppBreakdown, BrowserBreakdown, CategoryBreakdown, DailyBreakdown,
        HourlyBreakdown, SwitchStats,
    },
    insights::{recommend, Insights},
    scoring::{interpretation, score, ScoreResult},
    segments::build_segments,
    switches::{collect_switches, detect_death_loops, DeathLoop},
};

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub days_tracked: usize,
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub date_range: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    #[serde(flatten)]
    pub scores: ScoreResult,
    pub interpretation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeTotals {
    pub total_active_hours: f64,
    pub average_hours_per_day: f64,
}

/// The full result of one analysis run. Computation ends here, rendering
/// (json or the text report) happens elsewhere from this same object.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub period: PeriodSummary,
    pub scores: ScoreSummary,
    pub time_totals: TimeTotals,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub top_apps: Vec<AppBreakdown>,
    pub browser_breakdown: Vec<BrowserBreakdown>,
    pub hourly_breakdown: Vec<HourlyBreakdown>,
    pub daily_trend: Vec<DailyBreakdown>,
    pub context_switching: SwitchStats,
    pub death_loops: Vec<DeathLoop>,
    pub ai_sessions: Vec<AgentUsage>,
    pub insights: Insights,
}

/// Runs the whole pipeline: raw events to normalized segments, agent
/// tagging, switch scanning, scoring, breakdowns, and advice. Pure apart
/// from allocation, so identical inputs give identical reports.
pub fn analyze(
    events: Vec<RawEvent>,
    load_stats: LoadStats,
    min_app_percentage: Percentage,
    config: &AnalyzerConfig,
    offset: FixedOffset,
) -> AnalysisReport {
    let mut segments = build_segments(events, config);
    tag_ai_segments(&mut segments, config);

    let switches = collect_switches(&segments);
    let death_loops = detect_death_loops(&segments, &switches, config);
    let scores = score(&segments, &death_loops, config);

    let category_breakdown = categories(&segments);
    let top_apps = top_apps(&segments, &config.taxonomy, min_app_percentage);
    let browser_breakdown = browser_titles(&segments, config);
    let hourly_breakdown = hourly(&segments, &switches, offset);
    let daily_trend = daily(&segments, offset);
    let context_switching = switch_stats(&switches, daily_trend.len(), hourly_breakdown.len());
    let ai_sessions = agent_usage(&segments, &switches);
    let insights = recommend(&category_breakdown, &hourly_breakdown, &death_loops, scores);

    let total = segments
        .iter()
        .fold(Duration::zero(), |sum, v| sum + v.duration());
    let date_range = match (daily_trend.first(), daily_trend.last()) {
        (Some(first), Some(last)) => Some(format!("{} to {}", first.day, last.day)),
        _ => None,
    };

    AnalysisReport {
        period: PeriodSummary {
            days_tracked: daily_trend.len(),
            total_rows: load_stats.total_rows,
            skipped_rows: load_stats.skipped_rows,
            date_range,
        },
        scores: ScoreSummary {
            scores,
            interpretation: interpretation(scores.combined_score),
        },
        time_totals: TimeTotals {
            total_active_hours: duration_hours(total),
            average_hours_per_day: duration_hours(total / daily_trend.len().max(1) as i32),
        },
        category_breakdown,
        top_apps,
        browser_breakdown,
        hourly_breakdown,
        daily_trend,
        context_switching,
        death_loops,
        ai_sessions,
        insights,
    }
}

pub(crate) mod duration_secs {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
