use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, FixedOffset, NaiveDate, Timelike};
use serde::Serialize;

use crate::{
    config::{is_idle_title, AnalyzerConfig, Taxonomy, DEEP_WORK_WEIGHT},
    utils::{
        percentage::{duration_percentage, Percentage},
        time::{duration_hours, next_day_start, next_hour_start},
    },
};

use super::{agent::detect_agent, category::classify, segments::Segment, switches::SwitchEvent};

/// Hours with less activity than this are noise and left out of the hourly
/// breakdown.
const ACTIVE_HOUR_FLOOR_MINUTES: i64 = 5;

const TOP_APP_LIMIT: usize = 20;
const BROWSER_TITLE_LIMIT: usize = 30;
const BROWSER_TITLE_WIDTH: usize = 60;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category: Arc<str>,
    pub hours: f64,
    pub percentage: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppBreakdown {
    pub app: Arc<str>,
    pub hours: f64,
    pub percentage: f64,
    pub category: Arc<str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserBreakdown {
    pub title: String,
    pub hours: f64,
    pub category: Arc<str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyBreakdown {
    pub hour: u32,
    pub total_hours: f64,
    pub productive_hours: f64,
    pub productive_pct: f64,
    pub switches: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyBreakdown {
    pub day: NaiveDate,
    pub total_hours: f64,
    pub productive_hours: f64,
    pub productive_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentUsage {
    pub agent: &'static str,
    pub hours: f64,
    pub switches: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SwitchStats {
    pub total_switches: u32,
    pub per_day: f64,
    pub per_active_hour: f64,
}

/// Time per category, largest first.
pub fn categories(segments: &[Segment]) -> Vec<CategoryBreakdown> {
    let total = total_duration(segments);
    let mut map: HashMap<Arc<str>, (Duration, f64)> = HashMap::new();
    for segment in segments {
        let entry = map
            .entry(segment.category.clone())
            .or_insert((Duration::zero(), segment.weight));
        entry.0 = entry.0 + segment.duration();
    }

    let mut result: Vec<_> = map
        .into_iter()
        .map(|(category, (duration, weight))| CategoryBreakdown {
            category,
            hours: duration_hours(duration),
            percentage: duration_percentage(duration, total).rounded(),
            weight,
        })
        .collect();
    result.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .expect("hours are finite")
            .then_with(|| a.category.cmp(&b.category))
    });
    result
}

/// Time per app, largest first, filtered to apps above `min_percentage` of
/// the total. The category column uses an app only classification, the same
/// view the death loop verdicts get.
pub fn top_apps(
    segments: &[Segment],
    taxonomy: &Taxonomy,
    min_percentage: Percentage,
) -> Vec<AppBreakdown> {
    let total = total_duration(segments);
    let mut map: HashMap<Arc<str>, Duration> = HashMap::new();
    for segment in segments {
        let entry = map.entry(segment.app.clone()).or_insert(Duration::zero());
        *entry = *entry + segment.duration();
    }

    let mut result: Vec<_> = map
        .into_iter()
        .filter(|(_, duration)| *duration_percentage(*duration, total) >= *min_percentage)
        .map(|(app, duration)| AppBreakdown {
            category: classify(&app, "", taxonomy).category,
            hours: duration_hours(duration),
            percentage: duration_percentage(duration, total).rounded(),
            app,
        })
        .collect();
    result.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .expect("hours are finite")
            .then_with(|| a.app.cmp(&b.app))
    });
    result.truncate(TOP_APP_LIMIT);
    result
}

/// What the browser was actually used for, by window title. Idle titles say
/// nothing and are skipped.
pub fn browser_titles(segments: &[Segment], config: &AnalyzerConfig) -> Vec<BrowserBreakdown> {
    let mut map: HashMap<String, (Duration, Arc<str>)> = HashMap::new();
    for segment in segments {
        if !config.is_browser(&segment.app) || is_idle_title(&segment.title) {
            continue;
        }
        let title = truncate_title(&segment.title);
        let entry = map
            .entry(title)
            .or_insert((Duration::zero(), segment.category.clone()));
        entry.0 = entry.0 + segment.duration();
    }

    let mut result: Vec<_> = map
        .into_iter()
        .map(|(title, (duration, category))| BrowserBreakdown {
            title,
            hours: duration_hours(duration),
            category,
        })
        .collect();
    result.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .expect("hours are finite")
            .then_with(|| a.title.cmp(&b.title))
    });
    result.truncate(BROWSER_TITLE_LIMIT);
    result
}

fn truncate_title(title: &str) -> String {
    let trimmed = title.trim();
    match trimmed.char_indices().nth(BROWSER_TITLE_WIDTH) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Activity per hour of day, with segments sliced across hour boundaries so
/// a long block credits every hour it actually covered. Hours below the
/// activity floor are dropped.
pub fn hourly(
    segments: &[Segment],
    switches: &[SwitchEvent],
    offset: FixedOffset,
) -> Vec<HourlyBreakdown> {
    let mut totals = [Duration::zero(); 24];
    let mut productive = [Duration::zero(); 24];
    for segment in segments {
        let is_productive = segment.weight >= DEEP_WORK_WEIGHT;
        let mut cursor = segment.start.with_timezone(&offset);
        let end = segment.end.with_timezone(&offset);
        while cursor < end {
            let boundary = next_hour_start(cursor).min(end);
            let hour = cursor.hour() as usize;
            totals[hour] = totals[hour] + (boundary - cursor);
            if is_productive {
                productive[hour] = productive[hour] + (boundary - cursor);
            }
            cursor = boundary;
        }
    }

    let mut switch_counts = [0u32; 24];
    for switch in switches {
        switch_counts[switch.at.with_timezone(&offset).hour() as usize] += 1;
    }

    (0..24)
        .filter(|hour| totals[*hour] >= Duration::minutes(ACTIVE_HOUR_FLOOR_MINUTES))
        .map(|hour| HourlyBreakdown {
            hour: hour as u32,
            total_hours: duration_hours(totals[hour]),
            productive_hours: duration_hours(productive[hour]),
            productive_pct: duration_percentage(productive[hour], totals[hour]).rounded(),
            switches: switch_counts[hour],
        })
        .collect()
}

/// Day by day trend, chronological.
pub fn daily(segments: &[Segment], offset: FixedOffset) -> Vec<DailyBreakdown> {
    let mut map: HashMap<NaiveDate, (Duration, Duration)> = HashMap::new();
    for segment in segments {
        let is_productive = segment.weight >= DEEP_WORK_WEIGHT;
        let mut cursor = segment.start.with_timezone(&offset);
        let end = segment.end.with_timezone(&offset);
        while cursor < end {
            let boundary = next_day_start(cursor).min(end);
            let entry = map
                .entry(cursor.date_naive())
                .or_insert((Duration::zero(), Duration::zero()));
            entry.0 = entry.0 + (boundary - cursor);
            if is_productive {
                entry.1 = entry.1 + (boundary - cursor);
            }
            cursor = boundary;
        }
    }

    let mut result: Vec<_> = map
        .into_iter()
        .map(|(day, (total, productive))| DailyBreakdown {
            day,
            total_hours: duration_hours(total),
            productive_hours: duration_hours(productive),
            productive_pct: duration_percentage(productive, total).rounded(),
        })
        .collect();
    result.sort_by_key(|v| v.day);
    result
}

/// Per agent usage summary: how long each detected agent ran and how many
/// switches its sessions were part of.
pub fn agent_usage(segments: &[Segment], switches: &[SwitchEvent]) -> Vec<AgentUsage> {
    let mut map: HashMap<&'static str, (Duration, u32)> = HashMap::new();
    for segment in segments.iter().filter(|v| v.is_ai_assisted) {
        let Some(signature) = detect_agent(&segment.title) else {
            continue;
        };
        let entry = map.entry(signature.agent).or_insert((Duration::zero(), 0));
        entry.0 = entry.0 + segment.duration();
    }

    for switch in switches {
        let ai_side = [switch.from, switch.to]
            .into_iter()
            .find(|index| segments[*index].is_ai_assisted);
        let Some(index) = ai_side else { continue };
        if let Some(signature) = detect_agent(&segments[index].title) {
            if let Some(entry) = map.get_mut(signature.agent) {
                entry.1 += 1;
            }
        }
    }

    let mut result: Vec<_> = map
        .into_iter()
        .map(|(agent, (duration, switches))| AgentUsage {
            agent,
            hours: duration_hours(duration),
            switches,
        })
        .collect();
    result.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .expect("hours are finite")
            .then_with(|| a.agent.cmp(b.agent))
    });
    result
}

pub fn switch_stats(
    switches: &[SwitchEvent],
    days_tracked: usize,
    active_hours: usize,
) -> SwitchStats {
    let total = switches.len() as u32;
    let per_day = total as f64 / days_tracked.max(1) as f64;
    let per_active_hour = total as f64 / active_hours.max(1) as f64;
    SwitchStats {
        total_switches: total,
        per_day: (per_day * 10.).round() / 10.,
        per_active_hour: (per_active_hour * 10.).round() / 10.,
    }
}

fn total_duration(segments: &[Segment]) -> Duration {
    segments
        .iter()
        .fold(Duration::zero(), |sum, v| sum + v.duration())
}
