use std::{
    collections::{BTreeSet, HashMap},
    fmt::Display,
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{AnalyzerConfig, DEEP_WORK_WEIGHT};

use super::{category::classify, segments::Segment};

/// A transition between two consecutive segments with differing apps.
/// Ephemeral, only used to build switching statistics.
#[derive(Debug, Clone, Copy)]
pub struct SwitchEvent {
    pub from: usize,
    pub to: usize,
    pub at: DateTime<Utc>,
}

pub fn collect_switches(segments: &[Segment]) -> Vec<SwitchEvent> {
    segments
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].app != pair[1].app)
        .map(|(index, pair)| SwitchEvent {
            from: index,
            to: index + 1,
            at: pair[1].start,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopVerdict {
    AiAssisted,
    Productive,
    Mixed,
    Distracting,
}

impl Display for LoopVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopVerdict::AiAssisted => write!(f, "ai_assisted"),
            LoopVerdict::Productive => write!(f, "productive"),
            LoopVerdict::Mixed => write!(f, "mixed"),
            LoopVerdict::Distracting => write!(f, "distracting"),
        }
    }
}

/// A frequently recurring back and forth between two apps.
#[derive(Debug, Clone, Serialize)]
pub struct DeathLoop {
    pub apps: (Arc<str>, Arc<str>),
    /// Loop occurrences. One occurrence is an out and back bounce, an
    /// unreturned final hop still counts.
    pub count: u32,
    #[serde(with = "super::duration_secs")]
    pub total_time: Duration,
    pub verdict: LoopVerdict,
    pub suggestion: String,
}

#[derive(Debug, Default)]
struct PairAccum {
    transitions: u32,
    ai_transitions: u32,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
    members: BTreeSet<usize>,
}

/// Finds app pairs that were bounced between often enough, and close enough
/// together, to count as a death loop. The result is sorted by occurrence
/// count so the worst loop comes first.
pub fn detect_death_loops(
    segments: &[Segment],
    switches: &[SwitchEvent],
    config: &AnalyzerConfig,
) -> Vec<DeathLoop> {
    let mut pairs: HashMap<(Arc<str>, Arc<str>), PairAccum> = HashMap::new();

    for switch in switches {
        let from = &segments[switch.from];
        let to = &segments[switch.to];
        let key = if from.app <= to.app {
            (from.app.clone(), to.app.clone())
        } else {
            (to.app.clone(), from.app.clone())
        };

        let accum = pairs.entry(key).or_default();
        accum.transitions += 1;
        if from.is_ai_assisted || to.is_ai_assisted {
            accum.ai_transitions += 1;
        }
        accum.first.get_or_insert(switch.at);
        accum.last = Some(switch.at);
        accum.members.insert(switch.from);
        accum.members.insert(switch.to);
    }

    let mut loops = vec![];
    for ((app_a, app_b), accum) in pairs {
        let count = accum.transitions.div_ceil(2);
        if count < config.loop_min_count {
            continue;
        }
        // Rapid flapping, not occasional legitimate back and forth: the mean
        // gap between switches has to stay inside the window.
        if accum.transitions >= 2 {
            let (Some(first), Some(last)) = (accum.first, accum.last) else {
                continue;
            };
            let mean_gap = (last - first) / (accum.transitions as i32 - 1);
            if mean_gap >= config.loop_window {
                continue;
            }
        }

        let total_time = accum
            .members
            .iter()
            .fold(Duration::zero(), |sum, index| sum + segments[*index].duration());
        let ai_majority = accum.ai_transitions * 2 > accum.transitions;
        let verdict = pair_verdict(&app_a, &app_b, ai_majority, config);

        loops.push(DeathLoop {
            suggestion: suggestion_for(verdict, &app_a, &app_b, config),
            apps: (app_a, app_b),
            count,
            total_time,
            verdict,
        });
    }

    loops.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.apps.cmp(&b.apps)));
    loops
}

/// Pair level verdict. The agent exemption only shields the terminal side of
/// a terminal/browser combination: a negative weight on the other member
/// still surfaces the pair as distracting.
fn pair_verdict(app_a: &str, app_b: &str, ai_majority: bool, config: &AnalyzerConfig) -> LoopVerdict {
    let weight_a = classify(app_a, "", &config.taxonomy).weight;
    let weight_b = classify(app_b, "", &config.taxonomy).weight;

    let terminal_browser = (config.is_terminal(app_a) && config.is_browser(app_b))
        || (config.is_terminal(app_b) && config.is_browser(app_a));

    if ai_majority && terminal_browser {
        let companion_weight = if config.is_terminal(app_a) {
            weight_b
        } else {
            weight_a
        };
        if companion_weight < 0. {
            return LoopVerdict::Distracting;
        }
        return LoopVerdict::AiAssisted;
    }

    if weight_a < 0. || weight_b < 0. {
        LoopVerdict::Distracting
    } else if weight_a >= DEEP_WORK_WEIGHT && weight_b >= DEEP_WORK_WEIGHT {
        LoopVerdict::Productive
    } else {
        LoopVerdict::Mixed
    }
}

fn suggestion_for(verdict: LoopVerdict, app_a: &str, app_b: &str, config: &AnalyzerConfig) -> String {
    match verdict {
        LoopVerdict::AiAssisted => "Agent supervision pattern - batch your check-ins".into(),
        LoopVerdict::Productive => "Normal dev workflow - consider split screen".into(),
        LoopVerdict::Mixed => "Consider batching these activities".into(),
        LoopVerdict::Distracting => {
            let weight_a = classify(app_a, "", &config.taxonomy).weight;
            let culprit = if weight_a < 0. { app_a } else { app_b };
            format!("Block {culprit} during focus hours")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{
        analysis::{agent::tag_ai_segments, category::classify, segments::Segment},
        config::AnalyzerConfig,
    };

    use super::{collect_switches, detect_death_loops, LoopVerdict};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    /// Alternating `count` segments of 10s each, back to back.
    fn alternating(app_a: &str, app_b: &str, count: usize, config: &AnalyzerConfig) -> Vec<Segment> {
        let title_a = format!("{app_a} window");
        let title_b = format!("{app_b} window");
        (0..count)
            .map(|index| {
                let (app, title) = if index % 2 == 0 {
                    (app_a, &title_a)
                } else {
                    (app_b, &title_b)
                };
                let matched = classify(app, title, &config.taxonomy);
                Segment {
                    category: matched.category,
                    weight: matched.weight,
                    app: Arc::from(app),
                    title: Arc::from(title.as_str()),
                    start: at(index as i64 * 10),
                    end: at(index as i64 * 10 + 10),
                    is_ai_assisted: false,
                }
            })
            .collect()
    }

    #[test]
    fn switches_require_an_app_change() {
        let config = AnalyzerConfig::default();
        let mut segments = alternating("Code", "Terminal", 3, &config);
        // Staying inside the same app is not a switch.
        segments[2].app = segments[1].app.clone();

        let switches = collect_switches(&segments);
        assert_eq!(switches.len(), 1);
    }

    #[test]
    fn threshold_boundary_is_exact() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.loop_min_count, 4);

        // 7 segments -> 6 transitions -> 3 occurrences: one short of the bar.
        let below = alternating("Code", "Terminal", 7, &config);
        let switches = collect_switches(&below);
        assert!(detect_death_loops(&below, &switches, &config).is_empty());

        // 8 segments -> 7 transitions -> 4 occurrences: exactly at the bar.
        let at_bar = alternating("Code", "Terminal", 8, &config);
        let switches = collect_switches(&at_bar);
        let loops = detect_death_loops(&at_bar, &switches, &config);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].count, 4);
        assert_eq!(loops[0].verdict, LoopVerdict::Productive);
    }

    #[test]
    fn slow_back_and_forth_is_not_a_loop() {
        let mut config = AnalyzerConfig::default();
        config.loop_window = Duration::minutes(5);

        let mut segments = alternating("Code", "Terminal", 8, &config);
        // Spread the same transitions over hours.
        for (index, segment) in segments.iter_mut().enumerate() {
            segment.start = at(index as i64 * 3600);
            segment.end = segment.start + Duration::seconds(10);
        }

        let switches = collect_switches(&segments);
        assert!(detect_death_loops(&segments, &switches, &config).is_empty());
    }

    #[test]
    fn agent_supervision_is_exempt() {
        let config = AnalyzerConfig::default();
        let mut segments = alternating("Terminal", "Google Chrome", 8, &config);
        for segment in segments.iter_mut().filter(|v| &*v.app == "Terminal") {
            segment.title = Arc::from("✳ claude");
        }
        tag_ai_segments(&mut segments, &config);

        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].verdict, LoopVerdict::AiAssisted);
    }

    #[test]
    fn negative_companion_overrides_the_exemption() {
        let mut config = AnalyzerConfig::default();
        // Pretend the entertainment app is one of the title broken-down ones.
        config.browser_apps.push(Arc::from("Netflix"));

        let mut segments = alternating("Terminal", "Netflix", 8, &config);
        for segment in segments.iter_mut().filter(|v| &*v.app == "Terminal") {
            segment.title = Arc::from("✳ claude");
        }
        tag_ai_segments(&mut segments, &config);

        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].verdict, LoopVerdict::Distracting);
        assert!(loops[0].suggestion.contains("Netflix"), "{}", loops[0].suggestion);
    }

    #[test]
    fn minority_agent_activity_is_not_exempt() {
        let config = AnalyzerConfig::default();
        let mut segments = alternating("Terminal", "Google Chrome", 8, &config);
        // Only one terminal visit out of four had an agent running.
        segments[0].title = Arc::from("✳ claude");
        tag_ai_segments(&mut segments, &config);

        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        assert_eq!(loops.len(), 1);
        assert_ne!(loops[0].verdict, LoopVerdict::AiAssisted);
    }

    #[test]
    fn negative_weight_member_means_distracting() {
        let config = AnalyzerConfig::default();
        let segments = alternating("Code", "Netflix", 8, &config);
        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        assert_eq!(loops[0].verdict, LoopVerdict::Distracting);
        assert!(loops[0].suggestion.contains("Netflix"));
    }

    #[test]
    fn middling_weights_mean_mixed() {
        let config = AnalyzerConfig::default();
        let segments = alternating("Code", "Slack", 8, &config);
        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        assert_eq!(loops[0].verdict, LoopVerdict::Mixed);
    }

    #[test]
    fn total_time_counts_each_segment_once() {
        let config = AnalyzerConfig::default();
        let segments = alternating("Code", "Terminal", 8, &config);
        let switches = collect_switches(&segments);
        let loops = detect_death_loops(&segments, &switches, &config);
        // All eight 10s segments participate in some transition.
        assert_eq!(loops[0].total_time, Duration::seconds(80));
    }
}
