use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{config::AnalyzerConfig, ingest::RawEvent};

use super::category::classify;

/// A contiguous block of time attributed to one (app, category) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub category: Arc<str>,
    pub weight: f64,
    pub app: Arc<str>,
    pub title: Arc<str>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_ai_assisted: bool,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Rebuilds the raw event stream into an ordered, non overlapping segment
/// sequence. Zero duration events are no-op focus changes and are dropped,
/// overlapping duplicates are resolved by keeping the longer record, and
/// adjacent events of the same (category, app) separated by tracker jitter
/// are fused into one segment.
pub fn build_segments(events: Vec<RawEvent>, config: &AnalyzerConfig) -> Vec<Segment> {
    let mut events: Vec<RawEvent> = events
        .into_iter()
        .filter(|v| v.duration > Duration::zero())
        .collect();
    // Stable, so records sharing a start keep their export order.
    events.sort_by_key(|v| v.start);
    let events = drop_overlaps(events);

    let mut segments: Vec<Segment> = vec![];
    for event in events {
        let matched = classify(&event.app, &event.title, &config.taxonomy);
        match segments.last_mut() {
            Some(last)
                if last.category == matched.category
                    && last.app == event.app
                    && event.start - last.end <= config.merge_gap =>
            {
                // The jitter gap is not activity. Extending by the event's own
                // duration keeps the segment sum within the tracked total.
                last.end = last.end + event.duration;
            }
            _ => {
                let end = event.end();
                segments.push(Segment {
                    category: matched.category,
                    weight: matched.weight,
                    app: event.app,
                    title: event.title,
                    start: event.start,
                    end,
                    is_ai_assisted: false,
                })
            }
        }
    }

    debug_assert!(
        segments.windows(2).all(|v| v[0].end <= v[1].start),
        "segments must stay ordered and non overlapping"
    );
    segments
}

/// Tracker bug tolerance: when two records cover the same span, the longer
/// one is kept and the shorter discarded as a duplicate.
fn drop_overlaps(events: Vec<RawEvent>) -> Vec<RawEvent> {
    let mut kept: Vec<RawEvent> = Vec::with_capacity(events.len());
    'events: for event in events {
        while let Some(last) = kept.last() {
            if event.start >= last.end() {
                break;
            }
            if event.duration > last.duration {
                kept.pop();
            } else {
                continue 'events;
            }
        }
        kept.push(event);
    }
    kept
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{config::AnalyzerConfig, ingest::RawEvent};

    use super::build_segments;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn event(app: &str, title: &str, start: i64, duration: i64) -> RawEvent {
        RawEvent {
            app: Arc::from(app),
            title: Arc::from(title),
            start: at(start),
            duration: Duration::seconds(duration),
        }
    }

    #[test]
    fn sorts_discards_zero_and_merges_jitter() {
        let config = AnalyzerConfig::default();
        // Out of order input, a zero duration no-op, and a 1s jitter gap
        // between two Code events.
        let events = vec![
            event("Code", "main.rs", 61, 30),
            event("Code", "main.rs", 0, 60),
            event("Finder", "", 40, 0),
        ];

        let segments = build_segments(events, &config);

        assert_eq!(segments.len(), 1);
        assert_eq!(&*segments[0].app, "Code");
        assert_eq!(&*segments[0].category, "deep_work");
        // 60s + 30s of activity, the jitter second is not counted.
        assert_eq!(segments[0].duration(), Duration::seconds(90));
    }

    #[test]
    fn gap_above_tolerance_starts_a_new_segment() {
        let config = AnalyzerConfig::default();
        let events = vec![
            event("Code", "main.rs", 0, 60),
            event("Code", "main.rs", 120, 60),
        ];

        let segments = build_segments(events, &config);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn different_category_is_never_merged() {
        let config = AnalyzerConfig::default();
        // Same app, but the title flips the category from development to
        // social_media.
        let events = vec![
            event("Google Chrome", "GitHub - review", 0, 60),
            event("Google Chrome", "Twitter", 60, 60),
        ];

        let segments = build_segments(events, &config);
        assert_eq!(segments.len(), 2);
        assert_ne!(segments[0].category, segments[1].category);
    }

    #[test]
    fn overlap_keeps_the_longer_record() {
        let config = AnalyzerConfig::default();
        let events = vec![
            event("Code", "main.rs", 0, 30),
            event("Slack", "Slack | #general", 0, 300),
        ];

        let segments = build_segments(events, &config);
        assert_eq!(segments.len(), 1);
        assert_eq!(&*segments[0].app, "Slack");
    }

    #[test]
    fn normalization_never_creates_time() {
        let config = AnalyzerConfig::default();
        let events = vec![
            event("Code", "main.rs", 0, 60),
            event("Code", "main.rs", 61, 30),
            event("Code", "main.rs", 61, 45),
            event("Slack", "Slack | #general", 200, 100),
        ];
        let raw_total: i64 = events.iter().map(|v| v.duration.num_seconds()).sum();

        let segments = build_segments(events, &config);
        let segment_total: i64 = segments.iter().map(|v| v.duration().num_seconds()).sum();

        assert!(segment_total <= raw_total, "{segment_total} > {raw_total}");
    }
}
