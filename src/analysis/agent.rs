use crate::config::AnalyzerConfig;

use super::segments::Segment;

/// Detection signature of one AI coding agent. Matching follows the window
/// title only, since that is all the tracker exports.
#[derive(Debug, Clone)]
pub struct AgentSignature {
    pub agent: &'static str,
    /// Case insensitive substrings of the terminal title.
    pub title_tokens: &'static [&'static str],
    /// Status glyphs some agents prepend to the title while running.
    pub leading_glyphs: &'static [char],
}

pub const AGENT_SIGNATURES: &[AgentSignature] = &[
    AgentSignature {
        agent: "Claude Code",
        title_tokens: &["claude code", "claude"],
        leading_glyphs: &['✳', '✶'],
    },
    AgentSignature {
        agent: "Codex",
        title_tokens: &["codex", "openai codex"],
        leading_glyphs: &[],
    },
    AgentSignature {
        agent: "Aider",
        title_tokens: &["aider"],
        leading_glyphs: &[],
    },
    AgentSignature {
        agent: "Gemini CLI",
        title_tokens: &["gemini"],
        leading_glyphs: &[],
    },
];

/// Matches a terminal title against the known agent signatures.
pub fn detect_agent(title: &str) -> Option<&'static AgentSignature> {
    let trimmed = title.trim_start();
    let lowered = title.to_lowercase();
    AGENT_SIGNATURES.iter().find(|signature| {
        signature
            .leading_glyphs
            .iter()
            .any(|glyph| trimmed.starts_with(*glyph))
            || signature
                .title_tokens
                .iter()
                .any(|token| lowered.contains(token))
    })
}

/// Flags terminal segments whose title betrays a running coding agent. The
/// flag feeds the switch classifier, it never changes category or weight.
pub fn tag_ai_segments(segments: &mut [Segment], config: &AnalyzerConfig) {
    for segment in segments.iter_mut() {
        if config.is_terminal(&segment.app) && detect_agent(&segment.title).is_some() {
            segment.is_ai_assisted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::config::AnalyzerConfig;
    use crate::analysis::segments::Segment;

    use super::{detect_agent, tag_ai_segments};

    fn segment(app: &str, title: &str) -> Segment {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        Segment {
            category: Arc::from("deep_work"),
            weight: 1.0,
            app: Arc::from(app),
            title: Arc::from(title),
            start,
            end: start + Duration::minutes(5),
            is_ai_assisted: false,
        }
    }

    #[test]
    fn detects_glyph_and_token_signatures() {
        assert_eq!(detect_agent("✳ npm run build").unwrap().agent, "Claude Code");
        assert_eq!(detect_agent("aider: editing main.py").unwrap().agent, "Aider");
        assert!(detect_agent("npm run build").is_none());
    }

    #[test]
    fn tags_only_terminal_segments() {
        let config = AnalyzerConfig::default();
        let mut segments = vec![
            segment("Terminal", "✳ claude"),
            segment("Google Chrome", "Claude - chat"),
            segment("Terminal", "htop"),
        ];

        tag_ai_segments(&mut segments, &config);

        assert!(segments[0].is_ai_assisted);
        assert!(!segments[1].is_ai_assisted, "browsers are never agent hosts");
        assert!(!segments[2].is_ai_assisted);
    }

    #[test]
    fn tagging_keeps_category_and_weight() {
        let config = AnalyzerConfig::default();
        let mut segments = vec![segment("Terminal", "✳ claude")];
        tag_ai_segments(&mut segments, &config);
        assert_eq!(&*segments[0].category, "deep_work");
        assert_eq!(segments[0].weight, 1.0);
    }
}
