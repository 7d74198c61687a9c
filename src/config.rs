use std::{path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const WEIGHT_MIN: f64 = -0.5;
pub const WEIGHT_MAX: f64 = 1.0;

/// Weight at and above which a category counts as deep work. Used both by the
/// death loop verdicts and by the "productive time" breakdowns.
pub const DEEP_WORK_WEIGHT: f64 = 0.7;

/// Category assigned when no rule matches.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Titles that carry no information about what the browser was used for.
pub const IDLE_TITLES: &[&str] = &["New Tab", "Untitled"];

/// A single classification rule. Rules are matched in declaration order, so
/// the position inside [Taxonomy] is part of the configuration.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub name: Arc<str>,
    pub weight: f64,
    /// Exact application names (ascii case is ignored during comparison).
    pub apps: Vec<Arc<str>>,
    /// Window title substrings, stored lowercased.
    pub titles: Vec<String>,
    pub description: String,
}

/// Body of a rule as it appears in the configuration file. The category name
/// is the key of the surrounding map.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoryRuleBody {
    weight: f64,
    #[serde(default)]
    apps: Vec<Arc<str>>,
    #[serde(default)]
    titles: Vec<String>,
    #[serde(default)]
    description: String,
}

/// Ordered list of category rules. Immutable for the whole run, validation
/// happens once at construction.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    rules: Vec<CategoryRule>,
}

impl Taxonomy {
    pub fn from_rules(rules: Vec<CategoryRule>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&rule.weight) {
                bail!(
                    "category \"{}\" has weight {} outside of [{WEIGHT_MIN}, {WEIGHT_MAX}]",
                    rule.name,
                    rule.weight
                );
            }
            if !seen.insert(rule.name.clone()) {
                bail!("duplicate category \"{}\"", rule.name);
            }
        }
        Ok(Self { rules })
    }

    /// Parses the configuration file format: a json map from category name to
    /// rule body. Map order is declaration order. Keys starting with `_` are
    /// treated as comments.
    pub fn from_json(text: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).context("Configuration is not a json object")?;

        let mut rules = vec![];
        for (name, value) in map {
            if name.starts_with('_') {
                continue;
            }
            let body: CategoryRuleBody = serde_json::from_value(value)
                .with_context(|| format!("category \"{name}\" is malformed"))?;
            rules.push(CategoryRule {
                name: name.into(),
                weight: body.weight,
                apps: body.apps,
                titles: body.titles.iter().map(|v| v.to_lowercase()).collect(),
                description: body.description,
            });
        }
        Self::from_rules(rules)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Serializes the rules back into the configuration file format.
    pub fn to_json(&self) -> String {
        let mut map = serde_json::Map::new();
        for rule in &self.rules {
            let body = CategoryRuleBody {
                weight: rule.weight,
                apps: rule.apps.clone(),
                titles: rule.titles.clone(),
                description: rule.description.clone(),
            };
            map.insert(
                rule.name.to_string(),
                serde_json::to_value(body).expect("rule bodies are plain data"),
            );
        }
        serde_json::to_string_pretty(&map).expect("rule maps are plain data")
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        fn rule(
            name: &str,
            weight: f64,
            apps: &[&str],
            titles: &[&str],
            description: &str,
        ) -> CategoryRule {
            CategoryRule {
                name: name.into(),
                weight,
                apps: apps.iter().map(|v| Arc::from(*v)).collect(),
                titles: titles.iter().map(|v| v.to_lowercase()).collect(),
                description: description.into(),
            }
        }

        // Mirrors the taxonomy shipped with the tracker export tooling.
        let rules = vec![
            rule(
                "deep_work",
                1.0,
                &["Terminal", "iTerm2", "Cursor", "Code", "VSCode", "PyCharm", "IntelliJ IDEA", "Xcode", "Zed"],
                &["claude code", "git "],
                "Focused coding and building",
            ),
            rule(
                "ai_tools",
                0.8,
                &["Claude", "ChatGPT"],
                &["ChatGPT", "Claude", "OpenAI Platform", "Google AI Studio"],
                "Working with AI assistants",
            ),
            rule(
                "development",
                0.8,
                &["DBeaver", "Postman", "Docker Desktop"],
                &["Supabase", "localhost", "GitHub", "GitLab"],
                "Supporting development work",
            ),
            rule(
                "writing",
                0.9,
                &["Notion", "Obsidian", "Notes"],
                &["Google Docs"],
                "Writing and note taking",
            ),
            rule(
                "design",
                0.9,
                &["Figma", "Sketch"],
                &["Figma", "Canva", "Webflow"],
                "Design work",
            ),
            rule(
                "presentations",
                0.7,
                &["Keynote", "Microsoft PowerPoint"],
                &["Google Slides"],
                "Preparing presentations",
            ),
            rule(
                "spreadsheets",
                0.6,
                &["Numbers", "Microsoft Excel"],
                &["Google Sheets"],
                "Spreadsheet work",
            ),
            rule(
                "meetings",
                0.5,
                &["zoom.us", "Zoom", "Google Meet"],
                &["Zoom Meeting"],
                "Calls and meetings",
            ),
            rule(
                "communication_work",
                0.3,
                &["Slack"],
                &["Slack |"],
                "Work chat",
            ),
            rule(
                "communication_personal",
                0.1,
                &["Telegram", "Messages", "WhatsApp", "Discord"],
                &[],
                "Personal chat",
            ),
            rule(
                "email",
                0.3,
                &["Mail", "Outlook"],
                &["Gmail", "Inbox"],
                "Email",
            ),
            rule(
                "learning",
                0.7,
                &[],
                &["Coursera", "tutorial", "documentation", "Stack Overflow"],
                "Courses and documentation",
            ),
            rule(
                "business_tools",
                0.5,
                &["Stripe"],
                &["Stripe", "Google Calendar", "Analytics"],
                "Business administration",
            ),
            rule(
                "content_creation",
                0.7,
                &[],
                &["YouTube Studio", "Creator Studio"],
                "Publishing content",
            ),
            rule(
                "social_media",
                -0.3,
                &[],
                &["Twitter", "Home / X", "LinkedIn", "Reddit"],
                "Social feeds",
            ),
            rule(
                "entertainment",
                -0.5,
                &["Netflix", "Spotify"],
                &["Netflix", "Prime Video", "Twitch", "Watch "],
                "Entertainment",
            ),
            rule("news", -0.2, &[], &["News", "Hacker News"], "News reading"),
            rule(
                "system",
                0.0,
                &["loginwindow", "Finder", "SystemUIServer", "UserNotificationCenter"],
                &["Finder"],
                "Operating system surfaces",
            ),
            rule(
                "browser_idle",
                0.0,
                &[],
                &["New Tab", "Untitled"],
                "Browser with nothing in it",
            ),
        ];

        Self::from_rules(rules).expect("built in taxonomy is valid")
    }
}

/// Loads a taxonomy from an optional path, falling back to the built in one.
pub async fn load_taxonomy(path: Option<&Path>) -> Result<Taxonomy> {
    let Some(path) = path else {
        return Ok(Taxonomy::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read configuration {path:?}"))?;
    Taxonomy::from_json(&text).with_context(|| format!("Failed to load configuration {path:?}"))
}

/// Tuning knobs of the analysis pipeline. One immutable value passed
/// explicitly through every stage.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub taxonomy: Taxonomy,
    /// Tracker jitter below this gap is treated as continuous work.
    pub merge_gap: Duration,
    /// Loop occurrences required before a pair qualifies as a death loop.
    pub loop_min_count: u32,
    /// Qualifying pairs must switch with a mean gap under this window.
    pub loop_window: Duration,
    /// Focus points removed per non exempt loop occurrence.
    pub switch_penalty: f64,
    pub productivity_weight: f64,
    pub focus_weight: f64,
    /// Apps an AI coding agent may run inside.
    pub terminal_apps: Vec<Arc<str>>,
    /// Apps that get the per title sub breakdown.
    pub browser_apps: Vec<Arc<str>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            taxonomy: Taxonomy::default(),
            merge_gap: Duration::seconds(2),
            loop_min_count: 4,
            loop_window: Duration::minutes(5),
            switch_penalty: 2.0,
            productivity_weight: 0.5,
            focus_weight: 0.5,
            terminal_apps: ["Terminal", "iTerm2", "Alacritty", "kitty", "WezTerm", "Warp", "Hyper", "Windows Terminal", "Console"]
                .into_iter()
                .map(Arc::from)
                .collect(),
            browser_apps: ["Google Chrome", "Safari", "Firefox", "Arc", "Brave", "Edge", "Opera", "Vivaldi", "ChatGPT Atlas"]
                .into_iter()
                .map(Arc::from)
                .collect(),
        }
    }
}

impl AnalyzerConfig {
    pub fn is_terminal(&self, app: &str) -> bool {
        self.terminal_apps.iter().any(|v| v.eq_ignore_ascii_case(app))
    }

    pub fn is_browser(&self, app: &str) -> bool {
        self.browser_apps.iter().any(|v| v.eq_ignore_ascii_case(app))
    }
}

pub fn is_idle_title(title: &str) -> bool {
    let title = title.trim();
    title.is_empty() || IDLE_TITLES.iter().any(|v| *v == title)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CategoryRule, Taxonomy};

    fn plain_rule(name: &str, weight: f64) -> CategoryRule {
        CategoryRule {
            name: name.into(),
            weight,
            apps: vec![Arc::from(name)],
            titles: vec![],
            description: String::new(),
        }
    }

    #[test]
    fn rejects_weight_outside_range() {
        let err = Taxonomy::from_rules(vec![plain_rule("gaming", -0.9)]).unwrap_err();
        assert!(err.to_string().contains("gaming"), "{err}");
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Taxonomy::from_rules(vec![plain_rule("mail", 0.3), plain_rule("mail", 0.4)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate category \"mail\""), "{err}");
    }

    #[test]
    fn json_keeps_declaration_order() {
        let taxonomy = Taxonomy::from_json(
            r#"{
                "_comment": "first rule wins",
                "chat": { "weight": 0.3, "titles": ["Slack"] },
                "decoy": { "weight": -0.5, "titles": ["Slack"] }
            }"#,
        )
        .unwrap();
        let names: Vec<_> = taxonomy.rules().iter().map(|v| v.name.to_string()).collect();
        assert_eq!(names, vec!["chat", "decoy"]);
    }

    #[test]
    fn json_naming_offending_category() {
        let err = Taxonomy::from_json(r#"{ "rabbit_holes": { "weight": 1.5 } }"#).unwrap_err();
        assert!(format!("{err:#}").contains("rabbit_holes"), "{err:#}");
    }

    #[test]
    fn default_taxonomy_round_trips() {
        let default = Taxonomy::default();
        let reparsed = Taxonomy::from_json(&default.to_json()).unwrap();
        assert_eq!(default.rules().len(), reparsed.rules().len());
        assert_eq!(
            default.rules()[0].name,
            reparsed.rules()[0].name,
        );
    }
}
