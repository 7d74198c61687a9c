use std::sync::Arc;

use crate::config::{Taxonomy, UNCATEGORIZED};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMatch {
    pub category: Arc<str>,
    pub weight: f64,
}

/// Resolves an activity to a category. App names are compared exactly before
/// any title matching happens, titles are matched as case insensitive
/// substrings. Both passes walk the rules in declaration order and the first
/// hit wins, so a rule earlier in the configuration shadows later ones.
pub fn classify(app: &str, title: &str, taxonomy: &Taxonomy) -> CategoryMatch {
    for rule in taxonomy.rules() {
        if rule.apps.iter().any(|v| v.eq_ignore_ascii_case(app)) {
            return CategoryMatch {
                category: rule.name.clone(),
                weight: rule.weight,
            };
        }
    }

    let title = title.to_lowercase();
    for rule in taxonomy.rules() {
        if rule
            .titles
            .iter()
            .any(|needle| !needle.is_empty() && title.contains(needle))
        {
            return CategoryMatch {
                category: rule.name.clone(),
                weight: rule.weight,
            };
        }
    }

    CategoryMatch {
        category: UNCATEGORIZED.into(),
        weight: 0.0,
    }
}
