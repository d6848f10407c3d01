//! # Classifier
//! Maps a post to one of the fixed topic categories.
//!
//! Precedence (first match wins):
//! 1. source in the sleep topic group
//! 2. source in the feeding topic group
//! 3. sleep keywords in title + body
//! 4. feeding keywords
//! 5. development keywords
//! 6. `general`
//!
//! Source groups are matched case-insensitively; keywords are plain substring
//! matches on the lower-cased text, so "feeding" hits "feed" and "walking" hits "walk".

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const SLEEP_KEYWORDS: &[&str] = &["sleep", "nap", "bedtime", "wake"];
pub const FEEDING_KEYWORDS: &[&str] = &["feed", "bottle", "breast", "formula", "milk"];
pub const DEVELOPMENT_KEYWORDS: &[&str] =
    &["milestone", "development", "crawl", "walk", "talk", "growth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sleep,
    Feeding,
    Development,
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Sleep,
        Category::Feeding,
        Category::Development,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sleep => "sleep",
            Category::Feeding => "feeding",
            Category::Development => "development",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sleep" => Ok(Category::Sleep),
            "feeding" => Ok(Category::Feeding),
            "development" => Ok(Category::Development),
            "general" => Ok(Category::General),
            other => Err(format!(
                "unknown category '{other}' (expected one of: sleep, feeding, development, general)"
            )),
        }
    }
}

/// Pure classifier holding the static topic source groupings.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    sleep_sources: HashSet<String>,
    feeding_sources: HashSet<String>,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(sleep_sources: &[S], feeding_sources: &[S]) -> Self {
        Self {
            sleep_sources: lowered(sleep_sources),
            feeding_sources: lowered(feeding_sources),
        }
    }

    pub fn classify(&self, source: &str, title: &str, body: &str) -> Category {
        let src = source.trim().to_lowercase();
        if self.sleep_sources.contains(&src) {
            return Category::Sleep;
        }
        if self.feeding_sources.contains(&src) {
            return Category::Feeding;
        }

        let content = format!("{title} {body}").to_lowercase();
        if contains_any(&content, SLEEP_KEYWORDS) {
            Category::Sleep
        } else if contains_any(&content, FEEDING_KEYWORDS) {
            Category::Feeding
        } else if contains_any(&content, DEVELOPMENT_KEYWORDS) {
            Category::Development
        } else {
            Category::General
        }
    }
}

fn lowered<S: AsRef<str>>(names: &[S]) -> HashSet<String> {
    names
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|k| haystack.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_groups() -> Classifier {
        Classifier::new(&["sleeptrain"], &["breastfeeding", "FormulaFeeders"])
    }

    #[test]
    fn source_group_overrides_keywords() {
        let c = default_groups();
        assert_eq!(c.classify("sleeptrain", "Anything", ""), Category::Sleep);
        assert_eq!(
            c.classify("sleeptrain", "Bottle refusal at daycare", "formula"),
            Category::Sleep
        );
        assert_eq!(
            c.classify("formulafeeders", "Night wakings again", ""),
            Category::Feeding
        );
    }

    #[test]
    fn keyword_precedence_sleep_then_feeding_then_development() {
        let c = default_groups();
        assert_eq!(
            c.classify("Parenting", "Bottle before bedtime?", ""),
            Category::Sleep
        );
        assert_eq!(
            c.classify("Parenting", "Bottle vs breast debate", ""),
            Category::Feeding
        );
        assert_eq!(
            c.classify("daddit", "First steps", "she started to WALK today"),
            Category::Development
        );
        assert_eq!(
            c.classify("daddit", "Car seat recommendations", ""),
            Category::General
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let c = default_groups();
        let a = c.classify("Mommit", "Milk supply tips", "pumping at work");
        for _ in 0..10 {
            assert_eq!(c.classify("Mommit", "Milk supply tips", "pumping at work"), a);
        }
    }

    #[test]
    fn empty_groups_fall_back_to_keywords() {
        let c = Classifier::default();
        assert_eq!(c.classify("sleeptrain", "Anything", ""), Category::General);
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Sleep".parse::<Category>().unwrap(), Category::Sleep);
        assert!("toddler".parse::<Category>().is_err());
    }
}
