//! Ordered first-match classification of values into styles.
//!
//! A [`Classifier`] holds a base style and an ordered list of [`Rule`]s. The
//! first rule (in configured order) whose predicate holds selects the style;
//! if none holds the base style is used. Overlapping rules therefore resolve
//! by position, never by "closest" match.
//!
//! ```
//! use barline::classify::{Classifier, Rule};
//! use barline::render::{Palette, Style};
//!
//! let palette = Palette::dark();
//! let battery = Classifier::new(Style::fg(palette.bad))
//!     .rule(Rule::at_least(75.0, Style::fg(palette.good)))
//!     .rule(Rule::at_least(25.0, Style::fg(palette.warn)));
//!
//! assert_eq!(battery.classify_f64(40.0), Style::fg(palette.warn));
//! ```

pub mod rule;

pub use rule::{Condition, Predicate, Rule, RuleConfig};

use std::sync::Arc;

use crate::render::{Palette, Style, UnknownColor};

/// Immutable ordered rule list with a fallback style.
///
/// Numeric lookups consider only numeric rules and textual lookups only
/// textual rules; a rule of the other domain is skipped for that call.
/// Cloning is cheap and classifiers can be shared across tasks freely.
#[derive(Debug, Clone)]
pub struct Classifier {
    base: Style,
    rules: Arc<[Rule]>,
}

impl Classifier {
    /// A classifier with no rules that always yields `base`.
    pub fn new(base: Style) -> Self {
        Self {
            base,
            rules: Arc::from(Vec::new()),
        }
    }

    /// A classifier with the given rules, kept in order.
    pub fn with_rules(base: Style, rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            base,
            rules: rules.into_iter().collect(),
        }
    }

    /// Build from configured rules, resolving colors against `palette`.
    pub fn from_config(
        base: Style,
        rules: &[RuleConfig],
        palette: &Palette,
    ) -> Result<Self, UnknownColor> {
        let rules = rules
            .iter()
            .map(|r| r.build(palette))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_rules(base, rules))
    }

    /// Append a rule after the existing ones.
    pub fn rule(self, rule: Rule) -> Self {
        let mut rules = self.rules.to_vec();
        rules.push(rule);
        Self {
            base: self.base,
            rules: rules.into(),
        }
    }

    pub fn base(&self) -> Style {
        self.base
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Style for a number.
    pub fn classify_f64(&self, value: f64) -> Style {
        self.rules
            .iter()
            .find(|rule| rule.matches_f64(value))
            .map_or(self.base, Rule::style)
    }

    /// Style for an integer, classified as its floating-point value.
    pub fn classify_int(&self, value: i64) -> Style {
        self.classify_f64(value as f64)
    }

    /// Style for a string.
    pub fn classify_str(&self, value: &str) -> Style {
        self.rules
            .iter()
            .find(|rule| rule.matches_str(value))
            .map_or(self.base, Rule::style)
    }
}
