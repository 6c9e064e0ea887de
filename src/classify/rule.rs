//! Classification rules: one predicate over one value domain, plus a style.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::render::{Palette, Style, UnknownColor};

type NumericFn = Arc<dyn Fn(f64) -> bool + Send + Sync>;
type TextFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A predicate over exactly one value domain.
#[derive(Clone)]
pub enum Predicate {
    Numeric(NumericFn),
    Text(TextFn),
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Numeric(_) => f.write_str("Numeric(..)"),
            Predicate::Text(_) => f.write_str("Text(..)"),
        }
    }
}

/// A predicate paired with the style it selects.
#[derive(Debug, Clone)]
pub struct Rule {
    predicate: Predicate,
    style: Style,
}

impl Rule {
    /// A rule over numbers.
    pub fn numeric<F>(predicate: F, style: Style) -> Self
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Numeric(Arc::new(predicate)),
            style,
        }
    }

    /// A rule over text.
    pub fn text<F>(predicate: F, style: Style) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Text(Arc::new(predicate)),
            style,
        }
    }

    /// Matches `v >= threshold`.
    pub fn at_least(threshold: f64, style: Style) -> Self {
        Self::numeric(move |v| v >= threshold, style)
    }

    /// Matches `v > threshold`.
    pub fn above(threshold: f64, style: Style) -> Self {
        Self::numeric(move |v| v > threshold, style)
    }

    /// Matches `v <= threshold`.
    pub fn at_most(threshold: f64, style: Style) -> Self {
        Self::numeric(move |v| v <= threshold, style)
    }

    /// Matches `v < threshold`.
    pub fn below(threshold: f64, style: Style) -> Self {
        Self::numeric(move |v| v < threshold, style)
    }

    /// Matches text equal to `expected`.
    pub fn equals(expected: impl Into<String>, style: Style) -> Self {
        let expected = expected.into();
        Self::text(move |s| s == expected, style)
    }

    /// Matches text containing `needle`.
    pub fn contains(needle: impl Into<String>, style: Style) -> Self {
        let needle = needle.into();
        Self::text(move |s| s.contains(needle.as_str()), style)
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Evaluate against a number. Text rules never match.
    pub fn matches_f64(&self, value: f64) -> bool {
        match &self.predicate {
            Predicate::Numeric(f) => f(value),
            Predicate::Text(_) => false,
        }
    }

    /// Evaluate against text. Numeric rules never match.
    pub fn matches_str(&self, value: &str) -> bool {
        match &self.predicate {
            Predicate::Text(f) => f(value),
            Predicate::Numeric(_) => false,
        }
    }
}

/// A rule as written in configuration.
///
/// Exactly one condition key must be present:
///
/// ```toml
/// rules = [
///     { at_least = 75, color = "good" },
///     { at_least = 25, color = "warn", bold = true },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(flatten)]
    pub when: Condition,
    pub color: String,
    #[serde(default)]
    pub bold: bool,
}

/// The condition part of a [`RuleConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    AtLeast(f64),
    Above(f64),
    AtMost(f64),
    Below(f64),
    Equals(String),
    Contains(String),
}

impl RuleConfig {
    /// Build the rule, resolving the color against `palette`.
    pub fn build(&self, palette: &Palette) -> Result<Rule, UnknownColor> {
        let mut style = Style::fg(palette.resolve(&self.color)?);
        if self.bold {
            style = style.bold();
        }
        Ok(match &self.when {
            Condition::AtLeast(v) => Rule::at_least(*v, style),
            Condition::Above(v) => Rule::above(*v, style),
            Condition::AtMost(v) => Rule::at_most(*v, style),
            Condition::Below(v) => Rule::below(*v, style),
            Condition::Equals(s) => Rule::equals(s.clone(), style),
            Condition::Contains(s) => Rule::contains(s.clone(), style),
        })
    }
}
