//! Color palettes for the status line.
//!
//! Supports light and dark palettes with automatic terminal detection.

use std::str::FromStr;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

use super::Style;

/// Named colors used by the built-in rules and by configuration.
///
/// Use [`Palette::auto_detect()`] to pick based on the terminal background,
/// or [`Palette::dark()`]/[`Palette::light()`] explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Healthy / in range.
    pub good: Color,
    /// Needs attention.
    pub warn: Color,
    /// Broken / out of range.
    pub bad: Color,
    /// De-emphasized text.
    pub dim: Color,
}

impl Palette {
    /// Palette suited to dark bar backgrounds.
    pub fn dark() -> Self {
        Self {
            good: Color::Rgb(0x66, 0xa4, 0x61),
            warn: Color::Rgb(0xe4, 0xdd, 0x85),
            bad: Color::Rgb(0xa4, 0x61, 0x63),
            dim: Color::Rgb(0x88, 0x88, 0x88),
        }
    }

    /// Palette suited to light bar backgrounds.
    pub fn light() -> Self {
        Self {
            good: Color::Rgb(0x3b, 0x6e, 0x37),
            warn: Color::Rgb(0x8a, 0x7f, 0x1c),
            bad: Color::Rgb(0x8e, 0x35, 0x38),
            dim: Color::Rgb(0x60, 0x60, 0x60),
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Resolve a palette selection from configuration.
    pub fn from_choice(choice: PaletteChoice) -> Self {
        match choice {
            PaletteChoice::Auto => Self::auto_detect(),
            PaletteChoice::Dark => Self::dark(),
            PaletteChoice::Light => Self::light(),
        }
    }

    /// Foreground-only style in the given color.
    pub fn style(&self, color: NamedColor) -> Style {
        Style::fg(self.color(color))
    }

    pub fn color(&self, color: NamedColor) -> Color {
        match color {
            NamedColor::Good => self.good,
            NamedColor::Warn => self.warn,
            NamedColor::Bad => self.bad,
            NamedColor::Dim => self.dim,
        }
    }

    /// Resolve a configured color reference: a palette name or `#rrggbb`.
    pub fn resolve(&self, reference: &str) -> Result<Color, UnknownColor> {
        match reference.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(self.good),
            "warn" => Ok(self.warn),
            "bad" => Ok(self.bad),
            "dim" => Ok(self.dim),
            other => Color::from_str(other).map_err(|_| UnknownColor(reference.to_string())),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

/// Palette selection as written in configuration or on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaletteChoice {
    #[default]
    Auto,
    Dark,
    Light,
}

/// Palette slots addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Good,
    Warn,
    Bad,
    Dim,
}

/// A color reference that is neither a palette name nor a parseable color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color: {0}")]
pub struct UnknownColor(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_palette_names() {
        let palette = Palette::dark();
        assert_eq!(palette.resolve("good"), Ok(palette.good));
        assert_eq!(palette.resolve(" BAD "), Ok(palette.bad));
    }

    #[test]
    fn resolves_hex_colors() {
        let palette = Palette::dark();
        assert_eq!(palette.resolve("#e4dd85"), Ok(Color::Rgb(0xe4, 0xdd, 0x85)));
    }

    #[test]
    fn rejects_unknown_colors() {
        let palette = Palette::dark();
        assert!(palette.resolve("chartreuse-ish").is_err());
    }

    #[test]
    fn choice_picks_explicit_palettes() {
        assert_eq!(Palette::from_choice(PaletteChoice::Light), Palette::light());
        assert_eq!(Palette::from_choice(PaletteChoice::Dark), Palette::dark());
    }
}
