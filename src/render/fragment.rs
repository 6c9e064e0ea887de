//! Styled text fragments and the styles applied to them.

use ratatui::style::{Color, Modifier, Style as SpanStyle};
use ratatui::text::{Line, Span};

/// A visual attribute transform applied to a [`Fragment`].
///
/// Styles are plain values. Applying one never mutates the fragment it is
/// applied to; [`Style::apply`] always returns a new fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style(SpanStyle);

impl Style {
    /// A style that changes nothing.
    pub fn new() -> Self {
        Self(SpanStyle::new())
    }

    /// A style that sets the foreground color.
    pub fn fg(color: Color) -> Self {
        Self(SpanStyle::new().fg(color))
    }

    pub fn bold(self) -> Self {
        Self(self.0.add_modifier(Modifier::BOLD))
    }

    pub fn italic(self) -> Self {
        Self(self.0.add_modifier(Modifier::ITALIC))
    }

    pub fn underlined(self) -> Self {
        Self(self.0.add_modifier(Modifier::UNDERLINED))
    }

    /// Foreground color, if this style sets one.
    pub fn foreground(&self) -> Option<Color> {
        self.0.fg
    }

    /// Modifiers added by this style.
    pub fn modifiers(&self) -> Modifier {
        self.0.add_modifier
    }

    /// Layer `other` on top of this style. Attributes set by `other` win.
    pub fn patch(self, other: Style) -> Self {
        Self(self.0.patch(other.0))
    }

    /// Apply this style to a fragment, producing a new fragment.
    ///
    /// Attributes already set on the fragment's spans take precedence, so an
    /// outer style only fills in what inner spans left unset.
    pub fn apply(&self, fragment: &Fragment) -> Fragment {
        fragment.clone().styled(*self)
    }
}

/// One monitor's current rendering: an ordered run of styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment(Line<'static>);

impl Fragment {
    /// The fragment that renders as nothing.
    pub fn empty() -> Self {
        Self(Line::default())
    }

    /// An unstyled text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self(Line::from(Span::raw(text.into())))
    }

    /// Consume the fragment and return it with `style` applied underneath
    /// every span.
    pub fn styled(self, style: Style) -> Self {
        let mut line = self.0;
        for span in &mut line.spans {
            span.style = style.0.patch(span.style);
        }
        Self(line)
    }

    /// Append another fragment after this one.
    pub fn append(mut self, other: Fragment) -> Self {
        let line_style = other.0.style;
        for mut span in other.0.spans {
            span.style = line_style.patch(span.style);
            self.0.spans.push(span);
        }
        self
    }

    /// Join fragments left to right, placing `separator` between neighbours.
    pub fn join<I>(parts: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut joined = Fragment::empty();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 && !separator.is_empty() {
                joined = joined.append(Fragment::text(separator));
            }
            joined = joined.append(part);
        }
        joined
    }

    /// True when the fragment contains no visible text.
    pub fn is_empty(&self) -> bool {
        self.0.spans.iter().all(|span| span.content.is_empty())
    }

    /// The fragment's text without any styling.
    pub fn plain(&self) -> String {
        self.0.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    /// Iterate over `(text, effective style)` pairs.
    pub fn spans(&self) -> impl Iterator<Item = (&str, Style)> + '_ {
        let line_style = self.0.style;
        self.0
            .spans
            .iter()
            .filter(|span| !span.content.is_empty())
            .map(move |span| (span.content.as_ref(), Style(line_style.patch(span.style))))
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::text(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::Rgb(0xa4, 0x61, 0x63);
    const GREEN: Color = Color::Rgb(0x66, 0xa4, 0x61);

    #[test]
    fn apply_returns_new_fragment() {
        let original = Fragment::text("wlan0");
        let styled = Style::fg(GREEN).apply(&original);

        assert_eq!(original.spans().next().unwrap().1, Style::new());
        assert_eq!(styled.spans().next().unwrap().1.foreground(), Some(GREEN));
        assert_eq!(styled.plain(), "wlan0");
    }

    #[test]
    fn inner_styles_win_over_outer() {
        let inner = Fragment::text("0.42").styled(Style::fg(RED));
        let outer = Fragment::text("L:").append(inner).styled(Style::fg(GREEN).bold());

        let spans: Vec<_> = outer.spans().collect();
        assert_eq!(spans[0].1.foreground(), Some(GREEN));
        assert_eq!(spans[1].1.foreground(), Some(RED));
        assert!(spans[1].1.modifiers().contains(Modifier::BOLD));
    }

    #[test]
    fn join_places_separator_between_parts() {
        let joined = Fragment::join(
            vec![Fragment::text("a"), Fragment::empty(), Fragment::text("c")],
            "|",
        );
        assert_eq!(joined.plain(), "a||c");
    }

    #[test]
    fn empty_fragment() {
        assert!(Fragment::empty().is_empty());
        assert!(Fragment::text("").is_empty());
        assert!(!Fragment::text("x").is_empty());
        assert_eq!(Fragment::empty().spans().count(), 0);
    }
}
