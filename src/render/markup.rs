//! Encoding fragments for the different bar front-ends.

use std::fmt::Write as _;

use crossterm::style::{Attribute, Color as TermColor, ContentStyle};
use ratatui::style::{Color, Modifier};

use super::{Fragment, Style};

/// Escape text for inclusion in Pango markup.
pub fn escape_pango(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render a fragment as Pango markup.
///
/// Unstyled spans are emitted as escaped text, styled spans as `<span>`.
pub fn pango(fragment: &Fragment) -> String {
    let mut out = String::new();
    for (text, style) in fragment.spans() {
        let attributes = pango_attributes(style);
        if attributes.is_empty() {
            out.push_str(&escape_pango(text));
        } else {
            let _ = write!(out, "<span{}>{}</span>", attributes, escape_pango(text));
        }
    }
    out
}

fn pango_attributes(style: Style) -> String {
    let mut attributes = String::new();
    if let Some(color) = style.foreground().and_then(color_name) {
        let _ = write!(attributes, " foreground=\"{}\"", color);
    }
    let modifiers = style.modifiers();
    if modifiers.contains(Modifier::BOLD) {
        attributes.push_str(" weight=\"bold\"");
    }
    if modifiers.contains(Modifier::ITALIC) {
        attributes.push_str(" style=\"italic\"");
    }
    if modifiers.contains(Modifier::UNDERLINED) {
        attributes.push_str(" underline=\"single\"");
    }
    attributes
}

/// Color spelled the way Pango and i3bar accept it.
pub fn color_name(color: Color) -> Option<String> {
    let name = match color {
        Color::Reset | Color::Indexed(_) => return None,
        Color::Rgb(r, g, b) => return Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
        Color::Black => "#000000",
        Color::Red => "#cd0000",
        Color::Green => "#00cd00",
        Color::Yellow => "#cdcd00",
        Color::Blue => "#0000ee",
        Color::Magenta => "#cd00cd",
        Color::Cyan => "#00cdcd",
        Color::Gray => "#e5e5e5",
        Color::DarkGray => "#7f7f7f",
        Color::LightRed => "#ff0000",
        Color::LightGreen => "#00ff00",
        Color::LightYellow => "#ffff00",
        Color::LightBlue => "#5c5cff",
        Color::LightMagenta => "#ff00ff",
        Color::LightCyan => "#00ffff",
        Color::White => "#ffffff",
    };
    Some(name.to_string())
}

/// Render a fragment with ANSI escape sequences for a terminal.
pub fn ansi(fragment: &Fragment) -> String {
    let mut out = String::new();
    for (text, style) in fragment.spans() {
        let mut content = ContentStyle::new();
        content.foreground_color = style.foreground().and_then(term_color);
        let modifiers = style.modifiers();
        if modifiers.contains(Modifier::BOLD) {
            content.attributes.set(Attribute::Bold);
        }
        if modifiers.contains(Modifier::ITALIC) {
            content.attributes.set(Attribute::Italic);
        }
        if modifiers.contains(Modifier::UNDERLINED) {
            content.attributes.set(Attribute::Underlined);
        }
        let _ = write!(out, "{}", content.apply(text));
    }
    out
}

fn term_color(color: Color) -> Option<TermColor> {
    Some(match color {
        Color::Reset => return None,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Indexed(i) => TermColor::AnsiValue(i),
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_pango("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }

    #[test]
    fn pango_wraps_styled_spans() {
        let fragment = Fragment::text("B:")
            .append(Fragment::text("80").styled(Style::fg(Color::Rgb(0x66, 0xa4, 0x61)).bold()));
        assert_eq!(
            pango(&fragment),
            "B:<span foreground=\"#66a461\" weight=\"bold\">80</span>"
        );
    }

    #[test]
    fn pango_of_empty_fragment_is_empty() {
        assert_eq!(pango(&Fragment::empty()), "");
    }

    #[test]
    fn ansi_keeps_text() {
        let fragment = Fragment::text("up").styled(Style::fg(Color::Green));
        let rendered = ansi(&fragment);
        assert!(rendered.contains("up"));
        assert!(rendered.contains('\u{1b}'));
    }

    #[test]
    fn ansi_plain_text_has_no_escapes() {
        assert_eq!(ansi(&Fragment::text("plain")), "plain");
    }
}
