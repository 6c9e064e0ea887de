//! Where rendered lines go.
//!
//! The merge task hands every changed [`StatusLine`] to a [`Display`].
//! [`StdoutDisplay`] writes it for a status bar or a terminal;
//! [`ChannelDisplay`] publishes it on a watch channel for embedding and tests.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::bar::StatusLine;
use crate::render::markup;

/// A consumer of rendered lines.
pub trait Display: Send {
    /// Show a new line. An error ends the merge task.
    fn show(&mut self, line: &StatusLine) -> io::Result<()>;
}

/// Output encodings understood by [`StdoutDisplay`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Text only.
    Plain,
    /// Text with terminal escape sequences.
    Ansi,
    /// Pango markup, one line per update.
    #[default]
    Pango,
    /// The i3bar / swaybar JSON protocol.
    I3bar,
}

/// One block of the i3bar protocol.
#[derive(Debug, Serialize)]
struct Block<'a> {
    name: &'a str,
    instance: String,
    full_text: String,
    markup: &'static str,
}

/// Writes one line per update to any writer.
#[derive(Debug)]
pub struct StdoutDisplay<W: Write = io::Stdout> {
    out: W,
    format: OutputFormat,
    header_written: bool,
}

impl StdoutDisplay<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> StdoutDisplay<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            header_written: false,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_i3bar(&mut self, line: &StatusLine) -> io::Result<()> {
        if !self.header_written {
            // Header, then an endless array whose first element is empty so
            // every later update can be written as ",[...]".
            writeln!(self.out, r#"{{"version":1}}"#)?;
            writeln!(self.out, "[")?;
            writeln!(self.out, "[]")?;
            self.header_written = true;
        }
        let blocks: Vec<Block<'_>> = line
            .segments()
            .iter()
            .filter(|segment| !segment.fragment.is_empty())
            .map(|segment| Block {
                name: segment.monitor.name(),
                instance: segment.monitor.index().to_string(),
                full_text: markup::pango(&segment.fragment),
                markup: "pango",
            })
            .collect();
        writeln!(self.out, ",{}", serde_json::to_string(&blocks)?)
    }
}

impl<W: Write + Send> Display for StdoutDisplay<W> {
    fn show(&mut self, line: &StatusLine) -> io::Result<()> {
        match self.format {
            OutputFormat::Plain => writeln!(self.out, "{}", line.joined().plain())?,
            OutputFormat::Ansi => writeln!(self.out, "{}", markup::ansi(&line.joined()))?,
            OutputFormat::Pango => writeln!(self.out, "{}", markup::pango(&line.joined()))?,
            OutputFormat::I3bar => self.write_i3bar(line)?,
        }
        self.out.flush()
    }
}

/// Publishes the latest line on a watch channel.
///
/// `show` fails once every receiver is gone, which ends the merge task.
#[derive(Debug)]
pub struct ChannelDisplay {
    tx: watch::Sender<Option<StatusLine>>,
}

impl ChannelDisplay {
    pub fn channel() -> (Self, watch::Receiver<Option<StatusLine>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl Display for ChannelDisplay {
    fn show(&mut self, line: &StatusLine) -> io::Result<()> {
        self.tx
            .send(Some(line.clone()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "line receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::{MonitorId, Segment};
    use crate::render::{Fragment, Style};
    use ratatui::style::Color;

    fn line() -> StatusLine {
        StatusLine::new(
            vec![
                Segment {
                    monitor: MonitorId::new(0, "window"),
                    fragment: Fragment::text("a<b"),
                },
                Segment {
                    monitor: MonitorId::new(1, "battery"),
                    fragment: Fragment::empty(),
                },
                Segment {
                    monitor: MonitorId::new(2, "load"),
                    fragment: Fragment::text("L:1").styled(Style::fg(Color::Rgb(0xa4, 0x61, 0x63))),
                },
            ],
            " ",
        )
    }

    fn render(format: OutputFormat, updates: usize) -> String {
        let mut display = StdoutDisplay::new(Vec::new(), format);
        for _ in 0..updates {
            display.show(&line()).unwrap();
        }
        String::from_utf8(display.into_inner()).unwrap()
    }

    #[test]
    fn plain_skips_empty_segments() {
        assert_eq!(render(OutputFormat::Plain, 1), "a<b L:1\n");
    }

    #[test]
    fn pango_escapes_and_colors() {
        assert_eq!(
            render(OutputFormat::Pango, 1),
            "a&lt;b <span foreground=\"#a46163\">L:1</span>\n"
        );
    }

    #[test]
    fn ansi_contains_escape_sequences() {
        let out = render(OutputFormat::Ansi, 1);
        assert!(out.contains("\u{1b}["));
        assert!(out.contains("L:1"));
    }

    #[test]
    fn i3bar_writes_header_once() {
        let out = render(OutputFormat::I3bar, 2);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], r#"{"version":1}"#);
        assert_eq!(lines[1], "[");
        assert_eq!(lines[2], "[]");
        assert_eq!(lines.len(), 5);

        let blocks: serde_json::Value = serde_json::from_str(&lines[3][1..]).unwrap();
        let blocks = blocks.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["name"], "window");
        assert_eq!(blocks[0]["full_text"], "a&lt;b");
        assert_eq!(blocks[1]["instance"], "2");
        assert_eq!(blocks[1]["markup"], "pango");
    }

    #[test]
    fn channel_display_fails_without_receivers() {
        let (mut display, rx) = ChannelDisplay::channel();
        display.show(&line()).unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().joined().plain(), "a<b L:1");

        drop(rx);
        let err = display.show(&line()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
