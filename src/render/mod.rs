//! Styled output: fragments, styles, palettes and markup encoders.
//!
//! ## Submodules
//!
//! - [`fragment`]: [`Fragment`] and [`Style`], the unit every monitor emits
//! - [`palette`]: named colors with light/dark variants
//! - [`markup`]: Pango and ANSI encoders used by the display

pub mod fragment;
pub mod markup;
pub mod palette;

pub use fragment::{Fragment, Style};
pub use palette::{NamedColor, Palette, PaletteChoice, UnknownColor};
