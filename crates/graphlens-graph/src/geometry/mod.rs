//! Renderer-agnostic shape geometry: captions, arrows and angle distribution.

pub mod arrows;
pub mod caption;
pub mod circular;

use crate::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const ELLIPSIS: char = '\u{2026}';

/// One segment of an outline path, in the arrow's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    ArcTo {
        radius: f32,
        large_arc: bool,
        sweep: bool,
        to: Vec2,
    },
    Close,
}

impl PathCommand {
    pub fn end_point(&self) -> Option<Vec2> {
        match *self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(p),
            PathCommand::ArcTo { to, .. } => Some(to),
            PathCommand::Close => None,
        }
    }
}

/// Render path commands as SVG path data.
pub fn to_svg_path(commands: &[PathCommand]) -> String {
    let mut out = String::new();
    for command in commands {
        if !out.is_empty() {
            out.push(' ');
        }
        // Writing into a String cannot fail
        let _ = match *command {
            PathCommand::MoveTo(p) => write!(out, "M {} {}", fmt_num(p.x), fmt_num(p.y)),
            PathCommand::LineTo(p) => write!(out, "L {} {}", fmt_num(p.x), fmt_num(p.y)),
            PathCommand::ArcTo {
                radius,
                large_arc,
                sweep,
                to,
            } => write!(
                out,
                "A {r} {r} 0 {} {} {} {}",
                large_arc as u8,
                sweep as u8,
                fmt_num(to.x),
                fmt_num(to.y),
                r = fmt_num(radius)
            ),
            PathCommand::Close => write!(out, "Z"),
        };
    }
    out
}

fn fmt_num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// Measures rendered text width.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32;
}

/// Width estimate from character count, for hosts without font metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateTextMeasure {
    pub char_width_ratio: f32,
}

impl Default for ApproximateTextMeasure {
    fn default() -> Self {
        Self {
            char_width_ratio: 0.6,
        }
    }
}

impl TextMeasure for ApproximateTextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.char_width_ratio
    }
}

/// Drop the last two characters and append an ellipsis.
pub(crate) fn shorten_once(text: &str) -> String {
    let keep = text.chars().count().saturating_sub(2);
    let mut shortened: String = text.chars().take(keep).collect();
    shortened.push(ELLIPSIS);
    shortened
}
