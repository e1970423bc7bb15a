// SPDX: CC0-1.0

//! Drawing primitives and the surface the renderer paints onto.

use crate::{Number, Point};
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0x000000);
    pub const WHITE: Self = Self::rgb(0xffffff);

    /// Opaque colour from `0xrrggbb`.
    pub const fn rgb(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
            a: 0xff,
        }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: Number,
    pub y: Number,
    pub w: Number,
    pub h: Number,
}

impl Rect {
    pub const fn new(x: Number, y: Number, w: Number, h: Number) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    MoveTo(Point<Number>),
    LineTo(Point<Number>),
    Close,
}

/// A polyline in screen space, possibly broken into several runs.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    segments: Vec<Segment>,
    lifted: bool,
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Path {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            lifted: true,
        }
    }

    pub fn move_to(&mut self, p: Point<Number>) {
        self.segments.push(Segment::MoveTo(p));
        self.lifted = false;
    }

    pub fn line_to(&mut self, p: Point<Number>) {
        self.segments.push(Segment::LineTo(p));
        self.lifted = false;
    }

    pub fn close(&mut self) {
        self.segments.push(Segment::Close);
    }

    /// Extends the current run to `p`, or starts a new run after a [`lift`].
    ///
    /// [`lift`]: Self::lift
    pub fn trace(&mut self, p: Point<Number>) {
        if self.lifted {
            self.move_to(p);
        } else {
            self.line_to(p);
        }
    }

    /// Breaks the path; the next [`trace`](Self::trace) starts a new run.
    pub fn lift(&mut self) {
        self.lifted = true;
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether anything would be stroked, i.e. some run has a second point.
    pub fn has_lines(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| matches!(seg, Segment::LineTo(_)))
    }

    /// Number of connected runs.
    pub fn runs(&self) -> usize {
        self.segments
            .iter()
            .filter(|seg| matches!(seg, Segment::MoveTo(_)))
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: Number,
    /// On and off lengths.
    pub dash: Option<[Number; 2]>,
}

impl Stroke {
    pub const fn solid(color: Color, width: Number) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub const fn dashed(self, on: Number, off: Number) -> Self {
        Self {
            dash: Some([on, off]),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    Top,
    Middle,
    Alphabetic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: Number,
    pub align: Align,
    pub baseline: Baseline,
}

impl TextStyle {
    pub const fn new(color: Color, size: Number) -> Self {
        Self {
            color,
            size,
            align: Align::Left,
            baseline: Baseline::Alphabetic,
        }
    }

    pub const fn aligned(self, align: Align, baseline: Baseline) -> Self {
        Self {
            align,
            baseline,
            ..self
        }
    }
}

/// Something the renderer can paint onto.
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke);

    /// Axis-aligned squares of side `size` centred on each point.
    fn fill_squares(&mut self, centers: &[Point<Number>], size: Number, color: Color);

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke);

    fn fill_path(&mut self, path: &Path, color: Color);

    fn fill_circle(&mut self, center: Point<Number>, radius: Number, color: Color);

    fn text(&mut self, text: &str, at: Point<Number>, style: &TextStyle);

    fn line(&mut self, from: Point<Number>, to: Point<Number>, stroke: &Stroke) {
        let mut path = Path::new();
        path.move_to(from);
        path.line_to(to);
        self.stroke_path(&path, stroke);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        stroke: Stroke,
    },
    FillSquares {
        centers: Vec<Point<Number>>,
        size: Number,
        color: Color,
    },
    StrokePath {
        path: Path,
        stroke: Stroke,
    },
    FillPath {
        path: Path,
        color: Color,
    },
    FillCircle {
        center: Point<Number>,
        radius: Number,
        color: Color,
    },
    Text {
        text: String,
        at: Point<Number>,
        style: TextStyle,
    },
}

/// A recorded frame, replayable onto any other [`Surface`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    pub width: Number,
    pub height: Number,
    cmds: Vec<DrawCmd>,
}

impl DisplayList {
    pub fn new(width: Number, height: Number) -> Self {
        Self {
            width,
            height,
            cmds: Vec::new(),
        }
    }

    pub fn cmds(&self) -> &[DrawCmd] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.cmds.iter().filter_map(|cmd| match cmd {
            DrawCmd::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Paths stroked in `color`.
    pub fn strokes_in(&self, color: Color) -> impl Iterator<Item = &Path> {
        self.cmds.iter().filter_map(move |cmd| match cmd {
            DrawCmd::StrokePath { path, stroke } if stroke.color == color => Some(path),
            _ => None,
        })
    }

    pub fn replay(&self, out: &mut dyn Surface) {
        for cmd in &self.cmds {
            match cmd {
                DrawCmd::FillRect { rect, color } => out.fill_rect(*rect, *color),
                DrawCmd::StrokeRect { rect, stroke } => out.stroke_rect(*rect, stroke),
                DrawCmd::FillSquares {
                    centers,
                    size,
                    color,
                } => out.fill_squares(centers, *size, *color),
                DrawCmd::StrokePath { path, stroke } => out.stroke_path(path, stroke),
                DrawCmd::FillPath { path, color } => out.fill_path(path, *color),
                DrawCmd::FillCircle {
                    center,
                    radius,
                    color,
                } => out.fill_circle(*center, *radius, *color),
                DrawCmd::Text { text, at, style } => out.text(text, *at, style),
            }
        }
    }
}

impl Surface for DisplayList {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.cmds.push(DrawCmd::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke) {
        self.cmds.push(DrawCmd::StrokeRect {
            rect,
            stroke: *stroke,
        });
    }

    fn fill_squares(&mut self, centers: &[Point<Number>], size: Number, color: Color) {
        if centers.is_empty() {
            return;
        }
        self.cmds.push(DrawCmd::FillSquares {
            centers: centers.to_vec(),
            size,
            color,
        });
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke) {
        self.cmds.push(DrawCmd::StrokePath {
            path: path.clone(),
            stroke: *stroke,
        });
    }

    fn fill_path(&mut self, path: &Path, color: Color) {
        self.cmds.push(DrawCmd::FillPath {
            path: path.clone(),
            color,
        });
    }

    fn fill_circle(&mut self, center: Point<Number>, radius: Number, color: Color) {
        self.cmds.push(DrawCmd::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn text(&mut self, text: &str, at: Point<Number>, style: &TextStyle) {
        self.cmds.push(DrawCmd::Text {
            text: text.to_string(),
            at,
            style: *style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours() {
        let c = Color::rgb(0x3b82f6);
        assert_eq!((c.r, c.g, c.b, c.a), (0x3b, 0x82, 0xf6, 0xff));
        assert_eq!(c.to_string(), "#3b82f6");
        assert_eq!(c.with_alpha(0x40).to_string(), "#3b82f640");
    }

    #[test]
    fn trace_breaks_into_runs() {
        let mut path = Path::new();
        path.trace(Point::new(0.0, 0.0));
        path.trace(Point::new(1.0, 1.0));
        path.lift();
        path.lift();
        path.trace(Point::new(5.0, 5.0));
        path.trace(Point::new(6.0, 5.0));
        assert_eq!(path.runs(), 2);
        assert!(matches!(path.segments()[2], Segment::MoveTo(_)));
        assert!(path.has_lines());
    }

    #[test]
    fn replay_reproduces_the_list() {
        let mut list = DisplayList::new(10.0, 10.0);
        list.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        list.line(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            &Stroke::solid(Color::BLACK, 1.0),
        );
        list.fill_squares(&[], 2.0, Color::BLACK);
        let mut copy = DisplayList::new(10.0, 10.0);
        list.replay(&mut copy);
        assert_eq!(copy, list);
        assert_eq!(copy.len(), 2);
    }
}
