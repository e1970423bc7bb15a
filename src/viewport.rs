// SPDX: CC0-1.0

use crate::{Number, Point};
use core::{fmt, ops::Range};

pub const ZOOM_IN: Number = 0.9;
pub const ZOOM_OUT: Number = 1.1;
/// Fraction of the extent added on each side by [`Viewport::fit`].
pub const FIT_PADDING: Number = 0.1;
/// Smallest span zooming in will reach, relative to the largest bound on
/// that axis (or one unit near the origin).
pub const MIN_SPAN: Number = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub enum ViewportErr {
    Size { width: Number, height: Number },
    EmptyRange { axis: char, range: Range<Number> },
}

impl fmt::Display for ViewportErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size { width, height } => {
                write!(f, "canvas size {width}x{height} must be positive and finite")
            }
            Self::EmptyRange { axis, range } => write!(
                f,
                "{axis} range {start}..{end} must be finite with min < max",
                start = range.start,
                end = range.end
            ),
        }
    }
}

/// The visible world rectangle and the pixel size it maps onto.
///
/// Screen y grows downward while world y grows upward.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: Range<Number>,
    pub y: Range<Number>,
    pub width: Number,
    pub height: Number,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: -10.0..10.0,
            y: -10.0..10.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("x range", &self.x)
            .field("y range", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn valid_range(range: &Range<Number>) -> bool {
    range.start.is_finite()
        && range.end.is_finite()
        && range.start < range.end
        && (range.end - range.start).is_finite()
}

fn min_span(range: &Range<Number>) -> Number {
    MIN_SPAN * range.start.abs().max(range.end.abs()).max(1.0)
}

impl Viewport {
    pub fn validate(&self) -> Result<(), ViewportErr> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(ViewportErr::Size {
                width: self.width,
                height: self.height,
            });
        }
        for (axis, range) in [('x', &self.x), ('y', &self.y)] {
            if !valid_range(range) {
                return Err(ViewportErr::EmptyRange {
                    axis,
                    range: range.clone(),
                });
            }
        }
        Ok(())
    }

    /// Same ranges, different canvas size.
    pub fn with_size(&self, width: Number, height: Number) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    pub fn x_span(&self) -> Number {
        self.x.end - self.x.start
    }

    pub fn y_span(&self) -> Number {
        self.y.end - self.y.start
    }

    pub fn screen_x(&self, x: Number) -> Number {
        (x - self.x.start) / self.x_span() * self.width
    }

    pub fn screen_y(&self, y: Number) -> Number {
        self.height - (y - self.y.start) / self.y_span() * self.height
    }

    pub fn to_screen(&self, world: Point<Number>) -> Point<Number> {
        Point::new(self.screen_x(world.x), self.screen_y(world.y))
    }

    pub fn to_world(&self, screen: Point<Number>) -> Point<Number> {
        Point::new(
            screen.x / self.width * self.x_span() + self.x.start,
            self.y.end - screen.y / self.height * self.y_span(),
        )
    }

    pub fn center(&self) -> Point<Number> {
        Point::new(
            (self.x.start + self.x.end) / 2.0,
            (self.y.start + self.y.end) / 2.0,
        )
    }

    /// Whether scaling by `factor` keeps both spans at or above
    /// [`MIN_SPAN`]. Zooming out is always allowed.
    fn can_scale(&self, factor: Number) -> bool {
        factor >= 1.0
            || (self.x_span() * factor >= min_span(&self.x)
                && self.y_span() * factor >= min_span(&self.y))
    }

    /// Scales both spans by `factor`, keeping the world point under the
    /// screen position `anchor` fixed.
    ///
    /// Zooming in stops at [`MIN_SPAN`].
    pub fn zoom_at(&mut self, anchor: Point<Number>, factor: Number) {
        if !self.can_scale(factor) {
            return;
        }
        let world = self.to_world(anchor);
        let x_span = self.x_span() * factor;
        let y_span = self.y_span() * factor;

        let x_start = world.x - anchor.x / self.width * x_span;
        let y_end = world.y + (self.height - anchor.y) / self.height * y_span;
        self.x = x_start..x_start + x_span;
        self.y = y_end - y_span..y_end;
    }

    pub fn zoom_centered(&mut self, factor: Number) {
        if !self.can_scale(factor) {
            return;
        }
        let c = self.center();
        let (hx, hy) = (self.x_span() * factor / 2.0, self.y_span() * factor / 2.0);
        self.x = c.x - hx..c.x + hx;
        self.y = c.y - hy..c.y + hy;
    }

    /// Moves the view so content follows a drag of `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: Number, dy: Number) {
        let dx_world = -(dx / self.width) * self.x_span();
        let dy_world = dy / self.height * self.y_span();
        self.x = self.x.start + dx_world..self.x.end + dx_world;
        self.y = self.y.start + dy_world..self.y.end + dy_world;
    }

    /// The bounding box of `points` padded by [`FIT_PADDING`], at this size.
    ///
    /// Non-finite points are ignored. A flat extent is widened by one unit
    /// each way; no finite points at all gives the default ranges.
    pub fn fit(&self, points: impl IntoIterator<Item = Point<Number>>) -> Self {
        let mut bounds: Option<(Point<Number>, Point<Number>)> = None;
        for p in points {
            if !(p.x.is_finite() && p.y.is_finite()) {
                continue;
            }
            bounds = Some(match bounds {
                None => (p, p),
                Some((lo, hi)) => (
                    Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                    Point::new(hi.x.max(p.x), hi.y.max(p.y)),
                ),
            });
        }

        let Some((lo, hi)) = bounds else {
            return Self::default().with_size(self.width, self.height);
        };
        let padded = |lo: Number, hi: Number| {
            let (lo, hi) = if hi - lo > 0.0 {
                (lo, hi)
            } else {
                (lo - 1.0, hi + 1.0)
            };
            let pad = (hi - lo) * FIT_PADDING;
            lo - pad..hi + pad
        };
        Self {
            x: padded(lo.x, hi.x),
            y: padded(lo.y, hi.y),
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Point<Number>, b: Point<Number>, tol: Number) -> bool {
        (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol
    }

    #[test]
    fn corners_map_to_canvas_corners() {
        let vp = Viewport::default();
        assert_eq!(vp.to_screen(Point::new(-10.0, 10.0)), Point::new(0.0, 0.0));
        assert_eq!(vp.to_screen(Point::new(10.0, -10.0)), Point::new(800.0, 600.0));
        assert_eq!(vp.to_screen(Point::new(0.0, 0.0)), Point::new(400.0, 300.0));
    }

    #[test]
    fn wheel_zoom_keeps_pointer_anchored() {
        for factor in [ZOOM_IN, ZOOM_OUT] {
            let mut vp = Viewport::default();
            let pointer = Point::new(123.0, 456.0);
            let world = vp.to_world(pointer);
            vp.zoom_at(pointer, factor);
            assert!(close(vp.to_screen(world), pointer, 1.0));
            assert!((vp.x_span() - 20.0 * factor).abs() < 1e-9);
        }
    }

    #[test]
    fn centered_zoom() {
        let mut vp = Viewport::default();
        vp.zoom_centered(ZOOM_IN);
        assert!((vp.x.start + 9.0).abs() < 1e-12 && (vp.x.end - 9.0).abs() < 1e-12);
        assert_eq!(vp.center(), Point::new(0.0, 0.0));
    }

    #[test]
    fn drag_right_moves_view_left() {
        let mut vp = Viewport::default();
        vp.pan(80.0, -60.0);
        assert!((vp.x.start + 12.0).abs() < 1e-12);
        assert!((vp.y.start + 12.0).abs() < 1e-12);
        assert!((vp.x_span() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn fit_pads_bounding_box() {
        let vp = Viewport::default().fit([Point::new(0.0, 0.0), Point::new(10.0, 5.0)]);
        assert_eq!(vp.x, -1.0..11.0);
        assert_eq!(vp.y, -0.5..5.5);
        assert_eq!((vp.width, vp.height), (800.0, 600.0));
    }

    #[test]
    fn fit_of_constant_stays_valid() {
        let vp = Viewport::default().fit([Point::new(-1.0, 3.0), Point::new(1.0, 3.0)]);
        assert!(vp.validate().is_ok());
        assert!(vp.y.start < 3.0 && 3.0 < vp.y.end);
    }

    #[test]
    fn fit_without_samples_is_default() {
        let vp = Viewport::default()
            .with_size(100.0, 50.0)
            .fit([Point::new(Number::NAN, 1.0)]);
        assert_eq!(vp, Viewport::default().with_size(100.0, 50.0));
    }

    #[test]
    fn degenerate_viewports() {
        let mut vp = Viewport::default();
        vp.width = 0.0;
        assert!(matches!(vp.validate(), Err(ViewportErr::Size { .. })));
        let mut vp = Viewport::default();
        vp.y = 1.0..1.0;
        assert!(matches!(
            vp.validate(),
            Err(ViewportErr::EmptyRange { axis: 'y', .. })
        ));
        vp.y = 0.0..Number::INFINITY;
        assert!(vp.validate().is_err());
    }

    #[test]
    fn span_must_not_overflow() {
        let mut vp = Viewport::default();
        vp.x = -1e308..1e308;
        assert!(matches!(
            vp.validate(),
            Err(ViewportErr::EmptyRange { axis: 'x', .. })
        ));
    }

    #[test]
    fn deep_zoom_stops_at_min_span_and_recovers() {
        let mut vp = Viewport::default();
        let anchor = Point::new(600.0, 150.0);
        let target = Point::new(5.0, 5.0);
        assert!(close(vp.to_world(anchor), target, 1e-12));

        for _ in 0..1000 {
            vp.zoom_at(anchor, ZOOM_IN);
        }
        let smallest = vp.x_span();
        assert!(smallest >= 5.0 * MIN_SPAN * 0.99, "{vp}");
        assert!(smallest < 1e-8, "{vp}");
        assert!(close(vp.to_world(anchor), target, 1e-6), "{vp}");

        for _ in 0..50 {
            vp.zoom_at(anchor, ZOOM_OUT);
        }
        assert!(vp.x_span() > 100.0 * smallest, "{vp}");
        assert!(close(vp.to_world(anchor), target, 1e-6), "{vp}");
        assert!(vp.validate().is_ok());
    }

    #[test]
    fn centered_zoom_in_is_clamped() {
        let mut vp = Viewport::default();
        for _ in 0..1000 {
            vp.zoom_centered(ZOOM_IN);
        }
        assert!(vp.x_span() >= MIN_SPAN, "{vp}");
        assert!(vp.validate().is_ok());
    }

    proptest! {
        #[test]
        fn screen_round_trip(
            x0 in -1e3..1e3f64,
            xw in 1e-3..1e3f64,
            y0 in -1e3..1e3f64,
            yw in 1e-3..1e3f64,
            sx in 0.0..800.0f64,
            sy in 0.0..600.0f64,
        ) {
            let vp = Viewport { x: x0..x0 + xw, y: y0..y0 + yw, width: 800.0, height: 600.0 };
            let screen = Point::new(sx, sy);
            prop_assert!(close(vp.to_screen(vp.to_world(screen)), screen, 1e-6));
        }

        #[test]
        fn zoom_anchor_is_fixed(
            sx in 0.0..800.0f64,
            sy in 0.0..600.0f64,
            zoom_in in any::<bool>(),
        ) {
            let mut vp = Viewport::default();
            let anchor = Point::new(sx, sy);
            let world = vp.to_world(anchor);
            vp.zoom_at(anchor, if zoom_in { ZOOM_IN } else { ZOOM_OUT });
            prop_assert!(close(vp.to_screen(world), anchor, 1.0));
        }
    }
}
