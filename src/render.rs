// SPDX: CC0-1.0

//! Samples curves across a viewport and paints them onto a [`Surface`].

use crate::{
    analysis::{self, samples},
    canvas::{Align, Baseline, Color, Path, Rect, Stroke, Surface, TextStyle},
    classify::{Curve, InequalityOp},
    eval::{Evaluate, ParamValues},
    expr::Expression,
    viewport::{Viewport, ViewportErr},
    Number, Point,
};
use core::{f64::consts::TAU, fmt, ops::Range, str::FromStr};
use std::collections::HashSet;
use tracing::{trace, warn};

pub const GRID_DIVISIONS: u32 = 20;
/// How far outside the canvas, in pixels, a traced point may fall before the
/// path breaks.
pub const CULL_MARGIN: Number = 100.0;
/// Intersections are only searched among this many function curves.
pub const MAX_INTERSECTION_CURVES: usize = 3;
pub const IMPLICIT_TOLERANCE: Number = 0.05;
pub const INTERSECTION_COLOR: Color = Color::rgb(0xff6b6b);

const CURVE_WIDTH: Number = 2.5;
const INTEGRAL_ALPHA: u8 = 0x40;
const INEQUALITY_ALPHA: u8 = 0x30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinateSystem {
    #[default]
    Cartesian,
    /// Functions of `x` are drawn as `r = f(θ)`.
    Polar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub show_grid: bool,
    pub show_axes: bool,
    pub theme: Theme,
    pub coordinates: CoordinateSystem,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_axes: true,
            theme: Theme::default(),
            coordinates: CoordinateSystem::default(),
        }
    }
}

/// A settings word that names none of the choices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownChoice {
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected one of: {}", self.expected.join(", "))
    }
}

impl FromStr for Theme {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(UnknownChoice {
                expected: &["light", "dark"],
            }),
        }
    }
}

impl FromStr for CoordinateSystem {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cartesian" => Ok(Self::Cartesian),
            "polar" => Ok(Self::Polar),
            _ => Err(UnknownChoice {
                expected: &["cartesian", "polar"],
            }),
        }
    }
}

/// Fixed colours of a theme.
#[derive(Clone, Copy, Debug)]
struct Chrome {
    background: Color,
    grid: Color,
    axis: Color,
    tick_label: Color,
    overlay_text: Color,
    hover_fill: Color,
    hover_border: Color,
    hover_text: Color,
}

impl Theme {
    const fn chrome(&self) -> Chrome {
        match self {
            Self::Light => Chrome {
                background: Color::WHITE,
                grid: Color::rgb(0xf3f4f6),
                axis: Color::rgb(0x374151),
                tick_label: Color::rgb(0x6b7280),
                overlay_text: Color::BLACK,
                hover_fill: Color::WHITE.with_alpha(0xf2),
                hover_border: Color::rgb(0xe5e7eb),
                hover_text: Color::rgb(0x374151),
            },
            Self::Dark => Chrome {
                background: Color::rgb(0x111827),
                grid: Color::rgb(0x1f2937),
                axis: Color::rgb(0xe5e7eb),
                tick_label: Color::rgb(0x9ca3af),
                overlay_text: Color::WHITE,
                hover_fill: Color::rgb(0x111827).with_alpha(0xf2),
                hover_border: Color::rgb(0x374151),
                hover_text: Color::rgb(0xe5e7eb),
            },
        }
    }
}

/// Everything that determines one picture.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub expressions: &'a [Expression],
    pub viewport: &'a Viewport,
    pub settings: &'a Settings,
    /// World point under the pointer, shown unless dragging.
    pub hover: Option<Point<Number>>,
}

/// Multiples of `span / GRID_DIVISIONS` within `range`.
fn grid_lines(range: &Range<Number>) -> impl Iterator<Item = Number> {
    let step = (range.end - range.start) / Number::from(GRID_DIVISIONS);
    let first = (range.start / step).ceil();
    let end = range.end;
    (0_u32..)
        .map(move |i| (first + Number::from(i)) * step)
        .take_while(move |val| *val <= end)
}

/// Traces `y = f(x)` across the visible x range, two samples per pixel.
///
/// Samples that are undefined, outside the y range or far off screen break
/// the path.
pub fn trace_function(f: &dyn Evaluate, params: &ParamValues, vp: &Viewport) -> Path {
    let step = vp.x_span() / (2.0 * vp.width);
    let mut path = Path::new();
    for x in samples(vp.x.start, vp.x.end, step) {
        match analysis::evaluate_at(f, x, params) {
            Some(y) if vp.y.start <= y && y <= vp.y.end => {
                let sy = vp.screen_y(y);
                if -CULL_MARGIN <= sy && sy <= vp.height + CULL_MARGIN {
                    path.trace(Point::new(vp.screen_x(x), sy));
                } else {
                    path.lift();
                }
            }
            _ => path.lift(),
        }
    }
    path
}

/// Traces `point_at(s)` for `s` across `range`, two samples per pixel of
/// canvas width.
fn trace_sweep(
    vp: &Viewport,
    range: &Range<Number>,
    mut point_at: impl FnMut(Number) -> Option<Point<Number>>,
) -> Path {
    let mut path = Path::new();
    let step = (range.end - range.start) / (2.0 * vp.width);
    if !step.is_finite() || step <= 0.0 {
        return path;
    }
    let on_canvas = |p: Point<Number>| {
        -CULL_MARGIN <= p.x
            && p.x <= vp.width + CULL_MARGIN
            && -CULL_MARGIN <= p.y
            && p.y <= vp.height + CULL_MARGIN
    };
    for s in samples(range.start, range.end, step) {
        match point_at(s).map(|p| vp.to_screen(p)) {
            Some(screen) if on_canvas(screen) => path.trace(screen),
            _ => path.lift(),
        }
    }
    path
}

pub fn default_sweep() -> Range<Number> {
    0.0..TAU
}

pub fn trace_parametric(
    fx: &dyn Evaluate,
    fy: &dyn Evaluate,
    params: &ParamValues,
    t: &Range<Number>,
    vp: &Viewport,
) -> Path {
    trace_sweep(vp, t, |t| analysis::evaluate_parametric(fx, fy, t, params))
}

pub fn trace_polar(
    f: &dyn Evaluate,
    params: &ParamValues,
    theta: &Range<Number>,
    vp: &Viewport,
) -> Path {
    trace_sweep(vp, theta, |theta| analysis::evaluate_polar(f, theta, params))
}

/// [`trace_polar`] for a function written in `x`, which stands for the angle.
fn trace_function_as_polar(
    f: &dyn Evaluate,
    params: &ParamValues,
    theta: &Range<Number>,
    vp: &Viewport,
) -> Path {
    trace_sweep(vp, theta, |theta| {
        let r = analysis::evaluate_at(f, theta, params)?;
        (r >= 0.0).then(|| analysis::polar_to_cartesian(r, theta))
    })
}

/// Screen positions of the world grid points `hit` accepts, scanning four
/// samples per pixel on each axis.
///
/// At most one point is kept per rounded pixel, the first one scanned. The
/// accepted points dropped in its favour lie within half a pixel of it, so
/// the marks can be up to half a pixel off from plotting every point.
pub fn scan_grid(vp: &Viewport, mut hit: impl FnMut(Number, Number) -> bool) -> Vec<Point<Number>> {
    let step_x = vp.x_span() / (4.0 * vp.width);
    let step_y = vp.y_span() / (4.0 * vp.height);
    let mut seen = HashSet::new();
    let mut ret = Vec::new();
    for x in samples(vp.x.start, vp.x.end, step_x) {
        let sx = vp.screen_x(x);
        for y in samples(vp.y.start, vp.y.end, step_y) {
            if !hit(x, y) {
                continue;
            }
            let sy = vp.screen_y(y);
            if seen.insert((sx.round() as i64, sy.round() as i64)) {
                ret.push(Point::new(sx, sy));
            }
        }
    }
    ret
}

/// Region between `y = f(x)` and the x axis over `range` clipped to the view.
///
/// `None` when nothing of the range is visible.
pub fn integral_region(
    f: &dyn Evaluate,
    params: &ParamValues,
    range: &Range<Number>,
    vp: &Viewport,
) -> Option<Path> {
    let a = range.start.max(vp.x.start);
    let b = range.end.min(vp.x.end);
    if a.is_nan() || b.is_nan() || a >= b {
        return None;
    }
    let step = (b - a) / (2.0 * vp.width);
    let mut path = Path::new();
    path.move_to(vp.to_screen(Point::new(a, 0.0)));
    for x in samples(a, b, step) {
        if let Some(y) = analysis::evaluate_at(f, x, params) {
            path.line_to(vp.to_screen(Point::new(x, y)));
        }
    }
    path.line_to(vp.to_screen(Point::new(b, 0.0)));
    path.close();
    Some(path)
}

fn draw_grid(out: &mut dyn Surface, vp: &Viewport, chrome: &Chrome) {
    let stroke = Stroke::solid(chrome.grid, 1.0);
    for x in grid_lines(&vp.x) {
        let sx = vp.screen_x(x);
        out.line(Point::new(sx, 0.0), Point::new(sx, vp.height), &stroke);
    }
    for y in grid_lines(&vp.y) {
        let sy = vp.screen_y(y);
        out.line(Point::new(0.0, sy), Point::new(vp.width, sy), &stroke);
    }
}

fn draw_axes(out: &mut dyn Surface, vp: &Viewport, chrome: &Chrome) {
    let stroke = Stroke::solid(chrome.axis, 1.5);
    let x_axis = vp.y.contains(&0.0) || vp.y.end == 0.0;
    let y_axis = vp.x.contains(&0.0) || vp.x.end == 0.0;
    if x_axis {
        let sy = vp.screen_y(0.0);
        out.line(Point::new(0.0, sy), Point::new(vp.width, sy), &stroke);
    }
    if y_axis {
        let sx = vp.screen_x(0.0);
        out.line(Point::new(sx, 0.0), Point::new(sx, vp.height), &stroke);
    }

    // labels sit on the axis when it is visible, on the canvas edge otherwise
    let style = TextStyle::new(chrome.tick_label, 11.0);
    let label_y = if x_axis { vp.screen_y(0.0) } else { vp.height - 10.0 };
    let x_style = style.aligned(Align::Center, Baseline::Top);
    for x in grid_lines(&vp.x).filter(|x| x.abs() > 0.01) {
        out.text(&format!("{x:.1}"), Point::new(vp.screen_x(x), label_y + 5.0), &x_style);
    }
    let label_x = if y_axis { vp.screen_x(0.0) } else { 10.0 };
    let y_style = style.aligned(Align::Right, Baseline::Middle);
    for y in grid_lines(&vp.y).filter(|y| y.abs() > 0.01) {
        out.text(&format!("{y:.1}"), Point::new(label_x - 5.0, vp.screen_y(y)), &y_style);
    }
}

fn draw_integral(out: &mut dyn Surface, expr: &Expression, f: &dyn Evaluate, vp: &Viewport) {
    let Some(range) = &expr.integral else {
        return;
    };
    let params = expr.param_values();
    let Some(region) = integral_region(f, &params, range, vp) else {
        return;
    };
    out.fill_path(&region, expr.color.with_alpha(INTEGRAL_ALPHA));

    let Some(value) = analysis::definite_integral(f, range.start, range.end, &params) else {
        return;
    };
    let mid = (range.start.max(vp.x.start) + range.end.min(vp.x.end)) / 2.0;
    let mid_y = analysis::evaluate_at(f, mid, &params).unwrap_or(0.0);
    let at = vp.to_screen(Point::new(mid, mid_y));
    out.text(
        &format!("∫ = {value:.3}"),
        Point::new(at.x, at.y - 10.0),
        &TextStyle::new(expr.color, 12.0).aligned(Align::Center, Baseline::Alphabetic),
    );
}

fn draw_inequality(
    out: &mut dyn Surface,
    expr: &Expression,
    op: InequalityOp,
    f: &dyn Evaluate,
    vp: &Viewport,
) {
    let params = expr.param_values();
    // f depends on x only, so evaluate it once per column
    let mut column: Option<(Number, Option<Number>)> = None;
    let hits = scan_grid(vp, |x, y| {
        let fx = match column {
            Some((cx, fx)) if cx == x => fx,
            _ => {
                let fx = analysis::evaluate_at(f, x, &params);
                column = Some((x, fx));
                fx
            }
        };
        fx.is_some_and(|fx| op.holds(y, fx))
    });
    out.fill_squares(&hits, 4.0, expr.color.with_alpha(INEQUALITY_ALPHA));
}

fn draw_curve(
    out: &mut dyn Surface,
    expr: &Expression,
    curve: &Curve,
    vp: &Viewport,
    settings: &Settings,
) {
    let params = expr.param_values();
    let sweep = expr.param_range.clone().unwrap_or_else(default_sweep);
    let path = match curve {
        Curve::Inequality { .. } => return,
        Curve::Implicit(f) => {
            let hits = scan_grid(vp, |x, y| {
                analysis::implicit_holds(f.as_ref(), x, y, &params, IMPLICIT_TOLERANCE)
            });
            out.fill_squares(&hits, 2.0, expr.color);
            return;
        }
        Curve::Parametric { x, y } => {
            trace_parametric(x.as_ref(), y.as_ref(), &params, &sweep, vp)
        }
        Curve::Polar(f) => trace_polar(f.as_ref(), &params, &sweep, vp),
        Curve::Function(f) => match settings.coordinates {
            CoordinateSystem::Polar => trace_function_as_polar(f.as_ref(), &params, &sweep, vp),
            CoordinateSystem::Cartesian => trace_function(f.as_ref(), &params, vp),
        },
    };
    if !path.segments().is_empty() {
        out.stroke_path(&path, &Stroke::solid(expr.color, CURVE_WIDTH));
    }
}

fn draw_tangent(
    out: &mut dyn Surface,
    expr: &Expression,
    f: &dyn Evaluate,
    vp: &Viewport,
    chrome: &Chrome,
) {
    let Some(x0) = expr.tangent_at else {
        return;
    };
    let params = expr.param_values();
    let (Some(tangent), Some(y0)) = (
        analysis::tangent_line(f, x0, &params),
        analysis::evaluate_at(f, x0, &params),
    ) else {
        return;
    };

    let from = Point::new(vp.x.start, tangent.at(vp.x.start));
    let to = Point::new(vp.x.end, tangent.at(vp.x.end));
    out.line(
        vp.to_screen(from),
        vp.to_screen(to),
        &Stroke::solid(expr.color, 1.0).dashed(5.0, 5.0),
    );

    let at = vp.to_screen(Point::new(x0, y0));
    out.fill_circle(at, 4.0, expr.color);
    out.text(
        &format!("f'({x0:.2}) = {:.3}", tangent.slope),
        Point::new(at.x + 8.0, at.y - 8.0),
        &TextStyle::new(chrome.overlay_text, 11.0),
    );
}

/// Marks where pairs of plain function curves cross. Returns how many
/// points were drawn.
fn draw_intersections(
    out: &mut dyn Surface,
    expressions: &[Expression],
    vp: &Viewport,
    chrome: &Chrome,
) -> usize {
    let eligible: Vec<(&dyn Evaluate, ParamValues)> = expressions
        .iter()
        .filter(|expr| !expr.shades_integral())
        .filter_map(|expr| match expr.curve() {
            Some(Curve::Function(f)) => Some((f.as_ref(), expr.param_values())),
            _ => None,
        })
        .collect();
    if eligible.len() > MAX_INTERSECTION_CURVES {
        return 0;
    }

    let style =
        TextStyle::new(chrome.overlay_text, 10.0).aligned(Align::Center, Baseline::Alphabetic);
    let mut count = 0;
    for (i, (f1, p1)) in eligible.iter().enumerate() {
        for (f2, p2) in &eligible[i + 1..] {
            for p in analysis::find_intersections(*f1, *f2, vp.x.clone(), p1, p2) {
                let at = vp.to_screen(p);
                out.fill_circle(at, 5.0, INTERSECTION_COLOR);
                out.text(
                    &format!("({:.2}, {:.2})", p.x, p.y),
                    Point::new(at.x, at.y - 10.0),
                    &style,
                );
                count += 1;
            }
        }
    }
    count
}

fn draw_hover(out: &mut dyn Surface, world: Point<Number>, chrome: &Chrome) {
    let rect = Rect::new(10.0, 10.0, 140.0, 40.0);
    out.fill_rect(rect, chrome.hover_fill);
    out.stroke_rect(rect, &Stroke::solid(chrome.hover_border, 1.0));
    let style = TextStyle::new(chrome.hover_text, 11.0);
    out.text(&format!("x: {:.3}", world.x), Point::new(15.0, 28.0), &style);
    out.text(&format!("y: {:.3}", world.y), Point::new(15.0, 42.0), &style);
}

/// Paints `frame` back to front. Invalid expressions are skipped.
///
/// Refuses a degenerate viewport without drawing anything.
pub fn draw(out: &mut dyn Surface, frame: &Frame<'_>) -> Result<(), ViewportErr> {
    let vp = frame.viewport;
    if let Err(err) = vp.validate() {
        warn!(%err, "refusing to draw");
        return Err(err);
    }
    let chrome = frame.settings.theme.chrome();

    out.fill_rect(Rect::new(0.0, 0.0, vp.width, vp.height), chrome.background);
    if frame.settings.show_grid {
        draw_grid(out, vp, &chrome);
    }
    if frame.settings.show_axes {
        draw_axes(out, vp, &chrome);
    }

    for expr in frame.expressions {
        if let (true, Some(Curve::Function(f))) = (expr.shades_integral(), expr.curve()) {
            draw_integral(out, expr, f.as_ref(), vp);
        }
    }

    for expr in frame.expressions {
        if let Some(Curve::Inequality { op, f }) = expr.curve() {
            draw_inequality(out, expr, *op, f.as_ref(), vp);
        }
    }

    let mut stroked = 0;
    for expr in frame.expressions {
        let Some(curve) = expr.curve() else {
            continue;
        };
        if expr.shades_integral() || matches!(curve, Curve::Inequality { .. }) {
            continue;
        }
        draw_curve(out, expr, curve, vp, frame.settings);
        if let Curve::Function(f) = curve {
            draw_tangent(out, expr, f.as_ref(), vp, &chrome);
        }
        stroked += 1;
    }

    let crossings = draw_intersections(out, frame.expressions, vp, &chrome);

    if let Some(world) = frame.hover {
        draw_hover(out, world, &chrome);
    }

    trace!(
        expressions = frame.expressions.len(),
        stroked,
        crossings,
        "frame drawn"
    );
    Ok(())
}
