// SPDX: CC0-1.0

//! Numerical operations on compiled curves.
//!
//! Nothing here fails loudly: an evaluation error and a non-finite result are
//! both reported as "no result".

use crate::{
    classify::InequalityOp,
    eval::{Evaluate, ParamValues, Scope},
    stdlib::{T, X, Y},
    Number, Point,
};
use core::ops::Range;

/// Step of the central difference.
pub const DERIVATIVE_STEP: Number = 1e-5;
/// Subintervals of Simpson's rule.
pub const INTEGRAL_INTERVALS: usize = 1000;
pub const IMPLICIT_TOLERANCE: Number = 0.1;
pub const INTERSECTION_STEP: Number = 0.1;
/// Largest `|f1 - f2|` that counts as a crossing.
pub const INTERSECTION_EPSILON: Number = 0.01;
/// Points closer than this on both axes are the same intersection.
pub const INTERSECTION_DEDUP: Number = 0.1;

/// `f` at `vars` layered over `params`, if finite.
pub fn evaluate_with(
    f: &dyn Evaluate,
    vars: &[(&str, Number)],
    params: &ParamValues,
) -> Option<Number> {
    f.evaluate(&Scope::new(vars, params))
        .ok()
        .filter(|val| val.is_finite())
}

pub fn evaluate_at(f: &dyn Evaluate, x: Number, params: &ParamValues) -> Option<Number> {
    evaluate_with(f, &[(X, x)], params)
}

pub fn derivative(f: &dyn Evaluate, x0: Number, params: &ParamValues) -> Option<Number> {
    derivative_with_step(f, x0, params, DERIVATIVE_STEP)
}

/// Central difference `(f(x0 + h) - f(x0 - h)) / 2h`.
pub fn derivative_with_step(
    f: &dyn Evaluate,
    x0: Number,
    params: &ParamValues,
    h: Number,
) -> Option<Number> {
    let ahead = evaluate_at(f, x0 + h, params)?;
    let behind = evaluate_at(f, x0 - h, params)?;
    Some((ahead - behind) / (2.0 * h)).filter(|val| val.is_finite())
}

pub fn definite_integral(
    f: &dyn Evaluate,
    a: Number,
    b: Number,
    params: &ParamValues,
) -> Option<Number> {
    definite_integral_with(f, a, b, params, INTEGRAL_INTERVALS)
}

/// Composite Simpson's rule over `n` subintervals.
///
/// `n` is rounded up to the next even number (at least 2). Samples that are
/// not finite contribute nothing.
pub fn definite_integral_with(
    f: &dyn Evaluate,
    a: Number,
    b: Number,
    params: &ParamValues,
    n: usize,
) -> Option<Number> {
    if !a.is_finite() || !b.is_finite() || a >= b {
        return None;
    }
    let n = n.max(2).next_multiple_of(2);
    let h = (b - a) / n as Number;

    let mut sum = 0.0;
    for i in 0..=n {
        let Some(fx) = evaluate_at(f, a + i as Number * h, params) else {
            continue;
        };
        sum += if i == 0 || i == n {
            fx
        } else if i % 2 == 1 {
            4.0 * fx
        } else {
            2.0 * fx
        };
    }
    Some(h / 3.0 * sum).filter(|val| val.is_finite())
}

/// `y = slope * x + intercept`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tangent {
    pub slope: Number,
    pub intercept: Number,
}

impl Tangent {
    pub fn at(&self, x: Number) -> Number {
        self.slope * x + self.intercept
    }
}

pub fn tangent_line(f: &dyn Evaluate, x0: Number, params: &ParamValues) -> Option<Tangent> {
    let y0 = evaluate_at(f, x0, params)?;
    let slope = derivative(f, x0, params)?;
    Some(Tangent {
        slope,
        intercept: y0 - slope * x0,
    })
}

/// `y <op> f(x)`; false where `f(x)` is undefined.
pub fn inequality_holds(
    f: &dyn Evaluate,
    x: Number,
    y: Number,
    params: &ParamValues,
    op: InequalityOp,
) -> bool {
    evaluate_at(f, x, params).is_some_and(|fx| op.holds(y, fx))
}

pub fn polar_to_cartesian(r: Number, theta: Number) -> Point<Number> {
    Point::new(r * theta.cos(), r * theta.sin())
}

/// The point at angle `theta` of `r = f(theta)`, with the angle bound as `t`.
///
/// Negative radii are rejected rather than reflected.
pub fn evaluate_polar(
    f: &dyn Evaluate,
    theta: Number,
    params: &ParamValues,
) -> Option<Point<Number>> {
    let r = evaluate_with(f, &[(T, theta)], params)?;
    (r >= 0.0).then(|| polar_to_cartesian(r, theta))
}

pub fn evaluate_parametric(
    fx: &dyn Evaluate,
    fy: &dyn Evaluate,
    t: Number,
    params: &ParamValues,
) -> Option<Point<Number>> {
    let vars = [(T, t)];
    let x = evaluate_with(fx, &vars, params)?;
    let y = evaluate_with(fy, &vars, params)?;
    Some(Point::new(x, y))
}

/// Whether `(x, y)` lies within `tolerance` of the zero set of `f`.
pub fn implicit_holds(
    f: &dyn Evaluate,
    x: Number,
    y: Number,
    params: &ParamValues,
    tolerance: Number,
) -> bool {
    evaluate_with(f, &[(X, x), (Y, y)], params).is_some_and(|val| val.abs() < tolerance)
}

pub fn find_intersections(
    f1: &dyn Evaluate,
    f2: &dyn Evaluate,
    range: Range<Number>,
    params1: &ParamValues,
    params2: &ParamValues,
) -> Vec<Point<Number>> {
    find_intersections_with_step(f1, f2, range, params1, params2, INTERSECTION_STEP)
}

/// Scans `range` every `step` for places where the curves nearly meet, then
/// refines each at a tenth of the step.
///
/// This is a proximity search, not root bracketing: crossings steeper than
/// the coarse step can resolve are missed.
pub fn find_intersections_with_step(
    f1: &dyn Evaluate,
    f2: &dyn Evaluate,
    range: Range<Number>,
    params1: &ParamValues,
    params2: &ParamValues,
    step: Number,
) -> Vec<Point<Number>> {
    let mut found: Vec<Point<Number>> = Vec::new();
    if step.is_nan() || step <= 0.0 || !range.start.is_finite() || !range.end.is_finite() {
        return found;
    }

    let gap = |x: Number| -> Option<Number> {
        let y1 = evaluate_at(f1, x, params1)?;
        let y2 = evaluate_at(f2, x, params2)?;
        Some((y1 - y2).abs())
    };

    let fine = step / 10.0;
    for x in samples(range.start, range.end, step) {
        let Some(diff) = gap(x) else {
            continue;
        };
        if diff >= INTERSECTION_EPSILON {
            continue;
        }

        let (mut best_x, mut best_diff) = (x, diff);
        for test_x in samples(x - step, x + step, fine) {
            if test_x < range.start || test_x > range.end {
                continue;
            }
            if let Some(test_diff) = gap(test_x) {
                if test_diff < best_diff {
                    (best_x, best_diff) = (test_x, test_diff);
                }
            }
        }

        if best_diff >= INTERSECTION_EPSILON {
            continue;
        }
        let Some(best_y) = evaluate_at(f1, best_x, params1) else {
            continue;
        };
        let duplicate = found.iter().any(|p| {
            (p.x - best_x).abs() < INTERSECTION_DEDUP && (p.y - best_y).abs() < INTERSECTION_DEDUP
        });
        if !duplicate {
            found.push(Point::new(best_x, best_y));
        }
    }
    found
}

/// Rows `(x, f(x))` for `x = start + i * step` up to `end`, skipping
/// undefined values.
pub fn table(
    f: &dyn Evaluate,
    range: Range<Number>,
    step: Number,
    params: &ParamValues,
) -> Vec<Point<Number>> {
    if step.is_nan() || step <= 0.0 || !range.start.is_finite() || !range.end.is_finite() {
        return Vec::new();
    }
    if range.start >= range.end {
        return Vec::new();
    }
    samples(range.start, range.end, step)
        .filter_map(|x| Some(Point::new(x, evaluate_at(f, x, params)?)))
        .collect()
}

/// `start, start + step, ...` up to and including `end`.
///
/// Each sample is computed from its index so error does not accumulate.
/// Yields nothing unless the bounds are finite and `step` is positive.
pub(crate) fn samples(start: Number, end: Number, step: Number) -> impl Iterator<Item = Number> {
    let advances = start.is_finite() && end.is_finite() && step.is_finite() && step > 0.0;
    (0_u64..)
        .take_while(move |_| advances)
        .map(move |i| start + i as Number * step)
        .take_while(move |x| *x <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{compile, Program};

    fn f(src: &str) -> Program {
        compile(src).unwrap()
    }

    fn none() -> ParamValues {
        ParamValues::new()
    }

    #[test]
    fn integral_of_identity() {
        let val = definite_integral(&f("x"), 0.0, 2.0, &none()).unwrap();
        assert!((val - 2.0).abs() < 1e-6, "{val}");
    }

    #[test]
    fn empty_or_reversed_interval_has_no_integral() {
        assert_eq!(definite_integral(&f("x"), 0.0, 0.0, &none()), None);
        assert_eq!(definite_integral(&f("x"), 2.0, 0.0, &none()), None);
        assert_eq!(definite_integral(&f("x"), 0.0, Number::INFINITY, &none()), None);
    }

    #[test]
    fn simpson_is_exact_for_cubics() {
        let val = definite_integral_with(&f("x^3 - x"), -1.0, 3.0, &none(), 7).unwrap();
        // [x^4/4 - x^2/2] from -1 to 3
        assert!((val - 16.0).abs() < 1e-9, "{val}");
    }

    #[test]
    fn undefined_samples_are_skipped() {
        // sqrt is NaN below zero, so only the right half counts
        let val = definite_integral(&f("sqrt(x)"), -1.0, 1.0, &none()).unwrap();
        assert!((val - 2.0 / 3.0).abs() < 1e-2, "{val}");
    }

    #[test]
    fn derivative_of_square() {
        let val = derivative(&f("x^2"), 3.0, &none()).unwrap();
        assert!((val - 6.0).abs() < 1e-3, "{val}");
        assert_eq!(derivative(&f("ln(x)"), 0.0, &none()), None);
    }

    #[test]
    fn tangent_of_square() {
        let t = tangent_line(&f("x^2"), 1.0, &none()).unwrap();
        assert!((t.slope - 2.0).abs() < 1e-6);
        assert!((t.intercept + 1.0).abs() < 1e-6);
        assert!((t.at(3.0) - 5.0).abs() < 1e-5);
        assert_eq!(tangent_line(&f("1/x"), 0.0, &none()), None);
    }

    #[test]
    fn parameters_are_bound() {
        let params = ParamValues::from([("a".to_string(), 3.0)]);
        assert_eq!(evaluate_at(&f("a*x"), 2.0, &params), Some(6.0));
        assert_eq!(evaluate_at(&f("a*x"), 2.0, &none()), None);
    }

    #[test]
    fn inequality_against_curve() {
        let g = f("x^2");
        assert!(inequality_holds(&g, 2.0, 5.0, &none(), InequalityOp::Greater));
        assert!(!inequality_holds(&g, 2.0, 4.0, &none(), InequalityOp::Greater));
        assert!(inequality_holds(&g, 2.0, 4.0, &none(), InequalityOp::GreaterEq));
        assert!(inequality_holds(&g, 2.0, 3.0, &none(), InequalityOp::Less));
        assert!(!inequality_holds(&f("ln(x)"), -1.0, 0.0, &none(), InequalityOp::Less));
    }

    #[test]
    fn polar_points() {
        let p = evaluate_polar(&f("2"), core::f64::consts::FRAC_PI_2, &none()).unwrap();
        assert!(p.x.abs() < 1e-12 && (p.y - 2.0).abs() < 1e-12);
        assert_eq!(evaluate_polar(&f("t-1"), 0.0, &none()), None, "negative radius");
    }

    #[test]
    fn parametric_points() {
        let p = evaluate_parametric(&f("cos(t)"), &f("sin(t)"), 0.0, &none()).unwrap();
        assert_eq!(p, Point::new(1.0, 0.0));
        assert_eq!(evaluate_parametric(&f("t"), &f("ln(t)"), 0.0, &none()), None);
    }

    #[test]
    fn implicit_band() {
        let circle = f("(x^2+y^2)-(4)");
        assert!(implicit_holds(&circle, 2.0, 0.0, &none(), IMPLICIT_TOLERANCE));
        assert!(implicit_holds(&circle, 2.01, 0.0, &none(), IMPLICIT_TOLERANCE));
        assert!(!implicit_holds(&circle, 0.0, 0.0, &none(), IMPLICIT_TOLERANCE));
    }

    #[test]
    fn crossing_lines_meet_once() {
        let found = find_intersections(&f("x"), &f("-x"), -5.0..5.0, &none(), &none());
        assert_eq!(found.len(), 1, "{found:?}");
        assert!(found[0].x.abs() < 1e-9 && found[0].y.abs() < 1e-9);
    }

    #[test]
    fn parallel_lines_never_meet() {
        let found = find_intersections(&f("x"), &f("x+1"), -5.0..5.0, &none(), &none());
        assert!(found.is_empty());
    }

    #[test]
    fn intersections_use_each_curves_parameters() {
        let a = ParamValues::from([("a".to_string(), 2.0)]);
        let b = ParamValues::from([("a".to_string(), -2.0)]);
        // 2x + 1 and -2x + 1 meet at (0, 1)
        let found = find_intersections(&f("a*x+1"), &f("a*x+1"), -3.0..3.0, &a, &b);
        assert_eq!(found.len(), 1);
        assert!((found[0].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn table_rows() {
        let rows = table(&f("2*x"), 0.0..1.0, 0.25, &none());
        let xs: Vec<Number> = rows.iter().map(|p| p.x).collect();
        assert_eq!(xs, [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(rows[4].y, 2.0);

        let rows = table(&f("1/x"), -1.0..1.0, 1.0, &none());
        assert_eq!(rows.len(), 2, "the undefined row is skipped");
        assert!(table(&f("x"), 0.0..1.0, 0.0, &none()).is_empty());
        assert!(table(&f("x"), 1.0..0.0, 0.1, &none()).is_empty());
    }
}
