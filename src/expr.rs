// SPDX: CC0-1.0

//! User-facing expressions and their tunable parameters.

use crate::{
    cache::CompileCache,
    canvas::Color,
    classify::{self, free_parameters, Curve, InequalityOp, Kind},
    eval::ParamValues,
    Number,
};
use core::{fmt, ops::Range};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::debug;

pub const DEFAULT_VALUE: Number = 1.0;
pub const DEFAULT_MIN: Number = -10.0;
pub const DEFAULT_MAX: Number = 10.0;
pub const DEFAULT_STEP: Number = 0.1;

/// Animation rate, in steps per second.
pub const SPEED: Number = 5.0;

pub const PALETTE: [Color; 8] = [
    Color::rgb(0x3b82f6),
    Color::rgb(0xef4444),
    Color::rgb(0x10b981),
    Color::rgb(0xf59e0b),
    Color::rgb(0x8b5cf6),
    Color::rgb(0xec4899),
    Color::rgb(0x06b6d4),
    Color::rgb(0x84cc16),
];

/// Colour for the expression at `index` in a list.
pub const fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamErr {
    NotFinite,
    EmptyRange { min: Number, max: Number },
    NonPositiveStep(Number),
}

impl fmt::Display for ParamErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFinite => write!(f, "value must be a finite number"),
            Self::EmptyRange { min, max } => {
                write!(f, "minimum ({min}) must be less than maximum ({max})")
            }
            Self::NonPositiveStep(step) => write!(f, "step ({step}) must be positive"),
        }
    }
}

/// A free symbol of an expression with a slider-like value.
///
/// Always `min < max`, `step > 0` and `min <= value <= max`.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    value: Number,
    min: Number,
    max: Number,
    step: Number,
    animating: bool,
    direction: Number,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: DEFAULT_VALUE,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            step: DEFAULT_STEP,
            animating: false,
            direction: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Number {
        self.value
    }

    pub fn min(&self) -> Number {
        self.min
    }

    pub fn max(&self) -> Number {
        self.max
    }

    pub fn step(&self) -> Number {
        self.step
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Sets the value, clamped into `[min, max]`.
    pub fn set_value(&mut self, value: Number) -> Result<(), ParamErr> {
        if value.is_nan() {
            return Err(ParamErr::NotFinite);
        }
        self.value = value.clamp(self.min, self.max);
        Ok(())
    }

    /// Sets the bounds and clamps the value into them.
    pub fn set_range(&mut self, min: Number, max: Number) -> Result<(), ParamErr> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ParamErr::NotFinite);
        }
        if min >= max {
            return Err(ParamErr::EmptyRange { min, max });
        }
        self.min = min;
        self.max = max;
        self.value = self.value.clamp(min, max);
        Ok(())
    }

    pub fn set_step(&mut self, step: Number) -> Result<(), ParamErr> {
        if !step.is_finite() {
            return Err(ParamErr::NotFinite);
        }
        if step <= 0.0 {
            return Err(ParamErr::NonPositiveStep(step));
        }
        self.step = step;
        Ok(())
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
    }

    /// Moves an animating value `elapsed` seconds forward, bouncing off the
    /// bounds. Returns whether the value changed.
    pub fn advance(&mut self, elapsed: Number) -> bool {
        if !self.animating || elapsed.is_nan() || elapsed <= 0.0 {
            return false;
        }
        let old = self.value;
        let mut new = old + self.step * self.direction * SPEED * elapsed;
        if new >= self.max {
            new = self.max;
            self.direction = -1.0;
        } else if new <= self.min {
            new = self.min;
            self.direction = 1.0;
        }
        self.value = new;
        new != old
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(u64);

impl ExprId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sorted free parameters of `text`, across every body of its curve.
pub fn detect_parameters(text: &str) -> BTreeSet<String> {
    match classify::split(text) {
        Ok(form) => {
            let independents = form.kind().independents();
            form.bodies()
                .into_iter()
                .flat_map(|body| free_parameters(body, independents))
                .collect()
        }
        Err(_) => free_parameters(text, Kind::Function.independents()),
    }
}

#[derive(Clone, Debug)]
pub struct Expression {
    id: ExprId,
    text: String,
    pub color: Color,
    kind: Kind,
    curve: Option<Curve>,
    error: Option<String>,
    parameters: BTreeMap<String, Parameter>,
    /// Overrides the `t`/`θ` sweep of parametric and polar curves.
    pub param_range: Option<Range<Number>>,
    /// Where to draw a tangent line.
    pub tangent_at: Option<Number>,
    /// Closed interval to shade and integrate over.
    pub integral: Option<Range<Number>>,
}

impl Expression {
    /// An empty, not yet valid expression.
    pub fn new(color: Color) -> Self {
        Self {
            id: ExprId::next(),
            text: String::new(),
            color,
            kind: Kind::Function,
            curve: None,
            error: None,
            parameters: BTreeMap::new(),
            param_range: None,
            tangent_at: None,
            integral: None,
        }
    }

    pub fn with_text(text: &str, color: Color, cache: &CompileCache) -> Self {
        let mut ret = Self::new(color);
        ret.set_text(text, cache);
        ret
    }

    /// Recompiles from `text` and reconciles the parameter set: symbols no
    /// longer present are dropped, new ones get defaults and the rest keep
    /// their state.
    pub fn set_text(&mut self, text: &str, cache: &CompileCache) {
        self.text = text.to_string();
        match classify::compile_cached(text, cache) {
            Ok(curve) => {
                self.kind = curve.kind();
                self.curve = Some(curve);
                self.error = None;
            }
            Err(err) => {
                self.kind = classify::split(text)
                    .map(|form| form.kind())
                    .unwrap_or(Kind::Function);
                self.curve = None;
                self.error = Some(err.to_string());
            }
        }

        let detected = detect_parameters(text);
        self.parameters.retain(|name, _| detected.contains(name));
        for name in detected {
            self.parameters
                .entry(name)
                .or_insert_with_key(|name| Parameter::new(name.as_str()));
        }
        debug!(
            id = %self.id,
            kind = %self.kind,
            valid = self.is_valid(),
            params = self.parameters.len(),
            "expression updated"
        );
    }

    pub fn id(&self) -> ExprId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.curve.is_some()
    }

    pub fn curve(&self) -> Option<&Curve> {
        self.curve.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn inequality_op(&self) -> Option<InequalityOp> {
        match self.curve {
            Some(Curve::Inequality { op, .. }) => Some(op),
            _ => None,
        }
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(name)
    }

    /// Current parameter values, for binding at evaluation.
    pub fn param_values(&self) -> ParamValues {
        self.parameters
            .values()
            .map(|param| (param.name.clone(), param.value))
            .collect()
    }

    /// Whether the curve is drawn as a shaded integral instead of a stroke.
    ///
    /// Only functions of `x` can be integrated.
    pub fn shades_integral(&self) -> bool {
        self.integral.is_some() && matches!(self.curve, Some(Curve::Function(_)))
    }

    /// Advances every animating parameter. Returns whether any value moved.
    pub fn advance_animations(&mut self, elapsed: Number) -> bool {
        let mut moved = false;
        for param in self.parameters.values_mut() {
            moved |= param.advance(elapsed);
        }
        moved
    }

    pub fn is_animating(&self) -> bool {
        self.parameters.values().any(Parameter::is_animating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn detects_free_parameters() {
        assert_eq!(names(&detect_parameters("a*x^2 + b*x + c")), ["a", "b", "c"]);
        assert!(detect_parameters("x^2").is_empty());
        assert!(detect_parameters("e^x + pi").is_empty());
        assert!(detect_parameters("sin(x)").is_empty());
        assert_eq!(names(&detect_parameters("y > k*x")), ["k"]);
        assert_eq!(
            names(&detect_parameters("x = a*cos(t), y = b*sin(t)")),
            ["a", "b"]
        );
        assert_eq!(names(&detect_parameters("r = a*theta")), ["a"]);
    }

    #[test]
    fn renaming_a_parameter_replaces_it() {
        let cache = CompileCache::new();
        let mut expr = Expression::with_text("a*x", PALETTE[0], &cache);
        expr.parameter_mut("a").unwrap().set_value(4.0).unwrap();

        expr.set_text("b*x", &cache);
        assert!(expr.parameter("a").is_none());
        let b = expr.parameter("b").unwrap();
        assert_eq!(
            (b.value(), b.min(), b.max(), b.step()),
            (1.0, -10.0, 10.0, 0.1)
        );
        assert!(!b.is_animating());
    }

    #[test]
    fn editing_keeps_existing_parameters() {
        let cache = CompileCache::new();
        let mut expr = Expression::with_text("a*x", PALETTE[0], &cache);
        expr.parameter_mut("a").unwrap().set_value(4.0).unwrap();

        expr.set_text("a*x+1", &cache);
        assert_eq!(expr.parameter("a").unwrap().value(), 4.0);
        assert_eq!(expr.param_values().get("a"), Some(&4.0));
    }

    #[test]
    fn invalid_text_keeps_an_error() {
        let cache = CompileCache::new();
        let expr = Expression::with_text("sin(x", PALETTE[1], &cache);
        assert!(!expr.is_valid());
        assert!(expr.curve().is_none());
        assert!(!expr.error().unwrap().is_empty());
        assert!(cache.is_empty(), "failures are not cached");
    }

    #[test]
    fn kind_and_operator_follow_the_text() {
        let cache = CompileCache::new();
        let mut expr = Expression::with_text("y <= x", PALETTE[2], &cache);
        assert_eq!(expr.kind(), Kind::Inequality);
        assert_eq!(expr.inequality_op(), Some(InequalityOp::LessEq));
        expr.set_text("x^2 + y^2 = 1", &cache);
        assert_eq!(expr.kind(), Kind::Implicit);
        assert_eq!(expr.inequality_op(), None);
    }

    #[test]
    fn setters_reject_broken_invariants() {
        let mut p = Parameter::new("a");
        assert_eq!(p.set_range(2.0, 2.0), Err(ParamErr::EmptyRange { min: 2.0, max: 2.0 }));
        assert_eq!(p.set_step(0.0), Err(ParamErr::NonPositiveStep(0.0)));
        assert_eq!(p.set_value(Number::NAN), Err(ParamErr::NotFinite));
        p.set_value(50.0).unwrap();
        assert_eq!(p.value(), 10.0);
        p.set_range(-1.0, 0.5).unwrap();
        assert_eq!(p.value(), 0.5);
    }

    #[test]
    fn animation_bounces_off_bounds() {
        let mut p = Parameter::new("a");
        assert!(!p.advance(1.0), "not animating");
        p.set_animating(true);

        // 0.1 * 5 per second
        assert!(p.advance(2.0));
        assert!((p.value() - 2.0).abs() < 1e-12);

        assert!(p.advance(100.0));
        assert_eq!(p.value(), 10.0);
        p.advance(1.0);
        assert!((p.value() - 9.5).abs() < 1e-12, "direction reversed");

        assert!(!p.advance(0.0));
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(palette_color(0), palette_color(8));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn ids_are_unique() {
        let a = Expression::new(PALETTE[0]);
        let b = Expression::new(PALETTE[0]);
        assert_ne!(a.id(), b.id());
    }

    proptest! {
        #[test]
        fn parameter_stays_within_bounds(
            min in -100.0..0.0f64,
            width in 0.001..100.0f64,
            value in proptest::num::f64::ANY,
            ticks in proptest::collection::vec(0.0..10.0f64, 0..20),
        ) {
            let mut p = Parameter::new("a");
            p.set_range(min, min + width).unwrap();
            let _ = p.set_value(value);
            p.set_animating(true);
            for elapsed in ticks {
                p.advance(elapsed);
                prop_assert!(p.min() <= p.value() && p.value() <= p.max());
            }
            prop_assert!(p.min() <= p.value() && p.value() <= p.max());
        }
    }
}
