// SPDX: CC0-1.0

//! Recognizes what kind of curve an input line describes and compiles it.
//!
//! Rules are tried in order: inequality (`y > ...`), parametric
//! (`x = ..., y = ...`), implicit (`f(x, y) = g(x, y)`), polar (`r = ...`)
//! and finally a plain function of `x`.

use crate::{
    cache::CompileCache,
    eval::{self, EvalErr, EvalErrTyp, Handle, ParamValues, Scope},
    expr::DEFAULT_VALUE,
    lex::{LexErrTyp, Lexer, SubStr, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    stdlib::{self, T, X, Y},
    Number,
};
use core::fmt;
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Function,
    Inequality,
    Parametric,
    Polar,
    Implicit,
}

impl Kind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Inequality => "inequality",
            Self::Parametric => "parametric",
            Self::Polar => "polar",
            Self::Implicit => "implicit",
        }
    }

    /// Variables the curve is a function of; never treated as parameters.
    pub const fn independents(&self) -> &'static [&'static str] {
        match self {
            Self::Function => &[X],
            Self::Inequality | Self::Implicit => &[X, Y],
            Self::Parametric | Self::Polar => &[T],
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InequalityOp {
    Greater,
    Less,
    GreaterEq,
    LessEq,
}

impl InequalityOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
        }
    }

    /// `lhs <op> rhs`
    pub fn holds(&self, lhs: Number, rhs: Number) -> bool {
        match self {
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
            Self::GreaterEq => lhs >= rhs,
            Self::LessEq => lhs <= rhs,
        }
    }
}

impl fmt::Display for InequalityOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The recognized shape of an input line, bodies stripped of whitespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Form {
    Function(String),
    Inequality { op: InequalityOp, rhs: String },
    Parametric { x: String, y: String },
    Polar(String),
    Implicit(String),
}

impl Form {
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Function(_) => Kind::Function,
            Self::Inequality { .. } => Kind::Inequality,
            Self::Parametric { .. } => Kind::Parametric,
            Self::Polar(_) => Kind::Polar,
            Self::Implicit(_) => Kind::Implicit,
        }
    }

    pub fn bodies(&self) -> Vec<&str> {
        match self {
            Self::Function(body) | Self::Polar(body) | Self::Implicit(body) => vec![body],
            Self::Inequality { rhs, .. } => vec![rhs],
            Self::Parametric { x, y } => vec![x, y],
        }
    }
}

/// A classified and compiled curve.
#[derive(Clone, Debug)]
pub enum Curve {
    Function(Handle),
    Inequality { op: InequalityOp, f: Handle },
    Parametric { x: Handle, y: Handle },
    Polar(Handle),
    Implicit(Handle),
}

impl Curve {
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Function(_) => Kind::Function,
            Self::Inequality { .. } => Kind::Inequality,
            Self::Parametric { .. } => Kind::Parametric,
            Self::Polar(_) => Kind::Polar,
            Self::Implicit(_) => Kind::Implicit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifyErr {
    Empty,
    /// Looked parametric but was not `x = ..., y = ...`.
    ParametricFormat,
    /// The body compiled but its probe value was not a finite number.
    Invalid(Kind),
}

impl fmt::Display for ClassifyErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "expression cannot be empty"),
            Self::ParametricFormat => {
                write!(f, "use the x=..., y=... format for parametric equations")
            }
            Self::Invalid(Kind::Function) => {
                write!(f, "invalid expression: result is not a number")
            }
            Self::Invalid(kind) => write!(f, "invalid {kind} expression"),
        }
    }
}

#[derive(Debug)]
pub enum CompileErr {
    UndefinedSymbol {
        name: String,
        similar: Option<&'static str>,
    },
    Syntax(ParseErr),
    Other(String),
}

impl CompileErr {
    fn from_eval(err: EvalErr) -> Self {
        match err.typ {
            EvalErrTyp::UndefinedIdent { text } => {
                let name = text.get().to_string();
                let similar = most_similar_builtin(&name);
                Self::UndefinedSymbol { name, similar }
            }
            _ => Self::Other(err.to_string()),
        }
    }

    /// Source span to point at, when there is one.
    pub fn loc(&self) -> Option<&SubStr> {
        match self {
            Self::Syntax(err) => Some(&err.loc),
            Self::UndefinedSymbol { .. } | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for CompileErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedSymbol { name, similar } => {
                write!(f, "undefined variable or function '{name}'")?;
                if let Some(similar) = similar {
                    write!(f, " (did you mean '{similar}'?)")?;
                }
                Ok(())
            }
            Self::Syntax(err) => match err.typ {
                ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XPipe)) => write!(
                    f,
                    "unexpected character '|': use the 'abs' function for absolute value"
                ),
                ParseErrTyp::LexErr(_) | ParseErrTyp::ParenMismatch => write!(
                    f,
                    "unexpected character or syntax error: {} at position {}",
                    err.typ,
                    err.loc.start() + 1
                ),
                ParseErrTyp::ParseNum(_) => write!(f, "{}", err.typ),
            },
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug)]
pub enum ExprErr {
    Classify(ClassifyErr),
    Compile(CompileErr),
}

impl From<ClassifyErr> for ExprErr {
    fn from(err: ClassifyErr) -> Self {
        Self::Classify(err)
    }
}

impl From<CompileErr> for ExprErr {
    fn from(err: CompileErr) -> Self {
        Self::Compile(err)
    }
}

impl fmt::Display for ExprErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify(err) => write!(f, "{err}"),
            Self::Compile(err) => write!(f, "{err}"),
        }
    }
}

fn most_similar_builtin(name: &str) -> Option<&'static str> {
    stdlib::builtin_names()
        .map(|key| {
            (
                strsim::normalized_damerau_levenshtein(
                    &name.to_ascii_lowercase(),
                    &key.to_ascii_lowercase(),
                ),
                key,
            )
        })
        .filter(|(sim, _)| *sim > 0.3)
        // ties go to the alphabetically first name
        .max_by(|(a, ka), (b, kb)| a.total_cmp(b).then_with(|| kb.cmp(ka)))
        .map(|(_, key)| key)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|chr| !chr.is_whitespace()).collect()
}

/// Strips a case-insensitive ascii `prefix` from `s`.
fn strip_prefix_nocase<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Matches `<name> =` or `<name>(t) =` at the start of `s`, returning the
/// rest after `=`.
fn strip_assignment<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let rest = strip_prefix_nocase(s, name)?;
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix("(t)")
        .map(str::trim_start)
        .unwrap_or(rest);
    rest.strip_prefix('=')
}

fn match_inequality(s: &str) -> Option<(InequalityOp, &str)> {
    let rest = strip_prefix_nocase(s, Y)?.trim_start();
    // two-character operators first
    let (op, rhs) = [
        (">=", InequalityOp::GreaterEq),
        ("<=", InequalityOp::LessEq),
        (">", InequalityOp::Greater),
        ("<", InequalityOp::Less),
    ]
    .into_iter()
    .find_map(|(sym, op)| rest.strip_prefix(sym).map(|rhs| (op, rhs)))?;
    let rhs = rhs.trim();
    (!rhs.is_empty()).then_some((op, rhs))
}

fn match_parametric(s: &str) -> Option<(&str, &str)> {
    let body = strip_assignment(s, X)?;
    // the first comma that is followed by `y =` ends the x component
    for (idx, _) in body.match_indices(',') {
        let (x, rest) = (body[..idx].trim(), body[idx + 1..].trim_start());
        if let Some(y) = strip_assignment(rest, Y) {
            let y = y.trim();
            if !x.is_empty() && !y.is_empty() {
                return Some((x, y));
            }
        }
    }
    None
}

/// Identifier-like words of `s`: a letter followed by letters or digits.
fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|chr: char| !chr.is_ascii_alphanumeric())
        .filter(|word| word.starts_with(|chr: char| chr.is_ascii_alphabetic()))
}

fn is_polar(s: &str) -> bool {
    strip_assignment(s, "r").is_some()
        || strip_prefix_nocase(s, "r").is_some_and(|rest| rest.trim_start().starts_with('('))
}

fn polar_body(s: &str) -> Option<String> {
    let body = match strip_prefix_nocase(s, "r")?.trim_start() {
        rest if rest.starts_with('=') => &rest[1..],
        // `r(theta) = ...`
        rest => &rest[rest.find('=')? + 1..],
    };
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while !rest.is_empty() {
        if strip_prefix_nocase(rest, "theta").is_some() {
            out.push_str(T);
            rest = &rest["theta".len()..];
        } else if let Some(chr) = rest.chars().next() {
            match chr {
                'θ' | 'Θ' => out.push_str(T),
                chr => out.push(chr),
            }
            rest = &rest[chr.len_utf8()..];
        }
    }
    let out = strip_whitespace(&out);
    (!out.is_empty()).then_some(out)
}

/// Recognizes the shape of `text` without compiling anything.
pub fn split(text: &str) -> Result<Form, ClassifyErr> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ClassifyErr::Empty);
    }

    if let Some((op, rhs)) = match_inequality(trimmed) {
        return Ok(Form::Inequality {
            op,
            rhs: strip_whitespace(rhs),
        });
    }

    let parametric_hint = trimmed.contains("x(t)") && trimmed.contains("y(t)");
    if parametric_hint || strip_assignment(trimmed, X).is_some() {
        return match match_parametric(trimmed) {
            Some((x, y)) => Ok(Form::Parametric {
                x: strip_whitespace(x),
                y: strip_whitespace(y),
            }),
            None => Err(ClassifyErr::ParametricFormat),
        };
    }

    if let Some((lhs, rhs)) = trimmed.split_once('=') {
        let (lhs, rhs) = (lhs.trim(), rhs.trim());
        let has = |name: &str| words(trimmed).any(|word| word == name);
        if has(X) && has(Y) && !is_polar(trimmed) && !lhs.is_empty() && !rhs.is_empty() {
            return Ok(Form::Implicit(format!(
                "({})-({})",
                strip_whitespace(lhs),
                strip_whitespace(rhs)
            )));
        }
    }

    if is_polar(trimmed) {
        return polar_body(trimmed)
            .map(Form::Polar)
            .ok_or(ClassifyErr::Invalid(Kind::Polar));
    }

    Ok(Form::Function(strip_whitespace(trimmed)))
}

/// Single-letter symbols in `body` other than `independents` and the
/// reserved constants.
pub fn free_parameters(body: &str, independents: &[&str]) -> BTreeSet<String> {
    let src = Arc::new(body.to_string());
    Lexer::new(&src)
        .map_while(Result::ok)
        .filter(|tok| tok.typ == TokTyp::Ident)
        .map(|tok| tok.loc.get().to_string())
        .filter(|name| is_parameter_name(name, independents))
        .collect()
}

fn is_parameter_name(name: &str, independents: &[&str]) -> bool {
    name.len() == 1
        && name.chars().all(|chr| chr.is_ascii_alphabetic())
        && !independents.contains(&name)
        && !stdlib::RESERVED.contains(&name)
        && !stdlib::is_builtin(name)
}

/// Compiles `body` and evaluates it once with every independent variable at
/// zero and every parameter at its default.
fn probe(body: &str, kind: Kind) -> Result<Handle, ExprErr> {
    let prog = eval::compile(body).map_err(CompileErr::Syntax)?;
    let vars: Vec<(&str, Number)> = kind.independents().iter().map(|var| (*var, 0.0)).collect();
    let params: ParamValues = prog
        .vars()
        .into_iter()
        .filter(|name| is_parameter_name(name, kind.independents()))
        .map(|name| (name.to_string(), DEFAULT_VALUE))
        .collect();
    match eval::Evaluate::evaluate(&prog, &Scope::new(&vars, &params)) {
        Ok(val) if val.is_finite() => Ok(Arc::new(prog)),
        Ok(_) => Err(ClassifyErr::Invalid(kind).into()),
        Err(err) => Err(CompileErr::from_eval(err).into()),
    }
}

/// Classifies and compiles `text`.
pub fn classify(text: &str) -> Result<Curve, ExprErr> {
    let form = split(text)?;
    let kind = form.kind();
    let curve = match form {
        Form::Function(body) => Curve::Function(probe(&body, kind)?),
        Form::Inequality { op, rhs } => Curve::Inequality {
            op,
            f: probe(&rhs, kind)?,
        },
        Form::Parametric { x, y } => Curve::Parametric {
            x: probe(&x, kind)?,
            y: probe(&y, kind)?,
        },
        Form::Polar(body) => Curve::Polar(probe(&body, kind)?),
        Form::Implicit(body) => Curve::Implicit(probe(&body, kind)?),
    };
    Ok(curve)
}

/// [`classify`] through `cache`, keyed by the untrimmed text.
///
/// Failures are not cached.
pub fn compile_cached(text: &str, cache: &CompileCache) -> Result<Curve, ExprErr> {
    if let Some(entry) = cache.get(text) {
        debug!(text, kind = %entry.curve.kind(), "compile cache hit");
        return Ok(entry.curve);
    }
    match classify(text) {
        Ok(curve) => {
            debug!(text, kind = %curve.kind(), "compiled expression");
            cache.put(text, curve.clone());
            Ok(curve)
        }
        Err(err) => {
            debug!(text, %err, "expression rejected");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Evaluate;

    fn eval_at(f: &Handle, vars: &[(&str, Number)]) -> Number {
        f.evaluate(&Scope::new(vars, &ParamValues::new())).unwrap()
    }

    #[test]
    fn every_inequality_operator() {
        for (src, expected) in [
            ("y > x^2", InequalityOp::Greater),
            ("y < x^2", InequalityOp::Less),
            ("y >= x^2", InequalityOp::GreaterEq),
            ("Y<=x^2", InequalityOp::LessEq),
        ] {
            match classify(src).unwrap() {
                Curve::Inequality { op, f } => {
                    assert_eq!(op, expected, "{src}");
                    assert_eq!(eval_at(&f, &[(X, 3.0)]), 9.0);
                }
                other => panic!("{src} classified as {:?}", other.kind()),
            }
        }
    }

    #[test]
    fn parametric_forms() {
        assert_eq!(
            split("x = cos(t), y = sin(t)").unwrap(),
            Form::Parametric {
                x: "cos(t)".into(),
                y: "sin(t)".into()
            }
        );
        assert_eq!(
            split("x(t) = max(t, 1), y(t) = t").unwrap(),
            Form::Parametric {
                x: "max(t,1)".into(),
                y: "t".into()
            }
        );
    }

    #[test]
    fn bare_x_assignment_is_a_format_error() {
        assert_eq!(split("x = t^2"), Err(ClassifyErr::ParametricFormat));
        assert_eq!(
            split("x(t) and y(t) please"),
            Err(ClassifyErr::ParametricFormat)
        );
    }

    #[test]
    fn implicit_is_rewritten_as_difference() {
        assert_eq!(
            split("x^2 + y^2 = 4").unwrap(),
            Form::Implicit("(x^2+y^2)-(4)".into())
        );
        match classify("x^2 + y^2 = 4").unwrap() {
            Curve::Implicit(f) => assert_eq!(eval_at(&f, &[(X, 2.0), (Y, 0.0)]), 0.0),
            other => panic!("classified as {:?}", other.kind()),
        }
    }

    #[test]
    fn implicit_needs_both_symbols_as_words() {
        // `exp` contains an x but is not the symbol x
        assert!(matches!(split("exp(y) = 2"), Ok(Form::Function(_))));
    }

    #[test]
    fn polar_substitutes_theta() {
        assert_eq!(split("r = 2*theta").unwrap(), Form::Polar("2*t".into()));
        assert_eq!(split("r = 1 + cos(θ)").unwrap(), Form::Polar("1+cos(t)".into()));
        assert_eq!(split("r(θ) = Theta").unwrap(), Form::Polar("t".into()));
        assert_eq!(split("r(θ)"), Err(ClassifyErr::Invalid(Kind::Polar)));
    }

    #[test]
    fn function_is_the_fallback() {
        assert_eq!(split("  x ^ 2 ").unwrap(), Form::Function("x^2".into()));
        assert_eq!(split("   "), Err(ClassifyErr::Empty));
    }

    #[test]
    fn parameters_do_not_invalidate() {
        assert!(classify("a*x^2 + b").is_ok());
    }

    #[test]
    fn undefined_function_suggests_builtin() {
        match classify("sqrtt(x)") {
            Err(ExprErr::Compile(CompileErr::UndefinedSymbol { name, similar })) => {
                assert_eq!(name, "sqrtt");
                assert_eq!(similar, Some("sqrt"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_finite_probe_is_rejected() {
        let err = classify("y > ln(x)").unwrap_err();
        assert_eq!(err.to_string(), "invalid inequality expression");
        let err = classify("1/x").unwrap_err();
        assert_eq!(err.to_string(), "invalid expression: result is not a number");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = classify("x^2 +* 1").unwrap_err();
        assert!(!err.to_string().is_empty());
        let err = classify("(x").unwrap_err();
        assert!(err.to_string().starts_with("unexpected character or syntax error"));
    }

    #[test]
    fn free_parameters_skip_reserved_and_independents() {
        let found = free_parameters("a*x^2+b*x+c", Kind::Function.independents());
        assert_eq!(found, BTreeSet::from(["a".into(), "b".into(), "c".into()]));
        assert!(free_parameters("x^2", &[X]).is_empty());
        assert!(free_parameters("e^x+i", &[X]).is_empty());
        assert!(free_parameters("k*sin(t)", &[T]).contains("k"));
    }
}
