// SPDX: CC0-1.0

use crate::{
    lex::{Lexer, SubStr},
    parse::{self, ParseErr},
    stdlib, Number,
};
use core::{fmt, hash::BuildHasher};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Rem => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Rem => Left,
            Self::Pow => Right,
        }
    }

    /// Prefix operators take no left operand.
    pub const fn is_prefix(&self) -> bool {
        matches!(self, Self::Neg)
    }

    pub const fn fun(&self) -> (&'static str, Fun) {
        match self {
            Self::Neg => ("neg", Fun::new(1, stdlib::neg)),
            Self::Add => ("add", Fun::new(2, stdlib::add)),
            Self::Sub => ("sub", Fun::new(2, stdlib::sub)),
            Self::Mul => ("mul", Fun::new(2, stdlib::mul)),
            Self::Div => ("div", Fun::new(2, stdlib::div)),
            Self::Rem => ("rem", Fun::new(2, stdlib::rem)),
            Self::Pow => ("pow", Fun::new(2, stdlib::pow)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Number),
    Fun(Fun),
    Var,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Operator(typ) => write!(f, "call '{}'", typ.fun().0),
            OperationTyp::Fun(_) => write!(f, "call '{}'", self.loc.get()),
            OperationTyp::Var => write!(f, "load '{}'", self.loc.get()),
        }
    }
}

#[derive(Debug)]
pub enum EvalErrTyp {
    Empty,
    MissingArgs {
        name: IdentKey,
        arity: usize,
        found: usize,
    },
    StackMismatch {
        expected: usize,
        found: usize,
    },
    UndefinedIdent {
        text: SubStr,
    },
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::Empty => write!(f, "cannot evaluate empty program"),

            EvalErrTyp::MissingArgs { name, arity, found } => write!(
                f,
                "function '{name}' requires {arity} argument{s}, but found {found}",
                name = name.get(),
                s = if *arity == 1 { "" } else { "s" }
            ),

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} operation{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            ),

            EvalErrTyp::UndefinedIdent { text } => {
                write!(f, "undefined identifier '{}'", text.get())
            }
        }
    }
}

#[derive(Debug)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub arity: usize,
    pub fun: fn(&[Number]) -> Number,
}

impl Fun {
    pub const fn new(arity: usize, fun: fn(&[Number]) -> Number) -> Self {
        Self { arity, fun }
    }
}

#[derive(Debug)]
pub enum Ident {
    Const(Number),
    Fun(Fun),
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arc(s) => write!(f, "{s}"),
            Self::Static(s) => write!(f, "{s}"),
        }
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

pub type Idents = HashMap<IdentKey, Ident>;

/// Values for the free variables of a program.
///
/// Names a program does not reference are ignored.
pub trait Bindings {
    fn get(&self, name: &str) -> Option<Number>;
}

impl<S: BuildHasher> Bindings for HashMap<String, Number, S> {
    fn get(&self, name: &str) -> Option<Number> {
        HashMap::get(self, name).copied()
    }
}

impl Bindings for BTreeMap<String, Number> {
    fn get(&self, name: &str) -> Option<Number> {
        BTreeMap::get(self, name).copied()
    }
}

impl Bindings for [(&str, Number)] {
    fn get(&self, name: &str) -> Option<Number> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, val)| *val)
    }
}

/// Parameter values by name.
pub type ParamValues = HashMap<String, Number>;

/// Independent variables layered over a set of parameters.
///
/// Variables shadow parameters of the same name.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    vars: &'a [(&'a str, Number)],
    params: &'a dyn Bindings,
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a [(&'a str, Number)], params: &'a dyn Bindings) -> Self {
        Self { vars, params }
    }
}

impl Bindings for Scope<'_> {
    fn get(&self, name: &str) -> Option<Number> {
        Bindings::get(self.vars, name).or_else(|| self.params.get(name))
    }
}

/// A compiled expression: a pure evaluator over a set of bindings.
pub trait Evaluate: fmt::Debug + Send + Sync {
    fn evaluate(&self, bindings: &dyn Bindings) -> Result<Number, EvalErr>;
}

/// Shared handle to a compiled expression.
pub type Handle = Arc<dyn Evaluate>;

#[derive(Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Names of the variables the program loads, in order of first use.
    pub fn vars(&self) -> Vec<&str> {
        let mut ret: Vec<&str> = Vec::new();
        for op in self.ops() {
            if let OperationTyp::Var = op.typ {
                let name = op.loc.get();
                if !ret.contains(&name) {
                    ret.push(name);
                }
            }
        }
        ret
    }
}

impl Evaluate for Program {
    fn evaluate(&self, bindings: &dyn Bindings) -> Result<Number, EvalErr> {
        let mut stack = Vec::with_capacity(self.ops.len());
        eval(self, bindings, &mut stack)
    }
}

/// Lexes and parses `src` against the standard identifiers.
pub fn compile(src: &str) -> Result<Program, ParseErr> {
    let src = Arc::new(src.to_string());
    parse::parse(Lexer::new(&src), stdlib::standard_idents())
}

pub fn eval(
    prog: &Program,
    bindings: &dyn Bindings,
    stack: &mut Vec<Number>,
) -> Result<Number, EvalErr> {
    fn expect_fun_args(
        stack: &[Number],
        op: &Operation,
        name: impl Into<IdentKey>,
        fun: &Fun,
    ) -> Result<(), EvalErr> {
        let len = stack.len();
        if len < fun.arity {
            Err(EvalErr {
                typ: EvalErrTyp::MissingArgs {
                    arity: fun.arity,
                    found: len,
                    name: name.into(),
                },
                op: Some(op.clone()),
            })
        } else {
            Ok(())
        }
    }

    fn expect_exactly_n(
        stack: &[Number],
        op: impl Into<Option<Operation>>,
        n: usize,
    ) -> Result<(), EvalErr> {
        let len = stack.len();
        if len == n {
            Ok(())
        } else {
            Err(EvalErr {
                typ: EvalErrTyp::StackMismatch {
                    expected: n,
                    found: len,
                },
                op: op.into(),
            })
        }
    }

    fn eval_fun(
        stack: &mut Vec<Number>,
        op: &Operation,
        name: impl Into<IdentKey>,
        fun: &Fun,
    ) -> Result<Number, EvalErr> {
        expect_fun_args(stack, op, name, fun)?;
        // stack: ...a, b, c, d
        //                 ^^^^ args if arity is 2
        let split = stack.len() - fun.arity;
        let val = (fun.fun)(&stack[split..]);
        stack.truncate(split);
        Ok(val)
    }

    if prog.ops.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            op: None,
        });
    }

    stack.clear();

    for op in prog.ops() {
        let val = match op.typ {
            OperationTyp::Operator(typ) => {
                let (name, fun) = typ.fun();
                eval_fun(stack, op, name, &fun)?
            }

            OperationTyp::Fun(fun) => eval_fun(stack, op, op.loc.clone(), &fun)?,

            OperationTyp::Val(num) => num,

            OperationTyp::Var => match bindings.get(op.loc.get()) {
                Some(val) => val,
                None => {
                    return Err(EvalErr {
                        typ: EvalErrTyp::UndefinedIdent {
                            text: op.loc.clone(),
                        },
                        op: Some(op.clone()),
                    });
                }
            },
        };
        stack.push(val);
    }

    expect_exactly_n(stack, None, 1)?;
    stack.pop().ok_or(EvalErr {
        typ: EvalErrTyp::Empty,
        op: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str, vars: &[(&str, Number)]) -> Result<Number, EvalErr> {
        compile(src).unwrap().evaluate(&Scope::new(vars, &ParamValues::new()))
    }

    #[test]
    fn square_at_two() {
        assert_eq!(run("x^2", &[("x", 2.0)]).unwrap(), 4.0);
    }

    #[test]
    fn parameter_from_bindings() {
        let params = ParamValues::from([("a".to_string(), 3.0)]);
        let prog = compile("a*x").unwrap();
        assert_eq!(
            prog.evaluate(&Scope::new(&[("x", 2.0)], &params)).unwrap(),
            6.0
        );
    }

    #[test]
    fn extra_bindings_are_ignored() {
        assert_eq!(run("x+1", &[("x", 1.0), ("q", 9.0)]).unwrap(), 2.0);
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(run("1+2*3", &[]).unwrap(), 7.0);
        assert_eq!(run("2^3^2", &[]).unwrap(), 512.0);
        assert_eq!(run("-x^2", &[("x", 3.0)]).unwrap(), -9.0);
        assert_eq!(run("2^-1", &[]).unwrap(), 0.5);
        assert_eq!(run("x-1", &[("x", 3.0)]).unwrap(), 2.0);
        assert_eq!(run("7%4", &[]).unwrap(), 3.0);
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(run("2x", &[("x", 3.0)]).unwrap(), 6.0);
        assert_eq!(run("2(x+1)", &[("x", 3.0)]).unwrap(), 8.0);
        assert_eq!(run("(x+1)(x-1)", &[("x", 3.0)]).unwrap(), 8.0);
        assert_eq!(run("2sin(0)", &[]).unwrap(), 0.0);
    }

    #[test]
    fn functions_and_constants() {
        assert!((run("sin(pi/2)", &[]).unwrap() - 1.0).abs() < 1e-12);
        assert!((run("ln(e)", &[]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(run("max(2, 5)", &[]).unwrap(), 5.0);
        assert_eq!(run("sqrt(16)", &[]).unwrap(), 4.0);
    }

    #[test]
    fn unbound_variable_fails() {
        let err = run("a*x", &[("x", 1.0)]).unwrap_err();
        match err.typ {
            EvalErrTyp::UndefinedIdent { text } => assert_eq!(text.get(), "a"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn dangling_operator_is_missing_args() {
        let err = run("x+", &[("x", 1.0)]).unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::MissingArgs { arity: 2, .. }));
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        assert!(run("1/x", &[("x", 0.0)]).unwrap().is_infinite());
    }

    #[test]
    fn program_lists_its_variables() {
        let prog = compile("a*x^2 + b*x + a").unwrap();
        assert_eq!(prog.vars(), ["a", "x", "b"]);
    }
}
