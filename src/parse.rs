// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.typ, self.loc)
    }
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun(crate::eval::Fun),
    OpenParen,
}

#[derive(Clone, Debug)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    fn precedence(&self) -> i8 {
        match self.typ {
            ShuntOpTyp::Operator(op) => op.precedence(),
            // a function whose arguments were not parenthesized binds tightest
            ShuntOpTyp::Fun(_) => i8::MAX,
            ShuntOpTyp::OpenParen => i8::MIN,
        }
    }

    fn into_output(self) -> Option<Operation> {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Fun(fun) => OperationTyp::Fun(fun),
            ShuntOpTyp::OpenParen => return None,
        };
        Some(Operation { typ, loc: self.loc })
    }
}

struct Shunt {
    out: Vec<Operation>,  // output
    ops: Vec<ShuntOp>,    // operator stack
    after_operand: bool, // last token finished an operand
}

impl Shunt {
    fn push_operator(&mut self, o1: OperatorTyp, loc: SubStr) {
        if !o1.is_prefix() {
            while let Some(o2) = self.ops.last() {
                if !matches!(o2.typ, ShuntOpTyp::OpenParen)
                    && ((o2.precedence() > o1.precedence())
                        || ((o1.precedence() == o2.precedence())
                            && (o1.associativity() == Associativity::Left)))
                {
                    self.pop_to_output();
                } else {
                    break;
                }
            }
        }
        self.ops.push(ShuntOp {
            typ: ShuntOpTyp::Operator(o1),
            loc,
        });
        self.after_operand = false;
    }

    fn pop_to_output(&mut self) {
        if let Some(op) = self.ops.pop().and_then(ShuntOp::into_output) {
            self.out.push(op);
        }
    }

    fn pop_until_paren(&mut self) {
        while let Some(op) = self.ops.last() {
            if !matches!(op.typ, ShuntOpTyp::OpenParen) {
                self.pop_to_output();
            } else {
                break;
            }
        }
    }

    /// Juxtaposed operands multiply, e.g. `2x` or `(x+1)(x-1)`.
    fn implicit_mul(&mut self, loc: &SubStr) {
        if self.after_operand {
            let at = SubStr::new(loc.src(), loc.start(), 0);
            self.push_operator(OperatorTyp::Mul, at);
        }
    }
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut st = Shunt {
        out: Vec::new(),
        ops: Vec::new(),
        after_operand: false,
    };

    for tok in lex {
        let tok = tok?;
        match tok.typ {
            TokTyp::Number => {
                st.implicit_mul(&tok.loc);
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                st.out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
                st.after_operand = true;
            }

            TokTyp::Ident => {
                st.implicit_mul(&tok.loc);
                match idents.get(&tok.loc.clone().into()) {
                    Some(Ident::Const(val)) => {
                        st.out.push(Operation {
                            typ: OperationTyp::Val(*val),
                            loc: tok.loc,
                        });
                        st.after_operand = true;
                    }
                    Some(Ident::Fun(fun)) => {
                        st.ops.push(ShuntOp {
                            typ: ShuntOpTyp::Fun(*fun),
                            loc: tok.loc,
                        });
                        st.after_operand = false;
                    }
                    None => {
                        // anything unknown is a variable, bound at evaluation
                        st.out.push(Operation {
                            typ: OperationTyp::Var,
                            loc: tok.loc,
                        });
                        st.after_operand = true;
                    }
                }
            }

            TokTyp::Op(o1) => st.push_operator(o1, tok.loc),

            TokTyp::Comma => {
                st.pop_until_paren();
                st.after_operand = false;
            }

            TokTyp::OpenParen => {
                st.implicit_mul(&tok.loc);
                st.ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
                st.after_operand = false;
            }

            TokTyp::CloseParen => {
                st.pop_until_paren();

                if st.ops.pop().is_none() {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                }

                // handle functions
                if let Some(ShuntOp {
                    typ: ShuntOpTyp::Fun(_),
                    ..
                }) = st.ops.last()
                {
                    st.pop_to_output();
                }
                st.after_operand = true;
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => {
                // the lexer reports these, but don't trust it blindly
                return Err(ParseErr {
                    typ: ParseErrTyp::LexErr(LexErrTyp::Unsupported(tok.typ)),
                    loc: tok.loc,
                });
            }
        }
    }

    while let Some(op) = st.ops.pop() {
        if let ShuntOpTyp::OpenParen = op.typ {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            });
        }
        if let Some(op) = op.into_output() {
            st.out.push(op);
        }
    }

    Ok(Program::new(st.out))
}

#[cfg(test)]
mod tests {
    use crate::{eval::compile, parse::ParseErrTyp};

    fn listing(src: &str) -> Vec<String> {
        compile(src)
            .unwrap()
            .ops()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn postfix_order() {
        assert_eq!(
            listing("a*x+1"),
            ["load 'a'", "load 'x'", "call 'mul'", "push 1", "call 'add'"]
        );
    }

    #[test]
    fn constants_fold_into_values() {
        assert_eq!(listing("pi"), [format!("push {}", core::f64::consts::PI)]);
    }

    #[test]
    fn function_application() {
        assert_eq!(listing("sin(x)"), ["load 'x'", "call 'sin'"]);
    }

    #[test]
    fn unbalanced_parentheses() {
        for src in ["(x", "x)", "sin(x"] {
            let err = compile(src).unwrap_err();
            assert!(
                matches!(err.typ, ParseErrTyp::ParenMismatch),
                "{src}: {err:?}"
            );
        }
    }

    #[test]
    fn malformed_number() {
        let err = compile("1.2.3").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParseNum(_)));
        assert_eq!(err.loc.get(), "1.2.3");
    }
}
