// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            // unsupported tokens
            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }

    /// Whether a `-` following this token is a binary minus.
    const fn ends_operand(&self) -> bool {
        matches!(self, Self::Ident | Self::Number | Self::CloseParen)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '%' => TokTyp::Op(OperatorTyp::Rem),
            '^' => TokTyp::Op(OperatorTyp::Pow),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        Some(Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
        })
    }

    /// Gathers a token of type `typ` whose first character satisfies `first`
    /// and whose remaining characters satisfy `rest`.
    pub fn consume_by<F, R>(&mut self, next_idx: usize, typ: TokTyp, first: F, rest: R) -> Option<Tok>
    where
        F: Fn(char) -> bool,
        R: Fn(char) -> bool,
    {
        let (_, chr) = self.cur.peek().copied()?;
        if !first(chr) {
            return None;
        }
        let mut tok = Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), next_idx, 0),
        };
        while let Some((_, chr)) = self.cur.peek().copied() {
            if tok.loc.is_empty() || rest(chr) {
                tok.loc.shift_right(chr.len_utf8());
                self.cur.next();
            } else {
                break;
            }
        }
        Some(tok)
    }

    fn lex_one(&mut self) -> Option<Result<Tok, LexErr>> {
        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        if let Some(tok) = self.consume_unambiguous() {
            if tok.typ.is_unsupported() {
                return Some(Err(LexErr {
                    typ: LexErrTyp::Unsupported(tok.typ),
                    loc: tok.loc,
                }));
            }
            return Some(Ok(tok));
        }

        if next_chr == '-' {
            // distinguish subtraction from negation by what came before
            self.cur.next();
            let typ = if self.prev.map(|prev| prev.ends_operand()).unwrap_or(false) {
                TokTyp::Op(OperatorTyp::Sub)
            } else {
                TokTyp::Op(OperatorTyp::Neg)
            };
            return Some(Ok(Tok {
                typ,
                loc: SubStr::new(Arc::clone(self.src), next_idx, 1),
            }));
        }

        // identifiers may contain digits after the first letter, e.g. `log10`
        if let Some(tok) = self.consume_by(
            next_idx,
            TokTyp::Ident,
            |chr| chr.is_ascii_alphabetic(),
            |chr| chr.is_ascii_alphanumeric(),
        ) {
            return Some(Ok(tok));
        }

        if let Some(tok) = self.consume_by(
            next_idx,
            TokTyp::Number,
            |chr| chr.is_ascii_digit() || chr == '.',
            |chr| chr.is_ascii_digit() || chr == '.',
        ) {
            return Some(Ok(tok));
        }

        Some(Err(LexErr {
            typ: LexErrTyp::InvalidChar,
            loc: SubStr::new(Arc::clone(self.src), next_idx, next_chr.len_utf8()),
        }))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        let ret = self.lex_one()?;
        match ret {
            Ok(ref tok) => self.prev = Some(tok.typ),
            Err(_) => self.has_errored = true,
        }
        Some(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typs(src: &str) -> Vec<TokTyp> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src).map(|tok| tok.unwrap().typ).collect()
    }

    #[test]
    fn minus_after_operand_is_subtraction() {
        assert_eq!(
            typs("x-1"),
            [TokTyp::Ident, TokTyp::Op(OperatorTyp::Sub), TokTyp::Number]
        );
        assert_eq!(
            typs("(x)-1"),
            [
                TokTyp::OpenParen,
                TokTyp::Ident,
                TokTyp::CloseParen,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::Number
            ]
        );
    }

    #[test]
    fn minus_at_start_or_after_operator_is_negation() {
        assert_eq!(typs("-x"), [TokTyp::Op(OperatorTyp::Neg), TokTyp::Ident]);
        assert_eq!(
            typs("2^-x"),
            [
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Pow),
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Ident
            ]
        );
    }

    #[test]
    fn identifiers_keep_trailing_digits() {
        let src = Arc::new("log10(x)".to_string());
        let toks: Vec<Tok> = Lexer::new(&src).map(Result::unwrap).collect();
        assert_eq!(toks[0].loc.get(), "log10");
    }

    #[test]
    fn unsupported_tokens_stop_the_lexer() {
        let src = Arc::new("x = 1".to_string());
        let mut lexer = Lexer::new(&src);
        assert!(lexer.next().unwrap().is_ok());
        let err = lexer.next().unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::Unsupported(TokTyp::XEqual));
        assert_eq!(err.loc.start(), 2);
        assert!(lexer.next().is_none());
    }

    #[test]
    fn non_ascii_is_invalid() {
        let src = Arc::new("2θ".to_string());
        let errs: Vec<_> = Lexer::new(&src).filter_map(Result::err).collect();
        assert_eq!(errs[0].typ, LexErrTyp::InvalidChar);
        assert_eq!(errs[0].loc.get(), "θ");
    }
}
