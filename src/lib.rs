// SPDX: CC0-1.0

pub mod analysis;
pub mod cache;
pub mod canvas;
pub mod classify;
pub mod eval;
pub mod expr;
pub mod lex;
pub mod parse;
pub mod plotter;
pub mod render;
pub mod shell;
pub mod stdlib;
pub mod viewport;

use core::{fmt, ops::Sub};

pub type Number = f64;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl fmt::Display for Point<Number> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(prec) => write!(f, "({:.prec$}, {:.prec$})", self.x, self.y),
            None => write!(f, "({}, {})", self.x, self.y),
        }
    }
}
