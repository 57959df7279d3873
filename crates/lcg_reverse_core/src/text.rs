//! Text form of vectors and matrices
//!
//! Vectors print and parse as `{1, -1/2, 3}`, matrices as rows of vectors:
//! `{{1, 0}, {0, 1}}`. Whitespace is allowed around every token.

use std::fmt;
use std::str::FromStr;

use crate::error::{LatticeError, Result};
use crate::matrix::{Matrix, MatrixLike, MatrixView, MatrixViewMut};
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike, VectorView, VectorViewMut};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> LatticeError {
        LatticeError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(self.error(format!("expected '{}', found '{}'", c, found))),
            None => Err(self.error(format!("expected '{}', found end of input", c))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected trailing '{}'", c))),
        }
    }

    fn rational(&mut self) -> Result<Rational> {
        self.skip_whitespace();
        let start = self.pos;
        let len = self.input[start..]
            .find(|c: char| c == ',' || c == '}' || c == '{')
            .unwrap_or(self.input.len() - start);
        let token = &self.input[start..start + len];
        if token.trim().is_empty() {
            return Err(self.error("expected a number"));
        }
        self.pos += len;
        match token.parse::<Rational>() {
            Ok(x) => Ok(x),
            Err(LatticeError::Parse { position, message }) => Err(LatticeError::Parse {
                position: start + position,
                message,
            }),
            Err(_) => Err(LatticeError::Parse {
                position: start,
                message: format!("zero denominator in '{}'", token.trim()),
            }),
        }
    }

    /// Comma separated items between braces
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect('{')?;
        let mut items = Vec::new();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    fn vector(&mut self) -> Result<Vector> {
        let entries = self.list(Self::rational)?;
        if entries.is_empty() {
            return Err(LatticeError::EmptyShape);
        }
        Ok(Vector::from(entries))
    }

    fn matrix(&mut self) -> Result<Matrix> {
        Matrix::from_rows(&self.list(Self::vector)?)
    }
}

impl FromStr for Vector {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let v = parser.vector()?;
        parser.finish()?;
        Ok(v)
    }
}

impl FromStr for Matrix {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let m = parser.matrix()?;
        parser.finish()?;
        Ok(m)
    }
}

fn write_vector<V: VectorLike + ?Sized>(f: &mut fmt::Formatter<'_>, v: &V) -> fmt::Result {
    write!(f, "{{")?;
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, "}}")
}

fn write_matrix<M: MatrixLike + ?Sized>(f: &mut fmt::Formatter<'_>, m: &M) -> fmt::Result {
    write!(f, "{{")?;
    for (i, row) in m.rows().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_vector(f, &row)?;
    }
    write!(f, "}}")
}

macro_rules! display_via {
    ($writer:ident: $($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    $writer(f, self)
                }
            }
        )*
    };
}

display_via!(write_vector: Vector, VectorView<'_>, VectorViewMut<'_>);
display_via!(write_matrix: Matrix, MatrixView<'_>, MatrixViewMut<'_>);
