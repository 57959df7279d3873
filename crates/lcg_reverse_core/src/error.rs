//! Error types for the lattice engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("division by zero")]
    DivideByZero,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("vectors and matrices must have at least one entry per dimension")]
    EmptyShape,

    #[error("matrix is singular")]
    Singular,

    #[error("constraint set has no feasible solution")]
    Infeasible,

    #[error("objective is unbounded on the constraint set")]
    Unbounded,

    #[error("every generating vector of the lattice is dependent")]
    DegenerateLattice,

    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("argument outside domain: {0}")]
    Domain(String),
}

pub type Result<T> = std::result::Result<T, LatticeError>;

/// Fails with [`LatticeError::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LatticeError::DimensionMismatch { expected, actual })
    }
}

/// Fails with [`LatticeError::IndexOutOfRange`] unless `index < len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(LatticeError::IndexOutOfRange { index, len })
    }
}
