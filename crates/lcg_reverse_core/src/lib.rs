//! LCG Reverse Core Library
//!
//! Exact rational lattice arithmetic for recovering the seeds of linear
//! congruential generators.
//!
//! # Overview
//!
//! Observations of a generator's outputs constrain its states to a box. The
//! states themselves form a shifted integer lattice, so the seeds are the
//! lattice points inside that box. This library reduces the lattice with LLL,
//! describes the box as a linear program, and enumerates the points with a
//! depth-first search that can run on the rayon thread pool.
//!
//! # Key Components
//!
//! - [`rational`] - Exact rational number type
//! - [`vector`] / [`matrix`] - Dense vectors and matrices with aliasing views
//! - [`text`] - `{{1, 2}, {3, 4}}` parsing and formatting
//! - [`lattice`] - Gram-Schmidt orthogonalization and LLL reduction
//! - [`optimize`] - Exact simplex over a polytope
//! - [`enumerate`] - Lattice points inside a polytope
//! - [`lcg`] / [`reverser`] - Generators and seed recovery

pub mod error;
pub mod rational;
pub mod vector;
pub mod matrix;
pub mod text;
pub mod lattice;
pub mod optimize;
pub mod enumerate;
pub mod lcg;
pub mod reverser;

pub use error::{LatticeError, Result};
pub use rational::Rational;
pub use vector::{Vector, VectorLike, VectorLikeMut, VectorView, VectorViewMut};
pub use matrix::{Matrix, MatrixLike, MatrixLikeMut, MatrixView, MatrixViewMut};
pub use lattice::{GramSchmidt, Lll, LllConfig, LllResult, LllStats};
pub use optimize::{Optimize, OptimizeBuilder, Relation, Solution};
pub use enumerate::{enumerate, Enumeration, ParallelEnumeration, SearchNode, SearchSpace};
pub use lcg::Lcg;
pub use reverser::{RandomReverser, ReverserConfig, Seeds, StateRange};
