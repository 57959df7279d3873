//! Lattice basis reduction
//!
//! # Key Components
//!
//! - [`GramSchmidt`] - exact orthogonalization of a whole basis
//! - [`IncrementalGso`] - orthogonal data maintained by LLL as it runs
//! - [`Lll`] - LLL reduction of possibly dependent generating rows
//!
//! # Example
//!
//! ```
//! use lcg_reverse_core::lattice::{Lll, LllConfig};
//! use lcg_reverse_core::Matrix;
//!
//! let lattice: Matrix = "{{1, 0, 3}, {0, 1, 5}, {0, 0, 7}}".parse().unwrap();
//! let reduced = Lll::reduce(&lattice, &LllConfig::default()).unwrap();
//! assert!(Lll::is_reduced(&reduced.basis, &LllConfig::default()));
//! ```

pub mod gram_schmidt;
pub mod lll;

pub use gram_schmidt::{GramSchmidt, IncrementalGso, SwapCase};
pub use lll::{Lll, LllConfig, LllResult, LllStats};
