//! Integer points of a lattice inside a polyhedron
//!
//! Given a square basis B (rows are basis vectors), an origin o and a region
//! R described by an [`Optimize`], enumerates every integer coordinate
//! vector x with `o + Bᵗx ∈ R`, each exactly once.
//!
//! # Algorithm
//!
//! Coordinates are fixed one at a time. With g_d = row d of (Bᵗ)⁻¹ the
//! coordinate is x_d = g_d·(p - o), so the bounds of x_d over the current
//! region come from minimizing and maximizing g_d·p. Each integer in that
//! range becomes a child whose region carries the extra equality
//! g_d·p = x_d + g_d·o. At the last coordinate every integer in range is a
//! result.
//!
//! The search is a depth-first walk driven by the consumer: no LP work
//! happens for a level until the consumer pulls into it. [`Enumeration::split`]
//! hands part of the remaining work to another enumeration, which is what the
//! rayon form [`ParallelEnumeration`] builds on.

use std::sync::Arc;

use log::{debug, trace, warn};
use num_bigint::BigInt;
use num_traits::One;
use rayon::iter::plumbing::{bridge_unindexed, Folder, UnindexedConsumer, UnindexedProducer};
use rayon::iter::ParallelIterator;

use crate::error::{check_dim, LatticeError, Result};
use crate::matrix::{Matrix, MatrixLike};
use crate::optimize::Optimize;
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike, VectorView};

/// Data shared by every node of one search
#[derive(Debug)]
pub struct SearchSpace {
    dimension: usize,
    basis: Matrix,
    origin: Vector,
    /// (Bᵗ)⁻¹; row d is the gradient of coordinate d
    inverse: Matrix,
}

impl SearchSpace {
    pub fn new(basis: &Matrix, origin: &Vector) -> Result<Self> {
        if basis.row_count() != basis.col_count() {
            return Err(LatticeError::NotSquare {
                rows: basis.row_count(),
                cols: basis.col_count(),
            });
        }
        check_dim(basis.row_count(), origin.dim())?;
        Ok(Self {
            dimension: basis.row_count(),
            basis: basis.clone(),
            origin: origin.clone(),
            inverse: basis.transpose().inverse()?,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn basis(&self) -> &Matrix {
        &self.basis
    }

    pub fn origin(&self) -> &Vector {
        &self.origin
    }

    /// Gradient of coordinate `depth` in the original space
    pub fn gradient(&self, depth: usize) -> Result<VectorView<'_>> {
        self.inverse.row(depth)
    }

    /// The lattice point `origin + Bᵗx`
    pub fn point<V: VectorLike + ?Sized>(&self, coordinates: &V) -> Result<Vector> {
        check_dim(self.dimension, coordinates.dim())?;
        self.basis.transpose().multiply_vector(coordinates)?.add(&self.origin)
    }

    /// Integer range of coordinate `depth` over the region of `optimize`
    fn bounds(&self, depth: usize, optimize: &Optimize) -> Result<(BigInt, BigInt)> {
        let g = self.gradient(depth)?;
        let shift = g.dot(&self.origin)?;
        let low = optimize.minimize(&g)?.value;
        let high = optimize.maximize(&g)?.value;
        Ok(((&low - &shift).ceil(), (&high - &shift).floor()))
    }
}

/// One partially fixed coordinate vector and its remaining region
#[derive(Debug)]
pub struct SearchNode {
    space: Arc<SearchSpace>,
    depth: usize,
    fixed: Vec<BigInt>,
    optimize: Optimize,
}

impl SearchNode {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Coordinates fixed on the path to this node
    pub fn fixed(&self) -> &[BigInt] {
        &self.fixed
    }

    pub fn optimize(&self) -> &Optimize {
        &self.optimize
    }

    fn is_last_level(&self) -> bool {
        self.depth + 1 == self.space.dimension
    }

    /// Integer range [low, high] of the coordinate this node fixes
    pub fn bounds(&self) -> Result<(BigInt, BigInt)> {
        self.space.bounds(self.depth, &self.optimize)
    }

    /// The node with coordinate `depth` fixed to `value`, or `None` when
    /// that slice of the region is empty
    pub fn child(&self, value: &BigInt) -> Option<SearchNode> {
        let step = || -> Result<SearchNode> {
            let g = self.space.gradient(self.depth)?;
            let target = &Rational::from(value.clone()) + &g.dot(&self.space.origin)?;
            let optimize = self.optimize.with_strict_bound(&g, &target)?;
            let mut fixed = self.fixed.clone();
            fixed.push(value.clone());
            Ok(SearchNode {
                space: Arc::clone(&self.space),
                depth: self.depth + 1,
                fixed,
                optimize,
            })
        };
        match step() {
            Ok(node) => Some(node),
            Err(e) => {
                // Shapes are fixed at the root, so only emptiness is expected
                debug_assert!(
                    e == LatticeError::Infeasible,
                    "branch {:?} = {} failed: {}",
                    self.fixed,
                    value,
                    e
                );
                if e != LatticeError::Infeasible {
                    warn!("dropping branch {:?} = {}: {}", self.fixed, value, e);
                }
                None
            }
        }
    }

    fn leaf(&self, value: &BigInt) -> Vector {
        self.fixed
            .iter()
            .chain(std::iter::once(value))
            .map(|x| Rational::from(x.clone()))
            .collect()
    }
}

/// Values `next..=end` of one node still to be visited
#[derive(Debug, Clone)]
struct Frame {
    node: Arc<SearchNode>,
    next: BigInt,
    end: BigInt,
}

impl Frame {
    fn open(node: SearchNode) -> Option<Frame> {
        match node.bounds() {
            Ok((low, high)) => Frame::with_range(node, low, high),
            Err(e) => {
                debug_assert!(
                    e == LatticeError::Infeasible,
                    "node {:?} has no bounds: {}",
                    node.fixed,
                    e
                );
                if e != LatticeError::Infeasible {
                    warn!("dropping node {:?}: {}", node.fixed, e);
                }
                None
            }
        }
    }

    fn with_range(node: SearchNode, low: BigInt, high: BigInt) -> Option<Frame> {
        if low > high {
            return None;
        }
        trace!("depth {} fixed {:?}: range [{}, {}]", node.depth, node.fixed, low, high);
        Some(Frame {
            node: Arc::new(node),
            next: low,
            end: high,
        })
    }

    fn remaining(&self) -> BigInt {
        &self.end - &self.next + 1
    }
}

/// Lazy depth-first enumeration of the integer coordinate vectors
#[derive(Debug, Default)]
pub struct Enumeration {
    stack: Vec<Frame>,
}

impl Enumeration {
    /// Converts into a rayon parallel iterator
    pub fn par(self) -> ParallelEnumeration {
        ParallelEnumeration { inner: self }
    }

    /// Moves part of the remaining work into a new enumeration. The two
    /// together produce exactly what `self` would have produced alone.
    pub fn split(&mut self) -> Option<Enumeration> {
        loop {
            if let Some(other) = self.split_frames() {
                return Some(other);
            }
            if !self.descend() {
                return None;
            }
        }
    }

    /// Gives away values not yet started from the shallowest frame that can
    /// spare some
    fn split_frames(&mut self) -> Option<Enumeration> {
        let depth = self.stack.len();
        for (i, frame) in self.stack.iter_mut().enumerate() {
            let remaining = frame.remaining();
            if remaining >= BigInt::from(2) {
                let mid: BigInt = &frame.next + (&remaining / 2u32);
                let other = Frame {
                    node: Arc::clone(&frame.node),
                    next: mid.clone(),
                    end: frame.end.clone(),
                };
                frame.end = mid - 1;
                return Some(Enumeration { stack: vec![other] });
            }
            if remaining.is_one() && i + 1 < depth {
                let other = frame.clone();
                frame.next = &frame.end + 1;
                return Some(Enumeration { stack: vec![other] });
            }
        }
        None
    }

    /// Replaces a lone frame with a single value by the frame of its child
    fn descend(&mut self) -> bool {
        match self.stack.as_slice() {
            [frame] if frame.remaining().is_one() && !frame.node.is_last_level() => {}
            _ => return false,
        }
        let Some(frame) = self.stack.pop() else {
            return false;
        };
        match frame.node.child(&frame.next).and_then(Frame::open) {
            Some(child) => {
                self.stack.push(child);
                true
            }
            None => false,
        }
    }
}

impl Iterator for Enumeration {
    type Item = Vector;

    fn next(&mut self) -> Option<Vector> {
        loop {
            let top = self.stack.last_mut()?;
            if top.next > top.end {
                self.stack.pop();
                continue;
            }
            let value = top.next.clone();
            top.next += 1;
            let node = Arc::clone(&top.node);

            if node.is_last_level() {
                return Some(node.leaf(&value));
            }
            if let Some(frame) = node.child(&value).and_then(Frame::open) {
                self.stack.push(frame);
            }
        }
    }
}

/// Parallel form of [`Enumeration`]
#[derive(Debug)]
pub struct ParallelEnumeration {
    inner: Enumeration,
}

impl ParallelIterator for ParallelEnumeration {
    type Item = Vector;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: UnindexedConsumer<Self::Item>,
    {
        bridge_unindexed(EnumerationProducer(self.inner), consumer)
    }
}

struct EnumerationProducer(Enumeration);

impl UnindexedProducer for EnumerationProducer {
    type Item = Vector;

    fn split(mut self) -> (Self, Option<Self>) {
        let other = self.0.split().map(EnumerationProducer);
        (self, other)
    }

    fn fold_with<F>(self, folder: F) -> F
    where
        F: Folder<Self::Item>,
    {
        folder.consume_iter(self.0)
    }
}

/// Enumerates every integer x with `origin + Bᵗx` inside the region of
/// `optimize`
///
/// The region must be bounded along every coordinate:
/// [`LatticeError::Unbounded`] and [`LatticeError::Infeasible`] from the root
/// bounds are returned here, while infeasible branches deeper in the search
/// are simply empty.
pub fn enumerate(basis: &Matrix, origin: &Vector, optimize: &Optimize) -> Result<Enumeration> {
    let space = Arc::new(SearchSpace::new(basis, origin)?);
    check_dim(space.dimension, optimize.dimension())?;

    let mut volume = BigInt::one();
    let mut root_range = None;
    for d in 0..space.dimension {
        let (low, high) = space.bounds(d, optimize)?;
        if low > high {
            debug!("coordinate {} has an empty range, nothing to enumerate", d);
            return Ok(Enumeration::default());
        }
        volume *= &high - &low + 1;
        if d == 0 {
            root_range = Some((low, high));
        }
    }
    let Some((low, high)) = root_range else {
        return Ok(Enumeration::default());
    };
    debug!(
        "enumerating dimension {} with a root bounding box of {} points",
        space.dimension, volume
    );

    let root = SearchNode {
        space,
        depth: 0,
        fixed: Vec::new(),
        optimize: optimize.clone(),
    };
    Ok(Enumeration {
        stack: Frame::with_range(root, low, high).into_iter().collect(),
    })
}
