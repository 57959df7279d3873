//! Exact Gram-Schmidt orthogonalization
//!
//! Given rows B = [b_0, ..., b_{n-1}], computes orthogonal vectors b*_i and
//! coefficients μ_ij:
//!
//! ```text
//! b*_0 = b_0
//! b*_i = b_i - Σ_{j<i} μ_ij b*_j
//! μ_ij = <b_i, b*_j> / <b*_j, b*_j>
//! ```
//!
//! Rows may be linearly dependent. When ||b*_j||² = 0 the coefficient μ_ij
//! is taken to be 0, so the decomposition stays well defined.
//!
//! [`IncrementalGso`] is the working state of LLL: it computes rows on
//! demand up to a high-water mark and is patched in place after size
//! reductions and swaps instead of being recomputed.

use crate::error::Result;
use crate::matrix::{Matrix, MatrixLike, MatrixLikeMut};
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike, VectorLikeMut};

/// Gram-Schmidt coefficients and squared norms of a whole basis
#[derive(Debug, Clone)]
pub struct GramSchmidt {
    /// μ_ij for j < i, lower triangular
    mu: Matrix,
    /// ||b*_i||²
    norms: Vector,
    n: usize,
}

impl GramSchmidt {
    /// Orthogonalize every row of `basis`
    pub fn compute<M: MatrixLike + ?Sized>(basis: &M) -> Result<Self> {
        let n = basis.row_count();
        let mut gso = IncrementalGso::new(basis)?;
        for k in 1..n {
            gso.extend(basis, k)?;
        }
        Ok(Self {
            mu: gso.mu,
            norms: gso.norms,
            n,
        })
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    /// μ_ij; only defined for j < i
    pub fn mu(&self, i: usize, j: usize) -> &Rational {
        assert!(j < i, "μ_ij only defined for j < i");
        self.mu.at(i, j)
    }

    /// ||b*_i||²
    pub fn norm_sq(&self, i: usize) -> &Rational {
        self.norms.at(i)
    }

    /// |μ_ij| > 1/2
    pub fn needs_size_reduction(&self, i: usize, j: usize) -> bool {
        self.mu(i, j).abs() > Rational::half()
    }

    /// Lovász condition at position k:
    /// ||b*_k||² ≥ (δ - μ_{k,k-1}²) ||b*_{k-1}||²
    pub fn check_lovasz(&self, k: usize, delta: &Rational) -> bool {
        if k == 0 {
            return true;
        }
        lovasz_holds(&self.norms[k], &self.norms[k - 1], &self.mu[(k, k - 1)], delta)
    }
}

pub(crate) fn lovasz_holds(norm_k: &Rational, norm_prev: &Rational, mu: &Rational, delta: &Rational) -> bool {
    *norm_k >= &(delta - &mu.square()) * norm_prev
}

/// How the orthogonal data is patched when rows k-1 and k trade places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapCase {
    /// Both norms nonzero
    General,
    /// ||b*_k||² = 0 while μ_{k,k-1} ≠ 0
    FirstZeroNorm,
    /// ||b*_{k-1}||² = 0 while ||b*_k||² ≠ 0
    SecondZeroNorm,
    /// ||b*_k||² = 0 and μ_{k,k-1} = 0: the projected length after the swap
    /// is zero as well
    Degenerate,
}

impl SwapCase {
    pub fn classify(norm_k: &Rational, norm_prev: &Rational, mu: &Rational) -> Self {
        match (norm_k.is_zero(), mu.is_zero()) {
            (true, true) => SwapCase::Degenerate,
            (true, false) => SwapCase::FirstZeroNorm,
            (false, _) if norm_prev.is_zero() => SwapCase::SecondZeroNorm,
            (false, _) => SwapCase::General,
        }
    }
}

/// Incrementally maintained orthogonalization
#[derive(Debug, Clone)]
pub struct IncrementalGso {
    /// b*_i as rows
    pub(crate) orthogonal: Matrix,
    pub(crate) mu: Matrix,
    pub(crate) norms: Vector,
    /// Highest row whose data is valid
    pub(crate) kmax: usize,
}

impl IncrementalGso {
    /// Starts with only row 0 orthogonalized
    pub fn new<M: MatrixLike + ?Sized>(basis: &M) -> Result<Self> {
        let (n, m) = (basis.row_count(), basis.col_count());
        let mut orthogonal = Matrix::zeros(n, m);
        let first = basis.row(0)?;
        orthogonal.set_row(0, &first)?;
        let mut norms = Vector::zeros(n);
        norms[0] = first.mag_sq();
        Ok(Self {
            orthogonal,
            mu: Matrix::zeros(n, n),
            norms,
            kmax: 0,
        })
    }

    pub fn kmax(&self) -> usize {
        self.kmax
    }

    pub fn mu(&self, i: usize, j: usize) -> &Rational {
        self.mu.at(i, j)
    }

    pub fn norm_sq(&self, i: usize) -> &Rational {
        self.norms.at(i)
    }

    pub fn orthogonal(&self) -> &Matrix {
        &self.orthogonal
    }

    /// Computes b*_k, μ_kj and ||b*_k||² from the rows below k and raises
    /// the high-water mark to k
    pub fn extend<M: MatrixLike + ?Sized>(&mut self, basis: &M, k: usize) -> Result<()> {
        let row = basis.row(k)?;
        let mut star = row.to_vector();
        for j in 0..k {
            let bj = self.orthogonal.row(j)?;
            let coefficient = if self.norms[j].is_zero() {
                Rational::zero()
            } else {
                row.dot(&bj)?.checked_div(&self.norms[j])?
            };
            star.sub_assign_scaled(&bj, &coefficient)?;
            *self.mu.at_mut(k, j) = coefficient;
        }
        self.norms[k] = star.mag_sq();
        self.orthogonal.set_row(k, &star)?;
        self.kmax = self.kmax.max(k);
        Ok(())
    }

    /// Patch after b_k -= q b_l
    pub fn reduce(&mut self, k: usize, l: usize, q: &Rational) {
        *self.mu.at_mut(k, l) -= q;
        for i in 0..l {
            let delta = q * self.mu.at(l, i);
            *self.mu.at_mut(k, i) -= &delta;
        }
    }

    /// Patch after rows k-1 and k of the basis were exchanged
    pub fn swap(&mut self, k: usize) -> Result<SwapCase> {
        for j in 0..k - 1 {
            swap_entries(&mut self.mu, (k, j), (k - 1, j));
        }

        let mu = self.mu.at(k, k - 1).clone();
        let norm_k = self.norms[k].clone();
        let norm_prev = self.norms[k - 1].clone();
        let projected = &norm_k + &(&mu.square() * &norm_prev);

        let case = SwapCase::classify(&norm_k, &norm_prev, &mu);
        match case {
            SwapCase::Degenerate | SwapCase::SecondZeroNorm => {
                self.norms[k] = norm_prev;
                self.norms[k - 1] = norm_k;
                self.orthogonal.swap_rows(k, k - 1)?;
                for i in k + 1..=self.kmax {
                    swap_entries(&mut self.mu, (i, k), (i, k - 1));
                }
            }
            SwapCase::FirstZeroNorm => {
                self.norms[k - 1] = projected;
                self.orthogonal.row_mut(k - 1)?.scale_assign(&mu);
                *self.mu.at_mut(k, k - 1) = mu.recip()?;
                for i in k + 1..=self.kmax {
                    let scaled = self.mu.at(i, k - 1).checked_div(&mu)?;
                    *self.mu.at_mut(i, k - 1) = scaled;
                }
            }
            SwapCase::General => {
                let t = norm_prev.checked_div(&projected)?;
                let new_mu = &mu * &t;
                *self.mu.at_mut(k, k - 1) = new_mu.clone();

                let old_prev = self.orthogonal.row_vector(k - 1)?;
                let old_cur = self.orthogonal.row_vector(k)?;
                let prev = old_cur.add(&old_prev.scale(&mu))?;
                let cur = old_prev
                    .scale(&norm_k.checked_div(&projected)?)
                    .sub(&old_cur.scale(&new_mu))?;
                self.orthogonal.set_row(k - 1, &prev)?;
                self.orthogonal.set_row(k, &cur)?;

                self.norms[k] = &norm_k * &t;
                self.norms[k - 1] = projected;

                for i in k + 1..=self.kmax {
                    let t = self.mu.at(i, k).clone();
                    let upper = self.mu.at(i, k - 1) - &(&mu * &t);
                    *self.mu.at_mut(i, k) = upper;
                    let lower = &t + &(&new_mu * self.mu.at(i, k));
                    *self.mu.at_mut(i, k - 1) = lower;
                }
            }
        }
        Ok(case)
    }
}

fn swap_entries(m: &mut Matrix, (i1, j1): (usize, usize), (i2, j2): (usize, usize)) {
    let (data, offset, stride) = m.storage_mut();
    data.swap(offset + i1 * stride + j1, offset + i2 * stride + j2);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[Vec<i64>]) -> Matrix {
        Matrix::from_int_rows(rows).unwrap()
    }

    #[test]
    fn test_gram_schmidt_basic() {
        let basis = m(&[vec![3, 1], vec![2, 2]]);
        let gs = GramSchmidt::compute(&basis).unwrap();

        // ||b*_0||² = 9 + 1
        assert_eq!(gs.norm_sq(0), &Rational::from(10i64));
        // μ_10 = (6 + 2) / 10
        assert_eq!(gs.mu(1, 0), &Rational::new(4, 5).unwrap());
        // ||b*_1||² = 8 - (16/25) * 10
        assert_eq!(gs.norm_sq(1), &Rational::new(8, 5).unwrap());
    }

    #[test]
    fn test_gram_schmidt_3d_orthogonal() {
        let basis = m(&[vec![1, 1, 1], vec![-1, 0, 2], vec![3, 5, 6]]);
        let mut gso = IncrementalGso::new(&basis).unwrap();
        gso.extend(&basis, 1).unwrap();
        gso.extend(&basis, 2).unwrap();

        let stars = gso.orthogonal();
        for i in 0..3 {
            assert!(gso.norm_sq(i).is_positive());
            for j in 0..i {
                let dot = stars.row(i).unwrap().dot(&stars.row(j).unwrap()).unwrap();
                assert!(dot.is_zero(), "b*_{} and b*_{} not orthogonal", i, j);
            }
        }
    }

    #[test]
    fn test_dependent_rows_have_zero_norm() {
        let basis = m(&[vec![1, 2], vec![2, 4], vec![0, 1]]);
        let gs = GramSchmidt::compute(&basis).unwrap();

        assert!(gs.norm_sq(1).is_zero());
        // coefficients against a zero-norm vector vanish
        assert!(gs.mu(2, 1).is_zero());
        assert!(gs.norm_sq(2).is_positive());
    }

    #[test]
    fn test_lovasz_condition() {
        let identity = Matrix::identity(2);
        let gs = GramSchmidt::compute(&identity).unwrap();
        assert!(gs.check_lovasz(1, &Rational::new(3, 4).unwrap()));

        let unreduced = m(&[vec![10, 0], vec![1, 1]]);
        let gs = GramSchmidt::compute(&unreduced).unwrap();
        assert!(!gs.check_lovasz(1, &Rational::new(3, 4).unwrap()));
        assert!(!gs.needs_size_reduction(1, 0));
    }

    #[test]
    fn test_swap_general_matches_recompute() {
        let basis = m(&[vec![3, 1, 4], vec![1, 5, 9], vec![2, 6, 5]]);
        let mut gso = IncrementalGso::new(&basis).unwrap();
        gso.extend(&basis, 1).unwrap();
        gso.extend(&basis, 2).unwrap();

        let mut swapped = basis.clone();
        swapped.swap_rows(0, 1).unwrap();
        assert_eq!(gso.swap(1).unwrap(), SwapCase::General);

        let fresh = GramSchmidt::compute(&swapped).unwrap();
        for i in 0..3 {
            assert_eq!(gso.norm_sq(i), fresh.norm_sq(i));
            for j in 0..i {
                assert_eq!(gso.mu(i, j), fresh.mu(i, j));
            }
        }
    }

    #[test]
    fn test_swap_first_zero_norm_matches_recompute() {
        let basis = m(&[vec![2, 4], vec![1, 2]]);
        let mut gso = IncrementalGso::new(&basis).unwrap();
        gso.extend(&basis, 1).unwrap();
        assert!(gso.norm_sq(1).is_zero());

        assert_eq!(gso.swap(1).unwrap(), SwapCase::FirstZeroNorm);
        let swapped = m(&[vec![1, 2], vec![2, 4]]);
        let fresh = GramSchmidt::compute(&swapped).unwrap();
        assert_eq!(gso.norm_sq(0), fresh.norm_sq(0));
        assert_eq!(gso.norm_sq(1), fresh.norm_sq(1));
        assert_eq!(gso.mu(1, 0), fresh.mu(1, 0));
    }

    #[test]
    fn test_swap_case_classification() {
        let zero = Rational::zero();
        let one = Rational::one();
        assert_eq!(SwapCase::classify(&zero, &one, &zero), SwapCase::Degenerate);
        assert_eq!(SwapCase::classify(&zero, &one, &one), SwapCase::FirstZeroNorm);
        assert_eq!(SwapCase::classify(&one, &zero, &zero), SwapCase::SecondZeroNorm);
        assert_eq!(SwapCase::classify(&one, &one, &one), SwapCase::General);
    }
}
