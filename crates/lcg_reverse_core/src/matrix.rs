//! Dense matrix operations
//!
//! Row-major dense rational matrices. A [`Matrix`] owns its storage; a
//! [`MatrixView`] or [`MatrixViewMut`] borrows a rectangular window of some
//! larger storage, described by an offset, its logical extent and the row
//! stride (the column count of the underlying storage). Rows, columns and
//! submatrices of any form are zero-copy views, and writing through a mutable
//! view writes the parent.

use std::ops::{Index, IndexMut};

use crate::error::{check_dim, check_index, LatticeError, Result};
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike, VectorLikeMut, VectorView, VectorViewMut};

/// Read access shared by owned matrices and views
pub trait MatrixLike {
    fn row_count(&self) -> usize;

    fn col_count(&self) -> usize;

    /// Backing storage, offset of entry (0, 0), and row stride
    fn storage(&self) -> (&[Rational], usize, usize);

    /// Entry (i, j); panics when out of range
    fn at(&self, i: usize, j: usize) -> &Rational {
        assert!(
            i < self.row_count() && j < self.col_count(),
            "index ({}, {}) out of range for {}x{} matrix",
            i,
            j,
            self.row_count(),
            self.col_count()
        );
        let (data, offset, stride) = self.storage();
        &data[offset + i * stride + j]
    }

    fn get(&self, i: usize, j: usize) -> Result<&Rational> {
        check_index(i, self.row_count())?;
        check_index(j, self.col_count())?;
        Ok(self.at(i, j))
    }

    fn row(&self, i: usize) -> Result<VectorView<'_>> {
        check_index(i, self.row_count())?;
        let (data, offset, stride) = self.storage();
        Ok(VectorView::new(data, offset + i * stride, 1, self.col_count()))
    }

    fn column(&self, j: usize) -> Result<VectorView<'_>> {
        check_index(j, self.col_count())?;
        let (data, offset, stride) = self.storage();
        Ok(VectorView::new(data, offset + j, stride, self.row_count()))
    }

    /// Zero-copy window of `rows x cols` entries starting at (`row`, `col`)
    fn submatrix(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<MatrixView<'_>> {
        check_window(self.row_count(), self.col_count(), row, col, rows, cols)?;
        let (data, offset, stride) = self.storage();
        Ok(MatrixView {
            data,
            offset: offset + row * stride + col,
            rows,
            cols,
            stride,
        })
    }

    fn rows(&self) -> RowIter<'_, Self> {
        RowIter { matrix: self, next: 0 }
    }

    /// Detached copy
    fn to_matrix(&self) -> Matrix {
        let mut data = Vec::with_capacity(self.row_count() * self.col_count());
        for i in 0..self.row_count() {
            for j in 0..self.col_count() {
                data.push(self.at(i, j).clone());
            }
        }
        Matrix {
            data,
            rows: self.row_count(),
            cols: self.col_count(),
        }
    }

    /// Fresh transposed copy
    fn transpose(&self) -> Matrix {
        let (rows, cols) = (self.col_count(), self.row_count());
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(self.at(j, i).clone());
            }
        }
        Matrix { data, rows, cols }
    }

    fn multiply<M: MatrixLike + ?Sized>(&self, other: &M) -> Result<Matrix> {
        check_dim(self.col_count(), other.row_count())?;
        let (n, m, p) = (self.row_count(), self.col_count(), other.col_count());
        let mut out = Matrix::zeros(n, p);
        for i in 0..n {
            for k in 0..m {
                let a = self.at(i, k);
                if a.is_zero() {
                    continue;
                }
                for j in 0..p {
                    let b = other.at(k, j);
                    if !b.is_zero() {
                        out.data[i * p + j] += &(a * b);
                    }
                }
            }
        }
        Ok(out)
    }

    fn multiply_vector<V: VectorLike + ?Sized>(&self, v: &V) -> Result<Vector> {
        check_dim(self.col_count(), v.dim())?;
        (0..self.row_count())
            .map(|i| self.row(i).and_then(|row| row.dot(v)))
            .collect::<Result<Vec<_>>>()
            .map(Vector::from)
    }

    fn add<M: MatrixLike + ?Sized>(&self, other: &M) -> Result<Matrix> {
        self.zip_with(other, |a, b| a + b)
    }

    fn sub<M: MatrixLike + ?Sized>(&self, other: &M) -> Result<Matrix> {
        self.zip_with(other, |a, b| a - b)
    }

    fn zip_with<M, F>(&self, other: &M, f: F) -> Result<Matrix>
    where
        M: MatrixLike + ?Sized,
        F: Fn(&Rational, &Rational) -> Rational,
    {
        check_dim(self.row_count(), other.row_count())?;
        check_dim(self.col_count(), other.col_count())?;
        let mut data = Vec::with_capacity(self.row_count() * self.col_count());
        for i in 0..self.row_count() {
            for j in 0..self.col_count() {
                data.push(f(self.at(i, j), other.at(i, j)));
            }
        }
        Ok(Matrix {
            data,
            rows: self.row_count(),
            cols: self.col_count(),
        })
    }

    fn scale(&self, factor: &Rational) -> Matrix {
        let mut out = self.to_matrix();
        for x in out.data.iter_mut() {
            *x = &*x * factor;
        }
        out
    }

    /// Entrywise equality with any other matrix form
    fn equals<M: MatrixLike + ?Sized>(&self, other: &M) -> bool {
        self.row_count() == other.row_count()
            && self.col_count() == other.col_count()
            && (0..self.row_count())
                .all(|i| (0..self.col_count()).all(|j| self.at(i, j) == other.at(i, j)))
    }

    fn is_identity(&self) -> bool {
        self.row_count() == self.col_count()
            && (0..self.row_count()).all(|i| {
                (0..self.col_count()).all(|j| {
                    let x = self.at(i, j);
                    if i == j {
                        x.is_one()
                    } else {
                        x.is_zero()
                    }
                })
            })
    }

    fn is_integral(&self) -> bool {
        (0..self.row_count()).all(|i| (0..self.col_count()).all(|j| self.at(i, j).is_integer()))
    }
}

/// Write access shared by owned matrices and mutable views
pub trait MatrixLikeMut: MatrixLike {
    fn storage_mut(&mut self) -> (&mut [Rational], usize, usize);

    fn at_mut(&mut self, i: usize, j: usize) -> &mut Rational {
        assert!(
            i < self.row_count() && j < self.col_count(),
            "index ({}, {}) out of range for {}x{} matrix",
            i,
            j,
            self.row_count(),
            self.col_count()
        );
        let (data, offset, stride) = self.storage_mut();
        &mut data[offset + i * stride + j]
    }

    fn set(&mut self, i: usize, j: usize, value: Rational) -> Result<()> {
        check_index(i, self.row_count())?;
        check_index(j, self.col_count())?;
        *self.at_mut(i, j) = value;
        Ok(())
    }

    fn row_mut(&mut self, i: usize) -> Result<VectorViewMut<'_>> {
        check_index(i, self.row_count())?;
        let cols = self.col_count();
        let (data, offset, stride) = self.storage_mut();
        Ok(VectorViewMut::new(data, offset + i * stride, 1, cols))
    }

    fn column_mut(&mut self, j: usize) -> Result<VectorViewMut<'_>> {
        check_index(j, self.col_count())?;
        let rows = self.row_count();
        let (data, offset, stride) = self.storage_mut();
        Ok(VectorViewMut::new(data, offset + j, stride, rows))
    }

    fn submatrix_mut(&mut self, row: usize, col: usize, rows: usize, cols: usize) -> Result<MatrixViewMut<'_>> {
        check_window(self.row_count(), self.col_count(), row, col, rows, cols)?;
        let (data, offset, stride) = self.storage_mut();
        Ok(MatrixViewMut {
            data,
            offset: offset + row * stride + col,
            rows,
            cols,
            stride,
        })
    }

    fn set_row<V: VectorLike + ?Sized>(&mut self, i: usize, values: &V) -> Result<()> {
        self.row_mut(i)?.assign(values)
    }

    fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        check_index(i, self.row_count())?;
        check_index(j, self.row_count())?;
        if i == j {
            return Ok(());
        }
        let cols = self.col_count();
        let (data, offset, stride) = self.storage_mut();
        for c in 0..cols {
            data.swap(offset + i * stride + c, offset + j * stride + c);
        }
        Ok(())
    }

    /// Moves row `from` to position `to`; the rows in between move by one
    /// towards the vacated position.
    fn shift_row(&mut self, from: usize, to: usize) -> Result<()> {
        check_index(from, self.row_count())?;
        check_index(to, self.row_count())?;
        if from < to {
            for r in from..to {
                self.swap_rows(r, r + 1)?;
            }
        } else {
            for r in (to..from).rev() {
                self.swap_rows(r, r + 1)?;
            }
        }
        Ok(())
    }

    /// row[target] += factor * row[source]
    fn add_row_multiple(&mut self, target: usize, source: usize, factor: &Rational) -> Result<()> {
        check_index(target, self.row_count())?;
        check_index(source, self.row_count())?;
        if factor.is_zero() {
            return Ok(());
        }
        let cols = self.col_count();
        let (data, offset, stride) = self.storage_mut();
        for c in 0..cols {
            let x = &data[offset + source * stride + c];
            if !x.is_zero() {
                let delta = x * factor;
                data[offset + target * stride + c] += &delta;
            }
        }
        Ok(())
    }
}

fn check_window(total_rows: usize, total_cols: usize, row: usize, col: usize, rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(LatticeError::EmptyShape);
    }
    check_index(row + rows - 1, total_rows)?;
    check_index(col + cols - 1, total_cols)
}

/// Iterator over the rows of any [`MatrixLike`]
pub struct RowIter<'a, M: ?Sized> {
    matrix: &'a M,
    next: usize,
}

impl<'a, M: MatrixLike + ?Sized> Iterator for RowIter<'a, M> {
    type Item = VectorView<'a>;

    fn next(&mut self) -> Option<VectorView<'a>> {
        if self.next >= self.matrix.row_count() {
            return None;
        }
        let row = self.matrix.row(self.next).ok();
        self.next += 1;
        row
    }
}

/// Dense matrix in row-major order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Matrix {
    data: Vec<Rational>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a zero matrix
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "matrix dimensions must be positive");
        Self {
            data: vec![Rational::zero(); rows * cols],
            rows,
            cols,
        }
    }

    /// Create an identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = Rational::one();
        }
        m
    }

    /// Create a matrix from a flat vector (row-major order)
    pub fn from_flat(data: Vec<Rational>, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(LatticeError::EmptyShape);
        }
        check_dim(rows * cols, data.len())?;
        Ok(Self { data, rows, cols })
    }

    pub fn from_rows<V: VectorLike>(rows: &[V]) -> Result<Self> {
        let first = rows.first().ok_or(LatticeError::EmptyShape)?;
        let cols = first.dim();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            check_dim(cols, row.dim())?;
            data.extend(row.iter().cloned());
        }
        Self::from_flat(data, rows.len(), cols)
    }

    /// Create a matrix from integer rows
    pub fn from_int_rows<T: Into<num_bigint::BigInt> + Clone>(rows: &[Vec<T>]) -> Result<Self> {
        let vectors: Vec<Vector> = rows.iter().map(|r| Vector::from_ints(r)).collect();
        Self::from_rows(&vectors)
    }

    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            data: &self.data,
            offset: 0,
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
        }
    }

    pub fn view_mut(&mut self) -> MatrixViewMut<'_> {
        MatrixViewMut {
            data: &mut self.data,
            offset: 0,
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
        }
    }

    /// Detached copy of row `i`
    pub fn row_vector(&self, i: usize) -> Result<Vector> {
        Ok(self.row(i)?.to_vector())
    }

    /// Inverse by Gauss-Jordan elimination
    pub fn inverse(&self) -> Result<Matrix> {
        if self.rows != self.cols {
            return Err(LatticeError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);
        for col in 0..n {
            let pivot_row = (col..n)
                .find(|&r| !a.at(r, col).is_zero())
                .ok_or(LatticeError::Singular)?;
            a.swap_rows(col, pivot_row)?;
            inv.swap_rows(col, pivot_row)?;

            let scale = a.at(col, col).recip()?;
            a.row_mut(col)?.scale_assign(&scale);
            inv.row_mut(col)?.scale_assign(&scale);

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = -a.at(r, col);
                if factor.is_zero() {
                    continue;
                }
                a.add_row_multiple(r, col, &factor)?;
                inv.add_row_multiple(r, col, &factor)?;
            }
        }
        Ok(inv)
    }

    /// Determinant by fraction-exact Gaussian elimination
    pub fn determinant(&self) -> Result<Rational> {
        if self.rows != self.cols {
            return Err(LatticeError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut det = Rational::one();
        for col in 0..n {
            let Some(pivot_row) = (col..n).find(|&r| !a.at(r, col).is_zero()) else {
                return Ok(Rational::zero());
            };
            if pivot_row != col {
                a.swap_rows(col, pivot_row)?;
                det = -det;
            }
            let pivot = a.at(col, col).clone();
            for r in col + 1..n {
                let factor = -(a.at(r, col) / &pivot);
                a.add_row_multiple(r, col, &factor)?;
            }
            det = &det * &pivot;
        }
        Ok(det)
    }
}

impl MatrixLike for Matrix {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn storage(&self) -> (&[Rational], usize, usize) {
        (&self.data, 0, self.cols)
    }
}

impl MatrixLikeMut for Matrix {
    fn storage_mut(&mut self) -> (&mut [Rational], usize, usize) {
        let cols = self.cols;
        (&mut self.data, 0, cols)
    }
}

/// Read-only window into borrowed matrix storage
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    data: &'a [Rational],
    offset: usize,
    rows: usize,
    cols: usize,
    stride: usize,
}

impl MatrixLike for MatrixView<'_> {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn storage(&self) -> (&[Rational], usize, usize) {
        (self.data, self.offset, self.stride)
    }
}

/// Mutable window into borrowed matrix storage
#[derive(Debug)]
pub struct MatrixViewMut<'a> {
    data: &'a mut [Rational],
    offset: usize,
    rows: usize,
    cols: usize,
    stride: usize,
}

impl MatrixViewMut<'_> {
    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView {
            data: &*self.data,
            offset: self.offset,
            rows: self.rows,
            cols: self.cols,
            stride: self.stride,
        }
    }
}

impl MatrixLike for MatrixViewMut<'_> {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn storage(&self) -> (&[Rational], usize, usize) {
        (&*self.data, self.offset, self.stride)
    }
}

impl MatrixLikeMut for MatrixViewMut<'_> {
    fn storage_mut(&mut self) -> (&mut [Rational], usize, usize) {
        (&mut *self.data, self.offset, self.stride)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Rational;

    fn index(&self, (i, j): (usize, usize)) -> &Rational {
        self.at(i, j)
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Rational {
        self.at_mut(i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(rows: &[Vec<i64>]) -> Matrix {
        Matrix::from_int_rows(rows).unwrap()
    }

    #[test]
    fn test_matrix_access() {
        let data: Vec<Rational> = (0..6i64).map(Rational::from).collect();
        let a = Matrix::from_flat(data, 2, 3).unwrap();

        assert_eq!(a.at(0, 0), &Rational::from(0i64));
        assert_eq!(a.at(0, 2), &Rational::from(2i64));
        assert_eq!(a.at(1, 0), &Rational::from(3i64));
        assert_eq!(a[(1, 2)], Rational::from(5i64));
        assert_eq!(a.get(2, 0), Err(LatticeError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(Matrix::from_flat(vec![], 0, 3), Err(LatticeError::EmptyShape));
    }

    #[test]
    fn test_identity() {
        let id = Matrix::identity(3);
        assert!(id.is_identity());
        assert_eq!(id.at(0, 1), &Rational::zero());
    }

    #[test]
    fn test_multiply() {
        let a = m(&[vec![1, 2], vec![3, 4]]);
        let b = m(&[vec![0, 1], vec![1, 0]]);
        assert_eq!(a.multiply(&b).unwrap(), m(&[vec![2, 1], vec![4, 3]]));

        let v = Vector::from_ints(&[1i64, -1]);
        assert_eq!(a.multiply_vector(&v).unwrap(), Vector::from_ints(&[-1i64, -1]));

        let c = m(&[vec![1, 2, 3]]);
        assert_eq!(
            a.multiply(&c),
            Err(LatticeError::DimensionMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_transpose_is_detached() {
        let a = m(&[vec![1, 2, 3], vec![4, 5, 6]]);
        let mut t = a.transpose();
        assert_eq!(t, m(&[vec![1, 4], vec![2, 5], vec![3, 6]]));
        t.set(0, 0, Rational::from(9i64)).unwrap();
        assert_eq!(a.at(0, 0), &Rational::one());
    }

    #[test]
    fn test_row_and_column_views_alias() {
        let mut a = m(&[vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        a.row_mut(1).unwrap().scale_assign(&Rational::from(2i64));
        assert_eq!(a, m(&[vec![1, 2, 3], vec![8, 10, 12], vec![7, 8, 9]]));

        a.column_mut(2).unwrap().set(0, Rational::zero()).unwrap();
        assert_eq!(a.at(0, 2), &Rational::zero());
        assert_eq!(a.column(0).unwrap().to_vector(), Vector::from_ints(&[1i64, 8, 7]));
    }

    #[test]
    fn test_submatrix_touches_only_window() {
        let mut a = m(&[vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![9, 10, 11, 12]]);
        {
            let mut sub = a.submatrix_mut(1, 1, 2, 2).unwrap();
            assert_eq!(sub.to_matrix(), m(&[vec![6, 7], vec![10, 11]]));
            // nested window: the single entry originally at (2, 2)
            let mut inner = sub.submatrix_mut(1, 1, 1, 1).unwrap();
            inner.set(0, 0, Rational::zero()).unwrap();
            sub.row_mut(0).unwrap().assign(&Vector::from_ints(&[-1i64, -1])).unwrap();
            sub.swap_rows(0, 1).unwrap();
        }
        assert_eq!(
            a,
            m(&[vec![1, 2, 3, 4], vec![5, 10, 0, 8], vec![9, -1, -1, 12]])
        );
        assert!(a.submatrix(2, 2, 2, 1).is_err());
    }

    #[test]
    fn test_submatrix_copy_detaches() {
        let mut a = m(&[vec![1, 2], vec![3, 4]]);
        let copy = a.submatrix(0, 0, 1, 2).unwrap().to_matrix();
        a.set(0, 0, Rational::from(7i64)).unwrap();
        assert_eq!(copy, m(&[vec![1, 2]]));
    }

    #[test]
    fn test_shift_row() {
        let mut a = m(&[vec![0], vec![1], vec![2], vec![3]]);
        a.shift_row(3, 1).unwrap();
        assert_eq!(a, m(&[vec![0], vec![3], vec![1], vec![2]]));
        a.shift_row(0, 2).unwrap();
        assert_eq!(a, m(&[vec![3], vec![1], vec![0], vec![2]]));
    }

    #[test]
    fn test_inverse_and_determinant() {
        let a = m(&[vec![2, 1], vec![7, 4]]);
        let inv = a.inverse().unwrap();
        assert_eq!(inv, m(&[vec![4, -1], vec![-7, 2]]));
        assert_eq!(a.determinant().unwrap(), Rational::one());

        let singular = m(&[vec![1, 2], vec![2, 4]]);
        assert_eq!(singular.inverse(), Err(LatticeError::Singular));
        assert_eq!(singular.determinant().unwrap(), Rational::zero());

        let rect = m(&[vec![1, 2, 3]]);
        assert_eq!(rect.inverse(), Err(LatticeError::NotSquare { rows: 1, cols: 3 }));
    }

    proptest! {
        #[test]
        fn prop_inverse_roundtrip(entries in proptest::collection::vec(-20i64..20, 9)) {
            let a = Matrix::from_flat(entries.into_iter().map(Rational::from).collect(), 3, 3).unwrap();
            prop_assume!(!a.determinant().unwrap().is_zero());
            let inv = a.inverse().unwrap();
            prop_assert!(a.multiply(&inv).unwrap().is_identity());
            prop_assert!(inv.multiply(&a).unwrap().is_identity());
        }
    }
}
