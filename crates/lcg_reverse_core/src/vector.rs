//! Dense rational vectors and strided views
//!
//! [`Vector`] owns its entries. [`VectorView`] and [`VectorViewMut`] borrow a
//! backing slice (usually the storage of a [`crate::Matrix`]) together with an
//! offset and a stride, so rows and columns can be read and written in place.
//! Writing through a `VectorViewMut` changes the parent storage and nothing
//! outside the aliased entries; [`VectorLike::to_vector`] detaches a copy.

use std::ops::{Index, IndexMut};

use crate::error::{check_dim, check_index, Result};
use crate::rational::Rational;

/// Read access shared by owning vectors and views
pub trait VectorLike {
    fn dim(&self) -> usize;

    /// Entry `i`; panics if `i >= dim()`
    fn at(&self, i: usize) -> &Rational;

    fn get(&self, i: usize) -> Result<&Rational> {
        check_index(i, self.dim())?;
        Ok(self.at(i))
    }

    fn iter(&self) -> Entries<'_, Self> {
        Entries { vector: self, next: 0 }
    }

    /// Detached copy
    fn to_vector(&self) -> Vector {
        Vector::from(self.iter().cloned().collect::<Vec<_>>())
    }

    fn dot<W: VectorLike + ?Sized>(&self, other: &W) -> Result<Rational> {
        check_dim(self.dim(), other.dim())?;
        let mut sum = Rational::zero();
        for (a, b) in self.iter().zip(other.iter()) {
            if !a.is_zero() && !b.is_zero() {
                sum += &(a * b);
            }
        }
        Ok(sum)
    }

    /// Squared Euclidean length
    fn mag_sq(&self) -> Rational {
        self.iter().fold(Rational::zero(), |acc, x| &acc + &x.square())
    }

    fn is_zero(&self) -> bool {
        self.iter().all(Rational::is_zero)
    }

    fn add<W: VectorLike + ?Sized>(&self, other: &W) -> Result<Vector> {
        check_dim(self.dim(), other.dim())?;
        Ok(self.iter().zip(other.iter()).map(|(a, b)| a + b).collect())
    }

    fn sub<W: VectorLike + ?Sized>(&self, other: &W) -> Result<Vector> {
        check_dim(self.dim(), other.dim())?;
        Ok(self.iter().zip(other.iter()).map(|(a, b)| a - b).collect())
    }

    fn scale(&self, factor: &Rational) -> Vector {
        self.iter().map(|a| a * factor).collect()
    }

    fn neg(&self) -> Vector {
        self.iter().map(|a| -a).collect()
    }

    /// Entrywise equality with any other vector form
    fn equals<W: VectorLike + ?Sized>(&self, other: &W) -> bool {
        self.dim() == other.dim() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Write access shared by owning vectors and mutable views
pub trait VectorLikeMut: VectorLike {
    /// Mutable entry `i`; panics if `i >= dim()`
    fn at_mut(&mut self, i: usize) -> &mut Rational;

    fn set(&mut self, i: usize, value: Rational) -> Result<()> {
        check_index(i, self.dim())?;
        *self.at_mut(i) = value;
        Ok(())
    }

    /// Overwrite every entry with the entries of `other`
    fn assign<W: VectorLike + ?Sized>(&mut self, other: &W) -> Result<()> {
        check_dim(self.dim(), other.dim())?;
        for i in 0..self.dim() {
            *self.at_mut(i) = other.at(i).clone();
        }
        Ok(())
    }

    fn add_assign<W: VectorLike + ?Sized>(&mut self, other: &W) -> Result<()> {
        check_dim(self.dim(), other.dim())?;
        for i in 0..self.dim() {
            *self.at_mut(i) += other.at(i);
        }
        Ok(())
    }

    /// self -= factor * other
    fn sub_assign_scaled<W: VectorLike + ?Sized>(&mut self, other: &W, factor: &Rational) -> Result<()> {
        check_dim(self.dim(), other.dim())?;
        if factor.is_zero() {
            return Ok(());
        }
        for i in 0..self.dim() {
            let x = other.at(i);
            if !x.is_zero() {
                *self.at_mut(i) -= &(x * factor);
            }
        }
        Ok(())
    }

    fn scale_assign(&mut self, factor: &Rational) {
        for i in 0..self.dim() {
            let scaled = &*self.at_mut(i) * factor;
            *self.at_mut(i) = scaled;
        }
    }
}

/// Iterator over the entries of any [`VectorLike`]
pub struct Entries<'a, V: ?Sized> {
    vector: &'a V,
    next: usize,
}

impl<'a, V: VectorLike + ?Sized> Iterator for Entries<'a, V> {
    type Item = &'a Rational;

    fn next(&mut self) -> Option<&'a Rational> {
        if self.next >= self.vector.dim() {
            return None;
        }
        let item = self.vector.at(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.vector.dim().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Owning dense vector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Vector {
    entries: Vec<Rational>,
}

impl Vector {
    pub fn zeros(n: usize) -> Self {
        Self {
            entries: vec![Rational::zero(); n],
        }
    }

    /// Unit vector `e_i` of dimension `n`
    pub fn basis(n: usize, i: usize) -> Result<Self> {
        check_index(i, n)?;
        let mut v = Self::zeros(n);
        v.entries[i] = Rational::one();
        Ok(v)
    }

    pub fn from_ints<T: Into<num_bigint::BigInt> + Clone>(values: &[T]) -> Self {
        values.iter().map(|x| Rational::from_int(x.clone())).collect()
    }

    pub fn as_slice(&self) -> &[Rational] {
        &self.entries
    }

    pub fn into_inner(self) -> Vec<Rational> {
        self.entries
    }

    pub fn view(&self) -> VectorView<'_> {
        VectorView::new(&self.entries, 0, 1, self.entries.len())
    }

    pub fn view_mut(&mut self) -> VectorViewMut<'_> {
        let len = self.entries.len();
        VectorViewMut::new(&mut self.entries, 0, 1, len)
    }

    /// Strided view over the range `start..start + stride * len`
    pub fn slice(&self, start: usize, stride: usize, len: usize) -> Result<VectorView<'_>> {
        check_span(start, stride, len, self.entries.len())?;
        Ok(VectorView::new(&self.entries, start, stride, len))
    }

    pub fn slice_mut(&mut self, start: usize, stride: usize, len: usize) -> Result<VectorViewMut<'_>> {
        check_span(start, stride, len, self.entries.len())?;
        Ok(VectorViewMut::new(&mut self.entries, start, stride, len))
    }
}

fn check_span(start: usize, stride: usize, len: usize, total: usize) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    check_index(start + stride * (len - 1), total)
}

impl From<Vec<Rational>> for Vector {
    fn from(entries: Vec<Rational>) -> Self {
        Self { entries }
    }
}

impl FromIterator<Rational> for Vector {
    fn from_iter<I: IntoIterator<Item = Rational>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl VectorLike for Vector {
    fn dim(&self) -> usize {
        self.entries.len()
    }

    fn at(&self, i: usize) -> &Rational {
        &self.entries[i]
    }
}

impl VectorLikeMut for Vector {
    fn at_mut(&mut self, i: usize) -> &mut Rational {
        &mut self.entries[i]
    }
}

/// Read-only strided view into borrowed storage
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a> {
    data: &'a [Rational],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a> VectorView<'a> {
    pub(crate) fn new(data: &'a [Rational], offset: usize, stride: usize, len: usize) -> Self {
        Self { data, offset, stride, len }
    }

    /// Entry `i` with the lifetime of the backing storage
    pub fn entry(&self, i: usize) -> &'a Rational {
        assert!(i < self.len, "index {} out of range for vector of length {}", i, self.len);
        &self.data[self.offset + i * self.stride]
    }
}

impl VectorLike for VectorView<'_> {
    fn dim(&self) -> usize {
        self.len
    }

    fn at(&self, i: usize) -> &Rational {
        self.entry(i)
    }
}

/// Mutable strided view into borrowed storage
#[derive(Debug)]
pub struct VectorViewMut<'a> {
    data: &'a mut [Rational],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a> VectorViewMut<'a> {
    pub(crate) fn new(data: &'a mut [Rational], offset: usize, stride: usize, len: usize) -> Self {
        Self { data, offset, stride, len }
    }

    pub fn as_view(&self) -> VectorView<'_> {
        VectorView::new(&*self.data, self.offset, self.stride, self.len)
    }

    pub fn reborrow(&mut self) -> VectorViewMut<'_> {
        VectorViewMut::new(&mut *self.data, self.offset, self.stride, self.len)
    }
}

impl VectorLike for VectorViewMut<'_> {
    fn dim(&self) -> usize {
        self.len
    }

    fn at(&self, i: usize) -> &Rational {
        assert!(i < self.len, "index {} out of range for vector of length {}", i, self.len);
        &self.data[self.offset + i * self.stride]
    }
}

impl VectorLikeMut for VectorViewMut<'_> {
    fn at_mut(&mut self, i: usize) -> &mut Rational {
        assert!(i < self.len, "index {} out of range for vector of length {}", i, self.len);
        &mut self.data[self.offset + i * self.stride]
    }
}

impl Index<usize> for Vector {
    type Output = Rational;

    fn index(&self, i: usize) -> &Rational {
        self.at(i)
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, i: usize) -> &mut Rational {
        self.at_mut(i)
    }
}

impl Index<usize> for VectorView<'_> {
    type Output = Rational;

    fn index(&self, i: usize) -> &Rational {
        self.at(i)
    }
}

impl Index<usize> for VectorViewMut<'_> {
    type Output = Rational;

    fn index(&self, i: usize) -> &Rational {
        self.at(i)
    }
}

impl IndexMut<usize> for VectorViewMut<'_> {
    fn index_mut(&mut self, i: usize) -> &mut Rational {
        self.at_mut(i)
    }
}
