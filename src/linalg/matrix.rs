//! Column-major dense matrix
//!
//! Element (r, c) lives at `r + c * rows`, the same Fortran ordering LAPACK
//! expects. The buffer length always equals `rows * cols`.

use std::ops::{Index, IndexMut};

use num_traits::{Float, Zero};

use super::scalar::Scalar;
use crate::error::{ReconError, Result};

/// Which triangle of a square matrix a kernel reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uplo {
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Index into a column-major matrix
#[inline(always)]
pub fn idx2d(r: usize, c: usize, rows: usize) -> usize {
    r + c * rows
}

impl<T: Scalar> DenseMatrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![T::zero(); rows * cols] }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[idx2d(i, i, n)] = T::one();
        }
        m
    }

    /// Wrap an existing column-major buffer
    pub fn from_col_major(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ReconError::mismatch(
                "from_col_major",
                format!("buffer has {} elements, shape {}x{} needs {}", data.len(), rows, cols, rows * cols),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows, convenient for literals in tests and fixtures
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut m = Self::zeros(n_rows, n_cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(ReconError::mismatch(
                    "from_rows",
                    format!("row {} has {} entries, expected {}", r, row.len(), n_cols),
                ));
            }
            for (c, &v) in row.iter().enumerate() {
                m.data[idx2d(r, c, n_rows)] = v;
            }
        }
        Ok(m)
    }

    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for c in 0..cols {
            for r in 0..rows {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn col(&self, c: usize) -> &[T] {
        &self.data[c * self.rows..(c + 1) * self.rows]
    }

    pub fn col_mut(&mut self, c: usize) -> &mut [T] {
        &mut self.data[c * self.rows..(c + 1) * self.rows]
    }

    /// Reallocate to a new shape if it differs; contents are zeroed on reallocation
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if self.rows != rows || self.cols != cols {
            self.rows = rows;
            self.cols = cols;
            self.data = vec![T::zero(); rows * cols];
        }
    }

    pub fn fill(&mut self, v: T) {
        self.data.iter_mut().for_each(|x| *x = v);
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self[(c, r)])
    }

    pub fn conj_transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self[(c, r)].conj())
    }

    /// Copy of the leading `rows` rows
    pub fn top_rows(&self, rows: usize) -> Result<Self> {
        if rows > self.rows {
            return Err(ReconError::mismatch(
                "top_rows",
                format!("requested {} rows from a matrix with {}", rows, self.rows),
            ));
        }
        Ok(Self::from_fn(rows, self.cols, |r, c| self[(r, c)]))
    }

    /// Overwrite the triangle opposite to `keep` (diagonal excluded) with `v`
    pub fn clear_opposite_triangle(&mut self, keep: Uplo, v: T) {
        let n = self.rows;
        for c in 0..self.cols {
            for r in 0..n {
                let opposite = match keep {
                    Uplo::Lower => r < c,
                    Uplo::Upper => r > c,
                };
                if opposite {
                    self.data[idx2d(r, c, n)] = v;
                }
            }
        }
    }

    /// Fill the opposite triangle from the conjugate of `source`, making the matrix Hermitian
    pub fn hermitian_from(&mut self, source: Uplo) {
        let n = self.rows.min(self.cols);
        for c in 0..n {
            for r in (c + 1)..n {
                match source {
                    Uplo::Lower => self.data[idx2d(c, r, self.rows)] = self.data[idx2d(r, c, self.rows)].conj(),
                    Uplo::Upper => self.data[idx2d(r, c, self.rows)] = self.data[idx2d(c, r, self.rows)].conj(),
                }
            }
        }
    }

    pub fn frobenius_norm(&self) -> T::Real {
        let mut sum = T::Real::zero();
        for &v in &self.data {
            sum += v.modulus_sqr();
        }
        sum.sqrt()
    }

    /// Largest elementwise |self - other|, `None` when the shapes differ
    pub fn max_abs_diff(&self, other: &Self) -> Option<T::Real> {
        if self.shape() != other.shape() {
            return None;
        }
        let mut worst = T::Real::zero();
        for (&a, &b) in self.data.iter().zip(other.data.iter()) {
            let d = (a - b).modulus();
            if d > worst {
                worst = d;
            }
        }
        Some(worst)
    }

    /// Elementwise conversion into another scalar type
    pub fn map<U: Scalar, F: Fn(T) -> U>(&self, f: F) -> DenseMatrix<U> {
        DenseMatrix { rows: self.rows, cols: self.cols, data: self.data.iter().map(|&v| f(v)).collect() }
    }
}

impl<T: Scalar> Default for DenseMatrix<T> {
    fn default() -> Self {
        Self::zeros(0, 0)
    }
}

impl<T> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &T {
        &self.data[idx2d(r, c, self.rows)]
    }
}

impl<T> IndexMut<(usize, usize)> for DenseMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        &mut self.data[idx2d(r, c, self.rows)]
    }
}
