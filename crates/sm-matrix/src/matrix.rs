use std::fmt;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::dispatch::Dispatcher;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::strategy::{Strategy, VectorWidth};

/// A dense, row-major 2D matrix of one element type.
///
/// The shape is fixed at construction and the matrix exclusively owns its
/// buffer. Element `(r, c)` lives at `data[r * cols + c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Validates a shape and returns its element count.
fn checked_len<T>(rows: usize, cols: usize) -> Result<usize> {
    if rows == 0 || cols == 0 {
        return Err(MatrixError::InvalidArgument(format!(
            "matrix dimensions must be non-zero, got {}x{}",
            rows, cols
        )));
    }
    let len = rows
        .checked_mul(cols)
        .filter(|len| {
            len.checked_mul(std::mem::size_of::<T>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            MatrixError::InvalidArgument(format!(
                "matrix dimensions {}x{} exceed the addressable length",
                rows, cols
            ))
        })?;
    Ok(len)
}

impl<T: Element> Matrix<T> {
    /// Create a zero-filled `rows x cols` matrix.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either dimension is zero or the element
    /// count does not fit in memory.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let len = checked_len::<T>(rows, cols)?;
        Ok(Matrix {
            rows,
            cols,
            data: vec![T::ZERO; len],
        })
    }

    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `data.len() != rows * cols` or the shape
    /// itself is invalid.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let len = checked_len::<T>(rows, cols)?;
        if data.len() != len {
            return Err(MatrixError::InvalidArgument(format!(
                "data length {} does not match matrix dimensions {}x{} (expected {})",
                data.len(),
                rows,
                cols,
                len
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Create a matrix by copying row-major data out of a slice.
    pub fn from_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        Self::from_vec(rows, cols, data.to_vec())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of elements, `rows * cols`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: a matrix has at least one row and one column.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major view of the whole buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::OutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    /// # Errors
    /// Returns `OutOfRange` if `row >= rows()` or `col >= cols()`.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let idx = self.index(row, col)?;
        Ok(self.data[idx])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Result<&mut T> {
        let idx = self.index(row, col)?;
        Ok(&mut self.data[idx])
    }

    /// # Errors
    /// Returns `OutOfRange` if `row >= rows()` or `col >= cols()`.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let idx = self.index(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Fill with independent draws from `[min, max]` using the thread-local
    /// RNG. Reversed bounds are swapped.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for floating point bounds that are not
    /// finite or whose span is not finite.
    pub fn randomize(&mut self, min: T, max: T) -> Result<()> {
        self.randomize_with(&mut rand::thread_rng(), min, max)
    }

    /// [`randomize`](Self::randomize) over the type's default range.
    pub fn randomize_default(&mut self) -> Result<()> {
        let (min, max) = T::RANDOM_RANGE;
        self.randomize(min, max)
    }

    /// Fill with independent draws from `[min, max]` taken from `rng`.
    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R, min: T, max: T) -> Result<()> {
        let (low, high) = if max < min { (max, min) } else { (min, max) };
        if !T::valid_range(low, high) {
            return Err(MatrixError::InvalidArgument(format!(
                "cannot draw uniformly from [{}, {}]",
                min, max
            )));
        }
        let dist = Uniform::new_inclusive(low, high);
        for value in self.data.iter_mut() {
            *value = dist.sample(rng);
        }
        Ok(())
    }

    /// [`randomize_with`](Self::randomize_with) over the type's default range.
    pub fn randomize_default_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let (min, max) = T::RANDOM_RANGE;
        self.randomize_with(rng, min, max)
    }

    /// Same shape and every pair of elements within `epsilon` of each other.
    /// Integer types ignore `epsilon` and compare exactly.
    pub fn equals(&self, other: &Matrix<T>, epsilon: T) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| a.approx_eq(b, epsilon))
    }

    /// [`equals`](Self::equals) with the type's default epsilon.
    pub fn equals_default(&self, other: &Matrix<T>) -> bool {
        self.equals(other, T::DEFAULT_EPSILON)
    }

    /// Multiply `self` (`m x k`) by `other` (`k x n`) with the given strategy.
    ///
    /// Neither operand is modified; the `m x n` product is a new matrix.
    /// `width` only affects [`Strategy::Vectorized`].
    pub fn matmul(
        &self,
        other: &Matrix<T>,
        dispatcher: &Dispatcher,
        strategy: Strategy,
        width: VectorWidth,
    ) -> Result<Matrix<T>> {
        dispatcher.multiply(self, other, strategy, width)
    }
}

impl<T: Element> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}:", self.rows, self.cols)?;
        for row in self.data.chunks(self.cols) {
            write!(f, "  ")?;
            for &value in row {
                value.write_cell(f)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
