use std::fmt::Debug;

use crate::dtype::DType;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::strategy::{Strategy, VectorWidth};

/// Inclusive range an integer kernel narrows its accumulators into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaturationBounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> SaturationBounds<T> {
    pub fn new(min: T, max: T) -> Self {
        SaturationBounds { min, max }
    }
}

/// Operands of one kernel invocation.
///
/// All three buffers are row-major and tightly packed: `a` is `m x k`, `b`
/// is `k x n` and `out` is `m x n`. The borrows end when the kernel returns,
/// so no backend can hold on to a buffer past the call.
#[derive(Debug)]
pub struct GemmCall<'a, T> {
    a: &'a [T],
    b: &'a [T],
    out: &'a mut [T],
    m: usize,
    k: usize,
    n: usize,
}

impl<'a, T> GemmCall<'a, T> {
    /// # Errors
    /// Returns `InvalidArgument` if a buffer length disagrees with the
    /// dimensions.
    pub fn new(
        a: &'a [T],
        b: &'a [T],
        out: &'a mut [T],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<Self> {
        check_len("a", a.len(), m, k)?;
        check_len("b", b.len(), k, n)?;
        check_len("out", out.len(), m, n)?;
        Ok(GemmCall { a, b, out, m, k, n })
    }

    pub fn a(&self) -> &[T] {
        self.a
    }

    pub fn b(&self) -> &[T] {
        self.b
    }

    pub fn out(&mut self) -> &mut [T] {
        &mut *self.out
    }

    /// Rows of A and of the output.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Columns of A, rows of B.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Columns of B and of the output.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Splits the call into its inputs and its output buffer.
    pub fn split(self) -> (&'a [T], &'a [T], &'a mut [T]) {
        (self.a, self.b, self.out)
    }
}

fn check_len(name: &str, len: usize, rows: usize, cols: usize) -> Result<()> {
    match rows.checked_mul(cols) {
        Some(expected) if expected == len => Ok(()),
        _ => Err(MatrixError::InvalidArgument(format!(
            "{}: buffer holds {} elements but expected {}x{}",
            name, len, rows, cols
        ))),
    }
}

/// The call contract between the dispatch layer and a set of matrix kernels.
///
/// One operation per element type and strategy. Integer operations receive
/// the bounds to saturate into; vectorized integer operations also receive
/// the number of accumulation steps they may run between two saturation
/// checks. Operations a backend does not provide keep the default, which
/// reports `UnsupportedType`.
pub trait KernelBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "software", "native").
    fn name(&self) -> &str;

    fn naive_f32(&self, _call: GemmCall<'_, f32>) -> Result<()> {
        Err(self.unsupported(DType::F32, Strategy::Naive))
    }

    fn vectorized_f32(&self, _call: GemmCall<'_, f32>, _width: VectorWidth) -> Result<()> {
        Err(self.unsupported(DType::F32, Strategy::Vectorized))
    }

    fn naive_i8(&self, _call: GemmCall<'_, i8>, _bounds: SaturationBounds<i8>) -> Result<()> {
        Err(self.unsupported(DType::I8, Strategy::Naive))
    }

    fn vectorized_i8(
        &self,
        _call: GemmCall<'_, i8>,
        _bounds: SaturationBounds<i8>,
        _clamp_freq: u32,
        _width: VectorWidth,
    ) -> Result<()> {
        Err(self.unsupported(DType::I8, Strategy::Vectorized))
    }

    fn naive_i16(&self, _call: GemmCall<'_, i16>, _bounds: SaturationBounds<i16>) -> Result<()> {
        Err(self.unsupported(DType::I16, Strategy::Naive))
    }

    fn vectorized_i16(
        &self,
        _call: GemmCall<'_, i16>,
        _bounds: SaturationBounds<i16>,
        _clamp_freq: u32,
        _width: VectorWidth,
    ) -> Result<()> {
        Err(self.unsupported(DType::I16, Strategy::Vectorized))
    }

    fn naive_i32(&self, _call: GemmCall<'_, i32>, _bounds: SaturationBounds<i32>) -> Result<()> {
        Err(self.unsupported(DType::I32, Strategy::Naive))
    }

    fn vectorized_i32(
        &self,
        _call: GemmCall<'_, i32>,
        _bounds: SaturationBounds<i32>,
        _clamp_freq: u32,
        _width: VectorWidth,
    ) -> Result<()> {
        Err(self.unsupported(DType::I32, Strategy::Vectorized))
    }

    /// The error returned for an operation this backend does not provide.
    fn unsupported(&self, dtype: DType, strategy: Strategy) -> MatrixError {
        MatrixError::UnsupportedType {
            dtype,
            strategy,
            backend: self.name().to_string(),
        }
    }
}

/// Runs `strategy` for element type `T` on `backend`.
pub fn run_kernel<T: Element>(
    backend: &dyn KernelBackend,
    strategy: Strategy,
    call: GemmCall<'_, T>,
    width: VectorWidth,
) -> Result<()> {
    T::run_kernel(backend, strategy, call, width)
}
