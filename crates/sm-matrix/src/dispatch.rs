use crate::backend::{run_kernel, GemmCall, KernelBackend};
use crate::cpu::{matmul_reference, SoftwareKernels};
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;
use crate::strategy::{Strategy, VectorWidth};

/// Routes a multiplication to the reference algorithm or to a kernel
/// backend.
///
/// Holds no state besides the backend; every call is independent.
#[derive(Debug)]
pub struct Dispatcher {
    backend: Box<dyn KernelBackend>,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn KernelBackend>) -> Self {
        log::debug!("selected kernel backend: {}", backend.name());
        Dispatcher { backend }
    }

    /// Dispatcher over the pure-Rust [`SoftwareKernels`].
    pub fn software() -> Self {
        Self::new(Box::new(SoftwareKernels::new()))
    }

    /// Dispatcher over the linked native kernels.
    #[cfg(feature = "native")]
    pub fn native() -> Self {
        Self::new(Box::new(crate::native::NativeKernels::new()))
    }

    pub fn backend(&self) -> &dyn KernelBackend {
        self.backend.as_ref()
    }

    /// Multiply `a` (`m x k`) by `b` (`k x n`) into a new `m x n` matrix.
    ///
    /// `width` only affects [`Strategy::Vectorized`].
    ///
    /// # Errors
    /// - `DimensionMismatch` if `a.cols() != b.rows()`.
    /// - `UnsupportedType` if the backend has no kernel for `T` and
    ///   `strategy`.
    pub fn multiply<T: Element>(
        &self,
        a: &Matrix<T>,
        b: &Matrix<T>,
        strategy: Strategy,
        width: VectorWidth,
    ) -> Result<Matrix<T>> {
        let (m, k, n) = product_dims(a, b)?;

        log::debug!(
            "matmul [{}x{}] @ [{}x{}] {} via {} ({}, width {})",
            m,
            k,
            k,
            n,
            T::DTYPE,
            strategy,
            self.backend.name(),
            width
        );

        let mut out = Matrix::new(m, n)?;
        match strategy {
            Strategy::Reference => {
                matmul_reference(a.as_slice(), b.as_slice(), out.as_mut_slice(), m, k, n);
            }
            Strategy::Naive | Strategy::Vectorized => {
                let call = GemmCall::new(a.as_slice(), b.as_slice(), out.as_mut_slice(), m, k, n)?;
                run_kernel(self.backend.as_ref(), strategy, call, width)?;
            }
        }
        Ok(out)
    }
}

impl Default for Dispatcher {
    /// Native kernels when they are linked in, software kernels otherwise.
    fn default() -> Self {
        #[cfg(feature = "native")]
        {
            Self::native()
        }
        #[cfg(not(feature = "native"))]
        {
            Self::software()
        }
    }
}

/// `(m, k, n)` of `a @ b`, or `DimensionMismatch`.
fn product_dims<T: Element>(a: &Matrix<T>, b: &Matrix<T>) -> Result<(usize, usize, usize)> {
    let (m, k) = a.shape();
    let (k2, n) = b.shape();
    if k != k2 {
        return Err(MatrixError::DimensionMismatch { m, k, k2, n });
    }
    Ok((m, k, n))
}

/// Reference product of `a` and `b`, needing no backend.
pub fn multiply<T: Element>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
    let (m, k, n) = product_dims(a, b)?;
    let mut out = Matrix::new(m, n)?;
    matmul_reference(a.as_slice(), b.as_slice(), out.as_mut_slice(), m, k, n);
    Ok(out)
}
