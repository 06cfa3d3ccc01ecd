//! `sm-matrix` - Saturating dense matrix multiplication with swappable
//! kernel backends.
//!
//! This crate provides:
//! - A `Matrix<T>` container for `i8`, `i16`, `i32` and `f32` elements
//! - The `Element` numeric policy: accumulator widening, saturation bounds,
//!   clamp frequency
//! - A `KernelBackend` trait describing the external kernel call contract
//! - `SoftwareKernels`, a pure-Rust implementation of that contract, and
//!   `NativeKernels` (feature `native`) binding the hand-tuned kernels
//! - A `Dispatcher` selecting between the reference algorithm and a backend
//!
//! ```
//! use sm_matrix::{Dispatcher, Matrix, Strategy, VectorWidth};
//!
//! let a = Matrix::from_vec(1, 1, vec![100i8]).unwrap();
//! let b = Matrix::from_vec(1, 1, vec![100i8]).unwrap();
//! let d = Dispatcher::software();
//!
//! let c = d.multiply(&a, &b, Strategy::Vectorized, VectorWidth::bits(64)).unwrap();
//! assert_eq!(c.get(0, 0).unwrap(), i8::MAX);
//! ```

pub mod backend;
pub mod cpu;
pub mod dispatch;
pub mod dtype;
pub mod element;
pub mod error;
pub mod matrix;
#[cfg(feature = "native")]
pub mod native;
pub mod strategy;

// Re-export primary types at the crate root for convenience.
pub use backend::{GemmCall, KernelBackend, SaturationBounds};
pub use cpu::SoftwareKernels;
pub use dispatch::{multiply, Dispatcher};
pub use dtype::DType;
pub use element::{clamp_frequency_for, Accumulator, Element};
pub use error::{MatrixError, Result};
pub use matrix::Matrix;
#[cfg(feature = "native")]
pub use native::NativeKernels;
pub use strategy::{Strategy, VectorWidth};
