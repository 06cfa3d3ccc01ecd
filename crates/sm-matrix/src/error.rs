use thiserror::Error;

use crate::dtype::DType;
use crate::strategy::Strategy;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    DimensionMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("backend '{backend}' has no {strategy} kernel for {dtype}")]
    UnsupportedType {
        dtype: DType,
        strategy: Strategy,
        backend: String,
    },
}

pub type Result<T> = std::result::Result<T, MatrixError>;
