//! Bindings to the external hand-tuned kernels (feature `native`).
//!
//! The kernels are plain C-ABI functions taking raw row-major buffers and
//! `int` dimensions. They validate nothing, so every length and range check
//! happens on this side before the call. They also document no reentrancy,
//! so calls are serialized through one process-wide lock.

use std::os::raw::c_int;
use std::sync::{Mutex, MutexGuard};

use crate::backend::{GemmCall, KernelBackend, SaturationBounds};
use crate::error::{MatrixError, Result};
use crate::strategy::VectorWidth;

extern "C" {
    fn matmul_asm_naive_float(
        a: *const f32,
        b: *const f32,
        c: *mut f32,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
    );
    fn matmul_asm_vector_float(
        a: *const f32,
        b: *const f32,
        c: *mut f32,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        vlen: c_int,
    );
    fn matmul_asm_naive_int8(
        a: *const i8,
        b: *const i8,
        c: *mut i8,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
    );
    fn matmul_asm_vector_int8(
        a: *const i8,
        b: *const i8,
        c: *mut i8,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
        clamp_freq: c_int,
        vlen: c_int,
    );
    fn matmul_asm_naive_int16(
        a: *const i16,
        b: *const i16,
        c: *mut i16,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
    );
    fn matmul_asm_vector_int16(
        a: *const i16,
        b: *const i16,
        c: *mut i16,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
        clamp_freq: c_int,
        vlen: c_int,
    );
    fn matmul_asm_naive_int32(
        a: *const i32,
        b: *const i32,
        c: *mut i32,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
    );
    fn matmul_asm_vector_int32(
        a: *const i32,
        b: *const i32,
        c: *mut i32,
        a_rows: c_int,
        a_cols: c_int,
        b_cols: c_int,
        int_min: c_int,
        int_max: c_int,
        clamp_freq: c_int,
        vlen: c_int,
    );
}

static KERNEL_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    // The guarded data is `()`, a panic elsewhere cannot leave it inconsistent.
    KERNEL_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn c_int_of(name: &str, value: usize) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| {
        MatrixError::InvalidArgument(format!(
            "{} = {} does not fit the native kernel's int parameter",
            name, value
        ))
    })
}

/// `(a_rows, a_cols, b_cols)` as C ints.
fn dims<T>(call: &GemmCall<'_, T>) -> Result<(c_int, c_int, c_int)> {
    Ok((
        c_int_of("a_rows", call.m())?,
        c_int_of("a_cols", call.k())?,
        c_int_of("b_cols", call.n())?,
    ))
}

/// Unset widths are passed as 0.
fn vlen(width: VectorWidth) -> Result<c_int> {
    c_int_of("vlen", width.get().unwrap_or(0))
}

fn clamp_freq_of(freq: u32) -> Result<c_int> {
    c_int_of("clamp_freq", freq as usize)
}

/// Kernel backend calling the linked native kernels.
#[derive(Debug, Clone, Default)]
pub struct NativeKernels;

impl NativeKernels {
    pub fn new() -> Self {
        NativeKernels
    }
}

macro_rules! integer_ops {
    ($t:ty, $naive_op:ident, $vector_op:ident, $naive_sym:ident, $vector_sym:ident) => {
        fn $naive_op(&self, call: GemmCall<'_, $t>, bounds: SaturationBounds<$t>) -> Result<()> {
            let (m, k, n) = dims(&call)?;
            let (a, b, out) = call.split();
            let _guard = lock();
            // SAFETY: `GemmCall` guarantees a, b and out hold exactly m*k,
            // k*n and m*n elements; the borrows outlive the call.
            unsafe {
                $naive_sym(
                    a.as_ptr(),
                    b.as_ptr(),
                    out.as_mut_ptr(),
                    m,
                    k,
                    n,
                    c_int::from(bounds.min),
                    c_int::from(bounds.max),
                );
            }
            Ok(())
        }

        fn $vector_op(
            &self,
            call: GemmCall<'_, $t>,
            bounds: SaturationBounds<$t>,
            clamp_freq: u32,
            width: VectorWidth,
        ) -> Result<()> {
            let (m, k, n) = dims(&call)?;
            let freq = clamp_freq_of(clamp_freq)?;
            let vlen = vlen(width)?;
            let (a, b, out) = call.split();
            let _guard = lock();
            // SAFETY: as above.
            unsafe {
                $vector_sym(
                    a.as_ptr(),
                    b.as_ptr(),
                    out.as_mut_ptr(),
                    m,
                    k,
                    n,
                    c_int::from(bounds.min),
                    c_int::from(bounds.max),
                    freq,
                    vlen,
                );
            }
            Ok(())
        }
    };
}

impl KernelBackend for NativeKernels {
    fn name(&self) -> &str {
        "native"
    }

    fn naive_f32(&self, call: GemmCall<'_, f32>) -> Result<()> {
        let (m, k, n) = dims(&call)?;
        let (a, b, out) = call.split();
        let _guard = lock();
        // SAFETY: `GemmCall` guarantees the buffer lengths match m, k, n.
        unsafe { matmul_asm_naive_float(a.as_ptr(), b.as_ptr(), out.as_mut_ptr(), m, k, n) };
        Ok(())
    }

    fn vectorized_f32(&self, call: GemmCall<'_, f32>, width: VectorWidth) -> Result<()> {
        let (m, k, n) = dims(&call)?;
        let vlen = vlen(width)?;
        let (a, b, out) = call.split();
        let _guard = lock();
        // SAFETY: `GemmCall` guarantees the buffer lengths match m, k, n.
        unsafe {
            matmul_asm_vector_float(a.as_ptr(), b.as_ptr(), out.as_mut_ptr(), m, k, n, vlen)
        };
        Ok(())
    }

    integer_ops!(i8, naive_i8, vectorized_i8, matmul_asm_naive_int8, matmul_asm_vector_int8);
    integer_ops!(i16, naive_i16, vectorized_i16, matmul_asm_naive_int16, matmul_asm_vector_int16);
    integer_ops!(i32, naive_i32, vectorized_i32, matmul_asm_naive_int32, matmul_asm_vector_int32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_int_conversion() {
        assert_eq!(c_int_of("a_rows", 512).unwrap(), 512);
        assert!(matches!(
            c_int_of("a_rows", usize::MAX),
            Err(MatrixError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unset_width_is_zero() {
        assert_eq!(vlen(VectorWidth::UNSET).unwrap(), 0);
        assert_eq!(vlen(VectorWidth::bits(64)).unwrap(), 64);
    }
}
