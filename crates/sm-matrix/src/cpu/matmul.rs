//! Scalar triple-loop kernels.

use crate::element::{Accumulator, Element};

/// `out = A @ B` with every dot product accumulated exactly in `T::Acc` and
/// narrowed by `narrow`.
///
/// `a` is `m x k`, `b` is `k x n` and `out` is `m x n`, all row-major.
pub fn matmul_scalar<T, F>(a: &[T], b: &[T], out: &mut [T], m: usize, k: usize, n: usize, narrow: F)
where
    T: Element,
    F: Fn(T::Acc) -> T,
{
    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let mut sum = T::Acc::ZERO;
            for (p, &x) in a_row.iter().enumerate() {
                sum = sum + x.widen() * b[p * n + j].widen();
            }
            out[i * n + j] = narrow(sum);
        }
    }
}

/// The portable ground-truth product: exact accumulation followed by the
/// type's own saturating narrowing.
pub fn matmul_reference<T: Element>(a: &[T], b: &[T], out: &mut [T], m: usize, k: usize, n: usize) {
    matmul_scalar(a, b, out, m, k, n, T::saturate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SaturationBounds;

    #[test]
    fn test_reference_basic() {
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let mut c = [0i32; 4];
        matmul_reference(&[1, 2, 3, 4], &[5, 6, 7, 8], &mut c, 2, 2, 2);
        assert_eq!(c, [19, 22, 43, 50]);
    }

    #[test]
    fn test_reference_identity_f32() {
        let a = [1.0f32, 0.0, 0.0, 1.0];
        let x = [1.5f32, -2.0, 3.25, 4.0];
        let mut c = [0.0f32; 4];
        matmul_reference(&a, &x, &mut c, 2, 2, 2);
        assert_eq!(c, x);
    }

    #[test]
    fn test_reference_saturates_only_at_the_end() {
        // 100*100 + 100*(-100) = 0, even though the first product alone
        // is far outside i8.
        let mut c = [0i8; 1];
        matmul_reference(&[100, 100], &[100, -100], &mut c, 1, 2, 1);
        assert_eq!(c, [0]);
    }

    #[test]
    fn test_scalar_with_custom_bounds() {
        let bounds = SaturationBounds::new(-50i16, 50i16);
        let mut c = [0i16; 2];
        matmul_scalar(&[10, 10], &[3, -3, 4, -4], &mut c, 1, 2, 2, |acc| {
            i16::clamp_to(acc, bounds)
        });
        assert_eq!(c, [50, -50]);
    }
}
