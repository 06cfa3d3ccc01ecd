//! Register-lane kernel used by the software stand-in for the vectorized
//! strategy.
//!
//! Each output row is processed `lanes` columns at a time. A lane holds a
//! partial dot product in the narrow `T::Lane` type and is spilled into the
//! exact `T::Acc` total every `window` accumulation steps, which is where a
//! hand-written kernel would re-saturate its registers. A lane that would
//! overflow before its window closes is spilled early, so the result always
//! matches the scalar kernels exactly.

use crate::element::{Accumulator, Element};

/// Computes `out = A @ B` and returns the number of early spills.
///
/// `window` of `None` never spills before the end of the row; `Some(0)` is
/// treated as one.
#[allow(clippy::too_many_arguments)]
pub fn matmul_lanes<T, F>(
    a: &[T],
    b: &[T],
    out: &mut [T],
    m: usize,
    k: usize,
    n: usize,
    lanes: usize,
    window: Option<u32>,
    narrow: F,
) -> usize
where
    T: Element,
    F: Fn(T::Acc) -> T,
{
    let lanes = lanes.max(1);
    let window = window.map_or(usize::MAX, |w| (w as usize).max(1));
    let mut partial = vec![T::Lane::ZERO; lanes];
    let mut total = vec![T::Acc::ZERO; lanes];
    let mut early_spills = 0;

    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j0 in (0..n).step_by(lanes) {
            let width = lanes.min(n - j0);
            partial[..width].fill(T::Lane::ZERO);
            total[..width].fill(T::Acc::ZERO);

            for (p, &x) in a_row.iter().enumerate() {
                let x = x.to_lane();
                let b_chunk = &b[p * n + j0..p * n + j0 + width];
                for (l, &y) in b_chunk.iter().enumerate() {
                    let product = x * y.to_lane();
                    partial[l] = match partial[l].checked_add(product) {
                        Some(sum) => sum,
                        None => {
                            early_spills += 1;
                            total[l] = total[l] + T::spill(partial[l]);
                            product
                        }
                    };
                }
                if (p + 1) % window == 0 {
                    for l in 0..width {
                        total[l] = total[l] + T::spill(partial[l]);
                        partial[l] = T::Lane::ZERO;
                    }
                }
            }

            for l in 0..width {
                out[i * n + j0 + l] = narrow(total[l] + T::spill(partial[l]));
            }
        }
    }

    early_spills
}
