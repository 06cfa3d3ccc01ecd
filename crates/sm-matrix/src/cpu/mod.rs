pub mod lanes;
pub mod matmul;

use crate::backend::{GemmCall, KernelBackend, SaturationBounds};
use crate::element::Element;
use crate::error::Result;
use crate::strategy::VectorWidth;

pub use matmul::matmul_reference;

/// Register width assumed when the caller gives no vector width hint.
pub const DEFAULT_VECTOR_BITS: usize = 128;

/// Pure-Rust kernel backend.
///
/// Provides every operation of the kernel contract with straightforward
/// loops. It stands in for the hand-tuned kernels wherever they are not
/// linked, and honors the same contract: the naive operations narrow through
/// the bounds they are given, the vectorized ones additionally respect the
/// clamp frequency and vector width.
#[derive(Debug, Clone, Default)]
pub struct SoftwareKernels;

impl SoftwareKernels {
    pub fn new() -> Self {
        SoftwareKernels
    }
}

fn naive<T: Element>(call: GemmCall<'_, T>, bounds: SaturationBounds<T>) -> Result<()> {
    let (m, k, n) = (call.m(), call.k(), call.n());
    let (a, b, out) = call.split();
    matmul::matmul_scalar(a, b, out, m, k, n, |acc| T::clamp_to(acc, bounds));
    Ok(())
}

fn vectorized<T: Element>(
    call: GemmCall<'_, T>,
    bounds: SaturationBounds<T>,
    clamp_freq: Option<u32>,
    width: VectorWidth,
) -> Result<()> {
    let (m, k, n) = (call.m(), call.k(), call.n());
    let lanes = width.lanes(T::DTYPE.bits(), DEFAULT_VECTOR_BITS);
    let (a, b, out) = call.split();
    let early = lanes::matmul_lanes(a, b, out, m, k, n, lanes, clamp_freq, |acc| {
        T::clamp_to(acc, bounds)
    });
    if early > 0 {
        log::trace!(
            "{} lane kernel spilled {} lanes before their clamp window closed ({}x{}x{}, window {:?})",
            T::DTYPE,
            early,
            m,
            k,
            n,
            clamp_freq
        );
    }
    Ok(())
}

impl KernelBackend for SoftwareKernels {
    fn name(&self) -> &str {
        "software"
    }

    fn naive_f32(&self, call: GemmCall<'_, f32>) -> Result<()> {
        naive(call, SaturationBounds::new(f32::MIN, f32::MAX))
    }

    fn vectorized_f32(&self, call: GemmCall<'_, f32>, width: VectorWidth) -> Result<()> {
        vectorized(call, SaturationBounds::new(f32::MIN, f32::MAX), None, width)
    }

    fn naive_i8(&self, call: GemmCall<'_, i8>, bounds: SaturationBounds<i8>) -> Result<()> {
        naive(call, bounds)
    }

    fn vectorized_i8(
        &self,
        call: GemmCall<'_, i8>,
        bounds: SaturationBounds<i8>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        vectorized(call, bounds, Some(clamp_freq), width)
    }

    fn naive_i16(&self, call: GemmCall<'_, i16>, bounds: SaturationBounds<i16>) -> Result<()> {
        naive(call, bounds)
    }

    fn vectorized_i16(
        &self,
        call: GemmCall<'_, i16>,
        bounds: SaturationBounds<i16>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        vectorized(call, bounds, Some(clamp_freq), width)
    }

    fn naive_i32(&self, call: GemmCall<'_, i32>, bounds: SaturationBounds<i32>) -> Result<()> {
        naive(call, bounds)
    }

    fn vectorized_i32(
        &self,
        call: GemmCall<'_, i32>,
        bounds: SaturationBounds<i32>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        vectorized(call, bounds, Some(clamp_freq), width)
    }
}
