//! Per-element-type numeric policy.
//!
//! Everything that differs between `i8`, `i16`, `i32` and `f32` lives behind
//! the [`Element`] trait: the accumulator used for exact dot products, the
//! saturation bounds applied when narrowing back to the element type, the
//! default comparison epsilon and random range, and how often a vectorized
//! kernel must re-check its register-width lanes. The trait is sealed; the
//! set of element types is closed.

use std::fmt::{self, Debug, Display};
use std::ops::{Add, Mul};

use rand::distributions::uniform::SampleUniform;

use crate::backend::{GemmCall, KernelBackend, SaturationBounds};
use crate::dtype::DType;
use crate::error::{MatrixError, Result};
use crate::strategy::{Strategy, VectorWidth};

mod private {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Arithmetic needed from a running sum.
pub trait Accumulator:
    Copy + Debug + PartialOrd + Add<Output = Self> + Mul<Output = Self> + Send + Sync
{
    const ZERO: Self;

    /// `None` when the sum is not representable. Floating point never
    /// reports overflow; it rounds to infinity instead.
    fn checked_add(self, rhs: Self) -> Option<Self>;
}

macro_rules! integer_accumulator {
    ($($t:ty),*) => {$(
        impl Accumulator for $t {
            const ZERO: Self = 0;

            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$t>::checked_add(self, rhs)
            }
        }
    )*};
}

integer_accumulator!(i32, i64, i128);

impl Accumulator for f32 {
    const ZERO: Self = 0.0;

    fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(self + rhs)
    }
}

/// Number of accumulation steps a vectorized kernel may run between two
/// saturation checks, for an output whose larger dimension is `max_dim`.
///
/// `shifts` holds `log2` of the frequency for outputs up to 32, up to 128,
/// up to 256 and above 256 wide, in that order.
pub fn clamp_frequency_for(shifts: [u32; 4], max_dim: usize) -> u32 {
    let band = match max_dim {
        0..=32 => 0,
        33..=128 => 1,
        129..=256 => 2,
        _ => 3,
    };
    1 << shifts[band]
}

/// A matrix element type together with its numeric policy.
pub trait Element:
    private::Sealed
    + Copy
    + Debug
    + Display
    + Default
    + PartialEq
    + PartialOrd
    + SampleUniform
    + Send
    + Sync
    + 'static
{
    const DTYPE: DType;

    /// Exact accumulator for reference dot products.
    type Acc: Accumulator;

    /// Register-width accumulator a vector lane holds between checks. Always
    /// wide enough for a single product of two elements.
    type Lane: Accumulator;

    const MIN: Self;
    const MAX: Self;
    const ZERO: Self;

    /// Tolerance used by [`Matrix::equals_default`](crate::Matrix::equals_default).
    const DEFAULT_EPSILON: Self;

    /// Range drawn from by [`Matrix::randomize_default`](crate::Matrix::randomize_default).
    const RANDOM_RANGE: (Self, Self);

    /// Per size band `log2` clamp frequencies (see [`clamp_frequency_for`]),
    /// `None` for types that never saturate.
    const CLAMP_SHIFTS: Option<[u32; 4]>;

    fn widen(self) -> Self::Acc;

    /// Narrows an accumulated value into `[bounds.min, bounds.max]`.
    fn clamp_to(acc: Self::Acc, bounds: SaturationBounds<Self>) -> Self;

    /// Narrows an accumulated value through the type's own saturation
    /// bounds. Floating point is stored as computed.
    fn saturate(acc: Self::Acc) -> Self;

    fn to_lane(self) -> Self::Lane;

    /// Moves a lane's partial sum into the exact accumulator.
    fn spill(lane: Self::Lane) -> Self::Acc;

    /// Exact equality for integers, `|a - b| <= epsilon` for floating point.
    fn approx_eq(self, other: Self, epsilon: Self) -> bool;

    /// Returns false when `[low, high]` cannot back a uniform distribution.
    fn valid_range(low: Self, high: Self) -> bool;

    /// Writes one right-aligned cell of a matrix listing.
    fn write_cell(self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Invokes the backend operation matching `strategy` for this element
    /// type, supplying the bounds and clamp frequency this policy derives.
    fn run_kernel(
        backend: &dyn KernelBackend,
        strategy: Strategy,
        call: GemmCall<'_, Self>,
        width: VectorWidth,
    ) -> Result<()>;

    fn saturation_bounds() -> Option<SaturationBounds<Self>> {
        if Self::DTYPE.is_integer() {
            Some(SaturationBounds::new(Self::MIN, Self::MAX))
        } else {
            None
        }
    }

    /// See [`clamp_frequency_for`].
    fn clamp_frequency(max_dim: usize) -> Option<u32> {
        Self::CLAMP_SHIFTS.map(|shifts| clamp_frequency_for(shifts, max_dim))
    }
}

/// Bounds and clamp frequency an integer kernel receives for an output whose
/// larger dimension is `max_dim`.
fn integer_policy<T: Element>(max_dim: usize) -> Result<(SaturationBounds<T>, u32)> {
    match (T::saturation_bounds(), T::clamp_frequency(max_dim)) {
        (Some(bounds), Some(freq)) => Ok((bounds, freq)),
        _ => Err(MatrixError::InvalidArgument(format!(
            "{} has no saturation policy",
            T::DTYPE
        ))),
    }
}

fn reference_has_no_kernel(dtype: DType) -> MatrixError {
    MatrixError::InvalidArgument(format!(
        "the reference strategy for {} is computed in place, not by a kernel",
        dtype
    ))
}

macro_rules! integer_element {
    (
        $t:ty, $dtype:expr, acc = $acc:ty, lane = $lane:ty,
        random = ($lo:expr, $hi:expr), shifts = $shifts:expr,
        naive = $naive:ident, vectorized = $vectorized:ident
    ) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;
            type Acc = $acc;
            type Lane = $lane;
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
            const ZERO: Self = 0;
            const DEFAULT_EPSILON: Self = 0;
            const RANDOM_RANGE: (Self, Self) = ($lo, $hi);
            const CLAMP_SHIFTS: Option<[u32; 4]> = Some($shifts);

            fn widen(self) -> $acc {
                <$acc>::from(self)
            }

            fn clamp_to(acc: $acc, bounds: SaturationBounds<Self>) -> Self {
                if acc > <$acc>::from(bounds.max) {
                    bounds.max
                } else if acc < <$acc>::from(bounds.min) {
                    bounds.min
                } else {
                    acc as $t
                }
            }

            fn saturate(acc: $acc) -> Self {
                Self::clamp_to(acc, SaturationBounds::new(Self::MIN, Self::MAX))
            }

            fn to_lane(self) -> $lane {
                <$lane>::from(self)
            }

            fn spill(lane: $lane) -> $acc {
                <$acc>::from(lane)
            }

            fn approx_eq(self, other: Self, _epsilon: Self) -> bool {
                self == other
            }

            fn valid_range(_low: Self, _high: Self) -> bool {
                true
            }

            fn write_cell(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:>6} ", self)
            }

            fn run_kernel(
                backend: &dyn KernelBackend,
                strategy: Strategy,
                call: GemmCall<'_, Self>,
                width: VectorWidth,
            ) -> Result<()> {
                let (bounds, freq) = integer_policy::<Self>(call.m().max(call.n()))?;
                match strategy {
                    Strategy::Naive => backend.$naive(call, bounds),
                    Strategy::Vectorized => backend.$vectorized(call, bounds, freq, width),
                    Strategy::Reference => Err(reference_has_no_kernel($dtype)),
                }
            }
        }
    };
}

// Accumulators hold the sum of any addressable number of worst-case
// products. Lanes only need to hold one product; the clamp frequency bounds
// how many they hold at once.
integer_element!(
    i8, DType::I8, acc = i64, lane = i32,
    random = (-127, 127), shifts = [2, 4, 6, 7],
    naive = naive_i8, vectorized = vectorized_i8
);
integer_element!(
    i16, DType::I16, acc = i64, lane = i32,
    random = (-255, 255), shifts = [4, 6, 8, 9],
    naive = naive_i16, vectorized = vectorized_i16
);
integer_element!(
    i32, DType::I32, acc = i128, lane = i64,
    random = (-32767, 32767), shifts = [10, 12, 14, 16],
    naive = naive_i32, vectorized = vectorized_i32
);

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    type Acc = f32;
    type Lane = f32;
    const MIN: Self = f32::MIN;
    const MAX: Self = f32::MAX;
    const ZERO: Self = 0.0;
    const DEFAULT_EPSILON: Self = 1e-5;
    const RANDOM_RANGE: (Self, Self) = (-1.0, 1.0);
    const CLAMP_SHIFTS: Option<[u32; 4]> = None;

    fn widen(self) -> f32 {
        self
    }

    fn clamp_to(acc: f32, _bounds: SaturationBounds<Self>) -> Self {
        acc
    }

    fn saturate(acc: f32) -> Self {
        acc
    }

    fn to_lane(self) -> f32 {
        self
    }

    fn spill(lane: f32) -> f32 {
        lane
    }

    fn approx_eq(self, other: Self, epsilon: Self) -> bool {
        // Infinities produced by overflow compare equal to themselves.
        self == other || (self - other).abs() <= epsilon
    }

    fn valid_range(low: Self, high: Self) -> bool {
        low.is_finite() && high.is_finite() && (high - low).is_finite()
    }

    fn write_cell(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>9.4} ", self)
    }

    fn run_kernel(
        backend: &dyn KernelBackend,
        strategy: Strategy,
        call: GemmCall<'_, Self>,
        width: VectorWidth,
    ) -> Result<()> {
        match strategy {
            Strategy::Naive => backend.naive_f32(call),
            Strategy::Vectorized => backend.vectorized_f32(call, width),
            Strategy::Reference => Err(reference_has_no_kernel(DType::F32)),
        }
    }
}
