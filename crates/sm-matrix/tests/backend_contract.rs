//! What the dispatch layer hands to a kernel backend: dimensions, saturation
//! bounds, clamp frequency and vector width.

use std::sync::{Arc, Mutex};

use sm_matrix::{
    DType, Dispatcher, Element, GemmCall, KernelBackend, Matrix, Result, SaturationBounds,
    Strategy, VectorWidth,
};

#[derive(Debug, Clone, PartialEq)]
struct Received {
    dtype: DType,
    strategy: Strategy,
    dims: (usize, usize, usize),
    bounds: Option<(i64, i64)>,
    clamp_freq: Option<u32>,
    width: VectorWidth,
}

/// Records every call and leaves the output zeroed.
#[derive(Debug, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Received>>>,
}

impl Recorder {
    fn record<T: Element>(
        &self,
        strategy: Strategy,
        call: &GemmCall<'_, T>,
        bounds: Option<(i64, i64)>,
        clamp_freq: Option<u32>,
        width: VectorWidth,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Received {
            dtype: T::DTYPE,
            strategy,
            dims: (call.m(), call.k(), call.n()),
            bounds,
            clamp_freq,
            width,
        });
        Ok(())
    }
}

fn widen<T: Into<i64>>(bounds: SaturationBounds<T>) -> Option<(i64, i64)> {
    Some((bounds.min.into(), bounds.max.into()))
}

impl KernelBackend for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn naive_f32(&self, call: GemmCall<'_, f32>) -> Result<()> {
        self.record(Strategy::Naive, &call, None, None, VectorWidth::UNSET)
    }

    fn vectorized_f32(&self, call: GemmCall<'_, f32>, width: VectorWidth) -> Result<()> {
        self.record(Strategy::Vectorized, &call, None, None, width)
    }

    fn naive_i8(&self, call: GemmCall<'_, i8>, bounds: SaturationBounds<i8>) -> Result<()> {
        self.record(Strategy::Naive, &call, widen(bounds), None, VectorWidth::UNSET)
    }

    fn vectorized_i8(
        &self,
        call: GemmCall<'_, i8>,
        bounds: SaturationBounds<i8>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        self.record(Strategy::Vectorized, &call, widen(bounds), Some(clamp_freq), width)
    }

    fn naive_i16(&self, call: GemmCall<'_, i16>, bounds: SaturationBounds<i16>) -> Result<()> {
        self.record(Strategy::Naive, &call, widen(bounds), None, VectorWidth::UNSET)
    }

    fn vectorized_i16(
        &self,
        call: GemmCall<'_, i16>,
        bounds: SaturationBounds<i16>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        self.record(Strategy::Vectorized, &call, widen(bounds), Some(clamp_freq), width)
    }

    fn naive_i32(&self, call: GemmCall<'_, i32>, bounds: SaturationBounds<i32>) -> Result<()> {
        self.record(Strategy::Naive, &call, widen(bounds), None, VectorWidth::UNSET)
    }

    fn vectorized_i32(
        &self,
        call: GemmCall<'_, i32>,
        bounds: SaturationBounds<i32>,
        clamp_freq: u32,
        width: VectorWidth,
    ) -> Result<()> {
        self.record(Strategy::Vectorized, &call, widen(bounds), Some(clamp_freq), width)
    }
}

fn recording_dispatcher() -> (Dispatcher, Arc<Mutex<Vec<Received>>>) {
    let recorder = Recorder::default();
    let calls = Arc::clone(&recorder.calls);
    (Dispatcher::new(Box::new(recorder)), calls)
}

/// Non-square shapes with the larger side in each size band, on either side.
const SHAPES: [(usize, usize, usize); 6] = [
    (4, 3, 40),
    (32, 2, 5),
    (300, 2, 2),
    (2, 5, 300),
    (200, 1, 7),
    (7, 9, 129),
];

fn widths() -> [VectorWidth; 3] {
    [VectorWidth::UNSET, VectorWidth::bits(48), VectorWidth::bits(512)]
}

fn integer_calls_carry_policy<T: Element + Into<i64>>() {
    let (d, calls) = recording_dispatcher();
    for (m, k, n) in SHAPES {
        let a = Matrix::<T>::new(m, k).unwrap();
        let b = Matrix::<T>::new(k, n).unwrap();
        for width in widths() {
            d.multiply(&a, &b, Strategy::Vectorized, width).unwrap();
            let got = calls.lock().unwrap().pop().unwrap();
            assert_eq!(
                got,
                Received {
                    dtype: T::DTYPE,
                    strategy: Strategy::Vectorized,
                    dims: (m, k, n),
                    bounds: Some((T::MIN.into(), T::MAX.into())),
                    clamp_freq: T::clamp_frequency(m.max(n)),
                    width,
                },
                "{} {}x{}x{}",
                T::DTYPE,
                m,
                k,
                n
            );
        }

        d.multiply(&a, &b, Strategy::Naive, VectorWidth::bits(64)).unwrap();
        let got = calls.lock().unwrap().pop().unwrap();
        assert_eq!(got.strategy, Strategy::Naive);
        assert_eq!(got.bounds, Some((T::MIN.into(), T::MAX.into())));
        assert_eq!(got.dims, (m, k, n));
    }
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn i8_calls_carry_policy() {
    integer_calls_carry_policy::<i8>();
}

#[test]
fn i16_calls_carry_policy() {
    integer_calls_carry_policy::<i16>();
}

#[test]
fn i32_calls_carry_policy() {
    integer_calls_carry_policy::<i32>();
}

#[test]
fn clamp_frequency_follows_the_larger_output_side() {
    let (d, calls) = recording_dispatcher();
    let cases: [(usize, usize, u32, u32, u32); 4] = [
        // (m, n, i8, i16, i32)
        (4, 40, 1 << 4, 1 << 6, 1 << 12),
        (300, 2, 1 << 7, 1 << 9, 1 << 16),
        (200, 7, 1 << 6, 1 << 8, 1 << 14),
        (32, 5, 1 << 2, 1 << 4, 1 << 10),
    ];
    for (m, n, f8, f16, f32_) in cases {
        d.multiply(
            &Matrix::<i8>::new(m, 3).unwrap(),
            &Matrix::<i8>::new(3, n).unwrap(),
            Strategy::Vectorized,
            VectorWidth::UNSET,
        )
        .unwrap();
        d.multiply(
            &Matrix::<i16>::new(m, 3).unwrap(),
            &Matrix::<i16>::new(3, n).unwrap(),
            Strategy::Vectorized,
            VectorWidth::UNSET,
        )
        .unwrap();
        d.multiply(
            &Matrix::<i32>::new(m, 3).unwrap(),
            &Matrix::<i32>::new(3, n).unwrap(),
            Strategy::Vectorized,
            VectorWidth::UNSET,
        )
        .unwrap();
        let got: Vec<Option<u32>> = calls.lock().unwrap().drain(..).map(|r| r.clamp_freq).collect();
        assert_eq!(got, vec![Some(f8), Some(f16), Some(f32_)], "{}x{}", m, n);
    }
}

#[test]
fn float_calls_carry_width_only() {
    let (d, calls) = recording_dispatcher();
    let a = Matrix::<f32>::new(3, 4).unwrap();
    let b = Matrix::<f32>::new(4, 300).unwrap();
    for width in widths() {
        d.multiply(&a, &b, Strategy::Vectorized, width).unwrap();
        let got = calls.lock().unwrap().pop().unwrap();
        assert_eq!(got.width, width);
        assert_eq!(got.bounds, None);
        assert_eq!(got.clamp_freq, None);
        assert_eq!(got.dims, (3, 4, 300));
    }
}

#[test]
fn matrix_matmul_forwards_width() {
    let (d, calls) = recording_dispatcher();
    let a = Matrix::<i16>::new(2, 2).unwrap();
    a.matmul(&a, &d, Strategy::Vectorized, VectorWidth::bits(256))
        .unwrap();
    let got = calls.lock().unwrap().pop().unwrap();
    assert_eq!(got.width, VectorWidth::bits(256));
    assert_eq!(got.clamp_freq, Some(1 << 4));
}

#[test]
fn reference_never_reaches_the_backend() {
    let (d, calls) = recording_dispatcher();
    let a = Matrix::<i32>::new(3, 3).unwrap();
    d.multiply(&a, &a, Strategy::Reference, VectorWidth::bits(64))
        .unwrap();
    assert!(calls.lock().unwrap().is_empty());
}
