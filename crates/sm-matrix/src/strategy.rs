use std::fmt;
use std::num::NonZeroUsize;

/// Interchangeable multiplication algorithms sharing one output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Portable triple loop with exact widened accumulation. Ground truth
    /// for every other strategy.
    Reference,
    /// Scalar kernel provided by a [`KernelBackend`](crate::KernelBackend).
    Naive,
    /// Vector kernel provided by a [`KernelBackend`](crate::KernelBackend).
    Vectorized,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Reference, Strategy::Naive, Strategy::Vectorized];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Reference => "reference",
            Strategy::Naive => "naive",
            Strategy::Vectorized => "vectorized",
        }
    }

    /// Returns true when this strategy is executed by a kernel backend rather
    /// than computed in place.
    pub fn is_external(&self) -> bool {
        !matches!(self, Strategy::Reference)
    }

    pub fn from_name(name: &str) -> Option<Strategy> {
        match name {
            "reference" => Some(Strategy::Reference),
            "naive" => Some(Strategy::Naive),
            "vectorized" => Some(Strategy::Vectorized),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vector register width hint, in bits, for the vectorized strategy.
///
/// `VectorWidth::default()` leaves the choice to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VectorWidth(Option<NonZeroUsize>);

impl VectorWidth {
    pub const UNSET: VectorWidth = VectorWidth(None);

    /// A width of zero is treated as unset.
    pub fn bits(bits: usize) -> Self {
        VectorWidth(NonZeroUsize::new(bits))
    }

    pub fn get(&self) -> Option<usize> {
        self.0.map(NonZeroUsize::get)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Width in bits, or `default_bits` when unset.
    pub fn or(&self, default_bits: usize) -> usize {
        self.get().unwrap_or(default_bits)
    }

    /// Number of `element_bits`-wide lanes that fit in one register,
    /// never less than one.
    pub fn lanes(&self, element_bits: usize, default_bits: usize) -> usize {
        (self.or(default_bits) / element_bits).max(1)
    }
}

impl fmt::Display for VectorWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(bits) => write!(f, "{} bits", bits),
            None => f.write_str("unset"),
        }
    }
}
