use std::fmt;

/// Element types a matrix can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 32-bit IEEE 754 floating point.
    F32,
}

impl DType {
    /// Every supported element type, narrowest integer first.
    pub const ALL: [DType; 4] = [DType::I8, DType::I16, DType::I32, DType::F32];

    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::I8 => 1,
            DType::I16 => 2,
            DType::I32 | DType::F32 => 4,
        }
    }

    /// Element width in bits.
    pub fn bits(&self) -> usize {
        self.size_in_bytes() * 8
    }

    /// Returns true for the integer types, which saturate on narrowing.
    pub fn is_integer(&self) -> bool {
        !matches!(self, DType::F32)
    }

    /// Parses the names produced by `Display` (`i8`, `i16`, `i32`, `f32`).
    pub fn from_name(name: &str) -> Option<DType> {
        match name {
            "i8" => Some(DType::I8),
            "i16" => Some(DType::I16),
            "i32" => Some(DType::I32),
            "f32" => Some(DType::F32),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::I8 => write!(f, "i8"),
            DType::I16 => write!(f, "i16"),
            DType::I32 => write!(f, "i32"),
            DType::F32 => write!(f, "f32"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DType::I8.size_in_bytes(), 1);
        assert_eq!(DType::I16.size_in_bytes(), 2);
        assert_eq!(DType::I32.size_in_bytes(), 4);
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::I16.bits(), 16);
    }

    #[test]
    fn test_name_roundtrip() {
        for dtype in &DType::ALL {
            let back = DType::from_name(&dtype.to_string()).unwrap();
            assert_eq!(*dtype, back);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(DType::from_name("f16").is_none());
        assert!(DType::from_name("").is_none());
    }

    #[test]
    fn test_is_integer() {
        assert!(DType::I8.is_integer());
        assert!(DType::I32.is_integer());
        assert!(!DType::F32.is_integer());
    }
}
