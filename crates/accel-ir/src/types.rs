//! Element data types.

use std::fmt;

/// The kind of a scalar element.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum TypeCode {
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// Floating point.
    Float,
    /// Opaque pointer (buffer data).
    Handle,
}

/// A scalar (or short vector) element type: code, bit width and lane count.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct DataType {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl DataType {
    pub const BOOL: Self = Self::scalar(TypeCode::UInt, 1);
    pub const INT8: Self = Self::scalar(TypeCode::Int, 8);
    pub const INT32: Self = Self::scalar(TypeCode::Int, 32);
    pub const INT64: Self = Self::scalar(TypeCode::Int, 64);
    pub const UINT8: Self = Self::scalar(TypeCode::UInt, 8);
    pub const FLOAT32: Self = Self::scalar(TypeCode::Float, 32);
    pub const HANDLE: Self = Self::scalar(TypeCode::Handle, 64);

    /// A single-lane type.
    pub const fn scalar(code: TypeCode, bits: u8) -> Self {
        Self {
            code,
            bits,
            lanes: 1,
        }
    }

    /// Returns `true` for signed and unsigned integers (including `bool`).
    pub fn is_int(self) -> bool {
        matches!(self.code, TypeCode::Int | TypeCode::UInt)
    }

    pub fn is_float(self) -> bool {
        self.code == TypeCode::Float
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::BOOL {
            return f.write_str("bool");
        }
        match self.code {
            TypeCode::Int => write!(f, "int{}", self.bits)?,
            TypeCode::UInt => write!(f, "uint{}", self.bits)?,
            TypeCode::Float => write!(f, "float{}", self.bits)?,
            TypeCode::Handle => f.write_str("handle")?,
        }
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}
