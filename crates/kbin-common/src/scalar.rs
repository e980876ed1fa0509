//! Primitive storage units and typed scalar values.

use byteorder::{BigEndian, ByteOrder};

use crate::{Error, Result};

/// The primitive unit a value is stored as in the data stream.
///
/// `RawBytes` and `UtfText` are the element units of variable-length blobs and
/// strings; they are stored one byte at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageUnit {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    F32,
    F64,
    RawBytes,
    UtfText,
}

impl StorageUnit {
    /// Width of one unit in bytes.
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            Self::S8 | Self::U8 | Self::RawBytes | Self::UtfText => 1,
            Self::S16 | Self::U16 => 2,
            Self::S32 | Self::U32 | Self::F32 => 4,
            Self::S64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Resolve a struct-style format code (`b`, `B`, `h`, `H`, `i`, `I`, `q`, `Q`, `f`, `d`, `s`).
    pub fn from_code(code: char) -> Result<Self> {
        Ok(match code {
            'b' => Self::S8,
            'B' => Self::U8,
            'h' => Self::S16,
            'H' => Self::U16,
            'i' => Self::S32,
            'I' => Self::U32,
            'q' => Self::S64,
            'Q' => Self::U64,
            'f' => Self::F32,
            'd' => Self::F64,
            's' => Self::RawBytes,
            other => return Err(Error::InvalidWidth(other)),
        })
    }
}

/// Width in bytes of a storage unit.
#[inline]
pub const fn storage_width(unit: StorageUnit) -> usize {
    unit.width()
}

/// A Rust number type with a fixed big-endian wire representation.
pub trait Primitive: Copy + Sized {
    /// Storage unit this type maps to.
    const UNIT: StorageUnit;

    /// Decode from exactly `UNIT.width()` big-endian bytes.
    fn read_be(bytes: &[u8]) -> Self;

    /// Encode into exactly `UNIT.width()` big-endian bytes.
    fn write_be(self, out: &mut [u8]);
}

impl Primitive for u8 {
    const UNIT: StorageUnit = StorageUnit::U8;

    #[inline]
    fn read_be(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write_be(self, out: &mut [u8]) {
        out[0] = self;
    }
}

impl Primitive for i8 {
    const UNIT: StorageUnit = StorageUnit::S8;

    #[inline]
    fn read_be(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn write_be(self, out: &mut [u8]) {
        out[0] = self as u8;
    }
}

macro_rules! impl_primitive {
    ($ty:ty, $unit:ident, $read:ident, $write:ident) => {
        impl Primitive for $ty {
            const UNIT: StorageUnit = StorageUnit::$unit;

            #[inline]
            fn read_be(bytes: &[u8]) -> Self {
                BigEndian::$read(bytes)
            }

            #[inline]
            fn write_be(self, out: &mut [u8]) {
                BigEndian::$write(out, self)
            }
        }
    };
}

impl_primitive!(i16, S16, read_i16, write_i16);
impl_primitive!(u16, U16, read_u16, write_u16);
impl_primitive!(i32, S32, read_i32, write_i32);
impl_primitive!(u32, U32, read_u32, write_u32);
impl_primitive!(i64, S64, read_i64, write_i64);
impl_primitive!(u64, U64, read_u64, write_u64);
impl_primitive!(f32, F32, read_f32, write_f32);
impl_primitive!(f64, F64, read_f64, write_f64);

/// A single primitive value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    S8(i8),
    U8(u8),
    S16(i16),
    U16(u16),
    S32(i32),
    U32(u32),
    S64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// Storage unit of this value.
    pub const fn unit(&self) -> StorageUnit {
        match self {
            Self::S8(_) => StorageUnit::S8,
            Self::U8(_) => StorageUnit::U8,
            Self::S16(_) => StorageUnit::S16,
            Self::U16(_) => StorageUnit::U16,
            Self::S32(_) => StorageUnit::S32,
            Self::U32(_) => StorageUnit::U32,
            Self::S64(_) => StorageUnit::S64,
            Self::U64(_) => StorageUnit::U64,
            Self::F32(_) => StorageUnit::F32,
            Self::F64(_) => StorageUnit::F64,
        }
    }

    /// Width of this value in bytes.
    #[inline]
    pub const fn width(&self) -> usize {
        self.unit().width()
    }

    /// Decode one value of `unit` from the start of `bytes`.
    ///
    /// The caller guarantees `bytes.len() >= unit.width()`.
    pub fn read_be(unit: StorageUnit, bytes: &[u8]) -> Self {
        match unit {
            StorageUnit::S8 => Self::S8(i8::read_be(bytes)),
            StorageUnit::U8 | StorageUnit::RawBytes | StorageUnit::UtfText => {
                Self::U8(u8::read_be(bytes))
            }
            StorageUnit::S16 => Self::S16(i16::read_be(bytes)),
            StorageUnit::U16 => Self::U16(u16::read_be(bytes)),
            StorageUnit::S32 => Self::S32(i32::read_be(bytes)),
            StorageUnit::U32 => Self::U32(u32::read_be(bytes)),
            StorageUnit::S64 => Self::S64(i64::read_be(bytes)),
            StorageUnit::U64 => Self::U64(u64::read_be(bytes)),
            StorageUnit::F32 => Self::F32(f32::read_be(bytes)),
            StorageUnit::F64 => Self::F64(f64::read_be(bytes)),
        }
    }

    /// Encode this value into the start of `out`.
    pub fn write_be(&self, out: &mut [u8]) {
        match *self {
            Self::S8(v) => v.write_be(out),
            Self::U8(v) => v.write_be(out),
            Self::S16(v) => v.write_be(out),
            Self::U16(v) => v.write_be(out),
            Self::S32(v) => v.write_be(out),
            Self::U32(v) => v.write_be(out),
            Self::S64(v) => v.write_be(out),
            Self::U64(v) => v.write_be(out),
            Self::F32(v) => v.write_be(out),
            Self::F64(v) => v.write_be(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(storage_width(StorageUnit::S8), 1);
        assert_eq!(storage_width(StorageUnit::U16), 2);
        assert_eq!(storage_width(StorageUnit::F32), 4);
        assert_eq!(storage_width(StorageUnit::U64), 8);
        assert_eq!(storage_width(StorageUnit::RawBytes), 1);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(StorageUnit::from_code('H').unwrap(), StorageUnit::U16);
        assert_eq!(StorageUnit::from_code('d').unwrap(), StorageUnit::F64);
        assert!(matches!(StorageUnit::from_code('x'), Err(Error::InvalidWidth('x'))));
    }

    #[test]
    fn test_scalar_big_endian() {
        let mut out = [0u8; 4];
        Scalar::U32(0xC0A8_0101).write_be(&mut out);
        assert_eq!(out, [0xC0, 0xA8, 0x01, 0x01]);
        assert_eq!(Scalar::read_be(StorageUnit::U32, &out), Scalar::U32(0xC0A8_0101));
        assert_eq!(Scalar::read_be(StorageUnit::S8, &[0xFF]), Scalar::S8(-1));
    }
}
