//! kbin file header.

use kbin_common::ByteBuffer;
use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result, TextEncoding};

/// The fixed 8-byte header at the start of every kbin file.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawHeader {
    /// Always [`Header::SIGNATURE`].
    pub signature: u8,
    /// [`Header::SIG_COMPRESSED`] or [`Header::SIG_UNCOMPRESSED`].
    pub compression: u8,
    /// Text encoding id.
    pub encoding: u8,
    /// Bitwise complement of `encoding`.
    pub encoding_check: u8,
    /// Length of the node stream, not counting these 8 bytes.
    pub node_size: U32<BigEndian>,
}

/// Validated header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Node names are sixbit packed.
    pub compressed: bool,
    /// Text encoding for names and strings.
    pub encoding: TextEncoding,
    /// Length of the node stream in bytes.
    pub node_size: u32,
}

impl Header {
    /// First byte of every kbin file.
    pub const SIGNATURE: u8 = 0xA0;
    /// Compression marker for sixbit packed names.
    pub const SIG_COMPRESSED: u8 = 0x42;
    /// Compression marker for plain names.
    pub const SIG_UNCOMPRESSED: u8 = 0x45;
    /// Size of the fixed header.
    pub const SIZE: usize = 8;

    /// Check the two leading bytes that identify a kbin file.
    pub fn is_kbin(data: &[u8]) -> bool {
        data.len() >= 2
            && data[0] == Self::SIGNATURE
            && (data[1] == Self::SIG_COMPRESSED || data[1] == Self::SIG_UNCOMPRESSED)
    }

    /// Read and validate the header from the front of `reader`.
    pub fn parse(reader: &mut ByteBuffer) -> Result<Self> {
        let raw: RawHeader = reader.read_struct()?;

        if raw.signature != Self::SIGNATURE {
            return Err(Error::HeaderCorrupt(format!(
                "signature 0x{:02X}, expected 0x{:02X}",
                raw.signature,
                Self::SIGNATURE
            )));
        }

        let compressed = match raw.compression {
            Self::SIG_COMPRESSED => true,
            Self::SIG_UNCOMPRESSED => false,
            other => {
                return Err(Error::HeaderCorrupt(format!(
                    "compression marker 0x{:02X}",
                    other
                )))
            }
        };

        if raw.encoding ^ raw.encoding_check != 0xFF {
            return Err(Error::HeaderCorrupt(format!(
                "encoding check 0x{:02X} is not the complement of 0x{:02X}",
                raw.encoding_check, raw.encoding
            )));
        }

        Ok(Self {
            compressed,
            encoding: TextEncoding::from_id(raw.encoding),
            node_size: raw.node_size.get(),
        })
    }

    /// Raw on-disk form.
    pub fn to_raw(&self) -> RawHeader {
        let encoding = self.encoding.id();
        RawHeader {
            signature: Self::SIGNATURE,
            compression: if self.compressed {
                Self::SIG_COMPRESSED
            } else {
                Self::SIG_UNCOMPRESSED
            },
            encoding,
            encoding_check: !encoding,
            node_size: U32::new(self.node_size),
        }
    }

    /// Append the 8 header bytes to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_raw().as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(std::mem::size_of::<RawHeader>(), Header::SIZE);

        let header = Header {
            compressed: false,
            encoding: TextEncoding::Utf8,
            node_size: 8,
        };
        let mut out = Vec::new();
        header.write(&mut out);
        assert_eq!(out, [0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08]);

        let parsed = Header::parse(&mut ByteBuffer::from_vec(out)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_is_kbin() {
        assert!(Header::is_kbin(&[0xA0, 0x42]));
        assert!(Header::is_kbin(&[0xA0, 0x45, 0x00]));
        assert!(!Header::is_kbin(&[0xA0, 0x44]));
        assert!(!Header::is_kbin(b"<?xml"));
        assert!(!Header::is_kbin(&[0xA0]));
    }

    #[test]
    fn test_corrupt_headers() {
        let bad_signature = [0xA1, 0x42, 0x80, 0x7F, 0, 0, 0, 0];
        let bad_compression = [0xA0, 0x43, 0x80, 0x7F, 0, 0, 0, 0];
        let bad_check = [0xA0, 0x42, 0x80, 0x80, 0, 0, 0, 0];

        for data in [bad_signature, bad_compression, bad_check] {
            let result = Header::parse(&mut ByteBuffer::from_slice(&data));
            assert!(matches!(result, Err(Error::HeaderCorrupt(_))), "{:?}", data);
        }
    }

    #[test]
    fn test_truncated_header() {
        let result = Header::parse(&mut ByteBuffer::from_slice(&[0xA0, 0x42, 0x80]));
        assert!(matches!(result, Err(Error::Common(kbin_common::Error::OutOfBounds { .. }))));
    }
}
