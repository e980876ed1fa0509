//! Node and attribute name records in the node stream.

use kbin_common::ByteBuffer;

use crate::{sixbit, Error, Result, TextEncoding};

/// Flag carried by the length byte of an uncompressed name.
const PLAIN_NAME_FLAG: u8 = 0x40;

/// Longest uncompressed name in encoded bytes.
pub const MAX_PLAIN_LEN: usize = 64;

/// How names are written for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCodec {
    pub compressed: bool,
    pub encoding: TextEncoding,
}

impl NameCodec {
    pub fn new(compressed: bool, encoding: TextEncoding) -> Self {
        Self {
            compressed,
            encoding,
        }
    }

    /// Append a name record to the node stream.
    pub fn write(&self, name: &str, nodes: &mut ByteBuffer) -> Result<()> {
        if self.compressed {
            return sixbit::pack_into(name, nodes);
        }

        let bytes = self.encoding.encode(name)?;
        if bytes.is_empty() || bytes.len() > MAX_PLAIN_LEN {
            return Err(Error::NameLength {
                name: name.to_string(),
                len: bytes.len(),
                min: 1,
                max: MAX_PLAIN_LEN,
            });
        }
        nodes.write(((bytes.len() - 1) as u8) | PLAIN_NAME_FLAG);
        nodes.write_bytes(&bytes);
        Ok(())
    }

    /// Read a name record, returning the raw name bytes for plain names.
    ///
    /// Sixbit names are always ASCII and come back already decoded.
    pub fn read(&self, nodes: &mut ByteBuffer) -> Result<RawName> {
        if self.compressed {
            return sixbit::unpack(nodes).map(RawName::Text);
        }

        let len = (nodes.read::<u8>()? & !PLAIN_NAME_FLAG) as usize + 1;
        Ok(RawName::Bytes(nodes.read_bytes(len)?.to_vec()))
    }
}

/// A name as read from the node stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawName {
    Text(String),
    Bytes(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_record() {
        let codec = NameCodec::new(false, TextEncoding::Utf8);
        let mut nodes = ByteBuffer::new();
        codec.write("root", &mut nodes).unwrap();
        assert_eq!(nodes.as_slice(), &[0x43, b'r', b'o', b'o', b't']);

        assert_eq!(codec.read(&mut nodes).unwrap(), RawName::Bytes(b"root".to_vec()));
    }

    #[test]
    fn test_plain_name_limits() {
        let codec = NameCodec::new(false, TextEncoding::Utf8);
        let mut nodes = ByteBuffer::new();
        assert!(matches!(codec.write("", &mut nodes), Err(Error::NameLength { .. })));

        let longest = "n".repeat(MAX_PLAIN_LEN);
        codec.write(&longest, &mut nodes).unwrap();
        assert_eq!(nodes.as_slice()[0], 0x7F);
        assert!(codec.write(&"n".repeat(MAX_PLAIN_LEN + 1), &mut nodes).is_err());
    }

    #[test]
    fn test_plain_names_use_document_encoding() {
        let codec = NameCodec::new(false, TextEncoding::ShiftJis);
        let mut nodes = ByteBuffer::new();
        codec.write("名前", &mut nodes).unwrap();
        assert_eq!(nodes.as_slice()[0], 0x43);
        assert_eq!(nodes.len(), 5);
    }

    #[test]
    fn test_compressed_name_record() {
        let codec = NameCodec::new(true, TextEncoding::Utf8);
        let mut nodes = ByteBuffer::new();
        codec.write("root", &mut nodes).unwrap();
        assert_eq!(nodes.len(), 1 + 3);
        assert_eq!(codec.read(&mut nodes).unwrap(), RawName::Text("root".to_string()));
    }
}
