//! The kbin data stream and its three aligned cursors.
//!
//! Node values live in the data stream. Variable-length payloads and arrays
//! are length-prefixed and padded to 4 bytes. Fixed scalars and vectors that
//! are 1 or 2 bytes wide are packed into shared 4-byte words instead: a byte
//! cursor and a word cursor walk through words the primary cursor has already
//! reserved, so consecutive narrow values don't each cost a full word.
//!
//! All three cursors index the same [`ByteBuffer`]. The primary cursor is the
//! buffer's own write (encode) or read (decode) offset; the byte and word
//! cursors are plain offsets kept alongside it.

use kbin_common::{ByteBuffer, Scalar, StorageUnit};

use crate::Result;

const WORD: usize = 4;

/// Offsets of the three data-stream cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursors {
    pub primary: usize,
    pub byte: usize,
    pub word: usize,
}

impl Cursors {
    /// Re-point any sub-cursor sitting on a word boundary at the primary cursor.
    ///
    /// A sub-cursor on a boundary has used up its word and may have been lapped.
    #[inline]
    pub fn resynced(self) -> Self {
        Self {
            primary: self.primary,
            byte: if self.byte % WORD == 0 { self.primary } else { self.byte },
            word: if self.word % WORD == 0 { self.primary } else { self.word },
        }
    }

    /// Move the primary cursor past anything the sub-cursors have consumed.
    #[inline]
    pub fn settled(self) -> Self {
        let trailing = self.byte.max(self.word);
        if self.primary < trailing {
            Self {
                primary: trailing.next_multiple_of(WORD),
                ..self
            }
        } else {
            self
        }
    }
}

/// Encode-side data stream.
#[derive(Debug, Default)]
pub struct DataWriter {
    buf: ByteBuffer,
    byte: usize,
    word: usize,
}

impl DataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn cursors(&self) -> Cursors {
        Cursors {
            primary: self.buf.write_offset(),
            byte: self.byte,
            word: self.word,
        }
    }

    fn set_cursors(&mut self, cursors: Cursors) {
        self.buf.set_write_offset(cursors.primary);
        self.byte = cursors.byte;
        self.word = cursors.word;
    }

    /// Write a fixed-size value through the aligned protocol.
    pub fn write_aligned(&mut self, bytes: &[u8]) {
        self.set_cursors(self.cursors().resynced());

        match bytes.len() {
            1 => {
                if self.byte % WORD == 0 {
                    self.buf.write(0u32);
                }
                self.buf.write_bytes_at(self.byte, bytes);
                self.byte += 1;
            }
            2 => {
                if self.word % WORD == 0 {
                    self.buf.write(0u32);
                }
                self.buf.write_bytes_at(self.word, bytes);
                self.word += 2;
            }
            _ => {
                self.buf.write_bytes(bytes);
                self.buf.align_writes(WORD);
            }
        }

        self.set_cursors(self.cursors().settled());
    }

    /// Write a 4-byte length prefix, the payload, and pad to 4 bytes.
    pub fn write_prefixed(&mut self, bytes: &[u8]) {
        self.buf.write(bytes.len() as u32);
        self.buf.write_bytes(bytes);
        self.buf.align_writes(WORD);
    }

    /// Current length of the stream.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.into_vec()
    }
}

/// Decode-side data stream.
#[derive(Debug)]
pub struct DataReader {
    buf: ByteBuffer,
    byte: usize,
    word: usize,
    declared_size: u32,
}

impl DataReader {
    /// Start reading a data stream that begins with its own 4-byte length.
    pub fn new(data: &[u8]) -> Result<Self> {
        let mut buf = ByteBuffer::from_slice(data);
        let declared_size = buf.read::<u32>()?;
        Ok(Self {
            buf,
            byte: 0,
            word: 0,
            declared_size,
        })
    }

    /// Length the stream declared for itself.
    pub fn declared_size(&self) -> u32 {
        self.declared_size
    }

    /// Payload bytes actually present after the length field.
    pub fn available_size(&self) -> usize {
        self.buf.len().saturating_sub(WORD)
    }

    fn cursors(&self) -> Cursors {
        Cursors {
            primary: self.buf.read_offset(),
            byte: self.byte,
            word: self.word,
        }
    }

    fn set_cursors(&mut self, cursors: Cursors) {
        self.buf.set_read_offset(cursors.primary);
        self.byte = cursors.byte;
        self.word = cursors.word;
    }

    /// Read a fixed-size value of `size` bytes through the aligned protocol.
    pub fn read_aligned(&mut self, size: usize) -> Result<Vec<u8>> {
        self.set_cursors(self.cursors().resynced());

        let bytes = match size {
            1 => {
                let bytes = self.buf.bytes_at(self.byte, 1)?.to_vec();
                self.byte += 1;
                bytes
            }
            2 => {
                let bytes = self.buf.bytes_at(self.word, 2)?.to_vec();
                self.word += 2;
                bytes
            }
            _ => {
                let bytes = self.buf.read_bytes(size)?.to_vec();
                self.buf.align_reads(WORD);
                bytes
            }
        };

        self.set_cursors(self.cursors().settled());
        Ok(bytes)
    }

    /// Read a 4-byte value straight from the primary cursor.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.buf.read::<u32>()?)
    }

    /// Read `count` units straight from the primary cursor and pad to 4 bytes.
    pub fn read_units(&mut self, unit: StorageUnit, count: usize) -> Result<Vec<Scalar>> {
        let values = self.buf.read_unit(unit, count)?;
        self.buf.align_reads(WORD);
        Ok(values)
    }

    /// Read `len` raw bytes from the primary cursor and pad to 4 bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let bytes = self.buf.read_bytes(len)?.to_vec();
        self.buf.align_reads(WORD);
        Ok(bytes)
    }

    /// Read a length-prefixed payload.
    pub fn read_prefixed(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_raw(len)
    }
}
