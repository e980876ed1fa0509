//! Growable big-endian byte buffer with independent read and write cursors.
//!
//! This module provides [`ByteBuffer`], the cursor type every kbin stream is
//! built on. Reads are bounded by the populated length (or an explicit end
//! set with [`ByteBuffer::set_end`]), never by allocated capacity, so trailing
//! zero padding written by [`ByteBuffer::align_writes`] is real content while
//! spare capacity is not.

use zerocopy::FromBytes;

use crate::{Error, Primitive, Result, Scalar, StorageUnit};

/// A byte buffer with a read cursor and a write cursor.
///
/// All multi-byte values are big-endian.
///
/// # Example
///
/// ```
/// use kbin_common::ByteBuffer;
///
/// let mut buf = ByteBuffer::new();
/// buf.write(0x0102u16);
/// buf.write(0x03u8);
/// buf.align_writes(4);
/// assert_eq!(buf.as_slice(), &[0x01, 0x02, 0x03, 0x00]);
///
/// assert_eq!(buf.read::<u16>().unwrap(), 0x0102);
/// assert_eq!(buf.read::<u8>().unwrap(), 0x03);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_offset: usize,
    write_offset: usize,
    end: Option<usize>,
}

impl ByteBuffer {
    /// Create an empty buffer.
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            read_offset: 0,
            write_offset: 0,
            end: None,
        }
    }

    /// Create an empty buffer with room for `capacity` bytes.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Wrap existing content. The read cursor starts at 0, the write cursor at the end.
    #[inline]
    pub fn from_vec(data: Vec<u8>) -> Self {
        let write_offset = data.len();
        Self {
            data,
            read_offset: 0,
            write_offset,
            end: None,
        }
    }

    /// Copy a slice into a new buffer.
    #[inline]
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Populated length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Current read position.
    #[inline]
    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    /// Move the read cursor to an absolute position.
    #[inline]
    pub fn set_read_offset(&mut self, offset: usize) {
        self.read_offset = offset;
    }

    /// Current write position.
    #[inline]
    pub fn write_offset(&self) -> usize {
        self.write_offset
    }

    /// Move the write cursor to an absolute position.
    #[inline]
    pub fn set_write_offset(&mut self, offset: usize) {
        self.write_offset = offset;
    }

    /// Limit reads to the first `end` bytes.
    #[inline]
    pub fn set_end(&mut self, end: usize) {
        self.end = Some(end);
    }

    /// Exclusive upper bound for reads.
    #[inline]
    pub fn read_end(&self) -> usize {
        self.end.map_or(self.data.len(), |end| end.min(self.data.len()))
    }

    /// Number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.read_end().saturating_sub(self.read_offset)
    }

    /// Check if there is anything left to read.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.read_offset < self.read_end()
    }

    /// The populated content.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning its populated content.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    // ---- reads ----

    /// Borrow `count` bytes at an absolute offset without touching either cursor.
    pub fn bytes_at(&self, offset: usize, count: usize) -> Result<&[u8]> {
        let end = self.read_end();
        match offset.checked_add(count) {
            Some(stop) if stop <= end => Ok(&self.data[offset..stop]),
            _ => Err(Error::OutOfBounds {
                offset,
                needed: count,
                available: end.saturating_sub(offset),
            }),
        }
    }

    /// Peek at bytes without advancing the read cursor.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&[u8]> {
        self.bytes_at(self.read_offset, count)
    }

    /// Read bytes and advance the read cursor.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8]> {
        let start = self.read_offset;
        self.bytes_at(start, count)?;
        self.read_offset += count;
        Ok(&self.data[start..start + count])
    }

    /// Peek at one value without advancing.
    #[inline]
    pub fn peek<T: Primitive>(&self) -> Result<T> {
        self.peek_bytes(T::UNIT.width()).map(T::read_be)
    }

    /// Read one value.
    #[inline]
    pub fn read<T: Primitive>(&mut self) -> Result<T> {
        self.read_bytes(T::UNIT.width()).map(T::read_be)
    }

    /// Read `count` values of a storage unit chosen at runtime.
    pub fn read_unit(&mut self, unit: StorageUnit, count: usize) -> Result<Vec<Scalar>> {
        let values = self.peek_unit(unit, count)?;
        self.read_offset += unit.width() * count;
        Ok(values)
    }

    /// Peek at `count` values of a storage unit chosen at runtime.
    pub fn peek_unit(&self, unit: StorageUnit, count: usize) -> Result<Vec<Scalar>> {
        let width = unit.width();
        let bytes = self.peek_bytes(width * count)?;
        Ok(bytes
            .chunks_exact(width)
            .map(|chunk| Scalar::read_be(unit, chunk))
            .collect())
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let offset = self.read_offset;
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::InvalidStruct { offset, size })
    }

    /// Advance the read cursor to the next multiple of `alignment`.
    #[inline]
    pub fn align_reads(&mut self, alignment: usize) {
        self.read_offset = self.read_offset.next_multiple_of(alignment);
    }

    // ---- writes ----

    /// Grow the populated length to `stop`, zero-filling.
    fn ensure_len(&mut self, stop: usize) {
        if stop > self.data.len() {
            self.data.resize(stop, 0);
        }
    }

    /// Write bytes at the write cursor and advance it.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let start = self.write_offset;
        let stop = start + bytes.len();
        self.ensure_len(stop);
        self.data[start..stop].copy_from_slice(bytes);
        self.write_offset = stop;
    }

    /// Write bytes at an absolute offset.
    ///
    /// The write cursor only moves when the write extends the buffer past it.
    pub fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) {
        let stop = offset + bytes.len();
        self.ensure_len(stop);
        self.data[offset..stop].copy_from_slice(bytes);
        if stop > self.write_offset {
            self.write_offset = stop;
        }
    }

    /// Write one value.
    pub fn write<T: Primitive>(&mut self, value: T) {
        let mut raw = [0u8; 8];
        let width = T::UNIT.width();
        value.write_be(&mut raw[..width]);
        self.write_bytes(&raw[..width]);
    }

    /// Write one value at an absolute offset.
    pub fn write_at<T: Primitive>(&mut self, offset: usize, value: T) {
        let mut raw = [0u8; 8];
        let width = T::UNIT.width();
        value.write_be(&mut raw[..width]);
        self.write_bytes_at(offset, &raw[..width]);
    }

    /// Write consecutive scalars of any unit.
    pub fn write_scalars(&mut self, values: &[Scalar]) {
        let mut raw = [0u8; 8];
        for value in values {
            let width = value.width();
            value.write_be(&mut raw[..width]);
            self.write_bytes(&raw[..width]);
        }
    }

    /// Append zero bytes until the populated length is a multiple of `alignment`.
    ///
    /// The write cursor ends up at the new end of the buffer.
    pub fn align_writes(&mut self, alignment: usize) {
        let padded = self.data.len().next_multiple_of(alignment);
        self.ensure_len(padded);
        self.write_offset = padded;
    }
}
