//! Common utilities for kbin.
//!
//! This crate provides the low-level pieces shared by the kbin codec crates:
//!
//! - [`ByteBuffer`] - Growable big-endian byte buffer with independent read and write cursors
//! - [`StorageUnit`] - Primitive storage kinds and their binary widths
//! - [`Scalar`] - A single primitive value tagged with its storage unit
//! - [`Primitive`] - Rust number types that can be read from and written to a buffer

mod buffer;
mod error;
mod scalar;

pub use buffer::ByteBuffer;
pub use error::{Error, Result};
pub use scalar::{storage_width, Primitive, Scalar, StorageUnit};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
