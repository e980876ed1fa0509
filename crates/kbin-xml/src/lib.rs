//! kbin binary XML encoder and decoder.
//!
//! kbin is the compact binary form of XML used by arcade and embedded game
//! platforms. A document is an 8-byte header, a node stream describing the
//! element structure and types, and a data stream holding the values.
//! Values are typed through the `__type` attribute (`u8`, `3s32`, `ip4`,
//! `str`, `bin`, ...) and arrays carry a `__count` attribute.
//!
//! # Example
//!
//! ```
//! use kbin_xml::{DecodeOptions, EncodeOptions, Element};
//!
//! let root = Element::new("root")
//!     .attr("version", "1")
//!     .child(Element::new("id").attr("__type", "u32").text("42"));
//!
//! let bytes = kbin_xml::to_binary(&root, &EncodeOptions::default())?;
//! assert!(kbin_xml::is_binary_xml(&bytes));
//!
//! let doc = kbin_xml::from_binary(&bytes, &DecodeOptions::default())?;
//! assert_eq!(doc.root.canonical(), root.canonical());
//! # Ok::<(), kbin_xml::Error>(())
//! ```

mod aligned;
mod decoder;
mod encoder;
mod encoding;
mod error;
mod header;
mod mem;
mod name;
mod node;
pub mod sixbit;
pub mod types;
pub mod value;
#[cfg(feature = "xml-text")]
mod xml;

pub use aligned::{Cursors, DataReader, DataWriter};
pub use decoder::{from_binary, is_valid_name, DecodeOptions, Document};
pub use encoder::{to_binary, EncodeOptions};
pub use encoding::TextEncoding;
pub use error::{Error, Result, TypeKey};
pub use header::{Header, RawHeader};
pub use mem::{data_mem_size, mem_size};
pub use name::{NameCodec, RawName};
pub use node::{is_structural, Attribute, Element, Iter, COUNT_ATTR, SIZE_ATTR, TYPE_ATTR};
pub use types::TypeSpec;

/// Check whether `data` starts like a kbin document.
pub fn is_binary_xml(data: &[u8]) -> bool {
    Header::is_kbin(data)
}

/// Encode `root` with the given code page and name compression.
pub fn tree_to_binary(root: &Element, encoding: TextEncoding, compressed: bool) -> Result<Vec<u8>> {
    to_binary(
        root,
        &EncodeOptions::new().encoding(encoding).compressed(compressed),
    )
}

/// Decode a kbin document to its root element.
pub fn binary_to_tree(data: &[u8], convert_illegal: bool) -> Result<Element> {
    from_binary(data, &DecodeOptions::new().convert_illegal(convert_illegal)).map(|doc| doc.root)
}
