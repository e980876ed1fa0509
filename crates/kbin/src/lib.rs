//! kbin - binary XML library.
//!
//! This crate provides a single entry point to the kbin crates.
//!
//! # Crates
//!
//! - [`kbin_common`] - Big-endian byte buffer and primitive storage units
//! - [`kbin_xml`] - Type table, sixbit names, tree model and the binary codec
//!
//! # Example
//!
//! ```
//! use kbin::prelude::*;
//!
//! let root = Element::from_xml_str(r#"<ping><id __type="u16">7</id></ping>"#)?;
//! let bytes = to_binary(&root, &EncodeOptions::default().compressed(true))?;
//!
//! let doc = from_binary(&bytes, &DecodeOptions::default())?;
//! assert!(doc.compressed);
//! assert_eq!(doc.root.children[0].text_content(), "7");
//! # Ok::<(), kbin::Error>(())
//! ```

pub use kbin_common as common;
pub use kbin_xml as xml;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kbin_common::{ByteBuffer, Scalar, StorageUnit};
    pub use kbin_xml::{
        from_binary, is_binary_xml, to_binary, Attribute, DecodeOptions, Document, EncodeOptions,
        Element, TextEncoding, COUNT_ATTR, SIZE_ATTR, TYPE_ATTR,
    };
}

pub use kbin_xml::{Error, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
