//! Element tree to kbin bytes.

use kbin_common::ByteBuffer;
use log::debug;

use crate::aligned::DataWriter;
use crate::error::TypeKey;
use crate::name::NameCodec;
use crate::node::{is_structural, Attribute, COUNT_ATTR};
use crate::types::{self, TypeSpec, ARRAY_BIT, ATTR, END_SECTION, NODE_END};
use crate::value::parse_value;
use crate::{Element, Error, Header, Result, TextEncoding};

/// Options for [`to_binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodeOptions {
    /// Code page for names, strings and attribute values.
    pub encoding: TextEncoding,
    /// Sixbit-pack names instead of writing them as encoded bytes.
    pub compressed: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::ShiftJis,
            compressed: false,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }
}

/// Encode an element tree as a kbin document.
pub fn to_binary(root: &Element, options: &EncodeOptions) -> Result<Vec<u8>> {
    Encoder::new(*options).encode(root)
}

/// One encode pass: a node stream and a data stream filled in lock-step.
struct Encoder {
    options: EncodeOptions,
    names: NameCodec,
    nodes: ByteBuffer,
    data: DataWriter,
}

impl Encoder {
    fn new(options: EncodeOptions) -> Self {
        Self {
            options,
            names: NameCodec::new(options.compressed, options.encoding),
            nodes: ByteBuffer::new(),
            data: DataWriter::new(),
        }
    }

    fn encode(mut self, root: &Element) -> Result<Vec<u8>> {
        self.write_element(root)?;
        self.nodes.write(END_SECTION | ARRAY_BIT);
        self.nodes.align_writes(4);

        let header = Header {
            compressed: self.options.compressed,
            encoding: self.options.encoding,
            node_size: self.nodes.len() as u32,
        };
        let data = self.data.into_vec();
        debug!(
            "encoded {} node bytes and {} data bytes",
            header.node_size,
            data.len()
        );

        let mut out = Vec::with_capacity(Header::SIZE + self.nodes.len() + 4 + data.len());
        header.write(&mut out);
        out.extend_from_slice(self.nodes.as_slice());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&data);
        Ok(out)
    }

    fn write_element(&mut self, element: &Element) -> Result<()> {
        let spec = types::require_name(element.node_type())?;
        if spec.is_marker() {
            return Err(Error::UnknownType(TypeKey::Name(spec.name().to_string())));
        }

        let count = element
            .attribute(COUNT_ATTR)
            .map(|raw| {
                raw.trim().parse::<usize>().map_err(|_| Error::InvalidValue {
                    type_name: COUNT_ATTR.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()?;

        let array_bit = if count.is_some() { ARRAY_BIT } else { 0 };
        self.nodes.write(spec.id | array_bit);
        self.names.write(&element.name, &mut self.nodes)?;

        if !spec.is_void() {
            self.write_value(element, spec, count)?;
        }

        let mut attributes: Vec<&Attribute> = element
            .attributes
            .iter()
            .filter(|attr| !is_structural(&attr.name))
            .collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        for attr in attributes {
            self.write_string(&attr.value)?;
            self.nodes.write(ATTR);
            self.names.write(&attr.name, &mut self.nodes)?;
        }

        for child in &element.children {
            self.write_element(child)?;
        }

        self.nodes.write(NODE_END | ARRAY_BIT);
        Ok(())
    }

    fn write_value(&mut self, element: &Element, spec: &TypeSpec, count: Option<usize>) -> Result<()> {
        let value = parse_value(spec, element.text_content(), self.options.encoding)?;

        let Some(repeat) = spec.fixed_count() else {
            self.data.write_prefixed(&value.bytes);
            return Ok(());
        };

        let expected = match count {
            Some(count) => count.checked_mul(repeat).ok_or_else(|| Error::InvalidValue {
                type_name: COUNT_ATTR.to_string(),
                value: count.to_string(),
            })?,
            None => repeat,
        };
        if value.units != expected {
            return Err(Error::ArrayLengthMismatch {
                name: element.name.clone(),
                expected,
                actual: value.units,
            });
        }

        if count.is_some() {
            self.data.write_prefixed(&value.bytes);
        } else {
            self.data.write_aligned(&value.bytes);
        }
        Ok(())
    }

    /// Attribute values: encoded text plus NUL, length-prefixed.
    fn write_string(&mut self, text: &str) -> Result<()> {
        let mut bytes = self.options.encoding.encode(text)?;
        bytes.push(0);
        self.data.write_prefixed(&bytes);
        Ok(())
    }
}
