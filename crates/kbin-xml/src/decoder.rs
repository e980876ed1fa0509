//! kbin bytes to element tree.
//!
//! The node stream is a flat record sequence: element starts, attributes and
//! `nodeEnd` markers. The decoder replays it against an arena of elements
//! with an explicit stack of open element indices, then assembles the owned
//! tree once the stream is done.

use kbin_common::ByteBuffer;
use log::{debug, warn};

use crate::aligned::DataReader;
use crate::error::TypeKey;
use crate::name::{NameCodec, RawName};
use crate::node::{COUNT_ATTR, SIZE_ATTR, TYPE_ATTR, XMLNS_PREFIX};
use crate::types::{self, TextFormat, TypeSpec, ARRAY_BIT, ATTR, END_SECTION, NODE_END};
use crate::value::{format_hex, format_values};
use crate::{Element, Error, Header, Result, TextEncoding};

/// Options for [`from_binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    /// Recover from invalid node names and undecodable Shift-JIS strings
    /// instead of failing.
    pub convert_illegal: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_illegal(mut self, convert_illegal: bool) -> Self {
        self.convert_illegal = convert_illegal;
        self
    }
}

/// A decoded kbin document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
    /// Code page declared in the header.
    pub encoding: TextEncoding,
    /// Whether names were sixbit packed.
    pub compressed: bool,
    /// Data stream length declared in the input.
    pub data_size: u32,
}

/// Decode a kbin document.
pub fn from_binary(data: &[u8], options: &DecodeOptions) -> Result<Document> {
    let mut nodes = ByteBuffer::from_slice(data);
    let header = Header::parse(&mut nodes)?;

    let node_end = Header::SIZE + header.node_size as usize;
    if node_end > data.len() {
        return Err(kbin_common::Error::OutOfBounds {
            offset: Header::SIZE,
            needed: header.node_size as usize,
            available: data.len() - Header::SIZE,
        }
        .into());
    }
    nodes.set_end(node_end);

    let data_stream = DataReader::new(&data[node_end..])?;
    let data_size = data_stream.declared_size();
    if data_size as usize != data_stream.available_size() {
        debug!(
            "data stream declares {} bytes, {} present",
            data_size,
            data_stream.available_size()
        );
    }

    let decoder = Decoder {
        options: *options,
        encoding: header.encoding,
        names: NameCodec::new(header.compressed, header.encoding),
        nodes,
        data: data_stream,
        tree: TreeBuilder::default(),
    };

    Ok(Document {
        root: decoder.decode()?,
        encoding: header.encoding,
        compressed: header.compressed,
        data_size,
    })
}

struct Decoder {
    options: DecodeOptions,
    encoding: TextEncoding,
    names: NameCodec,
    nodes: ByteBuffer,
    data: DataReader,
    tree: TreeBuilder,
}

/// Value of one typed node, ready to attach.
struct DecodedValue {
    text: String,
    count: Option<usize>,
    size: Option<usize>,
}

impl Decoder {
    fn decode(mut self) -> Result<Element> {
        'records: while self.nodes.has_data() {
            let offset = self.nodes.read_offset() - Header::SIZE;
            let mut tag = self.nodes.read::<u8>()?;
            while tag == 0 {
                debug!(
                    "skipping padding byte at node offset {}",
                    self.nodes.read_offset() - Header::SIZE - 1
                );
                if !self.nodes.has_data() {
                    break 'records;
                }
                tag = self.nodes.read::<u8>()?;
            }

            let is_array = tag & ARRAY_BIT != 0;
            let type_id = tag & !ARRAY_BIT;

            match type_id {
                NODE_END => {
                    if !self.tree.close() {
                        if !self.options.convert_illegal {
                            return Err(Error::UnbalancedNodeEnd { offset });
                        }
                        warn!("ignoring unmatched nodeEnd at node offset {}", offset);
                    }
                    continue;
                }
                END_SECTION => break,
                _ => {}
            }

            let spec = types::require_id(type_id)?;
            debug!("node type {} ({}) at node offset {}", spec.name(), type_id, offset);

            let name = self.read_name()?;

            if type_id == ATTR {
                let value = self.read_string()?;
                self.tree.attribute(name, value);
                continue;
            }

            let name = self.checked_name(name)?;
            self.tree.open(name);

            if spec.is_void() {
                continue;
            }

            let value = self.read_value(spec, is_array)?;
            if let Some(element) = self.tree.current_mut() {
                element.set_attribute(TYPE_ATTR, spec.name());
                if let Some(count) = value.count {
                    element.set_attribute(COUNT_ATTR, count.to_string());
                }
                if let Some(size) = value.size {
                    element.set_attribute(SIZE_ATTR, size.to_string());
                }
                if !value.text.is_empty() {
                    element.text = Some(value.text);
                }
            }
        }

        self.tree.finish()
    }

    fn read_name(&mut self) -> Result<String> {
        match self.names.read(&mut self.nodes)? {
            RawName::Text(name) => Ok(name),
            RawName::Bytes(bytes) => self.decode_text(&bytes),
        }
    }

    /// Decode text in the document code page, falling back to UTF-8 for
    /// broken Shift-JIS when recovery is enabled.
    fn decode_text(&self, bytes: &[u8]) -> Result<String> {
        match self.encoding.decode(bytes) {
            Ok(text) => Ok(text),
            Err(err @ Error::StringDecodeFailure { .. }) => {
                if !(self.options.convert_illegal && self.encoding.is_shift_jis()) {
                    return Err(err);
                }
                warn!(
                    "malformed Shift-JIS string, decoding as UTF-8 (raw bytes: {:02x?})",
                    bytes
                );
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
            Err(err) => Err(err),
        }
    }

    /// A length-prefixed string with its NUL terminator removed.
    fn read_string(&mut self) -> Result<String> {
        let bytes = self.data.read_prefixed()?;
        let text = bytes.split_last().map_or(&[][..], |(_, body)| body);
        self.decode_text(text)
    }

    fn checked_name(&self, name: String) -> Result<String> {
        if is_valid_name(&name) {
            return Ok(name);
        }

        let renamed = format!("_{}", name);
        if self.options.convert_illegal && is_valid_name(&renamed) {
            warn!("renaming invalid node name {:?} to {:?}", name, renamed);
            return Ok(renamed);
        }
        Err(Error::InvalidNodeName { name, renamed })
    }

    fn read_value(&mut self, spec: &TypeSpec, is_array: bool) -> Result<DecodedValue> {
        let unit = spec
            .unit
            .ok_or_else(|| Error::UnknownType(TypeKey::Id(spec.id)))?;

        let mut value = DecodedValue {
            text: String::new(),
            count: None,
            size: None,
        };

        match spec.fixed_count() {
            None => {
                let bytes = self.data.read_prefixed()?;
                if spec.format == TextFormat::Hex {
                    value.size = Some(bytes.len());
                    value.text = format_hex(&bytes);
                } else {
                    let body = bytes.split_last().map_or(&[][..], |(_, body)| body);
                    value.text = self.decode_text(body)?;
                }
            }
            Some(repeat) if is_array => {
                let byte_len = self.data.read_u32()? as usize;
                let stride = unit.width() * repeat;
                let count = byte_len / stride.max(1);
                let values = self.data.read_units(unit, count * repeat)?;
                value.count = Some(count);
                value.text = format_values(spec, &values);
            }
            Some(repeat) => {
                let bytes = self.data.read_aligned(unit.width() * repeat)?;
                let values = ByteBuffer::from_vec(bytes).read_unit(unit, repeat)?;
                value.text = format_values(spec, &values);
            }
        }

        let trimmed = value.text.trim_end_matches('\0').len();
        value.text.truncate(trimmed);
        Ok(value)
    }
}

/// Whether `name` can be used as an element name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

struct Slot {
    element: Element,
    children: Vec<usize>,
}

struct Binding {
    prefix: String,
    uri: String,
    depth: usize,
}

/// Arena of decoded elements plus the stack of currently open ones.
#[derive(Default)]
struct TreeBuilder {
    slots: Vec<Slot>,
    stack: Vec<usize>,
    roots: Vec<usize>,
    bindings: Vec<Binding>,
}

impl TreeBuilder {
    /// Start a child of the current element (or a root) and make it current.
    fn open(&mut self, name: String) {
        let index = self.slots.len();
        self.slots.push(Slot {
            element: Element::new(name),
            children: Vec::new(),
        });
        match self.stack.last() {
            Some(&parent) => self.slots[parent].children.push(index),
            None => self.roots.push(index),
        }
        self.stack.push(index);
    }

    fn current_mut(&mut self) -> Option<&mut Element> {
        let index = *self.stack.last()?;
        Some(&mut self.slots[index].element)
    }

    fn attribute(&mut self, name: String, value: String) {
        let depth = self.stack.len();
        let Some(element) = self.current_mut() else {
            warn!("dropping attribute {:?} outside any element", name);
            return;
        };

        element.set_attribute(name.clone(), value.clone());
        if let Some(prefix) = name.strip_prefix(XMLNS_PREFIX) {
            self.bindings.push(Binding {
                prefix: prefix.to_string(),
                uri: value,
                depth,
            });
        }
    }

    /// Close the current element. Returns `false` when nothing is open.
    fn close(&mut self) -> bool {
        let depth = self.stack.len();
        let Some(index) = self.stack.pop() else {
            return false;
        };

        let bindings = &self.bindings;
        for attr in &mut self.slots[index].element.attributes {
            if let Some(prefix) = attr.prefix() {
                attr.namespace = resolve(bindings, prefix);
            }
        }

        while self.bindings.last().is_some_and(|binding| binding.depth >= depth) {
            self.bindings.pop();
        }
        true
    }

    /// Close anything still open and assemble the tree.
    fn finish(mut self) -> Result<Element> {
        while self.close() {}

        if self.roots.len() > 1 {
            warn!("node stream has {} root elements, keeping the first", self.roots.len());
        }
        let root = *self.roots.first().ok_or(Error::EmptyDocument)?;

        // Children always have higher indices than their parent, so a reverse
        // sweep finishes every subtree before its parent needs it.
        let mut built: Vec<Option<Element>> = Vec::with_capacity(self.slots.len());
        let mut child_lists = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            built.push(Some(slot.element));
            child_lists.push(slot.children);
        }

        for (index, children) in child_lists.iter().enumerate().rev() {
            let assembled = children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            if let Some(element) = built[index].as_mut() {
                element.children = assembled;
            }
        }

        built[root].take().ok_or(Error::EmptyDocument)
    }
}

fn resolve(bindings: &[Binding], prefix: &str) -> Option<String> {
    bindings
        .iter()
        .rev()
        .find(|binding| binding.prefix == prefix)
        .map(|binding| binding.uri.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_binary, EncodeOptions};

    const MINIMAL: [u8; 20] = [
        0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08, //
        0x01, 0x43, b'r', b'o', b'o', b't', 0xFE, 0xFF, //
        0x00, 0x00, 0x00, 0x00,
    ];

    fn decode(bytes: &[u8]) -> Result<Element> {
        from_binary(bytes, &DecodeOptions::default()).map(|doc| doc.root)
    }

    fn round_trip(root: &Element, options: &EncodeOptions) -> Element {
        let bytes = to_binary(root, options).unwrap();
        decode(&bytes).unwrap()
    }

    #[test]
    fn test_minimal_void_node() {
        let doc = from_binary(&MINIMAL, &DecodeOptions::default()).unwrap();
        assert_eq!(doc.root, Element::new("root"));
        assert_eq!(doc.encoding, TextEncoding::Utf8);
        assert!(!doc.compressed);
        assert_eq!(doc.data_size, 0);
    }

    #[test]
    fn test_corrupt_header() {
        let mut bytes = MINIMAL;
        bytes[3] = 0x00;
        assert!(matches!(decode(&bytes), Err(Error::HeaderCorrupt(_))));

        let mut bytes = MINIMAL;
        bytes[1] = 0x44;
        assert!(matches!(decode(&bytes), Err(Error::HeaderCorrupt(_))));
    }

    #[test]
    fn test_truncated_input() {
        assert!(decode(&MINIMAL[..12]).is_err());
        assert!(decode(&MINIMAL[..17]).is_err());
    }

    #[test]
    fn test_typed_values() {
        let root = Element::new("root")
            .child(Element::new("a").attr(TYPE_ATTR, "u8").text("7"))
            .child(Element::new("b").attr(TYPE_ATTR, "s16").text("-2"))
            .child(Element::new("c").attr(TYPE_ATTR, "3u8").text("1 2 3"))
            .child(Element::new("d").attr(TYPE_ATTR, "float").text("0.500000"))
            .child(Element::new("e").attr(TYPE_ATTR, "ip4").text("10.0.0.1"))
            .child(Element::new("f").attr(TYPE_ATTR, "bool").text("1"))
            .child(Element::new("g").attr(TYPE_ATTR, "u64").text("42"));

        let options = EncodeOptions::new().encoding(TextEncoding::Utf8);
        assert_eq!(round_trip(&root, &options), root.canonical());
    }

    #[test]
    fn test_str_and_bin() {
        let root = Element::new("root")
            .child(Element::new("s").text("hello"))
            .child(Element::new("b").attr(TYPE_ATTR, "bin").text("00ff"));
        let decoded = round_trip(&root, &EncodeOptions::new().encoding(TextEncoding::Utf8));

        let s = &decoded.children[0];
        assert_eq!(s.attribute(TYPE_ATTR), Some("str"));
        assert_eq!(s.text_content(), "hello");

        let b = &decoded.children[1];
        assert_eq!(b.attribute(TYPE_ATTR), Some("bin"));
        assert_eq!(b.attribute(SIZE_ATTR), Some("2"));
        assert_eq!(b.text_content(), "00ff");
    }

    #[test]
    fn test_arrays_get_count() {
        let root = Element::new("v")
            .attr(TYPE_ATTR, "2u16")
            .attr(COUNT_ATTR, "2")
            .text("1 2 3 4");
        let decoded = round_trip(&root, &EncodeOptions::default());
        assert_eq!(decoded.attribute(COUNT_ATTR), Some("2"));
        assert_eq!(decoded.text_content(), "1 2 3 4");
    }

    #[test]
    fn test_attributes_and_children() {
        let root = Element::new("root")
            .attr("version", "2")
            .child(Element::new("item").attr("id", "1"))
            .child(Element::new("item").attr("id", "2").child(Element::new("leaf")));

        for compressed in [false, true] {
            let options = EncodeOptions::new().compressed(compressed);
            assert_eq!(round_trip(&root, &options), root.canonical());
        }
    }

    #[test]
    fn test_unmatched_node_end() {
        // root, nodeEnd, extra nodeEnd, endSection
        let bytes = [
            0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08, //
            0x01, 0x40, b'r', 0xFE, 0xFE, 0xFF, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00,
        ];
        assert!(matches!(
            decode(&bytes),
            Err(Error::UnbalancedNodeEnd { offset: 4 })
        ));

        let lenient = DecodeOptions::new().convert_illegal(true);
        assert_eq!(from_binary(&bytes, &lenient).unwrap().root, Element::new("r"));
    }

    #[test]
    fn test_unknown_type_id() {
        // root, then a child typed 0x2F which is not in the table
        let bytes = [
            0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08, //
            0x01, 0x40, b'r', 0x2F, 0x40, b'x', 0xFE, 0xFF, //
            0x00, 0x00, 0x00, 0x00,
        ];
        for options in [DecodeOptions::default(), DecodeOptions::new().convert_illegal(true)] {
            let err = from_binary(&bytes, &options).unwrap_err();
            assert!(matches!(err, Error::UnknownType(TypeKey::Id(0x2F))));
            assert_eq!(err.to_string(), "unknown node type id 47");
        }
    }

    #[test]
    fn test_missing_end_section_is_accepted() {
        // root, child, no nodeEnd or endSection
        let bytes = [
            0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08, //
            0x01, 0x40, b'r', 0x01, 0x40, b'c', 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00,
        ];
        let root = decode(&bytes).unwrap();
        assert_eq!(root, Element::new("r").child(Element::new("c")));
    }

    #[test]
    fn test_empty_document() {
        let bytes = [
            0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x04, //
            0xFF, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00,
        ];
        assert!(matches!(decode(&bytes), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_invalid_node_name() {
        let bytes = to_binary(
            &Element::new("1st"),
            &EncodeOptions::new().compressed(true),
        )
        .unwrap();

        assert!(matches!(
            decode(&bytes),
            Err(Error::InvalidNodeName { ref renamed, .. }) if renamed == "_1st"
        ));

        let lenient = DecodeOptions::new().convert_illegal(true);
        assert_eq!(from_binary(&bytes, &lenient).unwrap().root.name, "_1st");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("root"));
        assert!(is_valid_name("_x.y-z:w"));
        assert!(is_valid_name("名前"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1st"));
        assert!(!is_valid_name("a b"));
    }

    #[test]
    fn test_namespaces_resolve_on_close() {
        let root = Element::new("root")
            .attr("xmlns:ex", "urn:example")
            .attr("ex:id", "1")
            .child(Element::new("child").attr("ex:flag", "y").attr("other:z", "q"));

        let decoded = round_trip(&root, &EncodeOptions::default());
        let id = decoded.attributes.iter().find(|a| a.name == "ex:id").unwrap();
        assert_eq!(id.namespace.as_deref(), Some("urn:example"));

        let child = &decoded.children[0];
        assert_eq!(child.attributes[0].namespace.as_deref(), Some("urn:example"));
        assert_eq!(child.attributes[1].namespace, None);
    }
}
