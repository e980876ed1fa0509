//! Memory footprint estimates for the node pool a kbin consumer allocates.
//!
//! Firmware that loads kbin documents preallocates one pool for every node
//! and its payload. These functions reproduce that sizing so a tool can report
//! it next to a converted file.

use crate::node::{COUNT_ATTR, SIZE_ATTR, TYPE_ATTR};
use crate::types::{self, TextFormat};
use crate::{Element, TextEncoding};

const POOL_OVERHEAD: usize = 630;
const NODE_COMPRESSED: usize = 52;
const NODE_UNCOMPRESSED: usize = 56;
const MIN_TAG: usize = 8;

/// Bytes of payload that spill out of the per-node slot.
///
/// Values of four bytes or fewer live inside the node itself. Untyped nodes
/// are not counted.
pub fn data_mem_size(root: &Element, encoding: TextEncoding) -> usize {
    root.iter()
        .filter_map(|element| {
            let spec = types::lookup_by_name(element.attribute(TYPE_ATTR)?)?;
            let size = match spec.fixed_count() {
                Some(repeat) => {
                    let count = numeric_attribute(element, COUNT_ATTR);
                    let size = numeric_attribute(element, SIZE_ATTR);
                    repeat
                        .saturating_mul(spec.unit_width())
                        .saturating_mul(count)
                        .saturating_mul(size)
                }
                None if spec.format == TextFormat::Hex => element.text_content().len() / 2,
                None => {
                    let text = element.text_content();
                    let encoded = encoding
                        .encode(text)
                        .map_or_else(|_| text.len(), |bytes| bytes.len());
                    encoded + 1
                }
            };

            if size <= 4 {
                None
            } else if spec.format == TextFormat::Hex {
                Some(size.saturating_add(1) & !1)
            } else {
                Some(size.saturating_add(3) & !3)
            }
        })
        .fold(0, usize::saturating_add)
}

/// Total pool size for `root`, as the consumer would allocate it.
pub fn mem_size(root: &Element, encoding: TextEncoding, compressed: bool) -> usize {
    let data_len = data_mem_size(root, encoding);
    let node_count = root.iter().count();

    let size = if compressed {
        (NODE_COMPRESSED * node_count)
            .saturating_add(data_len)
            .saturating_add(POOL_OVERHEAD)
    } else {
        let tags_len: usize = root
            .iter()
            .map(|element| (element.name.len().max(MIN_TAG) + 3) & !3)
            .sum();
        (NODE_UNCOMPRESSED * node_count)
            .saturating_add(data_len)
            .saturating_add(POOL_OVERHEAD)
            .saturating_add(tags_len)
    };

    size.saturating_add(8) & !7
}

fn numeric_attribute(element: &Element, name: &str) -> usize {
    element
        .attribute(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_stay_in_node() {
        let root = Element::new("root")
            .child(Element::new("a").attr(TYPE_ATTR, "u32").text("1"))
            .child(Element::new("b").attr(TYPE_ATTR, "str").text("abc"));
        assert_eq!(data_mem_size(&root, TextEncoding::Utf8), 0);
    }

    #[test]
    fn test_payload_rounding() {
        let root = Element::new("root")
            // 3 * 2 bytes -> 8
            .child(Element::new("a").attr(TYPE_ATTR, "3u16").text("1 2 3"))
            // 5 bytes -> 6
            .child(Element::new("b").attr(TYPE_ATTR, "bin").text("0102030405"))
            // "hello" + NUL -> 8
            .child(Element::new("c").attr(TYPE_ATTR, "str").text("hello"))
            // 4 * 4 bytes -> 16
            .child(
                Element::new("d")
                    .attr(TYPE_ATTR, "u32")
                    .attr(COUNT_ATTR, "4")
                    .text("1 2 3 4"),
            );
        assert_eq!(data_mem_size(&root, TextEncoding::Utf8), 8 + 6 + 8 + 16);
    }

    #[test]
    fn test_huge_count_saturates() {
        let root = Element::new("root").child(
            Element::new("a")
                .attr(TYPE_ATTR, "4u32")
                .attr(COUNT_ATTR, "9223372036854775808"),
        );
        assert_eq!(data_mem_size(&root, TextEncoding::Utf8), usize::MAX & !3);
        assert_eq!(mem_size(&root, TextEncoding::Utf8, true), usize::MAX & !7);
    }

    #[test]
    fn test_mem_size() {
        let root = Element::new("root").child(Element::new("child_name"));

        // 2 nodes * 52 + 630 = 734, then (734 + 8) & !7 = 736
        assert_eq!(mem_size(&root, TextEncoding::Utf8, true), 736);

        // tags: "root" -> 8, "child_name" -> 12
        // 2 * 56 + 630 + 20 = 762, then (762 + 8) & !7 = 768
        assert_eq!(mem_size(&root, TextEncoding::Utf8, false), 768);
    }
}
