//! Bit-exact fixtures and round-trip checks for the kbin codec.

use kbin_xml::{
    binary_to_tree, from_binary, to_binary, tree_to_binary, DecodeOptions, EncodeOptions, Element,
    Error, Header, TextEncoding, COUNT_ATTR, TYPE_ATTR,
};

fn utf8() -> EncodeOptions {
    EncodeOptions::new().encoding(TextEncoding::Utf8)
}

/// Split an encoded document into (node stream, data stream without its length).
fn streams(bytes: &[u8]) -> (&[u8], &[u8]) {
    let node_size = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let node_end = Header::SIZE + node_size;
    let data_size = u32::from_be_bytes(bytes[node_end..node_end + 4].try_into().unwrap()) as usize;
    let data = &bytes[node_end + 4..];
    assert_eq!(data.len(), data_size);
    (&bytes[Header::SIZE..node_end], data)
}

fn sample_tree() -> Element {
    Element::new("response")
        .attr("status", "0")
        .attr("expire", "600")
        .child(
            Element::new("player")
                .child(Element::new("name").attr(TYPE_ATTR, "str").text("PLAYER"))
                .child(Element::new("rank").attr(TYPE_ATTR, "u8").text("12"))
                .child(Element::new("flags").attr(TYPE_ATTR, "2b").text("1 0"))
                .child(Element::new("pos").attr(TYPE_ATTR, "3s16").text("-1 200 -300"))
                .child(Element::new("score").attr(TYPE_ATTR, "s64").text("-9000000000"))
                .child(Element::new("rate").attr(TYPE_ATTR, "double").text("0.250000"))
                .child(Element::new("addr").attr(TYPE_ATTR, "ip4").text("127.0.0.1"))
                .child(Element::new("stamp").attr(TYPE_ATTR, "time").text("1700000000"))
                .child(
                    Element::new("history")
                        .attr(TYPE_ATTR, "u16")
                        .attr(COUNT_ATTR, "5")
                        .text("1 2 3 4 5"),
                )
                .child(Element::new("blob").attr(TYPE_ATTR, "bin").text("deadbeef01")),
        )
        .child(
            Element::new("items").children((0..4).map(|i| {
                Element::new("item")
                    .attr("id", i.to_string())
                    .child(Element::new("kind").attr(TYPE_ATTR, "u8").text(i.to_string()))
                    .child(Element::new("count").attr(TYPE_ATTR, "s8").text((-i).to_string()))
            })),
        )
}

#[test]
fn test_round_trip_both_name_modes() {
    let tree = sample_tree();
    for compressed in [false, true] {
        for encoding in [TextEncoding::ShiftJis, TextEncoding::Utf8, TextEncoding::EucJp] {
            let bytes = tree_to_binary(&tree, encoding, compressed).unwrap();
            let decoded = binary_to_tree(&bytes, false).unwrap();

            // bin nodes gain __size on decode.
            let mut expected = tree.canonical();
            expected.children[0].children[9].set_attribute("__size", "5");
            assert_eq!(decoded.canonical(), expected.canonical());

            // A decoded tree encodes back to the same bytes.
            assert_eq!(tree_to_binary(&decoded, encoding, compressed).unwrap(), bytes);
        }
    }
}

#[test]
fn test_header_invariant() {
    for encoding in TextEncoding::ALL {
        for compressed in [false, true] {
            let bytes = tree_to_binary(&sample_tree(), encoding, compressed).unwrap();
            assert_eq!(bytes[0], 0xA0);
            assert_eq!(bytes[1], if compressed { 0x42 } else { 0x45 });
            assert_eq!(bytes[2] ^ bytes[3], 0xFF);
            assert_eq!(bytes[2], encoding.id());
            assert!(kbin_xml::is_binary_xml(&bytes));

            let (nodes, _) = streams(&bytes);
            assert_eq!(nodes.len() % 4, 0);
        }
    }
    assert!(!kbin_xml::is_binary_xml(b"<?xml version=\"1.0\"?>"));
    assert!(!kbin_xml::is_binary_xml(&[0xA0, 0x43]));
}

#[test]
fn test_aligned_packing() {
    let root = Element::new("r")
        .child(Element::new("a").attr(TYPE_ATTR, "u8").text("17"))
        .child(Element::new("b").attr(TYPE_ATTR, "u8").text("34"))
        .child(Element::new("c").attr(TYPE_ATTR, "u16").text("13124"))
        .child(Element::new("d").attr(TYPE_ATTR, "u8").text("85"))
        .child(Element::new("e").attr(TYPE_ATTR, "u32").text("1719109785"));

    let bytes = to_binary(&root, &utf8()).unwrap();
    let (_, data) = streams(&bytes);
    assert!(data.len() < 20);
    assert_eq!(
        data,
        &[
            0x11, 0x22, 0x55, 0x00, //
            0x33, 0x44, 0x00, 0x00, //
            0x66, 0x77, 0x88, 0x99,
        ]
    );

    let decoded = binary_to_tree(&bytes, false).unwrap();
    let values: Vec<_> = decoded.children.iter().map(Element::text_content).collect();
    assert_eq!(values, ["17", "34", "13124", "85", "1719109785"]);
}

#[test]
fn test_array_framing() {
    let root = Element::new("a")
        .attr(TYPE_ATTR, "u32")
        .attr(COUNT_ATTR, "3")
        .text("1 2 3");

    let bytes = to_binary(&root, &utf8()).unwrap();
    let (_, data) = streams(&bytes);
    assert_eq!(
        data,
        &[0, 0, 0, 12, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
    );
    assert_eq!(data.len() % 4, 0);

    let decoded = binary_to_tree(&bytes, false).unwrap();
    assert_eq!(decoded.attribute(COUNT_ATTR), Some("3"));
    assert_eq!(decoded.text_content(), "1 2 3");
}

#[test]
fn test_minimal_void_node() {
    let expected: [u8; 20] = [
        0xA0, 0x45, 0xA0, 0x5F, 0x00, 0x00, 0x00, 0x08, //
        0x01, 0x43, 0x72, 0x6F, 0x6F, 0x74, 0xFE, 0xFF, //
        0x00, 0x00, 0x00, 0x00,
    ];

    let bytes = tree_to_binary(&Element::new("root"), TextEncoding::Utf8, false).unwrap();
    assert_eq!(bytes, expected);

    let decoded = binary_to_tree(&expected, false).unwrap();
    assert_eq!(decoded.name, "root");
    assert!(decoded.attributes.is_empty());
    assert!(decoded.children.is_empty());
    assert_eq!(decoded.text, None);
}

#[test]
fn test_ip4_field() {
    let root = Element::new("addr").attr(TYPE_ATTR, "ip4").text("192.168.1.1");
    let bytes = to_binary(&root, &utf8()).unwrap();
    let (_, data) = streams(&bytes);
    assert_eq!(data, &[0xC0, 0xA8, 0x01, 0x01]);

    let decoded = binary_to_tree(&bytes, false).unwrap();
    assert_eq!(decoded.text_content(), "192.168.1.1");
}

#[test]
fn test_illegal_shift_jis_string() {
    // U+2713 is E2 9C 93 in UTF-8; as Shift-JIS the trailing lead byte 0x93
    // has no trail byte.
    let root = Element::new("s").text("\u{2713}");
    let mut bytes = to_binary(&root, &utf8()).unwrap();
    bytes[2] = TextEncoding::ShiftJis.id();
    bytes[3] = !TextEncoding::ShiftJis.id();

    let strict = from_binary(&bytes, &DecodeOptions::default());
    assert!(matches!(
        strict,
        Err(Error::StringDecodeFailure {
            encoding: TextEncoding::ShiftJis,
            ..
        })
    ));
    let message = strict.unwrap_err().to_string();
    assert!(message.contains("convert_illegal"));

    let lenient = from_binary(&bytes, &DecodeOptions::new().convert_illegal(true)).unwrap();
    assert_eq!(lenient.root.text_content(), "\u{2713}");
    assert_eq!(lenient.encoding, TextEncoding::ShiftJis);
}

#[test]
fn test_shift_jis_text() {
    let root = Element::new("msg")
        .attr("title", "ゲーム")
        .child(Element::new("body").text("こんにちは"));

    let bytes = tree_to_binary(&root, TextEncoding::ShiftJis, false).unwrap();
    let decoded = binary_to_tree(&bytes, false).unwrap();
    assert_eq!(decoded.attribute("title"), Some("ゲーム"));
    assert_eq!(decoded.children[0].text_content(), "こんにちは");

    // Not representable in ASCII.
    assert!(matches!(
        tree_to_binary(&root, TextEncoding::Ascii, false),
        Err(Error::StringEncodeFailure { .. })
    ));
}

#[cfg(feature = "xml-text")]
#[test]
fn test_xml_text_to_binary_and_back() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<call model="KFC:J:A:A:2019020600" srcid="0120" tag="abc">
  <eacoin method="checkin">
    <cardtype __type="str">1</cardtype>
    <cardid __type="str">E004000000000000</cardid>
    <passwd __type="str">1234</passwd>
    <vals __type="s32" __count="3">1 -2 3</vals>
  </eacoin>
</call>"#;

    let tree = Element::from_xml_str(xml).unwrap();
    let bytes = tree_to_binary(&tree, TextEncoding::ShiftJis, true).unwrap();
    let decoded = binary_to_tree(&bytes, false).unwrap();
    assert_eq!(decoded.canonical(), tree.canonical());

    let rendered = decoded.to_xml_string().unwrap();
    assert_eq!(Element::from_xml_str(&rendered).unwrap(), decoded);
}
