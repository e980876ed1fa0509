//! Conversion between [`Element`] trees and XML text.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::node::Attribute;
use crate::{Element, Error, Result};

impl Element {
    /// Parse XML text into an element tree.
    ///
    /// Text is trimmed; declarations, comments and processing instructions
    /// are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use kbin_xml::Element;
    ///
    /// let root = Element::from_xml_str(r#"<root><id __type="u32">7</id></root>"#).unwrap();
    /// assert_eq!(root.children[0].attribute("__type"), Some("u32"));
    /// assert_eq!(root.children[0].text_content(), "7");
    /// ```
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(start_element(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = start_element(&e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(element) = stack.last_mut() {
                        let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                        append_text(element, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(element) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        append_text(element, &text);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Xml(format!("XML parse error: {}", e))),
            }
        }

        root.ok_or_else(|| Error::Xml("no root element found in XML".to_string()))
    }

    /// Parse XML bytes. The input must be UTF-8.
    pub fn from_xml_bytes(xml: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(xml).map_err(|e| Error::Xml(e.to_string()))?;
        Self::from_xml_str(xml.strip_prefix('\u{feff}').unwrap_or(xml))
    }

    /// Render as indented XML with a UTF-8 declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output)?;
        String::from_utf8(output).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Write indented XML with a UTF-8 declaration.
    pub fn write_xml<W: Write>(&self, writer: W) -> Result<()> {
        let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);
        xml_writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::Xml(e.to_string()))?;
        write_element(&mut xml_writer, self)
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = Element::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        element.attributes.push(Attribute::new(key, value));
    }

    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn append_text(element: &mut Element, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    match element.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    let text = element.text.as_deref().filter(|text| !text.is_empty());
    if text.is_none() && element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Xml(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xml(e.to_string()))?;

    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Xml(e.to_string()))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TYPE_ATTR;

    #[test]
    fn test_parse_nested() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<root version="1">
    <!-- comment -->
    <items>
        <item id="a"/>
        <item id="b">text &amp; more</item>
    </items>
    <empty></empty>
</root>"#;

        let root = Element::from_xml_str(xml).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("version"), Some("1"));
        assert_eq!(root.children.len(), 2);

        let items = &root.children[0];
        assert_eq!(items.children.len(), 2);
        assert_eq!(items.children[1].text_content(), "text & more");
        assert_eq!(root.children[1], Element::new("empty"));
    }

    #[test]
    fn test_empty_input() {
        assert!(Element::from_xml_str("").is_err());
        assert!(Element::from_xml_bytes(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_write_layout() {
        let root = Element::new("root")
            .attr("a", "x<y")
            .child(Element::new("v").attr(TYPE_ATTR, "u8").text("1"))
            .child(Element::new("e"));

        let xml = root.to_xml_string().unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <root a=\"x&lt;y\">\n  \
             <v __type=\"u8\">1</v>\n  \
             <e/>\n\
             </root>"
        );
    }

    #[test]
    fn test_text_round_trip() {
        let root = Element::new("root")
            .attr("xmlns:ex", "urn:example")
            .child(Element::new("s").attr("ex:k", "v").text("a & b"))
            .child(Element::new("n").attr(TYPE_ATTR, "3s8").text("-1 0 1"));

        let xml = root.to_xml_string().unwrap();
        assert_eq!(Element::from_xml_str(&xml).unwrap(), root);
        assert_eq!(Element::from_xml_bytes(xml.as_bytes()).unwrap(), root);
    }
}
