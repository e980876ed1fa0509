//! Owned element tree.
//!
//! This is the shape both directions of the codec agree on: the encoder walks
//! it and the decoder produces it. Typed values travel as text plus the
//! structural attributes [`TYPE_ATTR`], [`COUNT_ATTR`] and [`SIZE_ATTR`].

/// Declares the node's type by alias.
pub const TYPE_ATTR: &str = "__type";
/// Marks a node as an array and gives its element count.
pub const COUNT_ATTR: &str = "__count";
/// Byte length of a decoded `bin` node.
pub const SIZE_ATTR: &str = "__size";

/// Prefix of namespace declaration attributes.
pub const XMLNS_PREFIX: &str = "xmlns:";

/// Whether an attribute describes the node's value rather than being data.
#[inline]
pub fn is_structural(name: &str) -> bool {
    matches!(name, TYPE_ATTR | COUNT_ATTR | SIZE_ATTR)
}

/// A named attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    /// Qualified name as written, including any `prefix:`.
    pub name: String,
    pub value: String,
    /// Namespace URI bound to the name's prefix, when one was declared.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub namespace: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            namespace: None,
        }
    }

    /// Namespace prefix of a qualified name. Declarations have none.
    pub fn prefix(&self) -> Option<&str> {
        if self.is_namespace_declaration() {
            return None;
        }
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Whether this attribute is an `xmlns:prefix` declaration.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.starts_with(XMLNS_PREFIX)
    }
}

/// A tree element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in insertion order.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub attributes: Vec<Attribute>,
    /// Text content of a leaf node.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub text: Option<String>,
    /// Child elements in document order.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element with the given tag name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute, replacing any existing one with the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set the text content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Add multiple children.
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Value of the attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute in place, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    /// Text content, empty when there is none.
    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Type alias the encoder will use for this node.
    ///
    /// An explicit `__type` wins; otherwise non-blank text makes a `str` node
    /// and anything else is `void`.
    pub fn node_type(&self) -> &str {
        match self.attribute(TYPE_ATTR) {
            Some(declared) => declared,
            None if !self.text_content().trim().is_empty() => "str",
            None => "void",
        }
    }

    /// Copy with attributes sorted by name and empty text dropped, recursively.
    ///
    /// Two trees that differ only in attribute order compare equal once both
    /// are canonical.
    pub fn canonical(&self) -> Element {
        let mut attributes = self.attributes.clone();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        Element {
            name: self.name.clone(),
            attributes,
            text: self.text.clone().filter(|text| !text.is_empty()),
            children: self.children.iter().map(Element::canonical).collect(),
        }
    }

    /// Depth-first, pre-order walk over this element and all descendants.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

/// Pre-order iterator returned by [`Element::iter`].
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}
