//! Document model shared by the parsers, the transform engine and the merger.

use std::borrow::Cow;

/// Content type reported for a fragment that leads a heterogeneous merge.
pub const FRAGMENT_CONTENT_TYPE: &str = "text/xml";

/// A node in a parsed document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An element holding a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.push_text(text);
        element
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Append text, joining it with a directly preceding text node.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(XmlNode::Text(existing)) => existing.push_str(&text),
            _ => self.children.push(XmlNode::Text(text)),
        }
    }

    /// Child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated text of all descendant text nodes (the XPath string-value).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize as XML markup without a declaration.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        crate::xml::write_element(self, &mut out);
        out
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(inner) => collect_text(inner, out),
        }
    }
}

/// Whether a normalized document went through an input transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Opaque,
    Fragment,
}

/// One backend response after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedDocument {
    /// Untransformed response, carried through verbatim.
    Opaque { content_type: String, body: String },
    /// Transformed response: a container element whose child elements are the
    /// feature info items.
    Fragment(XmlElement),
}

impl NormalizedDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            NormalizedDocument::Opaque { .. } => DocumentKind::Opaque,
            NormalizedDocument::Fragment(_) => DocumentKind::Fragment,
        }
    }

    /// The document's own content type.
    pub fn content_type(&self) -> &str {
        match self {
            NormalizedDocument::Opaque { content_type, .. } => content_type,
            NormalizedDocument::Fragment(_) => FRAGMENT_CONTENT_TYPE,
        }
    }

    /// Body representation used when documents are concatenated.
    pub fn serialize(&self) -> Cow<'_, str> {
        match self {
            NormalizedDocument::Opaque { body, .. } => Cow::Borrowed(body),
            NormalizedDocument::Fragment(root) => Cow::Owned(root.serialize()),
        }
    }

    /// The item elements of a fragment; `None` for opaque documents.
    pub fn items(&self) -> Option<impl Iterator<Item = &XmlElement>> {
        match self {
            NormalizedDocument::Opaque { .. } => None,
            NormalizedDocument::Fragment(root) => Some(root.child_elements()),
        }
    }
}
