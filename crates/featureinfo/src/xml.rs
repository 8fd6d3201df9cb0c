//! Strict XML parsing and serialization on top of `quick-xml`.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::document::{XmlElement, XmlNode};

#[derive(Debug, Error)]
pub enum XmlParseError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("text outside of the root element")]
    TextOutsideRoot,

    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// Parse a complete XML document into its root element.
///
/// Text nodes are kept as they are, including whitespace between elements.
/// Comments, processing instructions and the doctype are dropped.
pub fn parse_xml(input: &str) -> Result<XmlElement, XmlParseError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let syntax = |message: String| XmlParseError::Syntax { position, message };

        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open_element(&start).map_err(syntax)?),
            Ok(Event::Empty(start)) => {
                let element = open_element(&start).map_err(syntax)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| syntax("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| syntax(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(syntax(e.to_string())),
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlParseError::Unclosed(open.name));
    }
    root.ok_or(XmlParseError::NoRootElement)
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement, String> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(element);
            Ok(())
        }
        None if root.is_some() => Err(XmlParseError::MultipleRoots),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn append_text(stack: &mut [XmlElement], text: &str) -> Result<(), XmlParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlParseError::TextOutsideRoot),
    }
}

/// Write an element and its subtree as XML markup.
pub fn write_element(element: &XmlElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(inner) => write_element(inner, out),
            XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
