//! Tolerant HTML parsing.
//!
//! Backends frequently answer GetFeatureInfo with tag soup: unclosed
//! paragraphs, no `<html>` element, stray text. `scraper` (html5ever) repairs
//! all of that the way a browser would, so parsing never fails; the repaired
//! tree is then copied into the crate's own element model so HTML and XML
//! responses go through the same transform engine.

use scraper::{ElementRef, Html, Node};

use crate::document::{XmlElement, XmlNode};

/// Parse an HTML document, repairing malformed markup.
///
/// The returned root is always the `html` element.
pub fn parse_html(input: &str) -> XmlElement {
    let document = Html::parse_document(input);
    convert_element(document.root_element())
}

fn convert_element(element: ElementRef<'_>) -> XmlElement {
    let value = element.value();
    let mut converted = XmlElement::new(value.name());
    converted.attributes = value
        .attrs()
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .collect();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => converted.push_text(&**text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    converted
                        .children
                        .push(XmlNode::Element(convert_element(child_element)));
                }
            }
            _ => {}
        }
    }

    converted
}
