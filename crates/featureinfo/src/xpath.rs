//! The XPath subset understood by the stylesheet engine.
//!
//! Expressions are unions (`|`) of location paths built from child steps,
//! `//` descendant steps, `.`, `@name`, and the node tests `name`, `*`,
//! `text()` and `node()`. Predicates, axes other than child/descendant/self/
//! attribute, and functions are rejected at compile time.

use std::fmt;

use thiserror::Error;

use crate::document::{XmlElement, XmlNode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XPathError {
    #[error("empty expression")]
    Empty,

    #[error("unsupported expression '{0}'")]
    Unsupported(String),

    #[error("invalid step '{step}' in '{expression}'")]
    InvalidStep { expression: String, step: String },
}

/// A node visible to expressions during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    /// The document node; its only child is the given root element.
    Document(&'a XmlElement),
    Element(&'a XmlElement),
    Text(&'a str),
    Attribute(&'a str),
}

impl<'a> NodeRef<'a> {
    /// Child nodes in document order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::Document(root) => vec![NodeRef::Element(root)],
            NodeRef::Element(element) => element.children.iter().map(NodeRef::from).collect(),
            NodeRef::Text(_) | NodeRef::Attribute(_) => Vec::new(),
        }
    }

    /// The XPath string-value of the node.
    pub fn string_value(&self) -> String {
        match *self {
            NodeRef::Document(element) | NodeRef::Element(element) => element.text_content(),
            NodeRef::Text(text) | NodeRef::Attribute(text) => text.to_string(),
        }
    }

    fn descendants(&self, out: &mut Vec<NodeRef<'a>>) {
        for child in self.children() {
            out.push(child);
            child.descendants(out);
        }
    }
}

impl<'a> From<&'a XmlNode> for NodeRef<'a> {
    fn from(node: &'a XmlNode) -> Self {
        match node {
            XmlNode::Element(element) => NodeRef::Element(element),
            XmlNode::Text(text) => NodeRef::Text(text),
        }
    }
}

/// What a step selects among the candidate nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    Node,
}

impl NodeTest {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "*" => Some(NodeTest::AnyElement),
            "text()" => Some(NodeTest::Text),
            "node()" => Some(NodeTest::Node),
            name if is_qname(name) => Some(NodeTest::Name(name.to_string())),
            _ => None,
        }
    }

    pub fn matches(&self, node: &NodeRef<'_>) -> bool {
        match (self, node) {
            (NodeTest::Name(name), NodeRef::Element(element)) => element.name == *name,
            (NodeTest::AnyElement, NodeRef::Element(_)) => true,
            (NodeTest::Text, NodeRef::Text(_)) => true,
            (NodeTest::Node, NodeRef::Element(_) | NodeRef::Text(_)) => true,
            _ => false,
        }
    }

    /// Default XSLT template priority for a pattern made of this test.
    pub fn default_priority(&self) -> f64 {
        match self {
            NodeTest::Name(_) => 0.0,
            NodeTest::AnyElement | NodeTest::Text | NodeTest::Node => -0.5,
        }
    }
}

fn is_qname(token: &str) -> bool {
    let mut chars = token.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    valid_start
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        && !token.starts_with(':')
        && !token.ends_with(':')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Child(NodeTest),
    Descendant(NodeTest),
    SelfNode,
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// A compiled select expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    source: String,
    paths: Vec<LocationPath>,
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, XPathError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(XPathError::Empty);
        }
        let paths = source
            .split('|')
            .map(|part| parse_path(source, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.to_string(),
            paths,
        })
    }

    /// Evaluate against a context node. `root` is the document's root element,
    /// used by absolute paths.
    pub fn select<'a>(&self, root: &'a XmlElement, context: NodeRef<'a>) -> Vec<NodeRef<'a>> {
        let mut result = Vec::new();
        for path in &self.paths {
            let start = if path.absolute {
                NodeRef::Document(root)
            } else {
                context
            };
            let mut current = vec![start];
            for step in &path.steps {
                current = apply_step(step, &current);
            }
            result.extend(current);
        }
        result
    }

    /// String-value of the first selected node, or the empty string.
    pub fn string_value<'a>(&self, root: &'a XmlElement, context: NodeRef<'a>) -> String {
        self.select(root, context)
            .first()
            .map(NodeRef::string_value)
            .unwrap_or_default()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn apply_step<'a>(step: &Step, nodes: &[NodeRef<'a>]) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    for node in nodes {
        match step {
            Step::Child(test) => out.extend(node.children().into_iter().filter(|n| test.matches(n))),
            Step::Descendant(test) => {
                let mut all = Vec::new();
                node.descendants(&mut all);
                out.extend(all.into_iter().filter(|n| test.matches(n)));
            }
            Step::SelfNode => out.push(*node),
            Step::Attribute(name) => {
                if let NodeRef::Element(element) = node {
                    if let Some(value) = element.attribute(name) {
                        out.push(NodeRef::Attribute(value));
                    }
                }
            }
        }
    }
    out
}

fn parse_path(expression: &str, path: &str) -> Result<LocationPath, XPathError> {
    let invalid = |step: &str| XPathError::InvalidStep {
        expression: expression.to_string(),
        step: step.to_string(),
    };

    if path.is_empty() {
        return Err(XPathError::Empty);
    }
    if path.contains('[') || path.contains("::") || (path.contains('(') && !is_node_type_only(path))
    {
        return Err(XPathError::Unsupported(expression.to_string()));
    }

    let absolute = path.starts_with('/');
    let (mut descendant, rest) = if let Some(rest) = path.strip_prefix("//") {
        (true, rest)
    } else if let Some(rest) = path.strip_prefix('/') {
        (false, rest)
    } else {
        (false, path)
    };

    let mut steps = Vec::new();
    if rest.is_empty() {
        return if descendant {
            Err(invalid(path))
        } else {
            Ok(LocationPath { absolute, steps })
        };
    }

    for segment in rest.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            if descendant {
                return Err(invalid(path));
            }
            descendant = true;
            continue;
        }
        let step = match segment {
            "." => Step::SelfNode,
            ".." => return Err(XPathError::Unsupported(expression.to_string())),
            attr if attr.starts_with('@') => {
                let name = &attr[1..];
                if !is_qname(name) {
                    return Err(invalid(segment));
                }
                Step::Attribute(name.to_string())
            }
            token => {
                let test = NodeTest::parse(token).ok_or_else(|| invalid(segment))?;
                if descendant {
                    Step::Descendant(test)
                } else {
                    Step::Child(test)
                }
            }
        };
        if descendant && matches!(step, Step::SelfNode | Step::Attribute(_)) {
            return Err(XPathError::Unsupported(expression.to_string()));
        }
        descendant = false;
        steps.push(step);
    }

    if descendant {
        return Err(invalid(path));
    }
    Ok(LocationPath { absolute, steps })
}

/// Parentheses are only allowed as part of the `text()` and `node()` tests.
fn is_node_type_only(path: &str) -> bool {
    path.replace("text()", "").replace("node()", "").find(['(', ')']).is_none()
}

/// A template match pattern: `/`, or alternatives of single node tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    alternatives: Vec<PatternAlt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternAlt {
    Root,
    Test(NodeTest),
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, XPathError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(XPathError::Empty);
        }
        let alternatives = source
            .split('|')
            .map(|alt| match alt.trim() {
                "/" => Ok(PatternAlt::Root),
                token => NodeTest::parse(token)
                    .map(PatternAlt::Test)
                    .ok_or_else(|| XPathError::Unsupported(source.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Priority of the best alternative matching `node`, if any matches.
    pub fn match_priority(&self, node: &NodeRef<'_>) -> Option<f64> {
        self.alternatives
            .iter()
            .filter_map(|alt| match alt {
                PatternAlt::Root => matches!(node, NodeRef::Document(_)).then_some(0.5),
                PatternAlt::Test(test) => test.matches(node).then(|| test.default_priority()),
            })
            .reduce(f64::max)
    }
}
