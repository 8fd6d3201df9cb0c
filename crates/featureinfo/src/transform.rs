//! Tree transforms and the handles that configuration hands out for them.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::document::XmlElement;
use crate::xpath::XPathError;
use crate::xslt::Stylesheet;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid stylesheet: {0}")]
    Stylesheet(String),

    #[error("unsupported stylesheet construct: {0}")]
    Unsupported(String),

    #[error(transparent)]
    XPath(#[from] XPathError),

    #[error("transform produced no output element")]
    EmptyResult,

    #[error("transform produced {0} root elements, expected one")]
    MultipleRoots(usize),

    #[error("template recursion deeper than {0} levels")]
    RecursionLimit(usize),
}

/// Something that rewrites one document tree into another.
pub trait TreeTransform: Send + Sync + fmt::Debug {
    fn transform(&self, input: &XmlElement) -> Result<XmlElement, TransformError>;
}

/// A named, shareable transform.
///
/// Two handles are equal when their ids are equal; the merger relies on this
/// to decide whether layers share an output transform.
#[derive(Clone)]
pub struct TransformHandle {
    id: String,
    transform: Arc<dyn TreeTransform>,
}

impl TransformHandle {
    pub fn new(id: impl Into<String>, transform: Arc<dyn TreeTransform>) -> Self {
        Self {
            id: id.into(),
            transform,
        }
    }

    /// Compile an XSL stylesheet into a handle.
    pub fn from_stylesheet(id: impl Into<String>, source: &str) -> Result<Self, TransformError> {
        let stylesheet = Stylesheet::parse(source)?;
        Ok(Self::new(id, Arc::new(stylesheet)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn apply(&self, input: &XmlElement) -> Result<XmlElement, TransformError> {
        self.transform.transform(input)
    }
}

impl PartialEq for TransformHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TransformHandle {}

impl fmt::Debug for TransformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformHandle").field("id", &self.id).finish()
    }
}
