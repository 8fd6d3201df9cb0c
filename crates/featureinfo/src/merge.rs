//! Folding per-layer documents into one response.

use std::fmt;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wms_common::{WmsError, WmsResult};
use wms_protocol::OutputFormat;

use crate::document::{DocumentKind, NormalizedDocument, XmlElement};
use crate::transform::TransformHandle;

/// When fragments from different backends may share one output transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityRule {
    /// Every fragment's output transform for the format family is the same
    /// transform (same id).
    #[default]
    TransformIdentity,
    /// Every fragment has some output transform for the format family; the
    /// first layer's is applied.
    FormatFamily,
}

/// A normalized document together with the output transform its backend
/// offers for the negotiated format family.
#[derive(Debug, Clone)]
pub struct LayerDocument {
    pub backend: String,
    pub document: NormalizedDocument,
    pub output_transform: Option<TransformHandle>,
}

/// Final body and content type of an aggregated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedResult {
    pub content_type: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// All items rendered through one shared output transform
    Homogeneous,
    /// Layer bodies concatenated as they are
    Heterogeneous,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Homogeneous => "homogeneous",
            MergeMode::Heterogeneous => "heterogeneous",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output transform shared by all documents, if the merge is homogeneous.
fn shared_transform<'d>(
    documents: &'d [LayerDocument],
    format: &OutputFormat,
    rule: CompatibilityRule,
) -> Option<&'d TransformHandle> {
    if !format.family().permits_output_transform() {
        return None;
    }

    let mut transforms = documents.iter().map(|layer| match layer.document.kind() {
        DocumentKind::Fragment => layer.output_transform.as_ref(),
        DocumentKind::Opaque => None,
    });

    let first = transforms.next()??;
    for transform in transforms {
        let transform = transform?;
        if rule == CompatibilityRule::TransformIdentity && transform != first {
            return None;
        }
    }
    Some(first)
}

/// Decide how `documents` would be merged into `format`.
pub fn merge_mode(
    documents: &[LayerDocument],
    format: &OutputFormat,
    rule: CompatibilityRule,
) -> MergeMode {
    match shared_transform(documents, format, rule) {
        Some(_) => MergeMode::Homogeneous,
        None => MergeMode::Heterogeneous,
    }
}

/// Merge documents, in layer order, into one response.
///
/// Homogeneous: every item element of every fragment goes into one container
/// named after the first fragment's root, which is rendered once through the
/// shared output transform. Heterogeneous: the documents are concatenated and
/// the first document's content type is used.
pub fn merge(
    documents: &[LayerDocument],
    format: &OutputFormat,
    rule: CompatibilityRule,
) -> WmsResult<MergedResult> {
    let (mode, result) = match shared_transform(documents, format, rule) {
        Some(transform) => (
            MergeMode::Homogeneous,
            merge_homogeneous(documents, format, transform),
        ),
        None => (
            MergeMode::Heterogeneous,
            Ok(merge_heterogeneous(documents, format)),
        ),
    };

    counter!("featureinfo_merge_total", "mode" => mode.as_str()).increment(1);
    debug!(mode = %mode, layers = documents.len(), format = %format, "Merged feature info");
    result
}

fn merge_homogeneous(
    documents: &[LayerDocument],
    format: &OutputFormat,
    transform: &TransformHandle,
) -> WmsResult<MergedResult> {
    let container_name = documents
        .iter()
        .find_map(|layer| match &layer.document {
            NormalizedDocument::Fragment(root) => Some(root.name.as_str()),
            NormalizedDocument::Opaque { .. } => None,
        })
        .unwrap_or("featureInfo");

    let mut container = XmlElement::new(container_name);
    for layer in documents {
        if let Some(items) = layer.document.items() {
            for item in items {
                container.push_element(item.clone());
            }
        }
    }

    let rendered = transform
        .apply(&container)
        .map_err(|e| WmsError::TransformFailure {
            transform: transform.id().to_string(),
            message: e.to_string(),
        })?;

    Ok(MergedResult {
        content_type: format.mime().to_string(),
        body: rendered.serialize(),
    })
}

fn merge_heterogeneous(documents: &[LayerDocument], format: &OutputFormat) -> MergedResult {
    let content_type = documents
        .first()
        .map(|layer| layer.document.content_type().to_string())
        .unwrap_or_else(|| format.mime().to_string());

    MergedResult {
        content_type,
        body: documents
            .iter()
            .map(|layer| layer.document.serialize())
            .collect(),
    }
}
