//! Per-backend configuration.

use std::collections::HashMap;

use wms_protocol::{DialectSpec, FormatFamily, OutputFormat, WmsVersion};

use crate::transform::TransformHandle;

/// One upstream WMS that contributes feature info to a logical layer.
///
/// Descriptors are built once from configuration and shared read-only by
/// every request.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    /// Source name, used in logs, metrics and errors
    pub name: String,
    /// Base service URL; query parameters are appended
    pub url: String,
    /// Protocol version spoken to this backend
    pub version: WmsVersion,
    /// Backend-local layer names sent in LAYERS and QUERY_LAYERS
    pub layers: Vec<String>,
    /// INFO_FORMAT to request; `None` leaves the choice to the backend
    pub info_format: Option<String>,
    /// Response formats the backend produces natively; empty means any
    pub supported_formats: Vec<String>,
    /// Normalizes responses into a container of item elements
    pub input_transform: Option<TransformHandle>,
    /// Renders merged containers, per output format family
    pub output_transforms: HashMap<FormatFamily, TransformHandle>,
    /// Non-queryable sources are skipped when resolving query layers
    pub queryable: bool,
}

impl BackendDescriptor {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        version: WmsVersion,
        layers: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version,
            layers,
            info_format: None,
            supported_formats: Vec::new(),
            input_transform: None,
            output_transforms: HashMap::new(),
            queryable: true,
        }
    }

    pub fn with_info_format(mut self, info_format: impl Into<String>) -> Self {
        self.info_format = Some(info_format.into());
        self
    }

    pub fn with_supported_formats(mut self, formats: Vec<String>) -> Self {
        self.supported_formats = formats;
        self
    }

    pub fn with_input_transform(mut self, transform: TransformHandle) -> Self {
        self.input_transform = Some(transform);
        self
    }

    pub fn with_output_transform(mut self, family: FormatFamily, transform: TransformHandle) -> Self {
        self.output_transforms.insert(family, transform);
        self
    }

    pub fn with_queryable(mut self, queryable: bool) -> Self {
        self.queryable = queryable;
        self
    }

    /// Parameter names, axis order rule and default format of the backend's
    /// protocol version.
    pub fn dialect(&self) -> &'static DialectSpec {
        self.version.dialect()
    }

    pub fn output_transform(&self, family: FormatFamily) -> Option<&TransformHandle> {
        self.output_transforms.get(&family)
    }

    /// Whether this backend's pipeline can contribute to a response in
    /// `format`: it either produces the format itself or renders it through an
    /// output transform.
    pub fn can_produce(&self, format: &OutputFormat) -> bool {
        self.supported_formats.is_empty()
            || self
                .supported_formats
                .iter()
                .any(|supported| format.matches_mime(supported))
            || (self.input_transform.is_some()
                && format.family().permits_output_transform()
                && self.output_transform(format.family()).is_some())
    }
}
