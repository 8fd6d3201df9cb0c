//! Proxy configuration loading and types.
//!
//! The YAML file has three sections:
//!
//! ```yaml
//! featureinfo:
//!   max_concurrency: 8
//!   request_timeout_secs: 30
//!   compatibility: transform_identity
//!   output_transforms:
//!     xml: fi_out.xsl
//!     html: fi_out_html.xsl
//! sources:
//!   a:
//!     url: http://localhost:8081/service_a
//!     version: 1.3.0
//!     layers: [a_one]
//!     input_transform: fi_in.xsl
//! layers:
//!   - name: fi_layer
//!     sources: [a]
//! ```
//!
//! Stylesheet paths are relative to the directory of the config file. Each
//! stylesheet is compiled once and shared by every source referencing it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use featureinfo::{
    AggregatorConfig, BackendDescriptor, CompatibilityRule, LayerRegistry, LogicalLayer,
    TransformHandle,
};
use serde::Deserialize;
use wms_protocol::{FormatFamily, WmsVersion};

fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Raw `featureinfo` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureInfoSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub compatibility: CompatibilityRule,

    /// Output stylesheets shared by all sources, per format family.
    #[serde(default)]
    pub output_transforms: HashMap<FormatFamily, PathBuf>,
}

impl Default for FeatureInfoSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            compatibility: CompatibilityRule::default(),
            output_transforms: HashMap::new(),
        }
    }
}

/// How a source's responses are parsed before its input transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Xml,
    Html,
}

impl InputFormat {
    fn info_format(&self) -> &'static str {
        match self {
            InputFormat::Xml => "text/xml",
            InputFormat::Html => "text/html",
        }
    }
}

/// Raw backend source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,

    #[serde(default)]
    pub version: WmsVersion,

    /// Backend-local layer names
    pub layers: Vec<String>,

    /// Explicit INFO_FORMAT to request
    #[serde(default)]
    pub info_format: Option<String>,

    #[serde(default)]
    pub supported_formats: Vec<String>,

    #[serde(default)]
    pub input_transform: Option<PathBuf>,

    #[serde(default)]
    pub input_format: InputFormat,

    /// Per-source overrides of the shared output stylesheets
    #[serde(default)]
    pub output_transforms: HashMap<FormatFamily, PathBuf>,

    #[serde(default = "default_true")]
    pub queryable: bool,
}

/// Raw client-facing layer definition.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub sources: Vec<String>,
}

/// The config file as written.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub featureinfo: FeatureInfoSection,
    pub sources: BTreeMap<String, SourceConfig>,
    pub layers: Vec<LayerConfig>,
}

/// Resolved proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub aggregator: AggregatorConfig,
    pub request_timeout: Duration,
    pub registry: LayerRegistry,
}

impl ProxyConfig {
    /// Load and resolve a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir)
            .with_context(|| format!("Invalid config: {:?}", path))
    }

    /// Resolve YAML content; stylesheet paths are relative to `base_dir`.
    pub fn from_yaml(content: &str, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config YAML")?;
        Self::resolve(file, base_dir)
    }

    fn resolve(file: ConfigFile, base_dir: &Path) -> Result<Self> {
        let mut stylesheets = StylesheetCache::new(base_dir);

        let mut sources: HashMap<&str, Arc<BackendDescriptor>> = HashMap::new();
        for (name, source) in &file.sources {
            let backend = resolve_source(name, source, &file.featureinfo, &mut stylesheets)?;
            sources.insert(name.as_str(), Arc::new(backend));
        }

        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(file.layers.len());
        for layer in &file.layers {
            if !seen.insert(layer.name.as_str()) {
                bail!("Layer '{}' is defined more than once", layer.name);
            }
            if layer.sources.is_empty() {
                bail!("Layer '{}' has no sources", layer.name);
            }
            let layer_sources = layer
                .sources
                .iter()
                .map(|source| {
                    sources.get(source.as_str()).cloned().with_context(|| {
                        format!("Layer '{}' references unknown source '{}'", layer.name, source)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            layers.push(LogicalLayer::new(layer.name.clone(), layer_sources));
        }

        tracing::info!(
            sources = sources.len(),
            layers = layers.len(),
            stylesheets = stylesheets.len(),
            "Loaded featureinfo configuration"
        );

        Ok(Self {
            aggregator: AggregatorConfig {
                max_concurrency: file.featureinfo.max_concurrency.max(1),
                compatibility: file.featureinfo.compatibility,
            },
            request_timeout: Duration::from_secs(file.featureinfo.request_timeout_secs),
            registry: LayerRegistry::new(layers),
        })
    }
}

fn resolve_source(
    name: &str,
    source: &SourceConfig,
    featureinfo: &FeatureInfoSection,
    stylesheets: &mut StylesheetCache,
) -> Result<BackendDescriptor> {
    if source.layers.is_empty() {
        bail!("Source '{}' has no layers", name);
    }

    let mut backend = BackendDescriptor::new(name, source.url.clone(), source.version, source.layers.clone())
        .with_supported_formats(source.supported_formats.clone())
        .with_queryable(source.queryable);

    if let Some(path) = &source.input_transform {
        let handle = stylesheets
            .get(path)
            .with_context(|| format!("Source '{}': input transform", name))?;
        backend = backend.with_input_transform(handle);
    }

    let info_format = source.info_format.clone().or_else(|| {
        source
            .input_transform
            .as_ref()
            .map(|_| source.input_format.info_format().to_string())
    });
    if let Some(info_format) = info_format {
        backend = backend.with_info_format(info_format);
    }

    let mut outputs: HashMap<FormatFamily, &PathBuf> = featureinfo
        .output_transforms
        .iter()
        .map(|(family, path)| (*family, path))
        .collect();
    outputs.extend(
        source
            .output_transforms
            .iter()
            .map(|(family, path)| (*family, path)),
    );
    for (family, path) in outputs {
        if !family.permits_output_transform() {
            bail!("Source '{}': {} responses cannot have an output transform", name, family);
        }
        let handle = stylesheets
            .get(path)
            .with_context(|| format!("Source '{}': {} output transform", name, family))?;
        backend = backend.with_output_transform(family, handle);
    }

    Ok(backend)
}

/// Compiles each stylesheet file once.
struct StylesheetCache {
    base_dir: PathBuf,
    compiled: HashMap<PathBuf, TransformHandle>,
}

impl StylesheetCache {
    fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            compiled: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.compiled.len()
    }

    fn get(&mut self, path: &Path) -> Result<TransformHandle> {
        let full_path = self.base_dir.join(path);
        if let Some(handle) = self.compiled.get(&full_path) {
            return Ok(handle.clone());
        }

        let source = std::fs::read_to_string(&full_path)
            .with_context(|| format!("Failed to read stylesheet: {:?}", full_path))?;
        let handle = TransformHandle::from_stylesheet(full_path.display().to_string(), &source)
            .with_context(|| format!("Failed to compile stylesheet: {:?}", full_path))?;

        self.compiled.insert(full_path, handle.clone());
        Ok(handle)
    }
}
