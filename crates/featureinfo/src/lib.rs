//! GetFeatureInfo aggregation pipeline.
//!
//! One client query fans out to every backend that contributes to the queried
//! layers, and the responses are folded back into a single document:
//!
//! ```text
//! query -> translate (per backend) -> dispatch -> normalize (per backend) -> merge
//!   \-> negotiate output format ---------------------------------------------^
//! ```
//!
//! Every stage is all-or-nothing; a failing backend fails the whole request.

pub mod aggregate;
pub mod backend;
pub mod dispatch;
pub mod document;
pub mod html;
pub mod layers;
pub mod merge;
pub mod negotiate;
pub mod normalize;
pub mod transform;
pub mod translate;
pub mod xml;
pub mod xpath;
pub mod xslt;

pub use aggregate::{AggregatorConfig, FeatureInfoAggregator};
pub use backend::BackendDescriptor;
pub use dispatch::{HttpFetcher, HttpResponse, RawResponse, ReqwestFetcher};
pub use document::{DocumentKind, NormalizedDocument, XmlElement, XmlNode};
pub use layers::{LayerRegistry, LogicalLayer};
pub use merge::{CompatibilityRule, LayerDocument, MergeMode, MergedResult};
pub use transform::{TransformError, TransformHandle, TreeTransform};
pub use translate::SubRequest;
pub use xslt::Stylesheet;
