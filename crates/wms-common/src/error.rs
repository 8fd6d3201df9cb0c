//! Error types for the featureinfo proxy.

use thiserror::Error;

use crate::bbox::BboxParseError;
use crate::crs::CrsParseError;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for WMS operations.
///
/// Every backend-side variant is fatal for the whole aggregation: a
/// GetFeatureInfo response never silently omits a queried layer.
#[derive(Debug, Error)]
pub enum WmsError {
    // === WMS Protocol Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer is not queryable: {0}")]
    LayerNotQueryable(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    // === Backend Errors ===
    #[error("Backend '{backend}' unreachable: {message}")]
    BackendUnreachable { backend: String, message: String },

    #[error("Backend '{backend}' timed out")]
    BackendTimeout { backend: String },

    #[error("Backend '{backend}' returned unexpected status {status}")]
    BackendBadResponse { backend: String, status: u16 },

    // === Document Errors ===
    #[error("Failed to parse response from '{backend}': {message}")]
    ParseFailure { backend: String, message: String },

    #[error("Transform '{transform}' failed: {message}")]
    TransformFailure { transform: String, message: String },

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl WmsError {
    /// Get the OGC WMS exception code for this error.
    pub fn wms_exception_code(&self) -> &'static str {
        match self {
            WmsError::MissingParameter(_) => "MissingParameterValue",
            WmsError::InvalidParameter { .. } => "InvalidParameterValue",
            WmsError::LayerNotFound(_) => "LayerNotDefined",
            WmsError::LayerNotQueryable(_) => "LayerNotQueryable",
            WmsError::InvalidCrs(_) => "InvalidCRS",
            WmsError::InvalidBbox(_) => "InvalidParameterValue",
            WmsError::UnsupportedFormat(_) => "InvalidFormat",
            WmsError::OperationNotSupported(_) => "OperationNotSupported",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WmsError::MissingParameter(_)
            | WmsError::InvalidParameter { .. }
            | WmsError::LayerNotQueryable(_)
            | WmsError::InvalidCrs(_)
            | WmsError::InvalidBbox(_)
            | WmsError::UnsupportedFormat(_)
            | WmsError::OperationNotSupported(_) => 400,

            WmsError::LayerNotFound(_) => 404,

            WmsError::BackendUnreachable { .. }
            | WmsError::BackendBadResponse { .. }
            | WmsError::ParseFailure { .. }
            | WmsError::TransformFailure { .. } => 502,

            WmsError::BackendTimeout { .. } => 504,

            WmsError::InternalError(_) => 500,
        }
    }

    /// Whether the error originates from a backend or its response rather than
    /// from the client request.
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            WmsError::BackendUnreachable { .. }
                | WmsError::BackendTimeout { .. }
                | WmsError::BackendBadResponse { .. }
                | WmsError::ParseFailure { .. }
                | WmsError::TransformFailure { .. }
        )
    }
}

impl From<BboxParseError> for WmsError {
    fn from(err: BboxParseError) -> Self {
        WmsError::InvalidBbox(err.to_string())
    }
}

impl From<CrsParseError> for WmsError {
    fn from(err: CrsParseError) -> Self {
        WmsError::InvalidCrs(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_are_gateway_failures() {
        let err = WmsError::BackendBadResponse {
            backend: "a".to_string(),
            status: 500,
        };
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.wms_exception_code(), "NoApplicableCode");
        assert!(err.is_backend_error());

        let err = WmsError::BackendTimeout {
            backend: "a".to_string(),
        };
        assert_eq!(err.http_status_code(), 504);
    }

    #[test]
    fn test_client_errors() {
        let err = WmsError::UnsupportedFormat("image/gif".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.wms_exception_code(), "InvalidFormat");
        assert!(!err.is_backend_error());

        let err = WmsError::LayerNotFound("nope".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.wms_exception_code(), "LayerNotDefined");
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: WmsError = BboxParseError::InvalidFormat("1,2".to_string()).into();
        assert!(matches!(err, WmsError::InvalidBbox(_)));

        let err: WmsError = CrsParseError::Empty.into();
        assert_eq!(err.wms_exception_code(), "InvalidCRS");
    }
}
