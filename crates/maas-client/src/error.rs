//! MAAS client errors

use thiserror::Error;

/// Errors returned by `MaasClientTrait` implementations
#[derive(Debug, Error)]
pub enum MaasError {
    /// The request never produced a response (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// MAAS answered with an unexpected status, or refused the operation
    #[error("MAAS API error: {0}")]
    Api(String),

    /// The response body was not the JSON the endpoint documents
    #[error("could not decode response from {path}: {source} (body starts: {body})")]
    Decode {
        path: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// API key malformed, or rejected with 401/403
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// 404 from MAAS
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400 from MAAS, or a request that cannot be built (e.g. saving a machine without a zone)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
