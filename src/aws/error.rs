use std::fmt;

/// Throttling and transient-unavailable error codes that are worth
/// retrying before giving up on a facet
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "SlowDown",
    "TooManyRequests",
    "RequestLimitExceeded",
    "ServiceUnavailable",
];

/// A single facet query failure, classified at the provider boundary.
///
/// "Not configured" is not represented here; it is a normal outcome and
/// surfaces as `Ok(None)` from the store instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetError {
    /// The provider throttled the request; retryable
    Throttled { code: String },

    /// The provider rejected the request (permission denial, missing
    /// bucket, or any other modeled API error)
    Api { code: String, message: String },

    /// The request never produced a provider response (connection,
    /// timeout, credential resolution)
    Transport(String),

    /// The provider response could not be decoded into the expected
    /// facet shape
    Decode(String),
}

impl FacetError {
    /// Classify an error by its provider error code and message.
    ///
    /// A missing code means the request failed before reaching the
    /// provider, which is a transport problem.
    pub fn from_parts(code: Option<String>, message: Option<String>, detail: String) -> Self {
        match code {
            Some(code) if THROTTLING_CODES.contains(&code.as_str()) => Self::Throttled { code },
            Some(code) => Self::Api {
                code,
                message: message.unwrap_or_else(|| "no message".to_string()),
            },
            None => Self::Transport(detail),
        }
    }

    /// Whether retrying the query may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

impl fmt::Display for FacetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetError::Throttled { code } => {
                write!(f, "throttled by the provider ({})", code)
            }
            FacetError::Api { code, message } => {
                write!(f, "provider error {}: {}", code, message)
            }
            FacetError::Transport(detail) => {
                write!(f, "transport failure: {}", detail)
            }
            FacetError::Decode(detail) => {
                write!(f, "could not decode provider response: {}", detail)
            }
        }
    }
}

impl std::error::Error for FacetError {}

/// Failure to build the aggregate for one bucket, or to list buckets.
///
/// One bucket's retrieval error never aborts the processing of other
/// buckets; the orchestration reports it and skips the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Bucket listing itself failed; nothing can be processed
    Listing(FacetError),

    /// One facet of one bucket could not be retrieved
    Facet {
        bucket: String,
        facet: &'static str,
        source: FacetError,
    },
}

impl RetrievalError {
    /// The bucket this error is attributed to, if any
    pub fn bucket(&self) -> Option<&str> {
        match self {
            RetrievalError::Listing(_) => None,
            RetrievalError::Facet { bucket, .. } => Some(bucket),
        }
    }
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalError::Listing(source) => {
                write!(f, "failed to list buckets: {}", source)
            }
            RetrievalError::Facet {
                bucket,
                facet,
                source,
            } => {
                write!(
                    f,
                    "bucket '{}': failed to retrieve {}: {}",
                    bucket, facet, source
                )
            }
        }
    }
}

impl std::error::Error for RetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetrievalError::Listing(source) => Some(source),
            RetrievalError::Facet { source, .. } => Some(source),
        }
    }
}
