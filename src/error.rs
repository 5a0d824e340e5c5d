use thiserror::Error;

/// Per-document failures while turning a fetched post into a record.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The body produced no visible text. Extraction still runs on an empty
    /// fragment list, so this is reported, not propagated.
    #[error("document {id:?} has no visible text")]
    MalformedDocument { id: Option<i64> },

    #[error("document {id:?} is missing required field `{field}`")]
    MissingEnvelopeField {
        id: Option<i64>,
        field: &'static str,
    },

    #[error("category `{0}` is not configured")]
    UnknownCategory(String),
}

/// Failures of read-model lookups over a loaded collection.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("category `{0}` not found")]
    CategoryNotFound(String),

    #[error("record {id} has unparseable date `{value}`")]
    UnparseableDate {
        id: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {category} page {page} failed: {source}")]
    Http {
        category: String,
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{category} page {page} returned status {status}")]
    Status {
        category: String,
        page: u32,
        status: reqwest::StatusCode,
    },

    #[error("{category} page {page} is not a JSON array of posts")]
    NotAnArray { category: String, page: u32 },
}

impl FetchError {
    /// Rate limits, server errors and transport errors are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { .. } => true,
            FetchError::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::NotAnArray { .. } => false,
        }
    }
}
