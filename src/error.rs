use thiserror::Error;

/// Errors callers are expected to tell apart.
///
/// Transport and parsing failures inside a concurrent batch travel as plain
/// `anyhow::Error` and are isolated by [`crate::pool`]; the variants here are
/// the ones surfaced synchronously to the immediate caller.
#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("Invalid sampling method: {0}")]
    InvalidSamplingMethod(String),

    #[error("Unrecognized query strategy: {0}")]
    InvalidQueryStrategy(String),

    #[error("story_ids should be a list of valid story ids (got {0:?})")]
    InvalidStoryIds(String),

    #[error("limit should be between {min} and {max} (got {value})")]
    LimitOutOfBounds { value: i64, min: i64, max: i64 },

    #[error("days_back should be between {min} and {max} (got {value})")]
    DaysBackOutOfBounds { value: i64, min: i64, max: i64 },

    #[error("Unknown story attribute: {0}")]
    UnknownAttribute(String),

    #[error("Unsupported news market: {0}")]
    InvalidMarket(String),

    #[error("Similarity threshold must be within [0, 1] (got {0})")]
    InvalidThreshold(f32),

    #[error("A vector query must be provided when vector search is enabled")]
    MissingVectorQuery,

    #[error("The database is currently replicating. Please try again later.")]
    Replicating,

    #[error("Story database is not configured")]
    StoreUnavailable,

    #[error("Story lookup failed: {0}")]
    StoreQuery(String),

    #[error("News API rate limited the request")]
    RateLimited,

    #[error("News API server error (status {status}): {message}")]
    UpstreamServer { status: u16, message: String },

    #[error("Upstream request failed (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

impl PlaygroundError {
    /// Synchronous validation failures, as opposed to upstream ones.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSamplingMethod(_)
                | Self::InvalidQueryStrategy(_)
                | Self::InvalidStoryIds(_)
                | Self::LimitOutOfBounds { .. }
                | Self::DaysBackOutOfBounds { .. }
                | Self::UnknownAttribute(_)
                | Self::InvalidMarket(_)
                | Self::InvalidThreshold(_)
                | Self::MissingVectorQuery
        )
    }

    /// Rate-limit and 5xx responses from the news feed are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamServer { .. })
    }
}
