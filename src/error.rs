use warp::http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Bad page size, cursor or interleaver input. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The post source failed; passed through to the caller untouched.
    #[error("post source unavailable")]
    SourceUnavailable(#[source] BoxError),
    #[error("not found: {0}")]
    NotFound(String),
}

impl FeedError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FeedError::InvalidArgument(message.into())
    }

    pub fn unavailable(source: impl Into<BoxError>) -> Self {
        FeedError::SourceUnavailable(source.into())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            FeedError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            FeedError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            FeedError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<rusqlite::Error> for FeedError {
    fn from(value: rusqlite::Error) -> Self {
        FeedError::SourceUnavailable(Box::new(value))
    }
}

impl warp::reject::Reject for FeedError {}
