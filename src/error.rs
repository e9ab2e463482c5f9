//! Error taxonomy for the API surface
//!
//! Every failure crosses the GraphQL boundary as a request-level error with a
//! human-readable message and a `code` extension. Nothing is retried here;
//! retries are a client concern.

use async_graphql::ErrorExtensions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// An operation that requires a resolved identity was called anonymously.
    #[error("only an authorized user can perform this operation")]
    Unauthenticated,

    /// Lookup by github login yielded nothing.
    #[error("cannot find user with githubLogin '{0}'")]
    UserNotFound(String),

    /// The OAuth exchange or synthetic-profile fetch failed or reported an error.
    #[error("{0}")]
    Upstream(String),

    /// The photo record exists or was compensated, but its binary never made
    /// it to durable storage.
    #[error("photo upload failed: {0}")]
    Attachment(String),

    /// The store call itself errored.
    #[error("storage error: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::UserNotFound(_) => "NOT_FOUND",
            ApiError::Upstream(_) => "UPSTREAM_FAILURE",
            ApiError::Attachment(_) => "ATTACHMENT_FAILED",
            ApiError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

impl From<ApiError> for async_graphql::Error {
    fn from(err: ApiError) -> Self {
        let code = err.code();
        async_graphql::Error::new(err.to_string()).extend_with(|_, e| e.set("code", code))
    }
}
