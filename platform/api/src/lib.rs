use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use thiserror::Error;

/// Shared GraphQL result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("requested {requested} items, maximum is {max}")]
    LimitExceeded { requested: i32, max: i32 },
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// Wrap an unexpected failure. The cause is logged here and masked in
    /// the response.
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "internal api error");
        Self::Internal(Arc::new(err))
    }

    /// Validate a page size against an upper bound.
    pub fn check_limit(requested: i32, max: i32) -> ApiResult<u64> {
        if requested > max {
            return Err(ApiError::LimitExceeded { requested, max });
        }
        if requested < 1 {
            return Err(ApiError::InvalidInput("page size must be positive".into()));
        }
        Ok(requested as u64)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::InvalidInput(_) = self {
            err = err.extend_with(|_err, e| {
                e.set("type", "BAD_REQUEST");
            });
        }
        err
    }
}
