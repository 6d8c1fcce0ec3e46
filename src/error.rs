//! Client error taxonomy.

use thiserror::Error;

use tessera_api_types::ErrorPayload;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Raised by the session guard before any request is sent.
    #[error("not authenticated: no session is established")]
    Unauthenticated,
    /// A fetch ran without the identifier it needs.
    #[error("missing required argument `{0}`")]
    UndefinedArgument(&'static str),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Server { status: u16, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    /// A 2xx response that embeds per-target failures.
    #[error("{} of the targets failed: {}", .0.len(), first_message(.0))]
    Partial(Vec<ErrorPayload>),
}

impl ApiError {
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// HTTP status when the failure came from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Http(err) => err.status().map(|s| s.as_u16()),
            ApiError::Partial(errors) => errors.iter().find_map(|e| e.status_code),
            _ => None,
        }
    }

    /// Contract violations are bugs in the caller, not transient failures.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ApiError::UndefinedArgument(_))
    }
}

fn first_message(errors: &[ErrorPayload]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}
