use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{service}: access denied: {body}")]
    AccessDenied { service: &'static str, body: String },

    #[error("{service}: unauthorized - check the API key or token")]
    Unauthorized { service: &'static str },

    #[error("{service}: not found: {body}")]
    NotFound { service: &'static str, body: String },

    #[error("{service}: rate limited - gave up after retries")]
    RateLimited { service: &'static str },

    #[error("{service}: server error: {body}")]
    ServerError { service: &'static str, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("{service}: invalid response: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(service: &'static str, status: reqwest::StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { service },
            403 => ApiError::AccessDenied { service, body },
            404 => ApiError::NotFound { service, body },
            429 => ApiError::RateLimited { service },
            500..=599 => ApiError::ServerError { service, body },
            _ => ApiError::InvalidResponse {
                service,
                message: format!("Status {}: {}", status, body),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}
