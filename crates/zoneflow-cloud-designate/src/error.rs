//! Designate client error types

use thiserror::Error;
use zoneflow_cloud::{ClientError, ClientErrorKind};

#[derive(Error, Debug)]
pub enum DesignateError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map an HTTP status to the engine's error kind
pub fn kind_for_status(status: u16) -> ClientErrorKind {
    match status {
        400 => ClientErrorKind::BadRequest,
        401 => ClientErrorKind::Unauthorized,
        403 => ClientErrorKind::Forbidden,
        404 => ClientErrorKind::NotFound,
        409 => ClientErrorKind::Conflict,
        429 => ClientErrorKind::RateLimited,
        other => ClientErrorKind::Api(other),
    }
}

impl From<DesignateError> for ClientError {
    fn from(err: DesignateError) -> Self {
        let message = err.to_string();
        let kind = match &err {
            DesignateError::Api { status, .. } => kind_for_status(*status),
            DesignateError::Http(e) => match e.status() {
                Some(status) => kind_for_status(status.as_u16()),
                None if e.is_decode() => ClientErrorKind::InvalidResponse,
                None => ClientErrorKind::Transport,
            },
            DesignateError::Json(_) => ClientErrorKind::InvalidResponse,
            DesignateError::MissingEnvVar(_) | DesignateError::InvalidConfig(_) => {
                ClientErrorKind::BadRequest
            }
        };
        ClientError::new(kind, message)
    }
}

pub type Result<T> = std::result::Result<T, DesignateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_status() {
        assert_eq!(kind_for_status(404), ClientErrorKind::NotFound);
        assert_eq!(kind_for_status(409), ClientErrorKind::Conflict);
        assert_eq!(kind_for_status(429), ClientErrorKind::RateLimited);
        assert_eq!(kind_for_status(401), ClientErrorKind::Unauthorized);
        assert_eq!(kind_for_status(503), ClientErrorKind::Api(503));
    }

    #[test]
    fn test_api_error_conversion() {
        let err: ClientError = DesignateError::Api {
            status: 409,
            message: "Duplicate Zone".to_string(),
        }
        .into();
        assert_eq!(err.kind, ClientErrorKind::Conflict);
        assert_eq!(err.message, "API error (status 409): Duplicate Zone");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClientError = DesignateError::Json(json_err).into();
        assert_eq!(err.kind, ClientErrorKind::InvalidResponse);
    }
}
