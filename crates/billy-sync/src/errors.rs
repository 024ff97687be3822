use std::error::Error;

use billy_config::ConfigError;
use billy_protocol::NormalizeError;

/// Base trait for all panel errors
pub trait PanelError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Failure of one device API call.
///
/// `Clone` so that every caller joined on a coalesced fetch receives the same
/// error value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("device unreachable: {message}")]
    Transport { message: String },

    #[error("device error (HTTP {status}): {}", .message.as_deref().unwrap_or("no details"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("device rejected request (HTTP {status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("unexpected device response: {message}")]
    Decode { message: String },
}

impl ApiError {
    /// Network failures and 5xx responses may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Server { .. })
    }

    /// Message for a user-facing notification: the device's own `error`
    /// text when it sent one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            }
            | ApiError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl PanelError for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Transport { .. } => "DEVICE_UNREACHABLE",
            ApiError::Server { .. } => "DEVICE_SERVER_ERROR",
            ApiError::Rejected { .. } => "DEVICE_REJECTED",
            ApiError::Decode { .. } => "DEVICE_DECODE_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{operation} failed: {source}")]
    Api {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("cannot delete active profile '{id}'")]
    ActiveProfileDeletion { id: String },

    #[error("{operation} requires a selected user")]
    NoCurrentUser { operation: &'static str },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl SessionError {
    pub(crate) fn api(operation: &'static str, source: ApiError) -> Self {
        SessionError::Api { operation, source }
    }
}

impl PanelError for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            SessionError::Api { source, .. } => source.error_code(),
            SessionError::ActiveProfileDeletion { .. } => "ACTIVE_PROFILE_DELETION",
            SessionError::NoCurrentUser { .. } => "NO_CURRENT_USER",
            SessionError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            SessionError::Api { source, .. } => source.is_user_error(),
            SessionError::ActiveProfileDeletion { .. }
            | SessionError::NoCurrentUser { .. }
            | SessionError::InvalidInput { .. } => true,
        }
    }
}

impl PanelError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ConfigError::HomeNotFound => "HOME_NOT_FOUND",
            ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigParseError { .. } | ConfigError::InvalidConfiguration { .. }
        )
    }
}

impl PanelError for NormalizeError {
    fn error_code(&self) -> &'static str {
        match self {
            NormalizeError::UnknownShape { .. } => "UNKNOWN_USER_SHAPE",
            NormalizeError::MissingName => "USER_MISSING_NAME",
        }
    }
}
