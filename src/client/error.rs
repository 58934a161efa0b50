use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not signed in")]
    NotAuthenticated,

    /// A 401 on an authenticated call. The session has already been cleared.
    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message} ({status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session storage: {0}")]
    Storage(String),
}

impl ClientError {
    /// The session is gone and the user has to sign in.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Validation(_) => Some(StatusCode::BAD_REQUEST),
            Self::SessionExpired | Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            Self::NotAuthenticated | Self::Storage(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
