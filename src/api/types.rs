//! API request and response types.

use serde::Serialize;

use crate::session::Session;

/// One session in the list response.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Human-readable session ID.
    pub session_id: String,
    /// Shell target the session is bound to.
    pub target: String,
    /// Current lifecycle status.
    pub status: String,
    /// Number of retained history records.
    pub history_len: usize,
    /// Idle duration in seconds.
    pub idle_seconds: f64,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.to_string(),
            target: session.target.clone(),
            status: format!("{:?}", session.status).to_lowercase(),
            history_len: session.history.len(),
            idle_seconds: session.idle_duration().as_secs_f64(),
        }
    }
}

/// Response for listing sessions.
#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    #[test]
    fn test_session_summary() {
        let session = Session::new(SessionId::new(), "web1", 200);
        let summary = SessionSummary::from_session(&session);
        assert_eq!(summary.target, "web1");
        assert_eq!(summary.status, "connecting");
        assert_eq!(summary.history_len, 0);
        assert!(summary.session_id.starts_with("con-"));
    }

    #[test]
    fn test_error_response_shape() {
        let resp = ErrorResponse::internal_error("boom");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("INTERNAL_ERROR"));
        assert!(json.contains("boom"));
    }
}
