//! Typed error hierarchy for issue-pilot.
//!
//! `DispatchError` is the taxonomy every orchestration operation reports.
//! Collaborator failures (GitHub, Devin) are classified once, at the client
//! boundary, and then travel verbatim to the HTTP layer, which maps each
//! variant onto a status code.

use thiserror::Error;

/// The external service an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    GitHub,
    Devin,
    /// The issue-pilot backend itself, as seen from the CLI client.
    Backend,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::GitHub => write!(f, "GitHub"),
            Upstream::Devin => write!(f, "Devin"),
            Upstream::Backend => write!(f, "issue-pilot backend"),
        }
    }
}

/// Errors from the orchestration layer.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Malformed input, rejected before any outbound call.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The upstream rejected the caller's credential (401/403).
    #[error("{service} rejected the credential: {detail}")]
    UpstreamAuth { service: Upstream, detail: String },

    #[error("{0}")]
    NotFound(String),

    /// Any other 4xx from an upstream.
    #[error("{service} API error ({status}): {detail}")]
    UpstreamRejected {
        service: Upstream,
        status: u16,
        detail: String,
    },

    /// Network failure, timeout, 5xx or an undecodable body.
    #[error("{service} API unavailable: {detail}")]
    UpstreamUnavailable { service: Upstream, detail: String },
}

impl DispatchError {
    /// Classify a non-success upstream response by status code.
    pub fn from_status(service: Upstream, status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => DispatchError::UpstreamAuth { service, detail },
            404 => DispatchError::NotFound(format!("{} resource not found: {}", service, detail)),
            400..=499 => DispatchError::UpstreamRejected {
                service,
                status,
                detail,
            },
            _ => DispatchError::UpstreamUnavailable {
                service,
                detail: format!("status {}: {}", status, detail),
            },
        }
    }

    /// Classify a transport-level reqwest failure (connect, timeout, decode).
    pub fn from_transport(service: Upstream, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(service, status.as_u16(), err.to_string());
        }
        let detail = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_decode() {
            format!("unexpected response body: {}", err)
        } else {
            err.to_string()
        };
        DispatchError::UpstreamUnavailable { service, detail }
    }

    /// True for errors that originate upstream rather than in the request.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, DispatchError::Validation(_) | DispatchError::NotFound(_))
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
