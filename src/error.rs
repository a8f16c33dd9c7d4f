use crate::registry::CancelReason;
use crate::wire::ErrorBody;

/// Failure shapes at the transport boundary, before normalization.
#[derive(Debug)]
pub(crate) enum Failure {
    /// Superseded by a newer identical request or aborted by the caller.
    Cancelled(CancelReason),
    /// Non-success HTTP status with whatever failure body the server sent.
    Status { status: u16, body: ErrorBody },
    /// Network or request execution error from `reqwest`, timeouts included.
    Network(reqwest::Error),
}

impl Failure {
    /// Derives the reportable message.
    ///
    /// Priority: server `detail`, then server `message`, then transport text,
    /// then the literal `"unknown error"`.
    pub fn message(&self) -> String {
        match self {
            Failure::Cancelled(_) => "request cancelled".to_owned(),
            Failure::Status { status, body } => non_empty(&body.detail)
                .or_else(|| non_empty(&body.message))
                .unwrap_or_else(|| format!("request failed with status {status}")),
            Failure::Network(err) => {
                let text = err.to_string();
                if text.trim().is_empty() {
                    "unknown error".to_owned()
                } else {
                    text
                }
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Status { status, .. } => Some(*status),
            Failure::Cancelled(_) | Failure::Network(_) => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request cancelled before settling; never surfaced as a user notice.
    #[error("request cancelled ({0})")]
    Cancelled(CancelReason),
    /// Terminal failure: retry budget exhausted or retry disabled.
    #[error("{message}")]
    Terminal {
        /// Normalized, user-reportable message.
        message: String,
        /// HTTP status when the failure came from a server response.
        status: Option<u16>,
        /// Whether the user-visible notice was suppressed for this failure.
        notice_suppressed: bool,
    },
    /// Request params or body could not be serialized, or query params had a
    /// shape the query string cannot carry.
    #[error("invalid request payload: {0}")]
    Encode(String),
    /// 2xx response body did not match the expected envelope shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this outcome is a cancellation rather than a real failure.
    ///
    /// Callers typically ignore cancelled outcomes: the superseding request
    /// carries the result they care about.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled(_))
    }

    /// Whether no user-visible notice was emitted for this error.
    pub fn notice_suppressed(&self) -> bool {
        match self {
            ApiError::Terminal {
                notice_suppressed, ..
            } => *notice_suppressed,
            // Cancellations and contract errors never notify.
            ApiError::Cancelled(_) | ApiError::Encode(_) | ApiError::Decode(_) => true,
        }
    }

    /// HTTP status of the underlying response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Terminal { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Failure;
    use crate::wire::ErrorBody;

    #[test]
    fn detail_wins_over_message() {
        let failure = Failure::Status {
            status: 400,
            body: ErrorBody {
                detail: Some("D".to_owned()),
                message: Some("M".to_owned()),
            },
        };
        assert_eq!(failure.message(), "D");
    }

    #[test]
    fn message_used_when_detail_absent_or_blank() {
        let failure = Failure::Status {
            status: 400,
            body: ErrorBody {
                detail: Some("   ".to_owned()),
                message: Some("M".to_owned()),
            },
        };
        assert_eq!(failure.message(), "M");
    }

    #[test]
    fn status_text_fallback_when_body_is_empty() {
        let failure = Failure::Status {
            status: 502,
            body: ErrorBody::default(),
        };
        assert_eq!(failure.message(), "request failed with status 502");
    }
}
