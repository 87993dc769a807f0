use thiserror::Error;

/// Gateway-local failure taxonomy.
///
/// Everything except `AllEndpointsFailed` is absorbed inside the gateway
/// while it walks the candidate list; callers only ever observe the
/// exhaustion variant. Partial windows are not errors at all, they are
/// valid responses that drive end-of-data sentinels.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("endpoint unreachable: {0}")]
    EndpointUnreachable(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    ErrorStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    #[error("all candidate endpoints failed")]
    AllEndpointsFailed,
}

/// Maximum length for error response bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        GatewayError::ErrorStatus {
            status,
            body: Self::truncate_body(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = GatewayError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            GatewayError::ErrorStatus { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
                assert!(body.len() < 600);
                assert!(body.contains("truncated"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
