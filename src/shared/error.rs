use axum::http::{HeaderValue, Method, StatusCode, header::ALLOW};
use axum::response::{IntoResponse, Response};

/// Per-request failures of the interaction endpoint.
///
/// None of these are fatal to the process: each one ends the current request
/// with an empty-bodied HTTP error and a log line.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("method {0} is not allowed on the interaction endpoint")]
    MethodNotAllowed(Method),
    #[error("request signature could not be verified")]
    AuthenticationFailure,
    #[error("failed to read request body: {0}")]
    UnreadableBody(String),
    #[error("malformed interaction payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("interaction payload carries no recognized type (found {0:?})")]
    UnknownInteractionKind(Option<u64>),
    #[error("response data cannot be encoded: {0}")]
    ApplicationEncoding(String),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            DispatchError::UnreadableBody(_)
            | DispatchError::MalformedPayload(_)
            | DispatchError::UnknownInteractionKind(_) => StatusCode::BAD_REQUEST,
            DispatchError::ApplicationEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match &self {
            DispatchError::MethodNotAllowed(_) | DispatchError::AuthenticationFailure => {
                tracing::warn!("Rejected interaction request: {}", &self);
            }
            DispatchError::ApplicationEncoding(_) => {
                tracing::error!(
                    "Interaction handler produced a response that cannot be serialized, this is a bug in the handler: {}",
                    &self
                );
            }
            _ => tracing::error!("Failed to process interaction request: {}", &self),
        }

        let status = self.status();
        match self {
            DispatchError::MethodNotAllowed(_) => {
                (status, [(ALLOW, HeaderValue::from_static("POST"))]).into_response()
            }
            _ => status.into_response(),
        }
    }
}

/// Failures of the component/modal rendezvous.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RendezvousError {
    #[error("custom id `{0}` is already being awaited")]
    AlreadyAwaited(String),
    #[error("custom id `{0}` is served by a persistent handler")]
    HandlerConflict(String),
    #[error("timed out waiting for custom id `{0}`")]
    Timeout(String),
    #[error("wait for custom id `{0}` was cancelled")]
    Cancelled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            DispatchError::AuthenticationFailure.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::UnknownInteractionKind(Some(42)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::ApplicationEncoding("NaN".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn method_not_allowed_advertises_post() {
        let response = DispatchError::MethodNotAllowed(Method::GET).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "POST");
    }
}
