use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;

use crate::shared::error::DispatchError;
use crate::shared::structs::client::Client;
use crate::shared::utility::header_value;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const PUBLIC_KEY_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;

/// Decides whether a raw request really comes from the platform.
pub trait Authenticator: Send + Sync {
    fn verify(&self, body: &[u8], headers: &HeaderMap) -> bool;
}

/// Checks the Ed25519 signature the platform puts on every interaction
/// request: `signature(timestamp ++ body)` under the application public key.
#[derive(Debug, Clone)]
pub struct Ed25519Authenticator {
    public_key: Vec<u8>,
}

impl Ed25519Authenticator {
    pub fn from_hex(public_key: &str) -> anyhow::Result<Self> {
        let public_key = hex::decode(public_key.trim())?;
        if public_key.len() != PUBLIC_KEY_LENGTH {
            anyhow::bail!(
                "Application public key must be {} bytes, got {}.",
                PUBLIC_KEY_LENGTH,
                public_key.len()
            );
        }

        Ok(Ed25519Authenticator { public_key })
    }
}

impl Authenticator for Ed25519Authenticator {
    fn verify(&self, body: &[u8], headers: &HeaderMap) -> bool {
        let signature = header_value(headers, SIGNATURE_HEADER);
        let timestamp = header_value(headers, TIMESTAMP_HEADER);

        let signature_bytes = match hex::decode(&signature) {
            Ok(bytes) if bytes.len() == SIGNATURE_LENGTH => bytes,
            Ok(bytes) => {
                tracing::warn!("Rejected signature of unexpected length {}.", bytes.len());
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to decode signature from hex value: {e:?}");
                return false;
            }
        };

        let message = [timestamp.as_bytes(), body].concat();

        match nacl::sign::verify(&signature_bytes, &message, &self.public_key) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::error!("Failed to verify: {e:?}");
                false
            }
        }
    }
}

/// Gate in front of the interaction endpoint: only signed POST requests
/// reach the dispatcher, with their body buffered and re-attached.
pub async fn validate_interaction(
    State(client): State<Client>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return DispatchError::MethodNotAllowed(request.method().clone()).into_response();
    }

    match buffer_request_body(request, &headers, &client).await {
        Ok(request) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

async fn buffer_request_body(
    request: Request,
    headers: &HeaderMap,
    client: &Client,
) -> Result<Request, DispatchError> {
    let (parts, body) = request.into_parts();

    let bytes: Bytes = body
        .collect()
        .await
        .map_err(|e| DispatchError::UnreadableBody(format!("{e:?}")))?
        .to_bytes();

    if !client.authenticator().verify(&bytes, headers) {
        return Err(DispatchError::AuthenticationFailure);
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const PUBLIC_KEY: &str = "67c6bd767ca099e79efac9fcce4d2022a63bf7dea780e7f3d813f694c1597089";

    fn headers(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("1700000000"));
        headers
    }

    #[test]
    fn rejects_malformed_public_keys() {
        assert!(Ed25519Authenticator::from_hex("zz").is_err());
        assert!(Ed25519Authenticator::from_hex("abcd").is_err());
        assert!(Ed25519Authenticator::from_hex(PUBLIC_KEY).is_ok());
    }

    #[test]
    fn rejects_missing_or_malformed_signatures() {
        let authenticator = Ed25519Authenticator::from_hex(PUBLIC_KEY).unwrap();

        assert!(!authenticator.verify(br#"{"type":1}"#, &HeaderMap::new()));
        assert!(!authenticator.verify(br#"{"type":1}"#, &headers("not-hex")));
        assert!(!authenticator.verify(br#"{"type":1}"#, &headers("abcd")));
        assert!(!authenticator.verify(br#"{"type":1}"#, &headers(&"00".repeat(SIGNATURE_LENGTH))));
    }
}
