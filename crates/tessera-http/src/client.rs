//! HTTP client for the REST API.

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use tessera_core::{ProtocolError, Result, StoreError};

use crate::config::HttpStoreConfig;
use crate::wire::ErrorPayload;

/// Thin wrapper over `reqwest` that knows the API's error envelope.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpClient {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tessera/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    /// POST a JSON body to `resource` (relative to `v1/`).
    ///
    /// `doc_path` names the document for `NotFound` errors.
    #[instrument(skip(self, body), fields(base = %self.config.base_url))]
    pub async fn post<B, R>(&self, resource: &str, body: &B, doc_path: Option<&str>) -> Result<R>
    where
        B: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        let url = self.config.url(resource);
        debug!(%url, "POST");
        trace!(?body, "request body");

        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response(response, doc_path).await
    }

    /// GET `resource` (relative to `v1/`).
    #[instrument(skip(self), fields(base = %self.config.base_url))]
    pub async fn get<R>(&self, resource: &str, doc_path: Option<&str>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.config.url(resource);
        debug!(%url, "GET");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response(response, doc_path).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        doc_path: Option<&str>,
    ) -> Result<R> {
        let status = response.status();
        trace!(status = %status, "response");

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| StoreError::InvalidData {
                message: format!("unexpected response body: {}", e),
            })
        } else {
            Err(classify(status, &body, doc_path, self.timeout_ms()))
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout {
                duration_ms: self.timeout_ms(),
            }
        } else {
            StoreError::Transport {
                message: err.to_string(),
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Map an error response onto the store's error classes.
pub(crate) fn classify(
    status: StatusCode,
    body: &str,
    doc_path: Option<&str>,
    timeout_ms: u64,
) -> StoreError {
    let error = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(ErrorPayload::into_body);
    let code = error.as_ref().and_then(|e| e.status.clone());
    let message = error.and_then(|e| e.message);
    let text = message.clone().unwrap_or_else(|| status.to_string());

    match (status, code.as_deref()) {
        (_, Some("FAILED_PRECONDITION")) if text.to_ascii_lowercase().contains("index") => {
            StoreError::IndexUnavailable { message: text }
        }
        (_, Some("FAILED_PRECONDITION")) if doc_path.is_some() => StoreError::PreconditionFailed {
            path: doc_path.map_or(text, str::to_string),
        },
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _)
        | (_, Some("PERMISSION_DENIED" | "UNAUTHENTICATED")) => {
            StoreError::PermissionDenied { message: text }
        }
        (StatusCode::NOT_FOUND, _) | (_, Some("NOT_FOUND")) => StoreError::NotFound {
            path: doc_path.map_or(text, str::to_string),
        },
        (StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT, _)
        | (_, Some("DEADLINE_EXCEEDED")) => StoreError::Timeout {
            duration_ms: timeout_ms,
        },
        _ => StoreError::Protocol(ProtocolError::new(status.as_u16(), code, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify_json(status: u16, body: serde_json::Value) -> StoreError {
        classify(
            StatusCode::from_u16(status).unwrap(),
            &body.to_string(),
            Some("tasks/t1"),
            30_000,
        )
    }

    #[test]
    fn missing_index_is_index_unavailable() {
        let err = classify_json(
            400,
            json!([{ "error": {
                "code": 400,
                "message": "The query requires an index. You can create it here: https://console.example/indexes?create=abc",
                "status": "FAILED_PRECONDITION"
            } }]),
        );
        assert!(err.is_index_unavailable());
    }

    #[test]
    fn stale_document_version_is_a_lost_precondition() {
        let err = classify_json(
            400,
            json!({ "error": { "code": 400, "message": "the stored version does not match the required base version", "status": "FAILED_PRECONDITION" } }),
        );
        assert!(matches!(err, StoreError::PreconditionFailed { ref path } if path == "tasks/t1"));
    }

    #[test]
    fn failed_precondition_without_document_is_protocol() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            &json!({ "error": { "code": 400, "message": "Transaction aborted", "status": "FAILED_PRECONDITION" } })
                .to_string(),
            None,
            30_000,
        );
        assert!(matches!(err, StoreError::Protocol(ref e) if e.status == 400));
    }

    #[test]
    fn access_and_missing_documents() {
        assert!(matches!(
            classify_json(403, json!({ "error": { "status": "PERMISSION_DENIED", "message": "no" } })),
            StoreError::PermissionDenied { .. }
        ));
        assert!(matches!(
            classify_json(404, json!({ "error": { "status": "NOT_FOUND", "message": "No document to update" } })),
            StoreError::NotFound { ref path } if path == "tasks/t1"
        ));
    }

    #[test]
    fn deadline_is_timeout() {
        assert!(matches!(
            classify_json(504, json!({ "error": { "status": "DEADLINE_EXCEEDED" } })),
            StoreError::Timeout { duration_ms: 30_000 }
        ));
    }

    #[test]
    fn unparseable_body_keeps_http_status() {
        let err = classify(StatusCode::BAD_GATEWAY, "<html>", None, 1);
        assert!(matches!(err, StoreError::Protocol(ref e) if e.status == 502 && e.code.is_none()));
    }
}
