//! Typed HTTP client for the `/authz/*` endpoints.

use crate::dto::{EmitRequest, MutationResult, RelationshipRequest};
use crate::routes::{
    CHECK_BULK_PATH, CHECK_PATH, DELETE_RELATIONSHIP_PATH, EVENTS_PATH, LOOKUP_RESOURCES_PATH,
    WRITE_RELATIONSHIP_PATH,
};
use relsync_core::{
    BulkCheckRequest, BulkCheckResult, CheckRequest, CheckResult, DispatchSummary,
    LookupResourcesRequest, LookupResourcesResult, Payload,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response (connect, TLS, invalid URL).
    Transport(String),
    /// The server refused the request (validation, missing privilege).
    Rejected { status: u16, message: String },
    /// The response body was not what the endpoint returns.
    Decode(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "authz service unavailable: {msg}"),
            ClientError::Rejected { status, message } => {
                write!(f, "authz service rejected request ({status}): {message}")
            }
            ClientError::Decode(msg) => write!(f, "invalid authz response: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Typed client for the `/authz/*` endpoints.
///
/// Read queries return their structured result for 200, 401 and 500, so a
/// denied or failed check is a value, not an error:
///
/// ```ignore
/// let client = RelsyncClient::new("http://authz:8080")?.with_token(jwt);
/// let result = client.check(&CheckRequest::new("agent", "a1", "view")).await?;
/// if result.allowed { /* ... */ }
/// ```
#[derive(Clone)]
pub struct RelsyncClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

const READ_STATUSES: &[StatusCode] = &[
    StatusCode::OK,
    StatusCode::UNAUTHORIZED,
    StatusCode::INTERNAL_SERVER_ERROR,
];
const MUTATION_STATUSES: &[StatusCode] = &[StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR];

impl RelsyncClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::Transport(format!("invalid base url: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn check(&self, request: &CheckRequest) -> Result<CheckResult, ClientError> {
        self.post(CHECK_PATH, request, READ_STATUSES).await
    }

    pub async fn check_bulk(
        &self,
        request: &BulkCheckRequest,
    ) -> Result<BulkCheckResult, ClientError> {
        self.post(CHECK_BULK_PATH, request, READ_STATUSES).await
    }

    pub async fn lookup_resources(
        &self,
        request: &LookupResourcesRequest,
    ) -> Result<LookupResourcesResult, ClientError> {
        self.post(LOOKUP_RESOURCES_PATH, request, READ_STATUSES).await
    }

    pub async fn write_relationship(
        &self,
        request: &RelationshipRequest,
    ) -> Result<MutationResult, ClientError> {
        self.post(WRITE_RELATIONSHIP_PATH, request, MUTATION_STATUSES).await
    }

    pub async fn delete_relationship(
        &self,
        request: &RelationshipRequest,
    ) -> Result<MutationResult, ClientError> {
        self.post(DELETE_RELATIONSHIP_PATH, request, MUTATION_STATUSES).await
    }

    pub async fn emit(
        &self,
        event: impl Into<String>,
        payload: Payload,
    ) -> Result<DispatchSummary, ClientError> {
        let request = EmitRequest {
            event: event.into(),
            payload,
        };
        self.post(EVENTS_PATH, &request, &[StatusCode::OK]).await
    }

    async fn post<B, T>(&self, path: &str, body: &B, decodable: &[StatusCode]) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Transport(format!("invalid url: {e}")))?;

        let mut builder = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await?;
        let status = resp.status();

        if !decodable.contains(&status) {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "authz request rejected");
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_prefix() {
        let client = RelsyncClient::new("http://authz.local:8080/api").unwrap();
        assert_eq!(client.base_url().as_str(), "http://authz.local:8080/api/");
        assert_eq!(
            client.base_url().join("authz/check").unwrap().as_str(),
            "http://authz.local:8080/api/authz/check"
        );
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            RelsyncClient::new("not a url"),
            Err(ClientError::Transport(_))
        ));
    }
}
