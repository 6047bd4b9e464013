//! Session resolution: who is calling, and are they privileged.
//!
//! The boundary never authenticates users itself. A [`SessionResolver`]
//! reads an already-established session from the request headers; the
//! default [`JwtSessionResolver`] validates a bearer JWT.

use crate::error::ApiError;
use axum::extract::{FromRef, FromRequestParts};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Subject id used when a query does not name one.
    pub subject_id: String,
    pub roles: Vec<String>,
    /// May call the mutation and event endpoints.
    pub privileged: bool,
}

impl Session {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            roles: Vec::new(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The Authorization header is not a Bearer credential.
    InvalidAuthScheme,
    /// Malformed token, bad signature, expired, wrong issuer or audience.
    InvalidToken(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidAuthScheme => write!(f, "Invalid authorization scheme"),
            SessionError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        ApiError::Unauthorized("Unauthorized".into())
    }
}

/// Reads the caller's session from request headers.
///
/// `Ok(None)` means no credentials were presented. Credentials that were
/// presented but could not be verified are an error.
pub trait SessionResolver: Send + Sync + 'static {
    fn resolve<'a>(
        &'a self,
        headers: &'a HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Session>, SessionError>> + Send + 'a>>;
}

pub type SharedSessionResolver = Arc<dyn SessionResolver>;

/// Resolver that never finds a session. Pair with `allow_anonymous_subject`
/// for trusted service-to-service deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionResolver;

impl SessionResolver for NoSessionResolver {
    fn resolve<'a>(
        &'a self,
        _headers: &'a HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Session>, SessionError>> + Send + 'a>> {
        Box::pin(async { Ok(None) })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, SessionError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| SessionError::InvalidAuthScheme)?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() => {
            Ok(Some(token))
        }
        _ => Err(SessionError::InvalidAuthScheme),
    }
}

fn string_array(claims: &serde_json::Value, path: &[&str]) -> Vec<String> {
    let mut current = claims;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    current
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Validates `Authorization: Bearer` JWTs signed with a shared secret.
///
/// The subject comes from `sub`. Roles are read from a top-level `roles`
/// array or from Keycloak-style `realm_access.roles`; holding the admin
/// role (default `admin`) makes the session privileged.
///
/// ```ignore
/// let resolver = JwtSessionResolver::hs256(b"secret")
///     .with_issuer("https://auth.example.com")
///     .with_admin_role("authz-admin");
/// ```
pub struct JwtSessionResolver {
    key: DecodingKey,
    validation: Validation,
    admin_role: String,
}

impl JwtSessionResolver {
    pub fn hs256(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            admin_role: "admin".into(),
        }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_role = role.into();
        self
    }

    pub fn validate(&self, token: &str) -> Result<Session, SessionError> {
        let data = decode::<serde_json::Value>(token, &self.key, &self.validation).map_err(|e| {
            let err = SessionError::InvalidToken(e.to_string());
            warn!(error = %err, "JWT validation failed");
            err
        })?;
        let claims = data.claims;

        let subject_id = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SessionError::InvalidToken("missing 'sub' claim".into()))?
            .to_string();

        let mut roles = string_array(&claims, &["roles"]);
        roles.extend(string_array(&claims, &["realm_access", "roles"]));
        roles.sort();
        roles.dedup();

        let mut session = Session {
            subject_id,
            roles,
            privileged: false,
        };
        session.privileged = session.has_role(&self.admin_role);
        debug!(sub = %session.subject_id, privileged = session.privileged, "session resolved");
        Ok(session)
    }
}

impl SessionResolver for JwtSessionResolver {
    fn resolve<'a>(
        &'a self,
        headers: &'a HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Session>, SessionError>> + Send + 'a>> {
        Box::pin(async move {
            match bearer_token(headers)? {
                Some(token) => self.validate(token).map(Some),
                None => Ok(None),
            }
        })
    }
}

async fn resolve_session<S>(parts: &Parts, state: &S) -> Result<Option<Session>, ApiError>
where
    SharedSessionResolver: FromRef<S>,
{
    let resolver = SharedSessionResolver::from_ref(state);
    resolver.resolve(&parts.headers).await.map_err(|e| {
        warn!(uri = %parts.uri, error = %e, "rejected credentials");
        ApiError::from(e)
    })
}

/// The caller's session, if any. Rejects with 401 only when credentials
/// were presented and failed verification.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Session>);

impl Caller {
    pub fn subject_id(&self) -> Option<&str> {
        self.0.as_ref().map(|s| s.subject_id.as_str())
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    SharedSessionResolver: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(resolve_session(parts, state).await?))
    }
}

/// A privileged session. 401 without a session, 403 without privilege.
#[derive(Debug, Clone)]
pub struct Privileged(pub Session);

impl<S> FromRequestParts<S> for Privileged
where
    S: Send + Sync,
    SharedSessionResolver: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_session(parts, state).await? {
            Some(session) if session.privileged => Ok(Privileged(session)),
            Some(session) => {
                warn!(sub = %session.subject_id, uri = %parts.uri, "privileged endpoint denied");
                Err(ApiError::Forbidden("Insufficient privileges".into()))
            }
            None => Err(ApiError::Unauthorized("Unauthorized".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn bearer_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Ok(None));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Ok(Some("abc")));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(SessionError::InvalidAuthScheme));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(bearer_token(&headers), Err(SessionError::InvalidAuthScheme));
    }

    #[test]
    fn roles_from_both_claim_shapes() {
        let claims = serde_json::json!({
            "roles": ["reader"],
            "realm_access": {"roles": ["admin", "auditor"]}
        });
        assert_eq!(string_array(&claims, &["roles"]), vec!["reader"]);
        assert_eq!(
            string_array(&claims, &["realm_access", "roles"]),
            vec!["admin", "auditor"]
        );
        assert!(string_array(&claims, &["missing", "roles"]).is_empty());
    }

    #[test]
    fn roles_merged_without_duplicates() {
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let claims = serde_json::json!({
            "sub": "alice",
            "exp": exp,
            "roles": ["admin", "reader"],
            "realm_access": {"roles": ["auditor", "admin"]}
        });
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"roles-secret"),
        )
        .unwrap();

        let session = JwtSessionResolver::hs256(b"roles-secret").validate(&token).unwrap();
        assert_eq!(session.roles, vec!["admin", "auditor", "reader"]);
        assert!(session.privileged);
        assert!(session.has_role("auditor"));

        let session = JwtSessionResolver::hs256(b"roles-secret")
            .with_admin_role("owner")
            .validate(&token)
            .unwrap();
        assert!(!session.privileged);
    }
}
