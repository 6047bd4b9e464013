//! Configuration for the engine client and the sync layer.

use crate::engine::Consistency;
use crate::error::EngineError;
use crate::mapping::MappingDeclaration;
use serde::Deserialize;

fn default_connect_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 5 }
fn default_group_resource_type() -> String { "group".into() }
fn default_user_subject_type() -> String { "user".into() }
fn default_group_id_pointer() -> String { "/groupId".into() }
fn default_user_id_pointer() -> String { "/userId".into() }

/// Connection settings for the SpiceDB-protocol engine.
///
/// `endpoint` is required; all other fields have defaults.
///
/// ```yaml
/// engine:
///   endpoint: "localhost:50051"
///   token: "somerandomkeyhere"   # optional
///   insecure: true               # plaintext, dev only. default: false
///   connect_timeout_secs: 10     # default: 10
///   request_timeout_secs: 5      # default: 5
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// `host:port`, or a full `http(s)://` URI.
    pub endpoint: String,
    /// Preshared key sent as a Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Use plaintext HTTP/2 instead of TLS.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    /// Create a TLS engine configuration for the given endpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use relsync_core::EngineConfig;
    ///
    /// let config = EngineConfig::new("localhost:50051").insecure();
    /// assert!(config.insecure);
    /// ```
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            insecure: false,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Switch to plaintext transport.
    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// The URI handed to tonic, with a scheme matching the transport.
    pub fn uri(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else if self.insecure {
            format!("http://{}", self.endpoint)
        } else {
            format!("https://{}", self.endpoint)
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.endpoint.trim().is_empty() {
            return Err(EngineError::InvalidConfig("endpoint cannot be empty".into()));
        }
        if matches!(&self.token, Some(t) if t.is_empty()) {
            return Err(EngineError::InvalidConfig("token cannot be empty when set".into()));
        }
        if self.insecure && self.endpoint.starts_with("https://") {
            return Err(EngineError::InvalidConfig(
                "insecure transport requested for an https:// endpoint".into(),
            ));
        }
        Ok(())
    }
}

/// Built-in group membership sync (`group.memberAdded` / `group.memberRemoved`).
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSyncConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_group_resource_type")]
    pub resource_type: String,
    #[serde(default = "default_user_subject_type")]
    pub subject_type: String,
    /// JSON pointer to the group id in the event payload.
    #[serde(default = "default_group_id_pointer")]
    pub group_id_pointer: String,
    /// JSON pointer to the member's user id in the event payload.
    #[serde(default = "default_user_id_pointer")]
    pub user_id_pointer: String,
}

impl Default for GroupSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            resource_type: default_group_resource_type(),
            subject_type: default_user_subject_type(),
            group_id_pointer: default_group_id_pointer(),
            user_id_pointer: default_user_id_pointer(),
        }
    }
}

impl GroupSyncConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Sync and query settings.
///
/// ```yaml
/// sync:
///   namespace: "tenant1_"
///   check_consistency: minimize_latency   # or fully_consistent
///   group_membership:
///     enabled: true
///   mappings:
///     - event: agent.created
///       resource_type: agent
///       resource_id: /agent/id
///       relation: owner
///       subject_type: user
///       subject_id: /userId
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Prefix applied to every object id sent to the engine.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Consistency used by point and bulk checks. Lookups are always fully consistent.
    #[serde(default)]
    pub check_consistency: Consistency,
    #[serde(default)]
    pub group_membership: GroupSyncConfig,
    #[serde(default)]
    pub mappings: Vec<MappingDeclaration>,
}

impl SyncConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_check_consistency(mut self, consistency: Consistency) -> Self {
        self.check_consistency = consistency;
        self
    }

    pub fn with_group_membership(mut self, group_membership: GroupSyncConfig) -> Self {
        self.group_membership = group_membership;
        self
    }

    pub fn with_mapping(mut self, mapping: MappingDeclaration) -> Self {
        self.mappings.push(mapping);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_uri_follows_transport() {
        assert_eq!(EngineConfig::new("localhost:50051").uri(), "https://localhost:50051");
        assert_eq!(
            EngineConfig::new("localhost:50051").insecure().uri(),
            "http://localhost:50051"
        );
        assert_eq!(
            EngineConfig::new("http://spicedb:50051").uri(),
            "http://spicedb:50051"
        );
    }

    #[test]
    fn engine_validate_rejects_empty_endpoint() {
        assert!(EngineConfig::new("").validate().is_err());
        assert!(EngineConfig::new("localhost:50051").validate().is_ok());
    }

    #[test]
    fn engine_validate_rejects_insecure_https() {
        let config = EngineConfig::new("https://spicedb:443").insecure();
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn sync_config_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert!(config.namespace.is_none());
        assert_eq!(config.check_consistency, Consistency::MinimizeLatency);
        assert!(!config.group_membership.enabled);
        assert_eq!(config.group_membership.resource_type, "group");
        assert!(config.mappings.is_empty());
    }
}
