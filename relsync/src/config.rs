//! Service configuration: YAML file, `.env`, then environment overrides.
//!
//! ```yaml
//! engine:
//!   endpoint: "localhost:50051"
//!   token: "somerandomkeyhere"
//!   insecure: true
//! sync:
//!   namespace: "tenant1_"
//!   group_membership:
//!     enabled: true
//! server:
//!   bind: "0.0.0.0:8080"
//! session:
//!   jwt_secret: "change-me"
//!   admin_role: "admin"
//! ```

use relsync_core::{EngineConfig, SyncConfig};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

fn default_bind() -> String { "0.0.0.0:8080".into() }
fn default_admin_role() -> String { "admin".into() }

#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    Load(String),
    /// The configuration parsed but is not usable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Accept read queries without a session when they name a subject.
    #[serde(default)]
    pub allow_anonymous_subject: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allow_anonymous_subject: false,
        }
    }
}

/// Bearer JWT settings. Without a secret no session can be established.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            audience: None,
            admin_role: default_admin_role(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelsyncConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Environment variable and the config path it overrides.
const ENV_OVERRIDES: &[(&str, &[&str])] = &[
    ("RELSYNC_ENGINE_ENDPOINT", &["engine", "endpoint"]),
    ("RELSYNC_ENGINE_TOKEN", &["engine", "token"]),
    ("RELSYNC_ENGINE_INSECURE", &["engine", "insecure"]),
    ("RELSYNC_NAMESPACE", &["sync", "namespace"]),
    ("RELSYNC_BIND", &["server", "bind"]),
    ("RELSYNC_JWT_SECRET", &["session", "jwt_secret"]),
];

impl RelsyncConfig {
    /// Load `path` (optional), then `.env` (never overriding variables
    /// already set), then `RELSYNC_*` overrides, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using environment only");
            String::new()
        };

        let _ = dotenvy::dotenv();
        Self::from_yaml_str_with_env(&content, |key| std::env::var(key).ok())
    }

    /// Parse and validate YAML without consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_str_with_env(yaml, |_| None)
    }

    /// Parse YAML, apply overrides from `env`, and validate.
    pub fn from_yaml_str_with_env<F>(yaml: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tree = if yaml.trim().is_empty() {
            Value::Mapping(Mapping::new())
        } else {
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))?
        };

        for &(var, path) in ENV_OVERRIDES {
            if let Some(raw) = env(var) {
                set_path(&mut tree, path, override_value(var, raw)?)?;
            }
        }

        let config: RelsyncConfig =
            serde_yaml::from_value(tree).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind cannot be empty".into()));
        }
        match self.session.jwt_secret.as_deref() {
            Some("") => Err(ConfigError::Invalid("session.jwt_secret cannot be empty".into())),
            None if !self.server.allow_anonymous_subject => Err(ConfigError::Invalid(
                "session.jwt_secret is required unless server.allow_anonymous_subject is set"
                    .into(),
            )),
            _ => Ok(()),
        }
    }
}

fn override_value(var: &str, raw: String) -> Result<Value, ConfigError> {
    if var == "RELSYNC_ENGINE_INSECURE" {
        return match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Value::Bool(true)),
            "0" | "false" | "no" => Ok(Value::Bool(false)),
            _ => Err(ConfigError::Invalid(format!("{var} must be a boolean, got '{raw}'"))),
        };
    }
    Ok(Value::String(raw))
}

fn set_path(tree: &mut Value, path: &[&str], value: Value) -> Result<(), ConfigError> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    let mut node = tree;
    for key in parents {
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| ConfigError::Load(format!("'{key}' parent is not a mapping")))?;
        node = map
            .entry(Value::String((*key).to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    let map = node
        .as_mapping_mut()
        .ok_or_else(|| ConfigError::Load(format!("'{last}' parent is not a mapping")))?;
    map.insert(Value::String((*last).to_string()), value);
    Ok(())
}
