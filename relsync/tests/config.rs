use relsync::{ConfigError, RelsyncConfig};
use relsync_core::engine::Consistency;
use relsync_core::MappingAction;
use std::collections::HashMap;
use std::io::Write;

const MINIMAL: &str = r#"
engine:
  endpoint: "localhost:50051"
  insecure: true
session:
  jwt_secret: "secret"
"#;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = RelsyncConfig::from_yaml_str(MINIMAL).unwrap();
    assert_eq!(config.engine.endpoint, "localhost:50051");
    assert!(config.engine.insecure);
    assert_eq!(config.engine.connect_timeout_secs, 10);
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert!(!config.server.allow_anonymous_subject);
    assert_eq!(config.session.admin_role, "admin");
    assert_eq!(config.sync.namespace, None);
    assert_eq!(config.sync.check_consistency, Consistency::MinimizeLatency);
    assert!(!config.sync.group_membership.enabled);
    assert!(config.sync.mappings.is_empty());
}

#[test]
fn test_full_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
engine:
  endpoint: "spicedb:50051"
  token: "preshared"
sync:
  namespace: "tenant1_"
  check_consistency: fully_consistent
  group_membership:
    enabled: true
    group_id_pointer: /group/id
  mappings:
    - event: agent.created
      resource_type: agent
      resource_id: /agent/id
      relation: owner
      subject_type: user
      subject_id: /userId
    - event: agent.deleted
      resource_type: agent
      resource_id: /agentId
      relation: owner
      subject_type: user
      subject_id: /userId
      action: delete
server:
  bind: "127.0.0.1:9000"
session:
  jwt_secret: "secret"
  issuer: "https://issuer.example"
  admin_role: "authz-admin"
"#
    )
    .unwrap();

    let config = RelsyncConfig::load(file.path()).unwrap();
    assert_eq!(config.engine.token.as_deref(), Some("preshared"));
    assert_eq!(config.sync.namespace.as_deref(), Some("tenant1_"));
    assert_eq!(config.sync.check_consistency, Consistency::FullyConsistent);
    assert!(config.sync.group_membership.enabled);
    assert_eq!(config.sync.group_membership.group_id_pointer, "/group/id");
    assert_eq!(config.sync.group_membership.user_id_pointer, "/userId");
    assert_eq!(config.sync.mappings.len(), 2);
    assert_eq!(config.sync.mappings[0].action, MappingAction::Touch);
    assert_eq!(config.sync.mappings[1].action, MappingAction::Delete);
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.session.issuer.as_deref(), Some("https://issuer.example"));
    assert_eq!(config.session.admin_role, "authz-admin");
}

#[test]
fn test_env_overrides_file_values() {
    let config = RelsyncConfig::from_yaml_str_with_env(
        MINIMAL,
        env(&[
            ("RELSYNC_ENGINE_ENDPOINT", "spicedb:50051"),
            ("RELSYNC_ENGINE_INSECURE", "false"),
            ("RELSYNC_NAMESPACE", "t2_"),
            ("RELSYNC_BIND", "127.0.0.1:7000"),
            ("RELSYNC_JWT_SECRET", "from-env"),
        ]),
    )
    .unwrap();
    assert_eq!(config.engine.endpoint, "spicedb:50051");
    assert!(!config.engine.insecure);
    assert_eq!(config.sync.namespace.as_deref(), Some("t2_"));
    assert_eq!(config.server.bind, "127.0.0.1:7000");
    assert_eq!(config.session.jwt_secret.as_deref(), Some("from-env"));
}

#[test]
fn test_env_only_configuration() {
    let config = RelsyncConfig::from_yaml_str_with_env(
        "",
        env(&[
            ("RELSYNC_ENGINE_ENDPOINT", "localhost:50051"),
            ("RELSYNC_ENGINE_TOKEN", "key"),
            ("RELSYNC_JWT_SECRET", "secret"),
        ]),
    )
    .unwrap();
    assert_eq!(config.engine.endpoint, "localhost:50051");
    assert_eq!(config.engine.token.as_deref(), Some("key"));
}

#[test]
fn test_invalid_boolean_override() {
    let err = RelsyncConfig::from_yaml_str_with_env(
        MINIMAL,
        env(&[("RELSYNC_ENGINE_INSECURE", "maybe")]),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("RELSYNC_ENGINE_INSECURE")));
}

#[test]
fn test_missing_engine_is_a_load_error() {
    let err = RelsyncConfig::from_yaml_str("session:\n  jwt_secret: x\n").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_validation_failures() {
    let err = RelsyncConfig::from_yaml_str("engine:\n  endpoint: \"\"\nsession:\n  jwt_secret: x\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("endpoint")));

    let err = RelsyncConfig::from_yaml_str("engine:\n  endpoint: localhost:50051\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("jwt_secret")));

    let err = RelsyncConfig::from_yaml_str(
        "engine:\n  endpoint: localhost:50051\nsession:\n  jwt_secret: \"\"\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = RelsyncConfig::from_yaml_str(
        "engine:\n  endpoint: localhost:50051\nserver:\n  bind: \" \"\nsession:\n  jwt_secret: x\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("bind")));
}

#[test]
fn test_anonymous_subjects_need_no_secret() {
    let config = RelsyncConfig::from_yaml_str(
        "engine:\n  endpoint: localhost:50051\nserver:\n  allow_anonymous_subject: true\n",
    )
    .unwrap();
    assert!(config.session.jwt_secret.is_none());
}
