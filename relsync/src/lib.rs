//! relsync: keep a SpiceDB-protocol engine in sync with application events
//! and answer permission queries over HTTP.
//!
//! This crate wires [`relsync_core`] and [`relsync_http`] together from a
//! [`RelsyncConfig`]:
//!
//! ```ignore
//! use relsync::{Relsync, RelsyncConfig};
//!
//! relsync::init_tracing();
//! let config = RelsyncConfig::load("relsync.yaml")?;
//! let relsync = Relsync::connect(config).await?;
//!
//! // in-process emission
//! relsync.dispatcher().emit("group.memberAdded", payload).await;
//!
//! // or serve /authz/*
//! relsync.serve().await?;
//! ```

pub mod config;
pub mod layers;

pub use config::{ConfigError, RelsyncConfig, ServerConfig, SessionConfig};
pub use layers::{default_trace, init_tracing};
pub use relsync_core;
pub use relsync_http;

use relsync_core::{
    EngineError, EventDispatcher, GrpcEngine, MappingRegistry, PermissionCoordinator,
    RelationshipWriter, SharedEngine, TupleCodec,
};
use relsync_http::{AppState, JwtSessionResolver, NoSessionResolver, SharedSessionResolver};
use std::sync::Arc;

#[derive(Debug)]
pub enum RelsyncError {
    Config(ConfigError),
    Engine(EngineError),
    Io(std::io::Error),
}

impl std::fmt::Display for RelsyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelsyncError::Config(err) => write!(f, "{err}"),
            RelsyncError::Engine(err) => write!(f, "{err}"),
            RelsyncError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for RelsyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelsyncError::Config(err) => Some(err),
            RelsyncError::Engine(err) => Some(err),
            RelsyncError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for RelsyncError {
    fn from(err: ConfigError) -> Self {
        RelsyncError::Config(err)
    }
}

impl From<EngineError> for RelsyncError {
    fn from(err: EngineError) -> Self {
        RelsyncError::Engine(err)
    }
}

impl From<std::io::Error> for RelsyncError {
    fn from(err: std::io::Error) -> Self {
        RelsyncError::Io(err)
    }
}

/// The assembled service: writer, frozen registry, dispatcher, coordinator
/// and session resolver, all sharing one engine client.
#[derive(Clone)]
pub struct Relsync {
    config: RelsyncConfig,
    writer: RelationshipWriter,
    dispatcher: EventDispatcher,
    coordinator: PermissionCoordinator,
    sessions: SharedSessionResolver,
}

impl Relsync {
    /// Connect the gRPC engine and assemble from configuration.
    pub async fn connect(config: RelsyncConfig) -> Result<Self, RelsyncError> {
        Self::connect_with(config, |_| {}).await
    }

    /// Like [`connect`](Self::connect), with extra programmatic mappings.
    pub async fn connect_with<F>(config: RelsyncConfig, configure: F) -> Result<Self, RelsyncError>
    where
        F: FnOnce(&mut MappingRegistry),
    {
        let engine = GrpcEngine::connect(&config.engine).await?;
        Ok(Self::with_registry(Arc::new(engine), config, configure))
    }

    /// Assemble around an existing engine (for example a `MockEngine`).
    pub fn with_engine(engine: SharedEngine, config: RelsyncConfig) -> Self {
        Self::with_registry(engine, config, |_| {})
    }

    /// Assemble around an existing engine. `configure` runs after the
    /// built-in and declared mappings are registered, before the registry
    /// is frozen.
    pub fn with_registry<F>(engine: SharedEngine, config: RelsyncConfig, configure: F) -> Self
    where
        F: FnOnce(&mut MappingRegistry),
    {
        let codec = TupleCodec::from_config(config.sync.namespace.as_deref());
        let writer = RelationshipWriter::new(engine.clone(), codec.clone());

        let mut registry = MappingRegistry::new(writer.clone());
        registry.register_builtins(&config.sync.group_membership);
        for declaration in &config.sync.mappings {
            registry.register_declaration(declaration);
        }
        configure(&mut registry);
        tracing::info!(
            events = registry.event_names().len(),
            handlers = registry.len(),
            namespace = codec.namespace().unwrap_or(""),
            "relationship mappings registered"
        );

        let coordinator = PermissionCoordinator::new(engine, codec)
            .with_check_consistency(config.sync.check_consistency);

        Self {
            sessions: session_resolver(&config),
            writer,
            dispatcher: EventDispatcher::new(registry),
            coordinator,
            config,
        }
    }

    pub fn config(&self) -> &RelsyncConfig {
        &self.config
    }

    pub fn writer(&self) -> &RelationshipWriter {
        &self.writer
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn coordinator(&self) -> &PermissionCoordinator {
        &self.coordinator
    }

    /// The `/authz/*` router, without tracing middleware.
    pub fn router(&self) -> axum::Router {
        relsync_http::router(AppState {
            coordinator: self.coordinator.clone(),
            writer: self.writer.clone(),
            dispatcher: self.dispatcher.clone(),
            sessions: self.sessions.clone(),
            allow_anonymous_subject: self.config.server.allow_anonymous_subject,
        })
    }

    /// Bind `server.bind` and serve until the process is stopped.
    pub async fn serve(&self) -> Result<(), RelsyncError> {
        let app = self.router().layer(default_trace());
        let listener = tokio::net::TcpListener::bind(&self.config.server.bind).await?;
        tracing::info!(addr = %listener.local_addr()?, "relsync listening");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn session_resolver(config: &RelsyncConfig) -> SharedSessionResolver {
    let session = &config.session;
    match session.jwt_secret.as_deref() {
        Some(secret) => {
            let mut resolver =
                JwtSessionResolver::hs256(secret).with_admin_role(session.admin_role.clone());
            if let Some(issuer) = &session.issuer {
                resolver = resolver.with_issuer(issuer);
            }
            if let Some(audience) = &session.audience {
                resolver = resolver.with_audience(audience);
            }
            Arc::new(resolver)
        }
        None => {
            tracing::warn!("no session.jwt_secret configured, all callers are anonymous");
            Arc::new(NoSessionResolver)
        }
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::RelsyncConfig;
    pub use crate::{init_tracing, Relsync, RelsyncError};
    pub use relsync_core::prelude::*;
    pub use relsync_http::{RelsyncClient, SessionResolver};
}
