//! HTTP boundary for relsync.
//!
//! Exposes the permission queries and relationship mutations as JSON
//! endpoints on an axum [`Router`](axum::Router), and ships a typed
//! [`RelsyncClient`] for calling them from other services.
//!
//! | Path | Auth |
//! |---|---|
//! | `POST /authz/check` | session (or named subject when anonymous subjects are allowed) |
//! | `POST /authz/check-bulk` | same |
//! | `POST /authz/lookup-resources` | same |
//! | `POST /authz/write-relationship` | privileged session |
//! | `POST /authz/delete-relationship` | privileged session |
//! | `POST /authz/events` | privileged session |
//!
//! Sessions come from a [`SessionResolver`]; [`JwtSessionResolver`] covers
//! the common bearer-JWT case.

pub mod client;
pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod session;

pub use client::{ClientError, RelsyncClient};
pub use dto::{EmitRequest, MutationResult, RelationshipRequest};
pub use error::{ApiError, FieldError};
pub use extract::ValidJson;
pub use routes::{router, AppState};
pub use session::{
    Caller, JwtSessionResolver, NoSessionResolver, Privileged, Session, SessionError,
    SessionResolver, SharedSessionResolver,
};
