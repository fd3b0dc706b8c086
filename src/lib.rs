//! # resourceful
//!
//! Generic REST-resource controllers over axum.
//!
//! Give [`Resource`] a data model and a configuration and it wires up
//! the usual CRUD surface for you:
//! - `GET /`, `POST /`, `GET /:id`, `PUT /:id`, `DELETE /:id`, gated by
//!   an operation allowlist
//! - a fixed per-route pipeline: load instance → check authorization →
//!   execute handler
//! - per-item response filtering across list/create/read/update
//! - sub-resources nested under a parent instance and scoped by a
//!   foreign key
//! - custom collection- and instance-scoped POST operations
//!
//! The HTTP server, routing tree, body parsing and the data layer stay
//! external: the crate only composes handlers onto an `axum::Router`
//! and drives the caller-supplied [`Model`] contract.

pub mod config;
pub mod context;
pub mod errors;
pub mod model;
pub mod resource;

pub use config::{
    AllowAll, Authorizer, IdentityFilter, ListConditions, NoConditions, Operation,
    ResourceConfig, ResponseFilter,
};
pub use context::RequestContext;
pub use errors::{ResourceError, ResourceResult};
pub use model::{Attributes, ListQuery, Model, ModelInstance, SortDirection, SortKey};
pub use resource::{ParentRef, Resource};
