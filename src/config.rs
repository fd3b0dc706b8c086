//! Resource configuration
//!
//! Per-controller configuration: the operation allowlist, list shape,
//! and the three callback seams (authorization, list conditions,
//! response filtering). Built with chained setters in the usual
//! builder style; every field has a permissive default so
//! `ResourceConfig::new()` yields a fully-open CRUD resource.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::errors::ResourceResult;
use crate::model::SortKey;

/// A resource operation, used for route registration and as the key
/// handed to the authorization and filter callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
    /// Gate for entering a nested resource under a parent instance.
    SubResource,
    /// A caller-registered custom operation, keyed by name.
    Custom(String),
}

impl Operation {
    /// Stable name of the operation
    pub fn name(&self) -> &str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::SubResource => "subresource",
            Operation::Custom(name) => name,
        }
    }

    /// The five CRUD operations, in route-registration order
    pub fn crud() -> Vec<Operation> {
        vec![
            Operation::List,
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authorization seam: one async yes/no decision per operation.
///
/// `Ok(false)` denies the operation; `Err` propagates unchanged to the
/// error response channel. Plain synchronous predicates get a blanket
/// implementation, so a closure like
/// `|op: &Operation, ctx: &RequestContext| ctx.headers().contains_key("x-admin")`
/// is accepted anywhere an `Authorizer` is.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> ResourceResult<bool>;
}

#[async_trait]
impl<F> Authorizer for F
where
    F: Fn(&Operation, &RequestContext) -> bool + Send + Sync,
{
    async fn authorize(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> ResourceResult<bool> {
        Ok(self(operation, context))
    }
}

/// Default authorizer: everything is allowed.
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _: &Operation, _: &RequestContext) -> ResourceResult<bool> {
        Ok(true)
    }
}

/// Per-item response filter.
///
/// Applied uniformly to list/create/read/update responses; returning
/// `None` excludes the item from a list or yields a `null` body for
/// single-item operations.
pub trait ResponseFilter: Send + Sync {
    fn filter(&self, item: Value, operation: &Operation, context: &RequestContext)
        -> Option<Value>;
}

impl<F> ResponseFilter for F
where
    F: Fn(Value, &Operation, &RequestContext) -> Option<Value> + Send + Sync,
{
    fn filter(
        &self,
        item: Value,
        operation: &Operation,
        context: &RequestContext,
    ) -> Option<Value> {
        self(item, operation, context)
    }
}

/// Default filter: items pass through untouched.
pub struct IdentityFilter;

impl ResponseFilter for IdentityFilter {
    fn filter(&self, item: Value, _: &Operation, _: &RequestContext) -> Option<Value> {
        Some(item)
    }
}

/// Builds extra field-equality conditions for list queries from the
/// incoming request.
pub trait ListConditions: Send + Sync {
    fn conditions(&self, context: &RequestContext) -> Map<String, Value>;
}

impl<F> ListConditions for F
where
    F: Fn(&RequestContext) -> Map<String, Value> + Send + Sync,
{
    fn conditions(&self, context: &RequestContext) -> Map<String, Value> {
        self(context)
    }
}

/// Default conditions: unconstrained.
pub struct NoConditions;

impl ListConditions for NoConditions {
    fn conditions(&self, _: &RequestContext) -> Map<String, Value> {
        Map::new()
    }
}

/// Configuration for one resource controller.
#[derive(Clone)]
pub struct ResourceConfig {
    pub(crate) operations: Vec<Operation>,
    pub(crate) list_attributes: Vec<String>,
    pub(crate) list_order: Vec<SortKey>,
    pub(crate) id_param: String,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) filter: Arc<dyn ResponseFilter>,
    pub(crate) conditions: Arc<dyn ListConditions>,
}

impl ResourceConfig {
    /// Configuration with all CRUD operations enabled, `id` as the
    /// path parameter, listing only `id` ordered by `created_at`.
    pub fn new() -> Self {
        Self {
            operations: Operation::crud(),
            list_attributes: vec!["id".to_string()],
            list_order: vec![SortKey::asc("created_at")],
            id_param: "id".to_string(),
            authorizer: Arc::new(AllowAll),
            filter: Arc::new(IdentityFilter),
            conditions: Arc::new(NoConditions),
        }
    }

    /// Restrict the set of registered CRUD routes
    pub fn operations<I>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.operations = operations.into_iter().collect();
        self
    }

    /// Attributes requested from the model for list queries
    pub fn list_attributes<I, T>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.list_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sort order for list queries
    pub fn list_order<I>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = SortKey>,
    {
        self.list_order = order.into_iter().collect();
        self
    }

    /// Name of the instance path parameter (default `id`)
    pub fn id_param<T: Into<String>>(mut self, name: T) -> Self {
        self.id_param = name.into();
        self
    }

    /// Authorization callback consulted before every operation
    pub fn authorizer<A: Authorizer + 'static>(mut self, authorizer: A) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Per-item response filter
    pub fn filter<F: ResponseFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Extra list-query conditions derived from the request
    pub fn conditions<C: ListConditions + 'static>(mut self, conditions: C) -> Self {
        self.conditions = Arc::new(conditions);
        self
    }

    pub(crate) fn operation_enabled(&self, operation: &Operation) -> bool {
        self.operations.contains(operation)
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("operations", &self.operations)
            .field("list_attributes", &self.list_attributes)
            .field("list_order", &self.list_order)
            .field("id_param", &self.id_param)
            .finish_non_exhaustive()
    }
}
