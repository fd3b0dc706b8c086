//! Resource controllers
//!
//! [`Resource`] binds a set of CRUD routes to a [`Model`] and yields an
//! `axum::Router`. Every instance-scoped route runs the same pipeline
//! in fixed order: parent gate (for nested resources) → load instance →
//! check authorization → execute handler. Each step is a sequential
//! await; the first failure short-circuits to the error response
//! channel and the handler never runs.

use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{post, MethodRouter};
use axum::Router;
use serde_json::Value;

use crate::config::{Operation, ResourceConfig};
use crate::context::RequestContext;
use crate::errors::{ResourceError, ResourceResult};
use crate::model::{Attributes, ListQuery, Model, ModelInstance};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type CollectionHandlerFn =
    Arc<dyn Fn(RequestContext, Value) -> BoxFuture<ResourceResult<Response>> + Send + Sync>;

type InstanceHandlerFn<I> =
    Arc<dyn Fn(I, RequestContext, Value) -> BoxFuture<ResourceResult<Response>> + Send + Sync>;

type ChildMountFn<M> = Box<dyn FnOnce(&Arc<ResourceState<M>>) -> (String, Router) + Send>;

enum CustomOperation<M: Model> {
    Collection {
        name: String,
        handler: CollectionHandlerFn,
    },
    Instance {
        name: String,
        handler: InstanceHandlerFn<M::Instance>,
    },
}

/// Validated reference to an already-loaded parent instance, handed to
/// nested resources for foreign-key scoping.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub foreign_key: String,
    pub id: Value,
}

/// Erased handle to a parent resource's gate: runs the parent's own
/// gate chain, loads the parent instance, and authorizes `SubResource`.
#[async_trait]
trait ParentGate: Send + Sync {
    async fn require_parent(&self, context: &RequestContext) -> ResourceResult<ParentRef>;

    /// Path-parameter names already claimed by the ancestor chain.
    fn reserved_params(&self) -> Vec<String>;
}

struct ParentGateImpl<M: Model> {
    state: Arc<ResourceState<M>>,
    foreign_key: String,
}

#[async_trait]
impl<M: Model> ParentGate for ParentGateImpl<M> {
    async fn require_parent(&self, context: &RequestContext) -> ResourceResult<ParentRef> {
        // Ancestors first, so deeper nesting gates the whole chain.
        self.state.require_parent(context).await?;
        let instance = self.state.require_instance(context).await?;
        self.state
            .require_authorization(&Operation::SubResource, context)
            .await?;
        Ok(ParentRef {
            foreign_key: self.foreign_key.clone(),
            id: instance.id(),
        })
    }

    fn reserved_params(&self) -> Vec<String> {
        let mut params = self
            .state
            .parent
            .as_ref()
            .map(|gate| gate.reserved_params())
            .unwrap_or_default();
        params.push(self.state.config.id_param.clone());
        params
    }
}

struct ResourceState<M: Model> {
    model: Arc<M>,
    config: ResourceConfig,
    parent: Option<Arc<dyn ParentGate>>,
}

impl<M: Model> ResourceState<M> {
    async fn require_parent(&self, context: &RequestContext) -> ResourceResult<Option<ParentRef>> {
        match &self.parent {
            Some(gate) => Ok(Some(gate.require_parent(context).await?)),
            None => Ok(None),
        }
    }

    /// Look up the instance addressed by the configured path parameter.
    /// A missing record fails the pipeline before any handler runs.
    async fn require_instance(&self, context: &RequestContext) -> ResourceResult<M::Instance> {
        let name = self.model.resource_name();
        let id = context
            .param(&self.config.id_param)
            .ok_or_else(|| ResourceError::not_found(name))?;

        tracing::debug!(resource = name, id, "loading instance");
        self.model
            .find_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(name))
    }

    async fn require_authorization(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> ResourceResult<()> {
        if self.config.authorizer.authorize(operation, context).await? {
            Ok(())
        } else {
            tracing::debug!(
                resource = self.model.resource_name(),
                operation = %operation,
                "authorization denied"
            );
            Err(ResourceError::authorization(operation.name()))
        }
    }

    fn filter_one(
        &self,
        instance: &M::Instance,
        operation: &Operation,
        context: &RequestContext,
    ) -> ResourceResult<Option<Value>> {
        let item = serde_json::to_value(instance)?;
        Ok(self.config.filter.filter(item, operation, context))
    }

    fn filter_many(
        &self,
        rows: Vec<M::Instance>,
        operation: &Operation,
        context: &RequestContext,
    ) -> ResourceResult<Vec<Value>> {
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(item) = self.filter_one(row, operation, context)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn list(&self, context: RequestContext) -> ResourceResult<Response> {
        let parent = self.require_parent(&context).await?;
        self.require_authorization(&Operation::List, &context)
            .await?;

        let mut conditions = self.config.conditions.conditions(&context);
        if let Some(parent) = parent {
            conditions.insert(parent.foreign_key, parent.id);
        }
        let query = ListQuery {
            attributes: self.config.list_attributes.clone(),
            conditions,
            order: self.config.list_order.clone(),
        };

        let rows = self.model.find_all(&query).await?;
        let items = self.filter_many(rows, &Operation::List, &context)?;
        Ok(Json(Value::Array(items)).into_response())
    }

    async fn create(&self, context: RequestContext, body: Value) -> ResourceResult<Response> {
        let parent = self.require_parent(&context).await?;
        self.require_authorization(&Operation::Create, &context)
            .await?;

        let mut attrs = object_attrs(body)?;
        // Identifiers are server-generated; a client-supplied one is dropped.
        attrs.remove("id");
        if let Some(parent) = parent {
            attrs.insert(parent.foreign_key, parent.id);
        }

        let instance = self.model.create(attrs).await?;
        let item = self.filter_one(&instance, &Operation::Create, &context)?;
        Ok((StatusCode::CREATED, Json(item)).into_response())
    }

    async fn read(&self, context: RequestContext) -> ResourceResult<Response> {
        self.require_parent(&context).await?;
        let instance = self.require_instance(&context).await?;
        self.require_authorization(&Operation::Read, &context)
            .await?;

        let item = self.filter_one(&instance, &Operation::Read, &context)?;
        Ok(Json(item).into_response())
    }

    async fn update(&self, context: RequestContext, body: Value) -> ResourceResult<Response> {
        self.require_parent(&context).await?;
        let mut instance = self.require_instance(&context).await?;
        self.require_authorization(&Operation::Update, &context)
            .await?;

        let mut attrs = object_attrs(body)?;
        for field in ["id", "created_at", "updated_at", "createdAt", "updatedAt"] {
            attrs.remove(field);
        }

        instance.update(attrs).await?;
        let item = self.filter_one(&instance, &Operation::Update, &context)?;
        Ok(Json(item).into_response())
    }

    async fn delete(&self, context: RequestContext) -> ResourceResult<Response> {
        self.require_parent(&context).await?;
        let instance = self.require_instance(&context).await?;
        self.require_authorization(&Operation::Delete, &context)
            .await?;

        instance.destroy().await?;
        let ack = serde_json::json!({
            "message": format!("{} deleted successfully", self.model.resource_name()),
        });
        Ok(Json(ack).into_response())
    }
}

/// A REST resource controller for one model.
///
/// Builds CRUD routes, optional custom operations, and nested
/// sub-resources, then yields the finished router:
///
/// ```ignore
/// let app = Resource::new(posts, ResourceConfig::new())
///     .sub_resource("comments", "post_id", Resource::new(comments, ResourceConfig::new()))
///     .mount_on(Router::new(), "/posts");
/// ```
pub struct Resource<M: Model> {
    model: Arc<M>,
    config: ResourceConfig,
    custom_operations: Vec<CustomOperation<M>>,
    children: Vec<ChildMountFn<M>>,
}

impl<M: Model> Resource<M> {
    /// Create a controller for `model` with the given configuration.
    pub fn new(model: M, config: ResourceConfig) -> Self {
        Self {
            model: Arc::new(model),
            config,
            custom_operations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Register a collection-scoped custom operation at `POST /{name}`,
    /// authorized under `Operation::Custom(name)`.
    pub fn operation<N, H, Fut>(mut self, name: N, handler: H) -> Self
    where
        N: Into<String>,
        H: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
    {
        self.custom_operations.push(CustomOperation::Collection {
            name: name.into(),
            handler: Arc::new(move |ctx, body| Box::pin(handler(ctx, body))),
        });
        self
    }

    /// Register an instance-scoped custom operation at
    /// `POST /:{id_param}/{name}`. The handler receives the loaded
    /// instance; lookup and authorization run first, as for CRUD routes.
    pub fn instance_operation<N, H, Fut>(mut self, name: N, handler: H) -> Self
    where
        N: Into<String>,
        H: Fn(M::Instance, RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
    {
        self.custom_operations.push(CustomOperation::Instance {
            name: name.into(),
            handler: Arc::new(move |instance, ctx, body| Box::pin(handler(instance, ctx, body))),
        });
        self
    }

    /// Nest `child` under `/:{id_param}/{slug}`.
    ///
    /// Every child route first runs this resource's gate (instance
    /// lookup + `SubResource` authorization), and the child's list and
    /// create operations are scoped to the parent via `foreign_key`.
    /// A child `id_param` already claimed by the ancestor chain is
    /// qualified to `{slug}_id`, since nested routers cannot reuse a
    /// path parameter name.
    pub fn sub_resource<C: Model>(
        mut self,
        slug: &str,
        foreign_key: &str,
        mut child: Resource<C>,
    ) -> Self {
        let slug = slug.to_string();
        let foreign_key = foreign_key.to_string();

        self.children.push(Box::new(move |parent_state| {
            let gate: Arc<dyn ParentGate> = Arc::new(ParentGateImpl {
                state: parent_state.clone(),
                foreign_key,
            });
            if gate.reserved_params().contains(&child.config.id_param) {
                child.config.id_param = format!("{slug}_id");
            }
            let path = format!("/:{}/{slug}", parent_state.config.id_param);
            (path, child.mount(Some(gate)))
        }));
        self
    }

    /// Build the router for this resource and everything nested in it.
    pub fn into_router(self) -> Router {
        self.mount(None)
    }

    /// Attach this resource to a caller-supplied router at `path`.
    pub fn mount_on(self, router: Router, path: &str) -> Router {
        router.nest(path, self.into_router())
    }

    fn mount(self, parent: Option<Arc<dyn ParentGate>>) -> Router {
        let state = Arc::new(ResourceState {
            model: self.model,
            config: self.config,
            parent,
        });
        let instance_path = format!("/:{}", state.config.id_param);
        tracing::debug!(
            resource = state.model.resource_name(),
            operations = ?state.config.operations,
            "mounting resource routes"
        );

        let mut router = Router::new();

        let mut collection = MethodRouter::new();
        let mut collection_routed = false;
        if state.config.operation_enabled(&Operation::List) {
            let st = state.clone();
            collection = collection.get(move |ctx: RequestContext| {
                let st = st.clone();
                async move { st.list(ctx).await }
            });
            collection_routed = true;
        }
        if state.config.operation_enabled(&Operation::Create) {
            let st = state.clone();
            collection = collection.post(move |ctx: RequestContext, Json(body): Json<Value>| {
                let st = st.clone();
                async move { st.create(ctx, body).await }
            });
            collection_routed = true;
        }
        if collection_routed {
            router = router.route("/", collection.fallback(disabled_operation(&state)));
        }

        let mut instance = MethodRouter::new();
        let mut instance_routed = false;
        if state.config.operation_enabled(&Operation::Read) {
            let st = state.clone();
            instance = instance.get(move |ctx: RequestContext| {
                let st = st.clone();
                async move { st.read(ctx).await }
            });
            instance_routed = true;
        }
        if state.config.operation_enabled(&Operation::Update) {
            let st = state.clone();
            instance = instance.put(move |ctx: RequestContext, Json(body): Json<Value>| {
                let st = st.clone();
                async move { st.update(ctx, body).await }
            });
            instance_routed = true;
        }
        if state.config.operation_enabled(&Operation::Delete) {
            let st = state.clone();
            instance = instance.delete(move |ctx: RequestContext| {
                let st = st.clone();
                async move { st.delete(ctx).await }
            });
            instance_routed = true;
        }
        if instance_routed {
            router = router.route(&instance_path, instance.fallback(disabled_operation(&state)));
        }

        for custom in self.custom_operations {
            match custom {
                CustomOperation::Collection { name, handler } => {
                    let st = state.clone();
                    let operation = Operation::Custom(name.clone());
                    router = router.route(
                        &format!("/{name}"),
                        post(move |ctx: RequestContext, body: Option<Json<Value>>| {
                            let st = st.clone();
                            let operation = operation.clone();
                            let handler = handler.clone();
                            async move {
                                st.require_parent(&ctx).await?;
                                st.require_authorization(&operation, &ctx).await?;
                                handler(ctx, optional_body(body)).await
                            }
                        }),
                    );
                }
                CustomOperation::Instance { name, handler } => {
                    let st = state.clone();
                    let operation = Operation::Custom(name.clone());
                    router = router.route(
                        &format!("{instance_path}/{name}"),
                        post(move |ctx: RequestContext, body: Option<Json<Value>>| {
                            let st = st.clone();
                            let operation = operation.clone();
                            let handler = handler.clone();
                            async move {
                                st.require_parent(&ctx).await?;
                                let instance = st.require_instance(&ctx).await?;
                                st.require_authorization(&operation, &ctx).await?;
                                handler(instance, ctx, optional_body(body)).await
                            }
                        }),
                    );
                }
            }
        }

        for child in self.children {
            let (path, child_router) = child(&state);
            router = router.nest(&path, child_router);
        }

        router
    }
}

/// Fallback for method routers: a disabled operation on a path that is
/// registered for other methods answers not-found, the same as an
/// unregistered path.
fn disabled_operation<M: Model>(
    state: &Arc<ResourceState<M>>,
) -> impl Fn() -> Ready<ResourceError> + Clone + Send + Sync + 'static {
    let resource = state.model.resource_name().to_string();
    move || ready(ResourceError::not_found(resource.clone()))
}

fn object_attrs(body: Value) -> ResourceResult<Attributes> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ResourceError::bad_request("expected a JSON object body")),
    }
}

/// Custom operations accept a missing or malformed body as `null`.
fn optional_body(body: Option<Json<Value>>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}
