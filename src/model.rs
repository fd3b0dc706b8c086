//! Model contract for resource controllers
//!
//! The controller never talks to a database directly; it drives an
//! opaque data-access object through the [`Model`] and [`ModelInstance`]
//! traits. Any ORM entity, repository, or in-memory store can back a
//! resource by implementing this pair.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ResourceResult;

/// JSON object map used for create/update attributes.
pub type Attributes = Map<String, Value>;

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

/// One column of a list query's sort order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc<T: Into<String>>(column: T) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc<T: Into<String>>(column: T) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Query handed to [`Model::find_all`] for list operations.
///
/// `conditions` are field-equality constraints; values come from the
/// configured conditions callback plus, for nested resources, the
/// parent foreign key.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub attributes: Vec<String>,
    pub conditions: Map<String, Value>,
    pub order: Vec<SortKey>,
}

/// Data-access contract a resource controller drives.
///
/// All methods are fallible and asynchronous; failures propagate
/// unchanged through the request pipeline to the error response
/// channel.
#[async_trait]
pub trait Model: Send + Sync + 'static {
    /// One loaded record of this model.
    type Instance: ModelInstance;

    /// Name used in route logs and not-found messages.
    fn resource_name(&self) -> &str;

    /// Look up a single record by its identifier.
    async fn find_by_id(&self, id: &str) -> ResourceResult<Option<Self::Instance>>;

    /// Fetch all records matching the query, in query order.
    async fn find_all(&self, query: &ListQuery) -> ResourceResult<Vec<Self::Instance>>;

    /// Persist a new record; the identifier is server-generated.
    async fn create(&self, attrs: Attributes) -> ResourceResult<Self::Instance>;
}

/// A single loaded record, mutable in place.
#[async_trait]
pub trait ModelInstance: Serialize + Send + Sync + 'static {
    /// The record's identifier, as a JSON value.
    fn id(&self) -> Value;

    /// Apply the given attributes to this record and persist.
    async fn update(&mut self, attrs: Attributes) -> ResourceResult<()>;

    /// Delete this record from the backing store.
    async fn destroy(&self) -> ResourceResult<()>;
}
