//! Shared in-memory model used by the integration tests.
//!
//! Implements the `Model` / `ModelInstance` contracts over a mutex-held
//! vector of JSON records, with counters so tests can assert exactly
//! how often destructive calls happen.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tower::ServiceExt;

use resourceful::{
    Attributes, ListQuery, Model, ModelInstance, ResourceError, ResourceResult, SortDirection,
};

#[derive(Default)]
pub struct MemStore {
    records: Mutex<Vec<Attributes>>,
    next_id: AtomicI64,
    pub destroy_calls: AtomicUsize,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            destroy_calls: AtomicUsize::new(0),
        })
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn record(&self, id: i64) -> Option<Attributes> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.get("id") == Some(&json!(id)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn insert(&self, mut attrs: Attributes) -> Attributes {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        attrs.insert("id".to_string(), json!(id));
        self.records.lock().unwrap().push(attrs.clone());
        attrs
    }

    fn replace(&self, id: &Value, attrs: &Attributes) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.get("id") == Some(id)) {
            *record = attrs.clone();
        }
    }

    fn remove(&self, id: &Value) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.get("id") != Some(id));
    }
}

pub struct MemModel {
    name: &'static str,
    store: Arc<MemStore>,
}

impl MemModel {
    pub fn new(name: &'static str, store: Arc<MemStore>) -> Self {
        Self { name, store }
    }
}

#[derive(Clone)]
pub struct MemRecord {
    attrs: Attributes,
    store: Arc<MemStore>,
}

impl MemRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }
}

impl Serialize for MemRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attrs.serialize(serializer)
    }
}

#[async_trait]
impl ModelInstance for MemRecord {
    fn id(&self) -> Value {
        self.attrs.get("id").cloned().unwrap_or(Value::Null)
    }

    async fn update(&mut self, attrs: Attributes) -> ResourceResult<()> {
        for (key, value) in attrs {
            self.attrs.insert(key, value);
        }
        self.store.replace(&self.id(), &self.attrs);
        Ok(())
    }

    async fn destroy(&self) -> ResourceResult<()> {
        self.store.remove(&self.id());
        Ok(())
    }
}

fn matches_conditions(record: &Attributes, conditions: &serde_json::Map<String, Value>) -> bool {
    conditions
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(O::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => O::Equal,
    }
}

#[async_trait]
impl Model for MemModel {
    type Instance = MemRecord;

    fn resource_name(&self) -> &str {
        self.name
    }

    async fn find_by_id(&self, id: &str) -> ResourceResult<Option<MemRecord>> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };
        Ok(self.store.record(id).map(|attrs| MemRecord {
            attrs,
            store: self.store.clone(),
        }))
    }

    async fn find_all(&self, query: &ListQuery) -> ResourceResult<Vec<MemRecord>> {
        let mut rows: Vec<Attributes> = {
            let records = self.store.records.lock().unwrap();
            records
                .iter()
                .filter(|r| matches_conditions(r, &query.conditions))
                .cloned()
                .collect()
        };

        for key in query.order.iter().rev() {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&key.column), b.get(&key.column));
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        let projected = rows.into_iter().map(|attrs| {
            let attrs = if query.attributes.is_empty() {
                attrs
            } else {
                attrs
                    .into_iter()
                    .filter(|(k, _)| query.attributes.contains(k))
                    .collect()
            };
            MemRecord {
                attrs,
                store: self.store.clone(),
            }
        });
        Ok(projected.collect())
    }

    async fn create(&self, attrs: Attributes) -> ResourceResult<MemRecord> {
        Ok(MemRecord {
            attrs: self.store.insert(attrs),
            store: self.store.clone(),
        })
    }
}

/// A model whose lookups always fail, for error-propagation tests.
pub struct BrokenModel;

#[async_trait]
impl Model for BrokenModel {
    type Instance = MemRecord;

    fn resource_name(&self) -> &str {
        "broken"
    }

    async fn find_by_id(&self, _: &str) -> ResourceResult<Option<MemRecord>> {
        Err(ResourceError::model("connection refused"))
    }

    async fn find_all(&self, _: &ListQuery) -> ResourceResult<Vec<MemRecord>> {
        Err(ResourceError::model("connection refused"))
    }

    async fn create(&self, _: Attributes) -> ResourceResult<MemRecord> {
        Err(ResourceError::model("connection refused"))
    }
}

/// Seed a record directly through the model contract.
pub async fn seed(model: &MemModel, attrs: Value) -> MemRecord {
    let Value::Object(attrs) = attrs else {
        panic!("seed expects a JSON object");
    };
    model.create(attrs).await.unwrap()
}

/// Drive one request through the router and return status + JSON body.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            builder.body(Body::from(body.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
