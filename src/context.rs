//! Typed request context
//!
//! A per-request snapshot of everything the configuration callbacks are
//! allowed to see: method, path, headers, path params and query params.
//! Loaded instances are threaded through the pipeline as explicit
//! values, never stashed on the request, so the context itself stays
//! read-only and cloneable.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};

/// Read-only view of the incoming request handed to authorization,
/// condition and filter callbacks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl RequestContext {
    /// HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path as matched by the router
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A path parameter by name, e.g. `id` for a `/:id` segment
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A query-string parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn for_testing(params: &[(&str, &str)]) -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            query: HashMap::new(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Routes without path parameters have no Path to extract.
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        let query = parts
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        Ok(Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            params,
            query,
        })
    }
}
