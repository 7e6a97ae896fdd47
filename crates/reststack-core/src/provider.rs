//! RestStack provider implementing the verb handlers.
//!
//! Every request follows the same lifecycle:
//!
//! ```text
//! resource allow-list -> verb validation -> filter | schema
//!   -> request interceptor -> storage -> ETag -> response interceptor
//!   -> broadcast (mutations) -> response
//! ```

use std::sync::Arc;

use http::{HeaderMap, HeaderValue, StatusCode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use tracing::debug;

use reststack_http::response::CONTENT_TYPE;
use reststack_model::error::RestError;
use reststack_model::operations::Verb;
use reststack_model::request::RestRequest;
use reststack_model::types::{BroadcastEvent, Document, ID_FIELD, Item};

use crate::broadcast::{Broadcaster, NoopBroadcaster};
use crate::config::RestConfig;
use crate::error::{filter_error_to_rest, storage_error_to_rest};
use crate::etag::{compute_etag, if_match_holds, if_none_match_hits};
use crate::filter::{Filter, parse_filter};
use crate::interceptor::{Intercept, Interceptors};
use crate::schema::{SchemaRegistry, Validation};
use crate::storage::Queries;

/// Bytes escaped in a `Location` path segment: everything but RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Outcome of a handled request, independent of the HTTP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    /// Response status.
    pub status: StatusCode,
    /// Extra headers (`ETag`, `Location`).
    pub headers: HeaderMap,
    /// JSON body; `None` for 204, 304 and HEAD.
    pub body: Option<Value>,
}

impl RestResponse {
    /// A response without a body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A JSON response.
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// A header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, RestError> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            RestError::internal_error(format!("Invalid {name} header value")).with_source(e)
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// The resource request engine.
#[derive(Debug, Clone)]
pub struct RestStackProvider {
    config: Arc<RestConfig>,
    queries: Arc<dyn Queries>,
    schemas: Arc<SchemaRegistry>,
    interceptors: Arc<Interceptors>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl RestStackProvider {
    /// Create a provider with no schemas, no interceptors and no broadcaster.
    #[must_use]
    pub fn new(config: RestConfig, queries: Arc<dyn Queries>) -> Self {
        Self {
            config: Arc::new(config),
            queries,
            schemas: Arc::new(SchemaRegistry::new()),
            interceptors: Arc::new(Interceptors::new()),
            broadcaster: Arc::new(NoopBroadcaster),
        }
    }

    /// Use `schemas` for POST/PUT/PATCH bodies.
    #[must_use]
    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Arc::new(schemas);
        self
    }

    /// Use `interceptors` for every verb.
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = Arc::new(interceptors);
        self
    }

    /// Publish mutations through `broadcaster`.
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Storage backend.
    #[must_use]
    pub fn queries(&self) -> &Arc<dyn Queries> {
        &self.queries
    }

    /// Handle one request.
    pub async fn handle(&self, request: RestRequest) -> Result<RestResponse, RestError> {
        debug!(
            verb = %request.verb,
            backend = self.queries.backend_name(),
            "handling request",
        );
        match request.verb {
            Verb::Get | Verb::Head => self.handle_get(&request).await,
            Verb::Post => self.handle_post(&request).await,
            Verb::Put | Verb::Patch => self.handle_update(&request).await,
            Verb::Delete => self.handle_delete(&request).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

impl RestStackProvider {
    /// Resolve the resource and apply the allow-list.
    fn resource<'a>(&self, request: &'a RestRequest) -> Result<&'a str, RestError> {
        match request.resource() {
            Some(resource) if self.config.allows(resource) => Ok(resource),
            other => Err(RestError::resource_not_found(other.unwrap_or_default())),
        }
    }

    /// Parse the filter and reject it on single-item requests.
    fn filter(request: &RestRequest) -> Result<Option<Filter>, RestError> {
        let filter = match request.query.as_deref() {
            Some(query) => parse_filter(query).map_err(filter_error_to_rest)?,
            None => None,
        };
        if filter.is_some() && request.id().is_some() {
            return Err(RestError::filter_by_id());
        }
        Ok(filter)
    }

    /// The request body as a JSON object without an `id`.
    fn body_fields(request: &RestRequest) -> Result<Document, RestError> {
        match &request.body {
            None => Ok(Document::new()),
            Some(Value::Object(fields)) if fields.contains_key(ID_FIELD) => {
                Err(RestError::id_in_body())
            }
            Some(Value::Object(fields)) => Ok(fields.clone()),
            Some(_) => Err(RestError::client_input(
                "The request body must be a JSON object",
            )),
        }
    }

    async fn validate(
        &self,
        resource: &str,
        verb: Verb,
        fields: &Document,
    ) -> Result<(), RestError> {
        let body = Value::Object(fields.clone());
        match self.schemas.validate(resource, verb, &body).await {
            Validation::Valid => Ok(()),
            Validation::Invalid { message } => Err(RestError::client_input(message)),
        }
    }

    /// Run the request interceptor. `Ok(Err(response))` short-circuits.
    async fn intercept(
        &self,
        request: &RestRequest,
        fields: Option<Document>,
    ) -> Result<Result<Option<Document>, RestResponse>, RestError> {
        match self.interceptors.run_request(request).await? {
            Intercept::Continue => Ok(Ok(fields)),
            Intercept::ReplaceBody(body) => match (fields, body) {
                (None, _) => Ok(Ok(None)),
                (Some(_), Value::Object(mut replaced)) => {
                    replaced.remove(ID_FIELD);
                    Ok(Ok(Some(replaced)))
                }
                (Some(_), _) => Err(RestError::internal_error(
                    "Request interceptor replaced the body with a non-object",
                )),
            },
            Intercept::Respond { status, body } => {
                let body = if request.verb == Verb::Head { None } else { body };
                Ok(Err(RestResponse {
                    status,
                    headers: HeaderMap::new(),
                    body,
                }))
            }
        }
    }

    /// Representation used for response bodies and entity tags.
    fn present(&self, value: Value) -> Value {
        if self.config.strip_nulls {
            strip_nulls(value)
        } else {
            value
        }
    }

    /// Enforce `If-Match` against the current representation.
    fn check_if_match(&self, request: &RestRequest, current: &Value) -> Result<(), RestError> {
        if !self.config.etags {
            return Ok(());
        }
        let tag = compute_etag(current);
        if if_match_holds(&tag, request.if_match()) {
            Ok(())
        } else {
            debug!(etag = %tag, if_match = ?request.if_match(), "precondition failed");
            Err(RestError::etag_mismatch())
        }
    }

    fn with_etag(&self, response: RestResponse, payload: &Value) -> Result<RestResponse, RestError> {
        if self.config.etags {
            response.with_header("etag", &compute_etag(payload))
        } else {
            Ok(response)
        }
    }

    fn location(&self, resource: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_path,
            utf8_percent_encode(resource, PATH_SEGMENT),
            utf8_percent_encode(id, PATH_SEGMENT),
        )
    }
}

// ---------------------------------------------------------------------------
// Verb handlers
// ---------------------------------------------------------------------------

impl RestStackProvider {
    /// GET / HEAD: one item or a (filtered) collection.
    async fn handle_get(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        let resource = self.resource(request)?;
        let filter = Self::filter(request)?;

        if let Err(response) = self.intercept(request, None).await? {
            return Ok(response);
        }

        let payload = match request.id() {
            Some(id) => self
                .queries
                .get_by_id(resource, id)
                .await
                .map_err(storage_error_to_rest)?
                .ok_or_else(|| RestError::id_not_found(id))?
                .into_value(),
            None => Value::Array(
                self.queries
                    .get_all(resource, filter.as_ref())
                    .await
                    .map_err(storage_error_to_rest)?
                    .into_iter()
                    .map(Item::into_value)
                    .collect(),
            ),
        };

        let payload = self.interceptors.run_response(request, payload).await?;
        let payload = self.present(payload);

        if self.config.etags {
            let tag = compute_etag(&payload);
            if let Some(if_none_match) = request.if_none_match() {
                if if_none_match_hits(&tag, if_none_match) {
                    return RestResponse::empty(StatusCode::NOT_MODIFIED).with_header("etag", &tag);
                }
            }
        }

        let response = if request.verb == Verb::Head {
            RestResponse::empty(StatusCode::OK).with_header("content-type", CONTENT_TYPE)?
        } else {
            RestResponse::json(StatusCode::OK, payload.clone())
        };
        self.with_etag(response, &payload)
    }

    /// POST: create an item, optionally under the id given in the URL.
    async fn handle_post(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        let resource = self.resource(request)?;
        let fields = Self::body_fields(request)?;
        self.validate(resource, Verb::Post, &fields).await?;

        let fields = match self.intercept(request, Some(fields)).await? {
            Ok(fields) => fields.unwrap_or_default(),
            Err(response) => return Ok(response),
        };

        let id = request.id();
        if let Some(id) = id {
            let existing = self
                .queries
                .get_by_id(resource, id)
                .await
                .map_err(storage_error_to_rest)?;
            if existing.is_some() {
                return Err(RestError::id_exists(id));
            }
        }

        let item = self
            .queries
            .create(resource, id, fields)
            .await
            .map_err(storage_error_to_rest)?;
        debug!(resource, id = %item.id, "created item");
        self.broadcaster.broadcast(BroadcastEvent::created(resource, &item));

        let location = self.location(resource, &item.id);
        RestResponse::json(StatusCode::CREATED, self.present(item.into_value()))
            .with_header("location", &location)
    }

    /// PUT replaces, PATCH shallow-merges. The id must be in the URL.
    async fn handle_update(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        let resource = self.resource(request)?;
        let id = request.id().ok_or_else(RestError::id_required)?;
        let fields = Self::body_fields(request)?;
        self.validate(resource, request.verb, &fields).await?;

        let fields = match self.intercept(request, Some(fields)).await? {
            Ok(fields) => fields.unwrap_or_default(),
            Err(response) => return Ok(response),
        };

        let existing = self
            .queries
            .get_by_id(resource, id)
            .await
            .map_err(storage_error_to_rest)?
            .ok_or_else(|| RestError::id_not_found(id))?;
        self.check_if_match(request, &self.present(existing.into_value()))?;

        let patch = Item::new(id, fields);
        let updated = if request.verb == Verb::Put {
            self.queries.replace(resource, patch).await
        } else {
            self.queries.update(resource, patch).await
        }
        .map_err(storage_error_to_rest)?;
        debug!(resource, id, verb = %request.verb, "updated item");
        self.broadcaster.broadcast(BroadcastEvent::updated(resource, &updated));

        let payload = self.present(updated.into_value());
        self.with_etag(RestResponse::json(StatusCode::OK, payload.clone()), &payload)
    }

    /// DELETE one item, or a (filtered) collection when enabled.
    async fn handle_delete(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        let resource = self.resource(request)?;
        let filter = Self::filter(request)?;

        if let Err(response) = self.intercept(request, None).await? {
            return Ok(response);
        }

        if let Some(id) = request.id() {
            let existing = self
                .queries
                .get_by_id(resource, id)
                .await
                .map_err(storage_error_to_rest)?;
            match &existing {
                Some(item) => self.check_if_match(request, &self.present(item.to_value()))?,
                None if self.config.etags && request.if_match().is_none() => {
                    return Err(RestError::etag_mismatch());
                }
                None => {}
            }
            if existing.is_some() {
                self.queries
                    .delete_by_id(resource, id)
                    .await
                    .map_err(storage_error_to_rest)?;
                debug!(resource, id, "deleted item");
                self.broadcaster.broadcast(BroadcastEvent::deleted(resource, id));
            }
            return Ok(RestResponse::empty(StatusCode::NO_CONTENT));
        }

        if !self.config.allow_delete_collection {
            return Err(RestError::collection_delete_not_allowed());
        }

        if self.config.etags {
            let snapshot = self
                .queries
                .get_all(resource, filter.as_ref())
                .await
                .map_err(storage_error_to_rest)?;
            let snapshot = Value::Array(snapshot.into_iter().map(Item::into_value).collect());
            self.check_if_match(request, &self.present(snapshot))?;
        }

        let deleted = match &filter {
            Some(filter) => self.queries.delete_by_filter(resource, filter).await,
            None => self.queries.delete_all(resource).await,
        };
        deleted.map_err(storage_error_to_rest)?;
        debug!(resource, filtered = filter.is_some(), "deleted collection");
        self.broadcaster.broadcast(BroadcastEvent::deleted_all(resource));

        Ok(RestResponse::empty(StatusCode::NO_CONTENT))
    }
}

/// Remove `null` fields from an item, or from every item of a collection.
/// Nested objects and array elements are left untouched.
#[must_use]
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(mut fields) => {
            fields.retain(|_, v| !v.is_null());
            Value::Object(fields)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(_) => strip_nulls(item),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
