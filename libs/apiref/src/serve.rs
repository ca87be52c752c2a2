//! Hand-off of a frozen API to the request dispatcher.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::{Extension, Router};
use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::ServiceDescriptor;
use crate::entry::{EndpointEntry, EntryHandler};
use crate::reference::{self, ReferenceDocument};
use crate::version::VersionCache;

/// Validates payloads against schemas referenced by entries.
pub trait SchemaValidator: Send + Sync {
    /// Check `value` against the schema `schema_ref` (e.g. `v1/task.json#`).
    ///
    /// # Errors
    /// Returns a message describing the validation failure.
    fn validate(&self, schema_ref: &str, value: &Value) -> Result<(), String>;
}

/// Resolves and compiles the schemas of a service.
#[async_trait]
pub trait SchemaSet: Send + Sync {
    /// Produce a validator resolving schema references under `root_url`.
    ///
    /// # Errors
    /// Returns an error if the schemas cannot be loaded or compiled.
    async fn validator(&self, root_url: &str) -> anyhow::Result<Arc<dyn SchemaValidator>>;
}

/// Context values made available to handlers via `Extension<ApiContext>`.
#[derive(Debug, Clone, Default)]
pub struct ApiContext(Arc<IndexMap<String, Value>>);

impl ApiContext {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Options supplied when building the servable API.
#[must_use]
pub struct ServeOptions {
    pub(crate) root_url: String,
    pub(crate) schema_set: Option<Arc<dyn SchemaSet>>,
    pub(crate) validator: Option<Arc<dyn SchemaValidator>>,
    pub(crate) context: IndexMap<String, Value>,
    pub(crate) versions: Arc<VersionCache>,
    pub(crate) started: Instant,
}

impl ServeOptions {
    /// Options for a deployment reachable at `root_url`.
    ///
    /// The version object is read from `version.json` in the working
    /// directory unless [`Self::version_cache`] is used.
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            schema_set: None,
            validator: None,
            context: IndexMap::new(),
            versions: Arc::new(VersionCache::new("version.json")),
            started: Instant::now(),
        }
    }

    pub fn schema_set(mut self, schema_set: Arc<dyn SchemaSet>) -> Self {
        self.schema_set = Some(schema_set);
        self
    }

    /// Passing a pre-built validator is no longer supported; building with
    /// one fails. Supply a [`SchemaSet`] instead.
    #[deprecated(note = "use a schema set instead")]
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Supply a value for a context key declared by the service.
    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn version_cache(mut self, versions: Arc<VersionCache>) -> Self {
        self.versions = versions;
        self
    }

    /// Instant `ping` measures uptime from; defaults to when the options were created.
    pub fn started_at(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }
}

impl fmt::Debug for ServeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeOptions")
            .field("root_url", &self.root_url)
            .field("schema_set", &self.schema_set.is_some())
            .field("context", &self.context.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A frozen API ready to be served.
pub struct ServableApi {
    pub(crate) descriptor: ServiceDescriptor,
    pub(crate) entries: Vec<EndpointEntry>,
    pub(crate) validator: Option<Arc<dyn SchemaValidator>>,
    pub(crate) context: ApiContext,
    pub(crate) root_url: String,
    pub(crate) versions: Arc<VersionCache>,
}

impl ServableApi {
    #[must_use]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Every entry, built-ins first, in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[EndpointEntry] {
        &self.entries
    }

    /// Schema validator resolved at build time, if any entry uses schemas.
    #[must_use]
    pub fn validator(&self) -> Option<&Arc<dyn SchemaValidator>> {
        self.validator.as_ref()
    }

    #[must_use]
    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    #[must_use]
    pub fn version_cache(&self) -> &Arc<VersionCache> {
        &self.versions
    }

    /// Path prefix every entry is served under: `/api/<serviceName>/<apiVersion>`.
    #[must_use]
    pub fn base_path(&self) -> String {
        format!(
            "/api/{}/{}",
            self.descriptor.service_name(),
            self.descriptor.api_version()
        )
    }

    #[must_use]
    pub fn reference(&self) -> ReferenceDocument {
        reference::generate(&self.descriptor, &self.entries)
    }

    /// Router serving every entry under [`Self::base_path`].
    ///
    /// Handlers can extract the build-time context with `Extension<ApiContext>`.
    #[must_use]
    pub fn router(&self) -> Router {
        let mut routes: IndexMap<String, axum::routing::MethodRouter> = IndexMap::new();
        for entry in &self.entries {
            let EntryHandler::Router(mr) = &entry.handler else {
                continue;
            };
            let path = entry.axum_path.clone();
            let merged = match routes.shift_remove(&path) {
                Some(existing) => existing.merge(mr.clone()),
                None => mr.clone(),
            };
            routes.insert(path, merged);
        }

        let inner = routes
            .into_iter()
            .fold(Router::new(), |router, (path, mr)| router.route(&path, mr));

        Router::new()
            .nest(&self.base_path(), inner)
            .layer(Extension(self.context.clone()))
    }
}

impl fmt::Debug for ServableApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServableApi")
            .field("service_name", &self.descriptor.service_name())
            .field("api_version", &self.descriptor.api_version())
            .field("entries", &self.entries.len())
            .field("validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) fn context_from(values: IndexMap<String, Value>) -> ApiContext {
    ApiContext(Arc::new(values))
}
