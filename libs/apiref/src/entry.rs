//! Endpoint declarations.
//!
//! [`EntryOptions`] is the declaration a service author writes; it is only
//! checked when handed to [`crate::ApiBuilder::declare`], which turns it into
//! an immutable [`EndpointEntry`].

use std::fmt;

use axum::handler::Handler;
use axum::routing::{MethodFilter, MethodRouter};
use http::Method;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::builtin::Builtin;
use crate::scopes::ScopeExpression;
use crate::stability::Stability;
use crate::validator::ParamValidator;

/// Literal output value for entries that return an opaque blob.
pub const BLOB: &str = "blob";

/// What an entry responds with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Normalized schema reference, e.g. `v1/task.json#`.
    Schema(String),
    /// Opaque, unvalidated response body.
    Blob,
}

impl Output {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Schema(s) => s,
            Self::Blob => BLOB,
        }
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Request handler attached to an entry.
#[derive(Debug, Clone)]
pub enum EntryHandler {
    /// Materialized when the API is built.
    Builtin(Builtin),
    Router(MethodRouter),
    /// Declared for documentation only; cannot be served.
    Unset,
}

/// An endpoint declaration, validated by [`crate::ApiBuilder::declare`].
///
/// ```ignore
/// EntryOptions::get("/task/:taskId")
///     .name("task")
///     .title("Get Task Definition")
///     .description("Fetch a task definition")
///     .category("Tasks")
///     .stability(Stability::Stable)
///     .no_scopes()
///     .output("task.yml")
///     .handler(get_task);
/// ```
#[must_use]
pub struct EntryOptions {
    pub(crate) method: Method,
    pub(crate) route: String,
    pub(crate) name: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) stability: Option<String>,
    pub(crate) scopes: Option<Option<ScopeExpression>>,
    pub(crate) params: IndexMap<String, ParamValidator>,
    pub(crate) query: IndexMap<String, ParamValidator>,
    pub(crate) invalid_params: Vec<(String, String)>,
    pub(crate) invalid_query: Vec<(String, String)>,
    pub(crate) input: Option<String>,
    pub(crate) output: Option<String>,
    pub(crate) no_publish: bool,
    pub(crate) defer_auth: bool,
    pub(crate) handler: EntryHandler,
}

impl EntryOptions {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            name: None,
            title: None,
            description: None,
            category: None,
            stability: None,
            scopes: None,
            params: IndexMap::new(),
            query: IndexMap::new(),
            invalid_params: Vec::new(),
            invalid_query: Vec::new(),
            input: None,
            output: None,
            no_publish: false,
            defer_auth: false,
            handler: EntryHandler::Unset,
        }
    }

    pub fn get(route: impl Into<String>) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn post(route: impl Into<String>) -> Self {
        Self::new(Method::POST, route)
    }

    pub fn put(route: impl Into<String>) -> Self {
        Self::new(Method::PUT, route)
    }

    pub fn delete(route: impl Into<String>) -> Self {
        Self::new(Method::DELETE, route)
    }

    pub fn patch(route: impl Into<String>) -> Self {
        Self::new(Method::PATCH, route)
    }

    pub fn head(route: impl Into<String>) -> Self {
        Self::new(Method::HEAD, route)
    }

    /// Identifier used by generated client libraries.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Markdown description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn stability(mut self, stability: Stability) -> Self {
        self.stability = Some(stability.as_str().to_owned());
        self
    }

    /// Stability given by name, as read from a manifest. Unknown names are
    /// rejected on declaration.
    pub fn stability_named(mut self, stability: impl Into<String>) -> Self {
        self.stability = Some(stability.into());
        self
    }

    /// Scope expression required to call the entry.
    pub fn scopes(mut self, scopes: impl Into<ScopeExpression>) -> Self {
        self.scopes = Some(Some(scopes.into()));
        self
    }

    /// Explicitly mark the entry as requiring no scopes.
    pub fn no_scopes(mut self) -> Self {
        self.scopes = Some(None);
        self
    }

    /// Set scopes from an optional expression; `None` means no scopes.
    pub fn scopes_opt(mut self, scopes: Option<ScopeExpression>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Validator for a path parameter; overrides the service default.
    pub fn param(mut self, name: impl Into<String>, validator: ParamValidator) -> Self {
        self.params.insert(name.into(), validator);
        self
    }

    pub fn param_pattern(mut self, name: impl Into<String>, pattern: &str) -> Self {
        let name = name.into();
        match ParamValidator::pattern(pattern) {
            Ok(v) => {
                self.params.insert(name, v);
            }
            Err(e) => self.invalid_params.push((name, e.to_string())),
        }
        self
    }

    /// Validator for an optional query-string parameter.
    pub fn query(mut self, name: impl Into<String>, validator: ParamValidator) -> Self {
        self.query.insert(name.into(), validator);
        self
    }

    pub fn query_pattern(mut self, name: impl Into<String>, pattern: &str) -> Self {
        let name = name.into();
        match ParamValidator::pattern(pattern) {
            Ok(v) => {
                self.query.insert(name, v);
            }
            Err(e) => self.invalid_query.push((name, e.to_string())),
        }
        self
    }

    /// Input schema filename (`.yml`, `.yaml` or `.json`).
    pub fn input(mut self, schema: impl Into<String>) -> Self {
        self.input = Some(schema.into());
        self
    }

    /// Output schema filename, or [`BLOB`].
    pub fn output(mut self, schema: impl Into<String>) -> Self {
        self.output = Some(schema.into());
        self
    }

    pub fn blob_output(self) -> Self {
        self.output(BLOB)
    }

    /// Leave the entry out of the reference document.
    pub fn no_publish(mut self) -> Self {
        self.no_publish = true;
        self
    }

    /// Deferred authorization is no longer supported; declaring an entry
    /// with it fails.
    #[deprecated(note = "authorize inside the handler instead")]
    pub fn defer_auth(mut self) -> Self {
        self.defer_auth = true;
        self
    }

    /// Attach the request handler, routed for this entry's method only.
    pub fn handler<H, T>(mut self, h: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.handler = match MethodFilter::try_from(self.method.clone()) {
            Ok(filter) => EntryHandler::Router(axum::routing::on(filter, h)),
            Err(_) => EntryHandler::Unset,
        };
        self
    }

    /// Alternative path: provide a pre-composed `MethodRouter` yourself
    /// (useful to attach per-route layers).
    pub fn method_router(mut self, mr: MethodRouter) -> Self {
        self.handler = EntryHandler::Router(mr);
        self
    }
}

impl fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryOptions")
            .field("method", &self.method)
            .field("route", &self.route)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A validated, immutable endpoint.
#[derive(Debug, Clone)]
pub struct EndpointEntry {
    pub(crate) name: String,
    pub(crate) method: Method,
    pub(crate) route: String,
    pub(crate) clean_route: String,
    /// Route with `{name}` segments, as mounted on the router.
    pub(crate) axum_path: String,
    pub(crate) route_params: Vec<String>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) stability: Stability,
    pub(crate) scopes: Option<ScopeExpression>,
    pub(crate) params: IndexMap<String, ParamValidator>,
    pub(crate) query: IndexMap<String, ParamValidator>,
    pub(crate) input: Option<String>,
    pub(crate) output: Option<Output>,
    pub(crate) no_publish: bool,
    pub(crate) handler: EntryHandler,
}

impl EndpointEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Route as declared, with `:name` tokens.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Route with `<name>` placeholders.
    #[must_use]
    pub fn clean_route(&self) -> &str {
        &self.clean_route
    }

    /// Path parameter names, left to right.
    #[must_use]
    pub fn route_params(&self) -> &[String] {
        &self.route_params
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn stability(&self) -> Stability {
        self.stability
    }

    #[must_use]
    pub fn scopes(&self) -> Option<&ScopeExpression> {
        self.scopes.as_ref()
    }

    /// Path parameter validators, service defaults included.
    #[must_use]
    pub fn params(&self) -> &IndexMap<String, ParamValidator> {
        &self.params
    }

    #[must_use]
    pub fn query(&self) -> &IndexMap<String, ParamValidator> {
        &self.query
    }

    /// Normalized input schema reference.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    #[must_use]
    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    #[must_use]
    pub fn no_publish(&self) -> bool {
        self.no_publish
    }

    #[must_use]
    pub fn handler(&self) -> &EntryHandler {
        &self.handler
    }
}
