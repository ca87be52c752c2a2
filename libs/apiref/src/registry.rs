//! The endpoint registry.
//!
//! # Flow
//! 1. **Construction**: [`ApiBuilder::new`] validates the service descriptor
//!    and seeds the built-in monitoring entries.
//! 2. **Declaration**: [`ApiBuilder::declare`] validates one entry against the
//!    entries declared so far and appends it.
//! 3. **Publication**: [`ApiBuilder::reference`] projects the entries into the
//!    reference document at any time.
//! 4. **Hand-off**: [`ApiBuilder::build`] consumes the builder and produces a
//!    [`ServableApi`] for the dispatcher. Declaring after this point is not
//!    possible.
//!
//! Declarations are expected to happen sequentially during startup; the
//! builder takes `&mut self` and does no locking of its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::routing::MethodFilter;
use http::Method;

use crate::builtin::Builtin;
use crate::descriptor::ServiceDescriptor;
use crate::entry::{BLOB, EndpointEntry, EntryHandler, EntryOptions, Output};
use crate::error::{DeclarationErrors, Error, Result};
use crate::reference::{self, ReferenceDocument};
use crate::route::{CleanRoute, clean_route_and_params};
use crate::schema_path::{SchemaPathError, resolve_schema_path};
use crate::scopes::{ScopeExpressionValidator, TemplateValidator};
use crate::serve::{self, ServableApi, ServeOptions};
use crate::stability::Stability;

/// Accumulates and validates endpoint declarations for one service.
pub struct ApiBuilder {
    descriptor: ServiceDescriptor,
    scope_validator: Arc<dyn ScopeExpressionValidator>,
    entries: Vec<EndpointEntry>,
    /// `(method, declared route)` -> index into `entries`
    by_route: HashMap<(Method, String), usize>,
    /// `(method, clean route)` -> index into `entries`
    by_clean_route: HashMap<(Method, String), usize>,
    /// `name` -> index into `entries`
    by_name: HashMap<String, usize>,
    /// route shape (placeholders erased) -> clean route that claimed it
    shapes: HashMap<String, String>,
    has_schemas: bool,
}

impl ApiBuilder {
    /// Create a registry using the structural [`TemplateValidator`] for scopes.
    #[must_use]
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self::with_scope_validator(descriptor, Arc::new(TemplateValidator))
    }

    /// Create a registry with an injected scope-expression validator.
    #[must_use]
    pub fn with_scope_validator(
        descriptor: ServiceDescriptor,
        scope_validator: Arc<dyn ScopeExpressionValidator>,
    ) -> Self {
        let mut builder = Self {
            descriptor,
            scope_validator,
            entries: Vec::new(),
            by_route: HashMap::new(),
            by_clean_route: HashMap::new(),
            by_name: HashMap::new(),
            shapes: HashMap::new(),
            has_schemas: false,
        };
        for builtin in Builtin::ALL {
            builder.push(builtin.entry());
        }
        builder
    }

    #[must_use]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Every entry, built-ins first, in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[EndpointEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&EndpointEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Whether any entry references an input or output schema.
    #[must_use]
    pub fn requires_schemas(&self) -> bool {
        self.has_schemas
    }

    /// Validate one declaration and append it.
    ///
    /// # Errors
    /// Returns the first violated rule; the registry is left unchanged.
    pub fn declare(&mut self, options: EntryOptions) -> Result<()> {
        let entry = self.validate(options)?;
        tracing::debug!(
            name = %entry.name,
            method = %entry.method,
            route = %entry.route,
            stability = %entry.stability,
            "declared API entry"
        );
        if entry.input.is_some() || matches!(entry.output, Some(Output::Schema(_))) {
            self.has_schemas = true;
        }
        self.push(entry);
        Ok(())
    }

    /// Declare every entry, collecting all failures instead of stopping at
    /// the first one.
    ///
    /// # Errors
    /// Returns every failure, in declaration order. Entries that passed
    /// validation stay declared.
    pub fn declare_all(
        &mut self,
        entries: impl IntoIterator<Item = EntryOptions>,
    ) -> Result<(), DeclarationErrors> {
        let errors: Vec<Error> = entries
            .into_iter()
            .filter_map(|options| self.declare(options).err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            tracing::warn!(
                service = %self.descriptor.service_name(),
                failures = errors.len(),
                "API declarations failed"
            );
            Err(DeclarationErrors(errors))
        }
    }

    /// The reference document for the entries declared so far.
    #[must_use]
    pub fn reference(&self) -> ReferenceDocument {
        reference::generate(&self.descriptor, &self.entries)
    }

    /// Freeze the registry and hand it off for serving.
    ///
    /// # Errors
    /// - [`Error::DeprecatedOptionUsed`] if a pre-built validator was supplied
    /// - [`Error::MissingSchemaSet`] if entries use schemas and no schema set was given
    /// - [`Error::SchemaSet`] if the schema set fails to produce a validator
    /// - [`Error::MissingContext`] for declared context keys without a value
    /// - [`Error::UnknownContext`] for values supplied for undeclared keys
    /// - [`Error::MissingHandler`] for entries declared without a handler
    pub async fn build(self, options: ServeOptions) -> Result<ServableApi> {
        if options.validator.is_some() {
            return Err(Error::DeprecatedOptionUsed {
                entry: None,
                option: "validator",
                hint: "use a schema set instead",
            });
        }

        let validator = if self.has_schemas {
            let schema_set = options.schema_set.as_ref().ok_or(Error::MissingSchemaSet)?;
            Some(
                schema_set
                    .validator(&options.root_url)
                    .await
                    .map_err(Error::SchemaSet)?,
            )
        } else {
            None
        };

        for key in self.descriptor.context() {
            if !options.context.contains_key(key) {
                return Err(Error::MissingContext { key: key.clone() });
            }
        }
        for key in options.context.keys() {
            if !self.descriptor.context().contains(key) {
                return Err(Error::UnknownContext { key: key.clone() });
            }
        }

        let mut entries = self.entries;
        for entry in &mut entries {
            match &entry.handler {
                EntryHandler::Builtin(builtin) => {
                    entry.handler =
                        EntryHandler::Router(builtin.router(options.started, &options.versions));
                }
                EntryHandler::Router(_) => {}
                EntryHandler::Unset => {
                    return Err(Error::MissingHandler {
                        entry: entry.name.clone(),
                    });
                }
            }
        }

        tracing::info!(
            service = %self.descriptor.service_name(),
            api_version = %self.descriptor.api_version(),
            entries = entries.len(),
            schemas = validator.is_some(),
            "Building API"
        );

        Ok(ServableApi {
            descriptor: self.descriptor,
            entries,
            validator,
            context: serve::context_from(options.context),
            root_url: options.root_url,
            versions: options.versions,
        })
    }

    fn push(&mut self, entry: EndpointEntry) {
        let index = self.entries.len();
        self.by_route
            .insert((entry.method.clone(), entry.route.clone()), index);
        self.by_clean_route
            .insert((entry.method.clone(), entry.clean_route.clone()), index);
        self.by_name.insert(entry.name.clone(), index);
        self.shapes
            .insert(route_shape(&entry.clean_route), entry.clean_route.clone());
        self.entries.push(entry);
    }

    fn validate(&self, o: EntryOptions) -> Result<EndpointEntry> {
        let entry_name = o.name.as_deref().filter(|n| !n.is_empty());
        let required = |value: Option<String>, option: &'static str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::missing(entry_name, option))
        };

        let name = required(o.name.clone(), "name")?;
        if o.route.is_empty() {
            return Err(Error::missing(Some(&name), "route"));
        }
        let title = required(o.title, "title")?;
        let description = required(o.description, "description")?;
        let category = required(o.category, "category")?;

        if MethodFilter::try_from(o.method.clone()).is_err() {
            return Err(Error::InvalidMethod {
                entry: Some(name),
                method: o.method.to_string(),
            });
        }

        // scopes may be explicitly empty, but must be stated
        let Some(scopes) = o.scopes else {
            return Err(Error::missing(Some(&name), "scopes"));
        };

        let stability = match o.stability.as_deref() {
            None => Stability::default(),
            Some(level) => level.parse().map_err(|_| Error::InvalidStability {
                entry: name.clone(),
                value: level.to_owned(),
            })?,
        };

        if let Some((key, reason)) = o.invalid_params.into_iter().next() {
            return Err(Error::InvalidParamValidator {
                entry: Some(name),
                key,
                reason,
            });
        }
        let mut params = self.descriptor.params().clone();
        params.extend(o.params);

        if let Some((key, reason)) = o.invalid_query.into_iter().next() {
            return Err(Error::InvalidQueryValidator {
                entry: name,
                key,
                reason,
            });
        }

        if o.defer_auth {
            return Err(Error::DeprecatedOptionUsed {
                entry: Some(name),
                option: "deferAuth",
                hint: "authorize inside the handler instead",
            });
        }

        if let Some(expr) = &scopes
            && !self.scope_validator.validate(expr)
        {
            return Err(Error::InvalidScopeExpression {
                entry: name,
                expression: expr.to_string(),
            });
        }

        if o.method == Method::GET && o.input.is_some() {
            return Err(Error::MethodSchemaConflict { entry: name });
        }

        if self
            .by_route
            .contains_key(&(o.method.clone(), o.route.clone()))
        {
            return Err(duplicate_route(&name, &o.method, &o.route));
        }
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateName { entry: name });
        }

        let (input, output) = self.resolve_schemas(&name, o.input, o.output)?;

        let clean = self.check_route(&name, &o.method, &o.route)?;

        if stability == Stability::Deprecated {
            tracing::warn!(name = %name, "declaring deprecated API entry");
        }

        Ok(EndpointEntry {
            name,
            method: o.method,
            route: o.route,
            axum_path: clean.axum_path,
            clean_route: clean.route,
            route_params: clean.params,
            title,
            description,
            category,
            stability,
            scopes,
            params,
            query: o.query,
            input,
            output,
            no_publish: o.no_publish,
            handler: o.handler,
        })
    }

    /// Normalize schema filenames to versioned references.
    fn resolve_schemas(
        &self,
        name: &str,
        input: Option<String>,
        output: Option<String>,
    ) -> Result<(Option<String>, Option<Output>)> {
        let api_version = self.descriptor.api_version();
        let invalid = |field: &'static str| {
            move |source: SchemaPathError| Error::InvalidSchemaPath {
                entry: name.to_owned(),
                field,
                source,
            }
        };

        let input = input
            .map(|file| resolve_schema_path(&file, api_version))
            .transpose()
            .map_err(invalid("input"))?;
        let output = match output {
            None => None,
            Some(out) if out == BLOB => Some(Output::Blob),
            Some(file) => Some(Output::Schema(
                resolve_schema_path(&file, api_version).map_err(invalid("output"))?,
            )),
        };
        Ok((input, output))
    }

    /// Clean the route and check it can be routed next to the existing ones.
    fn check_route(&self, name: &str, method: &Method, route: &str) -> Result<CleanRoute> {
        let clean = clean_route_and_params(route).map_err(|source| Error::InvalidRoute {
            entry: name.to_owned(),
            source,
        })?;

        // `/a/:id` and `/a/:id([0-9]+)` clean to the same route
        if self
            .by_clean_route
            .contains_key(&(method.clone(), clean.route.clone()))
        {
            return Err(duplicate_route(name, method, route));
        }
        if let Some(existing) = self.shapes.get(&route_shape(&clean.route))
            && *existing != clean.route
        {
            return Err(Error::ConflictingRoute {
                entry: name.to_owned(),
                route: clean.route,
                existing: existing.clone(),
            });
        }
        Ok(clean)
    }
}

fn duplicate_route(entry: &str, method: &Method, route: &str) -> Error {
    Error::DuplicateRoute {
        entry: entry.to_owned(),
        method: method.to_string(),
        route: route.to_owned(),
    }
}

/// Erase parameter names so `/a/<id>` and `/a/<name>` compare equal.
fn route_shape(clean_route: &str) -> String {
    clean_route
        .split('/')
        .map(|seg| {
            if seg.starts_with('<') && seg.ends_with('>') {
                "<>"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Debug for ApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBuilder")
            .field("service_name", &self.descriptor.service_name())
            .field("api_version", &self.descriptor.api_version())
            .field("entries", &self.entries.len())
            .field("has_schemas", &self.has_schemas)
            .finish_non_exhaustive()
    }
}
