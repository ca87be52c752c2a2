//! Configuration-time error types.
//!
//! Every failure raised while constructing a registry, declaring entries or
//! building the servable API is a bug in the service's own declarations.
//! Entry-level variants always carry the offending entry name so startup can
//! abort with a message that points at the right declaration.

use thiserror::Error;

use crate::route::RouteError;
use crate::schema_path::SchemaPathError;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while configuring an API.
#[derive(Error, Debug)]
pub enum Error {
    /// A required option was not provided (or was empty).
    #[error("{}option '{option}' must be provided", entry_prefix(.entry.as_deref()))]
    MissingOption {
        entry: Option<String>,
        option: &'static str,
    },

    /// A value does not match its required format.
    #[error("{what} \"{value}\" is not valid")]
    InvalidFormat { what: &'static str, value: String },

    /// The entry's HTTP method is malformed or cannot be routed.
    #[error("{}method \"{method}\" cannot be routed", entry_prefix(.entry.as_deref()))]
    InvalidMethod {
        entry: Option<String>,
        method: String,
    },

    /// A renamed or removed service option was supplied.
    #[error("option '{option}' is no longer allowed: {hint}")]
    LegacyOption {
        option: &'static str,
        hint: &'static str,
    },

    /// The stability level is not one of the known levels.
    #[error("entry '{entry}': stability \"{value}\" must be one of deprecated, experimental, stable")]
    InvalidStability { entry: String, value: String },

    /// The scope-expression template was rejected by the scope validator.
    #[error("entry '{entry}': invalid scope expression template: {expression}")]
    InvalidScopeExpression { entry: String, expression: String },

    /// Another entry already uses the same route and method.
    #[error("entry '{entry}': identical route and method declaration ({method} {route})")]
    DuplicateRoute {
        entry: String,
        method: String,
        route: String,
    },

    /// Another entry already uses the same name.
    #[error("entry '{entry}': this function has already been declared")]
    DuplicateName { entry: String },

    /// A query validator could not be turned into a pattern or predicate.
    #[error("entry '{entry}': query.{key} must be a pattern or a predicate: {reason}")]
    InvalidQueryValidator {
        entry: String,
        key: String,
        reason: String,
    },

    /// A path parameter validator could not be turned into a pattern or predicate.
    #[error("{}params.{key} must be a pattern or a predicate: {reason}", entry_prefix(.entry.as_deref()))]
    InvalidParamValidator {
        entry: Option<String>,
        key: String,
        reason: String,
    },

    /// A deprecated option was used.
    #[error("{}{option} is deprecated: {hint}", entry_prefix(.entry.as_deref()))]
    DeprecatedOptionUsed {
        entry: Option<String>,
        option: &'static str,
        hint: &'static str,
    },

    /// A GET entry declared an input schema.
    #[error("entry '{entry}': can't have an input with method GET")]
    MethodSchemaConflict { entry: String },

    /// A schema reference is not a service-local schema filename.
    #[error("entry '{entry}': {field} {source}")]
    InvalidSchemaPath {
        entry: String,
        field: &'static str,
        #[source]
        source: SchemaPathError,
    },

    /// The route pattern could not be cleaned.
    #[error("entry '{entry}': {source}")]
    InvalidRoute {
        entry: String,
        #[source]
        source: RouteError,
    },

    /// The route has the same shape as an existing route but names its
    /// parameters differently.
    #[error("entry '{entry}': route {route} conflicts with {existing}")]
    ConflictingRoute {
        entry: String,
        route: String,
        existing: String,
    },

    /// Entries reference schemas but no schema set was supplied to `build`.
    #[error("must provide a schema set if any schemas are used")]
    MissingSchemaSet,

    /// A context key declared by the service was not supplied to `build`.
    #[error("context key '{key}' must be provided")]
    MissingContext { key: String },

    /// A context value was supplied for a key the service does not declare.
    #[error("context key '{key}' is not declared by the service")]
    UnknownContext { key: String },

    /// An entry cannot be served because it has no handler.
    #[error("entry '{entry}': no handler attached")]
    MissingHandler { entry: String },

    /// The schema set failed to produce a validator.
    #[error("schema set failed to resolve a validator: {0}")]
    SchemaSet(#[source] anyhow::Error),
}

fn entry_prefix(entry: Option<&str>) -> String {
    entry.map(|e| format!("entry '{e}': ")).unwrap_or_default()
}

impl Error {
    pub(crate) fn missing(entry: Option<&str>, option: &'static str) -> Self {
        Self::MissingOption {
            entry: entry.map(ToOwned::to_owned),
            option,
        }
    }

    /// Name of the entry this error is about, if it is entry-scoped.
    #[must_use]
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::MissingOption { entry, .. }
            | Self::InvalidMethod { entry, .. }
            | Self::InvalidParamValidator { entry, .. }
            | Self::DeprecatedOptionUsed { entry, .. } => entry.as_deref(),
            Self::InvalidStability { entry, .. }
            | Self::InvalidScopeExpression { entry, .. }
            | Self::DuplicateRoute { entry, .. }
            | Self::DuplicateName { entry }
            | Self::InvalidQueryValidator { entry, .. }
            | Self::MethodSchemaConflict { entry }
            | Self::InvalidSchemaPath { entry, .. }
            | Self::InvalidRoute { entry, .. }
            | Self::ConflictingRoute { entry, .. }
            | Self::MissingHandler { entry } => Some(entry),
            Self::InvalidFormat { .. }
            | Self::LegacyOption { .. }
            | Self::MissingSchemaSet
            | Self::MissingContext { .. }
            | Self::UnknownContext { .. }
            | Self::SchemaSet(_) => None,
        }
    }
}

/// Every failure collected by [`crate::ApiBuilder::declare_all`].
#[derive(Error, Debug)]
#[error("{} declaration(s) failed: {}", .0.len(), join(.0))]
pub struct DeclarationErrors(pub Vec<Error>);

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DeclarationErrors {
    /// The individual failures, in declaration order.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.0
    }
}
