//! API manifests: a service and its entries declared in YAML or JSON.
//!
//! ```yaml
//! service:
//!   serviceName: queue
//!   apiVersion: v1
//!   title: Queue API
//!   description: The queue service
//!   params:
//!     taskId: "^[A-Za-z0-9_-]{22}$"
//! entries:
//!   - method: get
//!     route: /task/:taskId
//!     name: task
//!     title: Get Task Definition
//!     description: Fetch a task definition
//!     category: Tasks
//!     stability: stable
//!     scopes: null
//!     output: task.yml
//! ```
//!
//! Service metadata can be overridden from the environment with
//! `APIREF_SERVICE_<FIELD>` variables, e.g. `APIREF_SERVICE_API_VERSION=v2`.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Yaml};
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::descriptor::ServiceDescriptor;
use crate::entry::EntryOptions;
use crate::error::{DeclarationErrors, Error};
use crate::registry::ApiBuilder;
use crate::scopes::ScopeExpression;

const ENV_PREFIX: &str = "APIREF_SERVICE_";

/// Errors raised while loading a manifest file.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("manifest {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("manifest {} must be .yml, .yaml or .json", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("invalid manifest: {0}")]
    Parse(#[source] Box<figment::Error>),
}

/// A complete API declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiManifest {
    pub service: ServiceConfig,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceConfig {
    pub service_name: Option<String>,
    pub api_version: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Default path parameter patterns.
    #[serde(default)]
    pub params: IndexMap<String, String>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub error_codes: IndexMap<String, u16>,
    /// Removed; schemas are always resolved under the API version.
    #[serde(default)]
    pub schema_prefix: Option<serde_json::Value>,
    /// Renamed to `apiVersion`.
    #[serde(default)]
    pub version: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntryConfig {
    pub method: String,
    pub route: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub stability: Option<String>,
    /// Absent key: unset. `null`: explicitly no scopes.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub scopes: Option<Option<ScopeExpression>>,
    #[serde(default)]
    pub params: IndexMap<String, String>,
    #[serde(default)]
    pub query: IndexMap<String, String>,
    pub input: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub no_publish: bool,
    #[serde(default)]
    pub defer_auth: bool,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Load a manifest, applying environment overrides to the service section.
///
/// # Errors
/// Returns [`ConfigLoadError`] if the file is missing, has an unknown
/// extension or does not deserialize.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<ApiManifest, ConfigLoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConfigLoadError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("yml" | "yaml") => Figment::from(Yaml::file(path)),
        Some("json") => Figment::from(Json::file(path)),
        _ => return Err(ConfigLoadError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::debug!(path = %path.display(), "loading API manifest");
    figment
        .merge(service_env())
        .extract()
        .map_err(|e| ConfigLoadError::Parse(Box::new(e)))
}

/// Parse a manifest from a YAML string, without environment overrides.
///
/// # Errors
/// Returns [`ConfigLoadError::Parse`] if the document does not deserialize.
pub fn parse_manifest(yaml: &str) -> Result<ApiManifest, ConfigLoadError> {
    Figment::from(Yaml::string(yaml))
        .extract()
        .map_err(|e| ConfigLoadError::Parse(Box::new(e)))
}

/// `APIREF_SERVICE_API_VERSION` -> `service.apiVersion`
fn service_env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .lowercase(false)
        .map(|key| format!("service.{}", camel_case(key.as_str())).into())
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, word) in key.split('_').filter(|w| !w.is_empty()).enumerate() {
        let word = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

impl ServiceConfig {
    /// Build the descriptor, rejecting legacy options first.
    ///
    /// # Errors
    /// Returns [`Error::LegacyOption`] or any descriptor validation error.
    pub fn to_descriptor(&self) -> Result<ServiceDescriptor, Error> {
        if self.schema_prefix.is_some() {
            return Err(Error::LegacyOption {
                option: "schemaPrefix",
                hint: "schemas are resolved under the API version",
            });
        }
        if self.version.is_some() {
            return Err(Error::LegacyOption {
                option: "version",
                hint: "use apiVersion",
            });
        }

        let mut builder = ServiceDescriptor::builder();
        if let Some(v) = &self.service_name {
            builder = builder.service_name(v);
        }
        if let Some(v) = &self.api_version {
            builder = builder.api_version(v);
        }
        if let Some(v) = &self.title {
            builder = builder.title(v);
        }
        if let Some(v) = &self.description {
            builder = builder.description(v);
        }
        for (name, pattern) in &self.params {
            builder = builder.param_pattern(name, pattern);
        }
        for key in &self.context {
            builder = builder.context_key(key);
        }
        for (code, status) in &self.error_codes {
            builder = builder.error_code(code, *status);
        }
        builder.build()
    }
}

impl EntryConfig {
    /// Translate into declaration options.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMethod`] for a malformed method; every other
    /// check happens on declaration.
    pub fn to_options(&self) -> Result<EntryOptions, Error> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes()).map_err(
            |_| Error::InvalidMethod {
                entry: self.name.clone(),
                method: self.method.clone(),
            },
        )?;

        let mut options = EntryOptions::new(method, &self.route);
        if let Some(v) = &self.name {
            options = options.name(v);
        }
        if let Some(v) = &self.title {
            options = options.title(v);
        }
        if let Some(v) = &self.description {
            options = options.description(v);
        }
        if let Some(v) = &self.category {
            options = options.category(v);
        }
        if let Some(v) = &self.stability {
            options = options.stability_named(v);
        }
        if let Some(scopes) = &self.scopes {
            options = options.scopes_opt(scopes.clone());
        }
        for (name, pattern) in &self.params {
            options = options.param_pattern(name, pattern);
        }
        for (name, pattern) in &self.query {
            options = options.query_pattern(name, pattern);
        }
        if let Some(v) = &self.input {
            options = options.input(v);
        }
        if let Some(v) = &self.output {
            options = options.output(v);
        }
        if self.no_publish {
            options = options.no_publish();
        }
        if self.defer_auth {
            #[allow(deprecated)]
            {
                options = options.defer_auth();
            }
        }
        Ok(options)
    }
}

impl ApiManifest {
    /// Construct a registry and declare every entry.
    ///
    /// # Errors
    /// Returns the descriptor error alone if the service section is invalid,
    /// otherwise every entry that failed to declare.
    pub fn into_builder(self) -> Result<ApiBuilder, DeclarationErrors> {
        let descriptor = self
            .service
            .to_descriptor()
            .map_err(|e| DeclarationErrors(vec![e]))?;
        let mut builder = ApiBuilder::new(descriptor);

        let mut errors = Vec::new();
        for entry in &self.entries {
            match entry.to_options() {
                Ok(options) => {
                    if let Err(e) = builder.declare(options) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(builder)
        } else {
            tracing::warn!(failures = errors.len(), "manifest declarations failed");
            Err(DeclarationErrors(errors))
        }
    }
}
