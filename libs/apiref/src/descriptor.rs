//! Service-level identity and defaults.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::validator::ParamValidator;

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("static regex should not panic"));

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static API_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9]+$").expect("static regex should not panic"));

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static ERROR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("static regex should not panic"));

/// Error codes every service understands, merged under service overrides.
pub const DEFAULT_ERROR_CODES: &[(&str, u16)] = &[
    ("MalformedPayload", 400),
    ("InvalidRequestArguments", 400),
    ("InputValidationError", 400),
    ("InputError", 400),
    ("AuthenticationFailed", 401),
    ("InsufficientScopes", 403),
    ("ResourceNotFound", 404),
    ("RequestConflict", 409),
    ("ResourceExpired", 410),
    ("InputTooLarge", 413),
    ("InternalServerError", 500),
];

/// Validated service metadata shared by every entry of a registry.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    service_name: String,
    api_version: String,
    title: String,
    description: String,
    params: IndexMap<String, ParamValidator>,
    context: Vec<String>,
    error_codes: BTreeMap<String, u16>,
}

impl ServiceDescriptor {
    #[must_use]
    pub fn builder() -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder::default()
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Default path parameter validators.
    #[must_use]
    pub fn params(&self) -> &IndexMap<String, ParamValidator> {
        &self.params
    }

    /// Context keys that must be supplied when the API is built.
    #[must_use]
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Defaults merged with the service's own error codes.
    #[must_use]
    pub fn error_codes(&self) -> &BTreeMap<String, u16> {
        &self.error_codes
    }
}

/// Builder for [`ServiceDescriptor`]; validation happens in [`Self::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct ServiceDescriptorBuilder {
    service_name: Option<String>,
    api_version: Option<String>,
    title: Option<String>,
    description: Option<String>,
    params: IndexMap<String, ParamValidator>,
    context: Vec<String>,
    error_codes: Vec<(String, u16)>,
    invalid_params: Vec<(String, String)>,
}

impl ServiceDescriptorBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Default validator for a path parameter, used by every entry that does
    /// not declare its own.
    pub fn param(mut self, name: impl Into<String>, validator: ParamValidator) -> Self {
        self.params.insert(name.into(), validator);
        self
    }

    /// Default pattern for a path parameter. Compile errors surface from
    /// [`Self::build`].
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

    pub fn context_key(mut self, key: impl Into<String>) -> Self {
        self.context.push(key.into());
        self
    }

    pub fn error_code(mut self, code: impl Into<String>, status: u16) -> Self {
        self.error_codes.push((code.into(), status));
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// # Errors
    /// Returns [`Error::MissingOption`] for absent metadata,
    /// [`Error::InvalidFormat`] for malformed names, versions or error codes
    /// and [`Error::InvalidParamValidator`] for uncompilable default patterns.
    pub fn build(self) -> Result<ServiceDescriptor> {
        let title = required(self.title, "title")?;
        let description = required(self.description, "description")?;
        let service_name = required(self.service_name, "serviceName")?;
        let api_version = required(self.api_version, "apiVersion")?;

        if !SERVICE_NAME.is_match(&service_name) {
            return Err(Error::InvalidFormat {
                what: "api serviceName",
                value: service_name,
            });
        }
        if !API_VERSION.is_match(&api_version) {
            return Err(Error::InvalidFormat {
                what: "apiVersion",
                value: api_version,
            });
        }

        if let Some((key, reason)) = self.invalid_params.into_iter().next() {
            return Err(Error::InvalidParamValidator {
                entry: None,
                key,
                reason,
            });
        }

        let mut error_codes: BTreeMap<String, u16> = DEFAULT_ERROR_CODES
            .iter()
            .map(|(code, status)| ((*code).to_owned(), *status))
            .collect();
        error_codes.extend(self.error_codes);
        for (code, status) in &error_codes {
            if !ERROR_CODE.is_match(code) {
                return Err(Error::InvalidFormat {
                    what: "error code",
                    value: code.clone(),
                });
            }
            if !(100..=599).contains(status) {
                return Err(Error::InvalidFormat {
                    what: "HTTP status code",
                    value: format!("{code}={status}"),
                });
            }
        }

        Ok(ServiceDescriptor {
            service_name,
            api_version,
            title,
            description,
            params: self.params,
            context: self.context,
            error_codes,
        })
    }
}

fn required(value: Option<String>, option: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing(None, option))
}
