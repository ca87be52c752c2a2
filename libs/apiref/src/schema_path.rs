//! Derivation of service-local schema references.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static SCHEMA_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(ya?ml|json)$").expect("static regex should not panic"));

/// Errors raised while resolving a schema filename.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaPathError {
    /// The value is a URL instead of a service-local filename.
    #[error("should be a filename, not a url: \"{0}\"")]
    AbsoluteUrl(String),
    /// The filename does not end in `.yml`, `.yaml` or `.json`.
    #[error("\"{0}\" must end in .yml, .yaml or .json")]
    UnknownExtension(String),
}

/// Rewrite `filename` to `<api_version>/<filename-without-extension>.json#`.
///
/// `foo.yaml` with `v1` becomes `v1/foo.json#`. Relative directories in the
/// filename are kept as-is.
///
/// # Errors
/// Returns an error for absolute URLs or unknown extensions.
pub fn resolve_schema_path(filename: &str, api_version: &str) -> Result<String, SchemaPathError> {
    if looks_like_url(filename) {
        return Err(SchemaPathError::AbsoluteUrl(filename.to_owned()));
    }
    if !SCHEMA_EXTENSION.is_match(filename) {
        return Err(SchemaPathError::UnknownExtension(filename.to_owned()));
    }
    let relative = filename.trim_start_matches("./");
    Ok(format!(
        "{api_version}/{}",
        SCHEMA_EXTENSION.replace(relative, ".json#")
    ))
}

fn looks_like_url(value: &str) -> bool {
    value.starts_with("http") || url::Url::parse(value).is_ok_and(|u| !u.cannot_be_a_base())
}
