//! Route pattern cleaning and path parameter extraction.
//!
//! Routes are declared with express-style `:name` tokens, for example
//! `/object/:id/action/:param`. The reference document publishes them with a
//! neutral `<name>` placeholder so client generators can template them in any
//! target language, and the dispatcher receives them as `{name}` segments.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// `/:name`, optionally followed by a `(constraint)` and an optional marker `?`.
#[allow(clippy::expect_used)] // good regex, it doesn't panic
static PARAM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/:(\w+)(\(.*?\))?\??").expect("static regex should not panic")
});

/// Errors raised while cleaning a route pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The same parameter name appears more than once in one route.
    #[error("route \"{route}\" declares parameter '{param}' more than once")]
    DuplicateParameter { route: String, param: String },
    #[error("route \"{0}\" must start with '/'")]
    MissingLeadingSlash(String),
    /// A segment the router cannot mount, such as `*path`, `:-x` or a
    /// parameter that is not a whole segment.
    #[error("route \"{route}\" has segment \"{segment}\" that cannot be routed")]
    UnroutableSegment { route: String, segment: String },
}

/// A route with its parameter tokens replaced by `<name>` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRoute {
    /// Route with `<name>` placeholders.
    pub route: String,
    /// Parameter names in left-to-right order.
    pub params: Vec<String>,
    /// Route with `{name}` segments as understood by `axum`.
    pub axum_path: String,
}

/// Replace every `:name` token with `<name>` and collect the names in order.
///
/// # Errors
/// Returns [`RouteError::DuplicateParameter`] if a name is used twice,
/// [`RouteError::MissingLeadingSlash`] for relative routes and
/// [`RouteError::UnroutableSegment`] for segments the router would refuse.
pub fn clean_route_and_params(route: &str) -> Result<CleanRoute, RouteError> {
    if !route.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash(route.to_owned()));
    }
    let mut params: Vec<String> = Vec::new();
    let cleaned = PARAM_TOKEN.replace_all(route, |caps: &Captures<'_>| {
        let name = &caps[1];
        params.push(name.to_owned());
        format!("/<{name}>")
    });

    for (i, param) in params.iter().enumerate() {
        if params[..i].contains(param) {
            return Err(RouteError::DuplicateParameter {
                route: route.to_owned(),
                param: param.clone(),
            });
        }
    }

    let axum_path = axum_path(route, &cleaned, &params)?;
    Ok(CleanRoute {
        route: cleaned.into_owned(),
        params,
        axum_path,
    })
}

/// Map `<name>` segments to `{name}` and refuse anything else with router syntax.
fn axum_path(route: &str, cleaned: &str, params: &[String]) -> Result<String, RouteError> {
    let mut pending = params.iter();
    let mut segments = Vec::new();
    for segment in cleaned.split('/') {
        let placeholder = segment
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'));
        if let Some(name) = placeholder
            && pending.as_slice().first().is_some_and(|p| p == name)
        {
            pending.next();
            segments.push(format!("{{{name}}}"));
            continue;
        }
        if segment.starts_with([':', '*']) || segment.contains(['{', '}', '<', '>']) {
            return Err(RouteError::UnroutableSegment {
                route: route.to_owned(),
                segment: segment.to_owned(),
            });
        }
        segments.push(segment.to_owned());
    }
    Ok(segments.join("/"))
}
