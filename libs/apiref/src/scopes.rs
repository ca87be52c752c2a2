//! Scope-expression templates attached to entries.
//!
//! The grammar itself belongs to the authorization layer. This crate only
//! stores templates, publishes them verbatim, and asks a
//! [`ScopeExpressionValidator`] whether a template is well-formed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A scope-expression template in its JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeExpression(Value);

impl ScopeExpression {
    /// A single scope, which may contain `<param>` placeholders.
    #[must_use]
    pub fn scope(scope: impl Into<String>) -> Self {
        Self(Value::String(scope.into()))
    }

    #[must_use]
    pub fn all_of(items: impl IntoIterator<Item = ScopeExpression>) -> Self {
        Self(json!({ "AllOf": items.into_iter().map(|e| e.0).collect::<Vec<_>>() }))
    }

    #[must_use]
    pub fn any_of(items: impl IntoIterator<Item = ScopeExpression>) -> Self {
        Self(json!({ "AnyOf": items.into_iter().map(|e| e.0).collect::<Vec<_>>() }))
    }

    /// Wrap a raw JSON template without checking it.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for ScopeExpression {
    fn from(scope: &str) -> Self {
        Self::scope(scope)
    }
}

impl fmt::Display for ScopeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks that a scope-expression template is well-formed.
pub trait ScopeExpressionValidator: Send + Sync {
    fn validate(&self, expression: &ScopeExpression) -> bool;
}

/// Structural validator for the template grammar.
///
/// Accepts printable-ASCII scope strings, `{"AllOf": [..]}`, `{"AnyOf": [..]}`,
/// `{"if": name, "then": expr[, "else": expr]}` and
/// `{"for": name, "in": name, "each": scope}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateValidator;

impl ScopeExpressionValidator for TemplateValidator {
    fn validate(&self, expression: &ScopeExpression) -> bool {
        valid_template(&expression.0)
    }
}

fn valid_scope(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

fn valid_template(value: &Value) -> bool {
    match value {
        Value::String(s) => valid_scope(s),
        Value::Object(obj) => valid_object(obj),
        _ => false,
    }
}

fn valid_object(obj: &Map<String, Value>) -> bool {
    if obj.len() == 1
        && let Some(items) = obj.get("AllOf").or_else(|| obj.get("AnyOf"))
    {
        return items
            .as_array()
            .is_some_and(|items| items.iter().all(valid_template));
    }

    if obj.contains_key("if") {
        let keys_ok = obj.keys().all(|k| matches!(k.as_str(), "if" | "then" | "else"));
        return keys_ok
            && obj.get("if").is_some_and(Value::is_string)
            && obj.get("then").is_some_and(valid_template)
            && obj.get("else").is_none_or(valid_template);
    }

    if obj.contains_key("for") {
        return obj.len() == 3
            && obj.get("for").is_some_and(Value::is_string)
            && obj.get("in").is_some_and(Value::is_string)
            && obj
                .get("each")
                .and_then(Value::as_str)
                .is_some_and(valid_scope);
    }

    false
}
