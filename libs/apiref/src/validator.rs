//! Validators for path and query parameters.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// Predicate returning an error message when a value is invalid.
pub type PredicateFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A parameter validator: either a pattern or a predicate.
#[derive(Clone)]
pub enum ParamValidator {
    /// The value must match the pattern; anchor it with `^...$` to match the whole value.
    Pattern(Regex),
    /// Returns `Some(message)` if the value is invalid.
    Predicate(Arc<PredicateFn>),
}

impl ParamValidator {
    /// Compile `pattern` into a [`ParamValidator::Pattern`].
    ///
    /// # Errors
    /// Returns the regex compilation error.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Check `value`, returning a human readable message on failure.
    ///
    /// # Errors
    /// Returns the message describing why the value was rejected.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match self {
            Self::Pattern(re) => {
                if re.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("'{value}' does not match {}", re.as_str()))
                }
            }
            Self::Predicate(f) => f(value).map_or(Ok(()), Err),
        }
    }
}

impl fmt::Debug for ParamValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Regex> for ParamValidator {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}
