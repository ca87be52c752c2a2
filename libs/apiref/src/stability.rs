//! API stability levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle marker attached to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Marked for deprecation and should not be used in new clients.
    ///
    /// The entry description should outline the deprecation strategy.
    Deprecated,
    /// May change, and resources may be deleted, without warning.
    ///
    /// Good for anything under development or with a small number of
    /// consumers, where fixing the world after breaking the API is easy.
    #[default]
    Experimental,
    /// Will not break suddenly; changes come with a gradual migration.
    Stable,
}

impl Stability {
    /// Every level, in the order they are documented.
    pub const ALL: [Self; 3] = [Self::Deprecated, Self::Experimental, Self::Stable];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deprecated => "deprecated",
            Self::Experimental => "experimental",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stability level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stability level \"{0}\"")]
pub struct UnknownStability(pub String);

impl FromStr for Stability {
    type Err = UnknownStability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownStability(s.to_owned()))
    }
}
