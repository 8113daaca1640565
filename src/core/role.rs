//! Asset roles.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four asset categories, each with its own globs and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Html,
    Css,
    Images,
    Fonts,
}

impl Role {
    /// Every role, in build order.
    pub const ALL: [Role; 4] = [Role::Html, Role::Css, Role::Images, Role::Fonts];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    /// Whether a matched source produces output on its own.
    ///
    /// Sass files starting with `_` are partials, only reachable via `@use`.
    pub fn is_entry(self, path: &Path) -> bool {
        match self {
            Self::Css => !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_')),
            _ => true,
        }
    }

    /// Whether a successful run of this role can be applied without a page reload.
    pub const fn injects_styles(self) -> bool {
        matches!(self, Self::Css)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role `{s}` (expected html, css, images or fonts)"))
    }
}

impl clap::ValueEnum for Role {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.name()))
    }
}
