//! Config field path.

use owo_colors::OwoColorize;
use std::borrow::Cow;
use std::fmt;

/// Dotted path to a config field, e.g. `images.jpeg_quality`.
///
/// Role sections share field names, so paths are built per role with
/// [`FieldPath::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Cow<'static, str>);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(Cow::Borrowed(path))
    }

    /// `section.key`
    pub fn join(section: &str, key: &str) -> Self {
        Self(Cow::Owned(format!("{section}.{key}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
