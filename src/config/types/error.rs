//! Configuration error types.

use super::FieldPath;
use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),

    // NOTE: No #[from] here - we don't want source() which causes duplicate output
    #[error("{0}")]
    Diagnostics(ConfigDiagnostics),
}

// ============================================================================
// ConfigDiagnostic
// ============================================================================

/// A single configuration diagnostic
#[derive(Debug, Clone)]
pub struct ConfigDiagnostic {
    /// Config field path (e.g., "images.jpeg_quality")
    pub field: FieldPath,
    /// Error description
    pub message: String,
    /// Fix hint (optional)
    pub hint: Option<String>,
}

impl ConfigDiagnostic {
    pub fn new(field: FieldPath, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}{}",
            "[".dimmed(),
            self.field.as_str().cyan(),
            "]".dimmed()
        )?;
        write!(f, "{} {}", "→".red(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {}", "hint:".yellow(), hint)?;
        }
        Ok(())
    }
}

// ============================================================================
// ConfigDiagnostics
// ============================================================================

#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    errors: Vec<ConfigDiagnostic>,
    /// Collected warnings, printed together after validation.
    warnings: Vec<(FieldPath, String)>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: FieldPath, message: impl Into<String>) {
        self.errors.push(ConfigDiagnostic::new(field, message));
    }

    /// Add an error with a hint.
    pub fn error_with_hint(
        &mut self,
        field: FieldPath,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.errors
            .push(ConfigDiagnostic::new(field, message).with_hint(hint));
    }

    pub fn warn(&mut self, field: FieldPath, message: impl Into<String>) {
        self.warnings.push((field, message.into()));
    }

    /// Print collected warnings in a grouped format.
    pub fn print_warnings(&self) {
        for (field, message) in &self.warnings {
            crate::log!("warning"; "[{}] {}", field.as_str(), message);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn errors(&self) -> &[ConfigDiagnostic] {
        &self.errors
    }

    /// Convert to Result (returns Err if there are errors).
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", "config validation failed:".red().bold())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "{err}")?;
            if i + 1 < self.errors.len() {
                writeln!(f, "\n")?;
            }
        }
        if self.errors.len() > 1 {
            write!(
                f,
                "\n\n{} {} {}",
                "found".dimmed(),
                self.errors.len().to_string().red().bold(),
                "errors".dimmed()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigDiagnostics {}
