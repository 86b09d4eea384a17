//! Error reports with a hint and the chain of underlying causes.

use quarry_core::error::QuarryError;
use std::error::Error;

use super::colors::ColorSupport;

/// Renders `QuarryError`s for the terminal
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Error line, optional `help:` hint, then every `caused by:` source
    pub fn format_error(&self, error: &QuarryError) -> String {
        let mut output = format!("{}: {}\n", self.colors.red("error"), error);

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("\n{}: {}\n", self.colors.dim("help"), suggestion));
        }

        let mut source = error.source();
        while let Some(cause) = source {
            output.push_str(&format!("\n{}: {}", self.colors.dim("caused by"), cause));
            source = cause.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_format_with_suggestion() {
        let error = QuarryError::not_found("collection", "https://galaxy.example/api/v3/collections/a/b/");
        let rendered = plain().format_error(&error);
        assert!(rendered.starts_with("error: No collection found at: https://galaxy.example/"));
        assert!(rendered.contains("\nhelp: "));
    }

    #[test]
    fn test_format_includes_cause_chain() {
        let error = QuarryError::io(
            "Failed to read /tmp/x".to_string(),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
        );
        let rendered = plain().format_error(&error);
        assert!(rendered.starts_with("error: IO error: Failed to read /tmp/x"));
        assert!(rendered.ends_with("caused by: access denied"));
    }
}
