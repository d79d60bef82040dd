//! Source locations for diagnostics
//!
//! The engine never sees source text. A location only needs to be precise
//! enough for a presentation layer to anchor a message at a module
//! declaration, a directive, a command-line option, or a reference site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo file used for locations that come from the command line
pub const COMMAND_LINE: &str = "<command line>";

/// A position inside a file (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// File path, or `<command line>` for option values
    pub file: String,
    /// Line number (1-based, 0 when unknown)
    pub line: usize,
    /// Column number (1-based, 0 when unknown)
    pub column: usize,
    /// Length of the highlighted range
    #[serde(default)]
    pub length: usize,
}

impl Location {
    /// Create a location at the given line and column
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length: 0,
        }
    }

    /// Location used when nothing better is known
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }

    /// Location attributed to a command-line option such as `--add-exports`
    pub fn option(option: &str) -> Self {
        Self {
            file: COMMAND_LINE.to_string(),
            line: 0,
            column: 0,
            length: option.len(),
        }
    }

    /// Set the highlighted length
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Whether this location points at the command line
    pub fn is_command_line(&self) -> bool {
        self.file == COMMAND_LINE
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let loc = Location::new("m1x/module-info.java", 3, 5);
        assert_eq!(loc.to_string(), "m1x/module-info.java:3:5");
    }

    #[test]
    fn test_command_line_location() {
        let loc = Location::option("--add-reads");
        assert!(loc.is_command_line());
        assert_eq!(loc.to_string(), "<command line>");
        assert_eq!(loc.length, "--add-reads".len());
    }
}
