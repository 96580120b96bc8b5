//! Compile diagnostics shared by the translator and the VM.
//!
//! Lives in the core so that the translator hook ([`CompileFn`]) has a single
//! signature both sides agree on.

use core::fmt;

use thiserror::Error;

use crate::bytecode::Chunk;
use crate::object::Heap;

/// Where in the source a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// At the given lexeme.
    At(String),
    /// At end of input.
    End,
    /// No location (scanner errors carry their own message).
    None,
}

/// One compile-time error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source line (1-based).
    pub line: u32,
    /// Token location.
    pub location: Location,
    /// Human message.
    pub message: String,
}

impl Diagnostic {
    /// Error at a lexeme.
    pub fn at(line: u32, lexeme: &str, message: impl Into<String>) -> Self {
        Self { line, location: Location::At(lexeme.to_owned()), message: message.into() }
    }

    /// Error at end of input.
    pub fn at_end(line: u32, message: impl Into<String>) -> Self {
        Self { line, location: Location::End, message: message.into() }
    }

    /// Error without location.
    pub fn bare(line: u32, message: impl Into<String>) -> Self {
        Self { line, location: Location::None, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            Location::At(lexeme) => write!(f, " at '{lexeme}'")?,
            Location::End => f.write_str(" at end")?,
            Location::None => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Failed compilation: the diagnostics of the pass, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.diagnostics))]
pub struct CompileError {
    /// Reported diagnostics (never empty).
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// Error carrying a single diagnostic.
    #[must_use]
    pub fn single(diagnostic: Diagnostic) -> Self { Self { diagnostics: vec![diagnostic] } }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Translator hook: compile `source` into `chunk`, allocating literals in `heap`.
pub type CompileFn = fn(&str, &mut Chunk, &mut Heap) -> Result<(), CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rendering() {
        assert_eq!(
            Diagnostic::at(3, "+", "Expect expression.").to_string(),
            "[line 3] Error at '+': Expect expression."
        );
        assert_eq!(
            Diagnostic::at_end(1, "Expect expression.").to_string(),
            "[line 1] Error at end: Expect expression."
        );
        assert_eq!(
            Diagnostic::bare(2, "Unexpected character.").to_string(),
            "[line 2] Error: Unexpected character."
        );
    }

    #[test]
    fn error_joins_lines() {
        let err = CompileError {
            diagnostics: vec![Diagnostic::bare(1, "a"), Diagnostic::at_end(2, "b")],
        };
        assert_eq!(err.to_string(), "[line 1] Error: a\n[line 2] Error at end: b");
    }
}
