//! Errors raised by the embedded script host.
//!
//! Every variant is produced by [`ScriptHost`](super::ScriptHost) and passes
//! through [`Game`](crate::game::Game) operations unchanged.

use std::panic::Location;

use thiserror::Error;

/// Result alias used throughout the script and game layers.
pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

/// Failure of a script host operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The Lua state itself could not be created.
    #[error("lua: cannot allocate new state: {0}")]
    Allocation(String),

    /// The script could not be read, failed to compile, or raised while its
    /// top-level code was running.
    #[error("cannot load script {origin}: {message}")]
    Load { origin: String, message: String },

    /// A called function raised an error.
    #[error("lua error in '{function}()': {message}\n    called at {location}")]
    Runtime {
        function: String,
        message: String,
        location: &'static Location<'static>,
    },

    /// A returned value does not have the shape the calling convention
    /// expects.  `row`/`col` are 1-based and only set for matrix calls.
    #[error("type error in '{function}()'{}: {reason}", cell_suffix(.row, .col))]
    Type {
        function: String,
        row: Option<usize>,
        col: Option<usize>,
        reason: String,
    },

    /// The destination handed to a matrix call cannot hold the result.
    #[error("destination buffer for '{function}()' holds {available} cells, {needed} required")]
    Buffer {
        function: String,
        needed: usize,
        available: usize,
    },
}

impl ScriptError {
    /// Name of the script function involved, if any.
    pub fn function(&self) -> Option<&str> {
        match self {
            ScriptError::Runtime { function, .. }
            | ScriptError::Type { function, .. }
            | ScriptError::Buffer { function, .. } => Some(function),
            ScriptError::Allocation(_) | ScriptError::Load { .. } => None,
        }
    }

    /// `(row, col)` of the offending matrix entry, 1-based.
    pub fn position(&self) -> Option<(usize, Option<usize>)> {
        match self {
            ScriptError::Type { row: Some(row), col, .. } => Some((*row, *col)),
            _ => None,
        }
    }
}

fn cell_suffix(row: &Option<usize>, col: &Option<usize>) -> String {
    match (row, col) {
        (Some(r), Some(c)) => format!("[{r}][{c}]"),
        (Some(r), None) => format!("[{r}]"),
        _ => String::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
