//! Error types for the Todos server.
//!
//! Every failure the list/todo core can report is a recoverable,
//! user-facing condition. None of them is fatal: the request boundary turns
//! each one into a message for the user and leaves the rest of the session
//! untouched.
//!
//! # Error Types
//!
//! - [`TodoError`] - validation and lookup failures raised by the core
//! - [`NameSubject`] - which kind of name failed a length check
//!
//! # Example
//!
//! ```rust
//! use todos_server::error::{NameSubject, TodoError};
//!
//! let err = TodoError::InvalidLength { subject: NameSubject::List };
//! assert_eq!(err.to_string(), "List name must be between 1 and 100 characters.");
//! assert_eq!(err.code(), "invalid_length");
//! ```

use std::fmt;

use thiserror::Error;

use crate::types::{ListId, TodoId};

/// The kind of name a length check was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSubject {
    /// A list name.
    List,
    /// A todo name.
    Todo,
}

impl fmt::Display for NameSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("List"),
            Self::Todo => f.write_str("Todo"),
        }
    }
}

/// Failures reported by validation and by the list/todo store.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// A list or todo name is empty or longer than 100 characters.
    #[error("{subject} name must be between 1 and 100 characters.")]
    InvalidLength {
        /// Which name was rejected.
        subject: NameSubject,
    },

    /// Another list already uses this exact name.
    #[error("List name must be unique.")]
    DuplicateName,

    /// No list with the requested id exists in the session.
    #[error("The specified list was not found.")]
    ListNotFound {
        /// The id that was looked up.
        id: ListId,
    },

    /// The list exists but holds no todo with the requested id.
    #[error("The specified todo was not found.")]
    TodoNotFound {
        /// The owning list.
        list_id: ListId,
        /// The id that was looked up.
        id: TodoId,
    },
}

impl TodoError {
    /// Creates a length error for the given kind of name.
    pub fn invalid_length(subject: NameSubject) -> Self {
        Self::InvalidLength { subject }
    }

    /// Returns a stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "invalid_length",
            Self::DuplicateName => "duplicate_name",
            Self::ListNotFound { .. } => "list_not_found",
            Self::TodoNotFound { .. } => "todo_not_found",
        }
    }

    /// Returns `true` if this error came from name validation.
    ///
    /// Validation errors are answered by re-presenting the form; lookup
    /// errors are answered by sending the user somewhere that still exists.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidLength { .. } | Self::DuplicateName)
    }
}

/// A specialized Result type for list and todo operations.
pub type Result<T> = std::result::Result<T, TodoError>;
