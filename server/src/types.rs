//! Data model for to-do lists.
//!
//! A [`List`] exclusively owns its [`Todo`]s. Completion of a list is never
//! stored: it is derived from the todos that are not in the trash.

use serde::{Deserialize, Serialize};

use crate::ids::IdAllocator;

/// Identifier of a list, unique within one session.
pub type ListId = u64;

/// Identifier of a todo, unique within its owning list.
pub type TodoId = u64;

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub name: String,
    pub completed: bool,
    /// Soft-deleted. Trashed todos stay in their list until the trash is
    /// emptied, but do not count toward totals or completion.
    pub trashed: bool,
}

impl Todo {
    /// Creates an incomplete, untrashed todo.
    pub fn new(id: TodoId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
            trashed: false,
        }
    }
}

/// A named list of todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub todos: Vec<Todo>,

    /// Issues todo ids for this list only.
    #[serde(default)]
    pub(crate) todo_ids: IdAllocator,
}

impl List {
    /// Creates an empty list.
    pub fn new(id: ListId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            todos: Vec::new(),
            todo_ids: IdAllocator::default(),
        }
    }

    /// Number of todos outside the trash.
    pub fn total_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.trashed).count()
    }

    /// Number of todos outside the trash that are still open.
    pub fn remaining_count(&self) -> usize {
        self.todos
            .iter()
            .filter(|todo| !todo.trashed && !todo.completed)
            .count()
    }

    /// Number of todos currently in the trash.
    pub fn trashed_count(&self) -> usize {
        self.todos.iter().filter(|todo| todo.trashed).count()
    }

    /// A list is complete when it has at least one live todo and none of its
    /// live todos are open.
    pub fn is_complete(&self) -> bool {
        self.total_count() > 0 && self.remaining_count() == 0
    }
}

/// Severity of a one-shot message shown on the next page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

/// A one-shot message carried in the session until the next page read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    /// Creates a success-level flash with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    /// Creates an error-level flash with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}
