//! Read-only projections from store state to display-ready rows.
//!
//! Nothing here mutates a [`List`]. Both projections sort with a stable sort
//! on the completion flag alone, so open entries come first and ties keep
//! their original order.

use serde::Serialize;

use crate::types::{List, ListId, TodoId};

/// Display status for a row. Only completed rows carry a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    Complete,
}

impl StatusTag {
    /// `Some(Complete)` when `complete` is true, otherwise `None`.
    pub fn for_completion(complete: bool) -> Option<Self> {
        complete.then_some(Self::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
        }
    }
}

/// One row of the lists overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    pub name: String,
    pub id: ListId,
    pub remaining_count: usize,
    pub total_count: usize,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_tag: Option<StatusTag>,
}

impl From<&List> for ListSummary {
    fn from(list: &List) -> Self {
        let is_complete = list.is_complete();
        Self {
            name: list.name.clone(),
            id: list.id,
            remaining_count: list.remaining_count(),
            total_count: list.total_count(),
            is_complete,
            status_tag: StatusTag::for_completion(is_complete),
        }
    }
}

/// One row of a list's todos (or of its trash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoView {
    pub name: String,
    pub id: TodoId,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_tag: Option<StatusTag>,
}

/// Summarizes every list, incomplete lists first.
pub fn project_lists(lists: &[List]) -> Vec<ListSummary> {
    let mut summaries: Vec<ListSummary> = lists.iter().map(ListSummary::from).collect();
    summaries.sort_by_key(|summary| summary.is_complete);
    summaries
}

/// Projects the todos of `list` whose trash flag equals `trashed`,
/// incomplete todos first.
pub fn project_todos(list: &List, trashed: bool) -> Vec<TodoView> {
    let mut views: Vec<TodoView> = list
        .todos
        .iter()
        .filter(|todo| todo.trashed == trashed)
        .map(|todo| TodoView {
            name: todo.name.clone(),
            id: todo.id,
            completed: todo.completed,
            status_tag: StatusTag::for_completion(todo.completed),
        })
        .collect();
    views.sort_by_key(|view| view.completed);
    views
}
