//! The list/todo store.
//!
//! [`Session`] is the root of one visitor's state: the lists they created,
//! the id allocator for those lists, and a pending flash message. It is a
//! plain value; the [`SessionStore`](crate::session::SessionStore) hands out
//! copies and takes them back after each request.
//!
//! Every mutating operation validates first and returns before touching any
//! state when validation or lookup fails.
//!
//! # Example
//!
//! ```rust
//! use todos_server::store::Session;
//!
//! let mut session = Session::new();
//! let list_id = session.create_list("Groceries").unwrap().id;
//!
//! let list = session.find_list_mut(list_id).unwrap();
//! let milk = list.add_todo("Milk").unwrap().id;
//! list.mark_todo(milk, true).unwrap();
//!
//! assert!(session.find_list(list_id).unwrap().is_complete());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TodoError};
use crate::ids::IdAllocator;
use crate::types::{Flash, List, ListId, Todo, TodoId};
use crate::validation::{validate_list_name, validate_todo_name};

/// All state belonging to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    lists: Vec<List>,
    list_ids: IdAllocator,
    flash: Option<Flash>,
}

impl Session {
    /// Creates a session with no lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lists, in creation order.
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    /// Validates `name` and appends a new, empty list.
    ///
    /// # Errors
    ///
    /// [`TodoError::InvalidLength`] or [`TodoError::DuplicateName`]; the
    /// session is unchanged.
    pub fn create_list(&mut self, name: &str) -> Result<&List> {
        validate_list_name(name, &self.lists)?;

        let id = self.list_ids.allocate(self.lists.iter().map(|list| list.id));
        self.lists.push(List::new(id, name));
        debug!(list_id = id, list_count = self.lists.len(), "List created");

        Ok(&self.lists[self.lists.len() - 1])
    }

    /// Looks up a list by id.
    ///
    /// # Errors
    ///
    /// [`TodoError::ListNotFound`] if no list has this id.
    pub fn find_list(&self, id: ListId) -> Result<&List> {
        self.lists
            .iter()
            .find(|list| list.id == id)
            .ok_or(TodoError::ListNotFound { id })
    }

    /// Looks up a list by id for mutation.
    ///
    /// # Errors
    ///
    /// [`TodoError::ListNotFound`] if no list has this id.
    pub fn find_list_mut(&mut self, id: ListId) -> Result<&mut List> {
        self.lists
            .iter_mut()
            .find(|list| list.id == id)
            .ok_or(TodoError::ListNotFound { id })
    }

    /// Renames a list after checking the new name against every other list.
    ///
    /// # Errors
    ///
    /// [`TodoError::ListNotFound`] before any validation happens, then
    /// [`TodoError::InvalidLength`] or [`TodoError::DuplicateName`].
    pub fn rename_list(&mut self, id: ListId, new_name: &str) -> Result<()> {
        let index = self
            .lists
            .iter()
            .position(|list| list.id == id)
            .ok_or(TodoError::ListNotFound { id })?;

        validate_list_name(new_name, self.lists.iter().filter(|list| list.id != id))?;

        self.lists[index].name = new_name.to_string();
        debug!(list_id = id, "List renamed");
        Ok(())
    }

    /// Removes the list with this id and returns it.
    ///
    /// Deleting an id that does not exist is not an error; it returns `None`
    /// and leaves the session as it was.
    pub fn delete_list(&mut self, id: ListId) -> Option<List> {
        let index = self.lists.iter().position(|list| list.id == id)?;
        let removed = self.lists.remove(index);
        debug!(list_id = id, list_count = self.lists.len(), "List deleted");
        Some(removed)
    }

    /// Replaces the pending flash message.
    pub fn set_flash(&mut self, flash: Flash) {
        self.flash = Some(flash);
    }

    /// Removes and returns the pending flash message.
    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }
}

impl List {
    /// Validates `name` and appends a new open todo.
    ///
    /// # Errors
    ///
    /// [`TodoError::InvalidLength`]; the list is unchanged.
    pub fn add_todo(&mut self, name: &str) -> Result<&Todo> {
        validate_todo_name(name)?;

        let id = self.todo_ids.allocate(self.todos.iter().map(|todo| todo.id));
        self.todos.push(Todo::new(id, name));
        debug!(list_id = self.id, todo_id = id, "Todo added");

        Ok(&self.todos[self.todos.len() - 1])
    }

    /// Looks up a todo by id, trashed or not.
    ///
    /// # Errors
    ///
    /// [`TodoError::TodoNotFound`] if this list has no such todo.
    pub fn find_todo(&self, id: TodoId) -> Result<&Todo> {
        let list_id = self.id;
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .ok_or(TodoError::TodoNotFound { list_id, id })
    }

    fn find_todo_mut(&mut self, id: TodoId) -> Result<&mut Todo> {
        let list_id = self.id;
        self.todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(TodoError::TodoNotFound { list_id, id })
    }

    /// Sets a todo's completion flag. Setting the current value again is
    /// harmless.
    ///
    /// # Errors
    ///
    /// [`TodoError::TodoNotFound`] if this list has no such todo.
    pub fn mark_todo(&mut self, id: TodoId, completed: bool) -> Result<()> {
        self.find_todo_mut(id)?.completed = completed;
        debug!(list_id = self.id, todo_id = id, completed, "Todo marked");
        Ok(())
    }

    /// Moves a todo into the trash. Its other fields are kept.
    ///
    /// # Errors
    ///
    /// [`TodoError::TodoNotFound`] if this list has no such todo.
    pub fn trash_todo(&mut self, id: TodoId) -> Result<()> {
        self.find_todo_mut(id)?.trashed = true;
        debug!(list_id = self.id, todo_id = id, "Todo trashed");
        Ok(())
    }

    /// Takes a todo back out of the trash.
    ///
    /// # Errors
    ///
    /// [`TodoError::TodoNotFound`] if this list has no such todo.
    pub fn restore_todo(&mut self, id: TodoId) -> Result<()> {
        self.find_todo_mut(id)?.trashed = false;
        debug!(list_id = self.id, todo_id = id, "Todo restored");
        Ok(())
    }

    /// Marks every todo outside the trash as completed.
    ///
    /// Returns how many todos changed state.
    pub fn complete_all(&mut self) -> usize {
        let mut changed = 0;
        for todo in self.todos.iter_mut().filter(|todo| !todo.trashed) {
            if !todo.completed {
                todo.completed = true;
                changed += 1;
            }
        }
        debug!(list_id = self.id, changed, "Completed all todos");
        changed
    }

    /// Permanently drops every trashed todo.
    ///
    /// Returns how many todos were removed; a second call removes none.
    pub fn empty_trash(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|todo| !todo.trashed);
        let removed = before - self.todos.len();
        debug!(list_id = self.id, removed, "Emptied trash");
        removed
    }
}
