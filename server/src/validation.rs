//! Name validation for lists and todos.
//!
//! These checks are pure. Callers run them before touching the store and
//! abandon the mutation when one fails.

use crate::error::{NameSubject, Result, TodoError};
use crate::types::List;

/// Shortest accepted name, in characters.
pub const MIN_NAME_LEN: usize = 1;

/// Longest accepted name, in characters.
pub const MAX_NAME_LEN: usize = 100;

fn has_valid_length(name: &str) -> bool {
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.chars().count())
}

/// Checks a proposed list name against the length bounds and against the
/// names of `existing` lists (exact, case-sensitive comparison).
///
/// For a rename, pass every list except the one being renamed.
///
/// # Errors
///
/// - [`TodoError::InvalidLength`] if the name is empty or too long
/// - [`TodoError::DuplicateName`] if an existing list already has the name
pub fn validate_list_name<'a, I>(name: &str, existing: I) -> Result<()>
where
    I: IntoIterator<Item = &'a List>,
{
    if !has_valid_length(name) {
        return Err(TodoError::invalid_length(NameSubject::List));
    }

    if existing.into_iter().any(|list| list.name == name) {
        return Err(TodoError::DuplicateName);
    }

    Ok(())
}

/// Checks a proposed todo name. Todo names need not be unique.
///
/// # Errors
///
/// [`TodoError::InvalidLength`] if the name is empty or too long.
pub fn validate_todo_name(name: &str) -> Result<()> {
    if !has_valid_length(name) {
        return Err(TodoError::invalid_length(NameSubject::Todo));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists(names: &[&str]) -> Vec<List> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| List::new(i as u64 + 1, *name))
            .collect()
    }

    #[test]
    fn accepts_name_within_bounds() {
        assert_eq!(validate_list_name("Groceries", &lists(&[])), Ok(()));
        assert_eq!(validate_todo_name("Milk"), Ok(()));
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(
            validate_list_name("", &lists(&[])),
            Err(TodoError::invalid_length(NameSubject::List))
        );
        assert_eq!(
            validate_todo_name(""),
            Err(TodoError::invalid_length(NameSubject::Todo))
        );
    }

    #[test]
    fn length_bounds_are_inclusive() {
        let longest = "x".repeat(MAX_NAME_LEN);
        let too_long = "x".repeat(MAX_NAME_LEN + 1);

        assert!(validate_list_name("x", &lists(&[])).is_ok());
        assert!(validate_list_name(&longest, &lists(&[])).is_ok());
        assert!(validate_list_name(&too_long, &lists(&[])).is_err());
        assert!(validate_todo_name(&longest).is_ok());
        assert!(validate_todo_name(&too_long).is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 100 two-byte characters.
        let name = "é".repeat(MAX_NAME_LEN);
        assert!(name.len() > MAX_NAME_LEN);
        assert!(validate_todo_name(&name).is_ok());
    }

    #[test]
    fn rejects_duplicate_list_name() {
        let existing = lists(&["A", "B"]);
        assert_eq!(
            validate_list_name("A", &existing),
            Err(TodoError::DuplicateName)
        );
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let existing = lists(&["Groceries"]);
        assert!(validate_list_name("groceries", &existing).is_ok());
        assert!(validate_list_name("Groceries ", &existing).is_ok());
    }

    #[test]
    fn length_is_checked_before_uniqueness() {
        let existing = lists(&[""]);
        assert_eq!(
            validate_list_name("", &existing),
            Err(TodoError::invalid_length(NameSubject::List))
        );
    }

    #[test]
    fn todo_names_may_repeat() {
        assert!(validate_todo_name("Milk").is_ok());
        assert!(validate_todo_name("Milk").is_ok());
    }
}
