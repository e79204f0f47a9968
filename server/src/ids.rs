//! Identifier allocation for lists and todos.
//!
//! Ids are `max(existing) + 1`, starting at [`FIRST_ID`] for an empty
//! collection. Taking the maximum rather than the collection size keeps new
//! ids clear of every surviving member after deletions in the middle.
//!
//! Deleting the member holding the maximum id would let a bare `max + 1`
//! hand that id out again, so [`IdAllocator`] also remembers the last id it
//! issued and never goes below it.

use serde::{Deserialize, Serialize};

/// Id given to the first member of an empty collection.
pub const FIRST_ID: u64 = 1;

/// Returns `max(ids) + 1`, or [`FIRST_ID`] when `ids` is empty.
///
/// # Example
///
/// ```rust
/// use todos_server::ids::next_id;
///
/// assert_eq!(next_id([]), 1);
/// assert_eq!(next_id([1, 4, 2]), 5);
/// ```
pub fn next_id<I>(ids: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    ids.into_iter().max().map_or(FIRST_ID, |max| max + 1)
}

/// Monotonic id source scoped to one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    last_issued: Option<u64>,
}

impl IdAllocator {
    /// Issues the next id for a collection currently holding `ids`.
    ///
    /// The result is greater than every id in `ids` and every id this
    /// allocator has issued before.
    pub fn allocate<I>(&mut self, ids: I) -> u64
    where
        I: IntoIterator<Item = u64>,
    {
        let candidate = next_id(ids);
        let id = match self.last_issued {
            Some(last) => candidate.max(last + 1),
            None => candidate,
        };
        self.last_issued = Some(id);
        id
    }
}
