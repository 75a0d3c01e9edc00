//! Id Registry - monotonic snapshot id counter

use crate::types::Id;

/// Hands out snapshot ids, starting at 1.
///
/// One registry per recording session; there is no global counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRegistry {
    next: Id,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Mint a fresh id
    pub fn next_id(&mut self) -> Id {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id the next call to `next_id` will return
    pub fn peek(&self) -> Id {
        self.next
    }

    /// Start a new recording session
    pub fn reset(&mut self) {
        self.next = 1;
    }

    /// Make sure ids minted later never collide with `id`
    pub fn observe(&mut self, id: Id) {
        if id >= self.next {
            self.next = id + 1;
        }
    }
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}
