//! The scope manager.
//!
//! Block directives bind loop variables here so that the expression
//! resolution pass can substitute them. Every bind records the identifier's
//! previous binding in the opening block's [`Undo`] list; replaying the list
//! in reverse at block close restores each name exactly as it resolved
//! before the block opened, no matter how many nested blocks rebound it.

use std::collections::BTreeMap;

pub struct Scopes {
    bindings: BTreeMap<String, usize>,
    next_slot: usize,
}

/// The `(identifier, previous binding)` pairs recorded by one block.
#[derive(Default)]
pub struct Undo(Vec<(String, Option<usize>)>);

impl Scopes {
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            next_slot: 0,
        }
    }

    /// Allocate a fresh register slot. Slots are never reused within a
    /// compile; the final count sizes the renderer's register file.
    pub fn alloc(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    pub fn slots(&self) -> usize {
        self.next_slot
    }

    /// Bind `name` to `slot`, recording the previous binding in `undo`.
    pub fn bind(&mut self, name: &str, slot: usize, undo: &mut Undo) {
        let prev = self.bindings.insert(name.to_owned(), slot);
        undo.0.push((name.to_owned(), prev));
    }

    /// Restore every binding recorded by a block, in reverse order.
    pub fn restore(&mut self, undo: Undo) {
        for (name, prev) in undo.0.into_iter().rev() {
            match prev {
                Some(slot) => self.bindings.insert(name, slot),
                None => self.bindings.remove(&name),
            };
        }
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.bindings.get(name).copied()
    }
}
