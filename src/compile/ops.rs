//! The operator registry.
//!
//! Maps a directive name to its [`Descriptor`]. The registry is owned by the
//! [`Engine`][crate::Engine], populated at configuration time, and read-only
//! during compiles, so concurrent compiles can share it freely.

use std::collections::BTreeMap;

use crate::types::token::{Descriptor, Op};

pub struct Registry {
    ops: BTreeMap<String, Descriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self {
            ops: BTreeMap::new(),
        };
        registry.register("", Descriptor::inline(Op::Interp, true));
        registry.register("json", Descriptor::inline(Op::Json, true));
        registry.register("use", Descriptor::inline(Op::Use, false));
        registry.register("each", Descriptor::block(Op::Each));
        registry.register("for", Descriptor::block(Op::For));
        registry.register("if", Descriptor::block(Op::If));
        registry.register("elseif", Descriptor::block(Op::ElseIf));
        registry.register("else", Descriptor::block(Op::Else));
        registry.register("def", Descriptor::capture(Op::Def));
        registry
    }
}

impl Registry {
    /// Register a directive under the given name.
    ///
    /// Registering an existing name silently replaces the prior entry, which
    /// also allows aliasing a built-in under another name.
    pub fn register(&mut self, name: impl Into<String>, desc: Descriptor) {
        self.ops.insert(name.into(), desc);
    }

    pub fn get(&self, name: &str) -> Option<Descriptor> {
        self.ops.get(name).copied()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("ops", &self.ops.keys())
            .finish()
    }
}

impl Descriptor {
    pub const fn inline(kind: Op, escapes: bool) -> Self {
        Self {
            kind,
            block: false,
            escapes,
            captures: false,
        }
    }

    pub const fn block(kind: Op) -> Self {
        Self {
            kind,
            block: true,
            escapes: false,
            captures: false,
        }
    }

    pub const fn capture(kind: Op) -> Self {
        Self {
            kind,
            block: true,
            escapes: false,
            captures: true,
        }
    }
}
