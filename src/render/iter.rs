//! Loop iteration state.
//!
//! `each` enumerates the entries of a mapping and `for` iterates a sequence
//! by index. Absent, falsy, and wrongly-typed sources iterate zero times
//! rather than erroring, matching the original engine's guard around every
//! generated loop.

use std::slice;
use std::vec;

use crate::value::btree_map;
use crate::value::ValueCow;
use crate::Value;

pub enum LoopState<'render> {
    Empty,
    ListBorrowed {
        iter: slice::Iter<'render, Value>,
        index: usize,
        slots: (usize, Option<usize>),
    },
    ListOwned {
        iter: vec::IntoIter<Value>,
        index: usize,
        slots: (usize, Option<usize>),
    },
    MapBorrowed {
        iter: btree_map::Iter<'render, String, Value>,
        slots: (usize, usize),
    },
    MapOwned {
        iter: btree_map::IntoIter<String, Value>,
        slots: (usize, usize),
    },
}

/// A register write produced by advancing a loop.
pub struct Binding<'render> {
    pub slot: usize,
    pub value: ValueCow<'render>,
}

impl<'render> LoopState<'render> {
    /// Start enumerating a mapping's entries in their fixed order.
    pub fn entries(source: ValueCow<'render>, key: usize, value: usize) -> Self {
        match source {
            ValueCow::Borrowed(Value::Map(map)) => Self::MapBorrowed {
                iter: map.iter(),
                slots: (key, value),
            },
            ValueCow::Owned(Value::Map(map)) => Self::MapOwned {
                iter: map.into_iter(),
                slots: (key, value),
            },
            _ => Self::Empty,
        }
    }

    /// Start iterating a sequence by index.
    pub fn sequence(source: ValueCow<'render>, value: usize, index: Option<usize>) -> Self {
        match source {
            ValueCow::Borrowed(Value::List(list)) => Self::ListBorrowed {
                iter: list.iter(),
                index: 0,
                slots: (value, index),
            },
            ValueCow::Owned(Value::List(list)) => Self::ListOwned {
                iter: list.into_iter(),
                index: 0,
                slots: (value, index),
            },
            _ => Self::Empty,
        }
    }

    /// Advance the loop, returning the register writes for this iteration,
    /// or `None` when the loop is exhausted.
    pub fn advance(&mut self) -> Option<(Binding<'render>, Option<Binding<'render>>)> {
        match self {
            Self::Empty => None,

            Self::ListBorrowed { iter, index, slots } => {
                let value = iter.next()?;
                let i = *index;
                *index += 1;
                Some((
                    Binding {
                        slot: slots.0,
                        value: ValueCow::Borrowed(value),
                    },
                    slots.1.map(|slot| Binding {
                        slot,
                        value: ValueCow::Owned(Value::Integer(i as i64)),
                    }),
                ))
            }

            Self::ListOwned { iter, index, slots } => {
                let value = iter.next()?;
                let i = *index;
                *index += 1;
                Some((
                    Binding {
                        slot: slots.0,
                        value: ValueCow::Owned(value),
                    },
                    slots.1.map(|slot| Binding {
                        slot,
                        value: ValueCow::Owned(Value::Integer(i as i64)),
                    }),
                ))
            }

            Self::MapBorrowed { iter, slots } => {
                let (key, value) = iter.next()?;
                Some((
                    Binding {
                        slot: slots.0,
                        value: ValueCow::Owned(Value::String(key.clone())),
                    },
                    Some(Binding {
                        slot: slots.1,
                        value: ValueCow::Borrowed(value),
                    }),
                ))
            }

            Self::MapOwned { iter, slots } => {
                let (key, value) = iter.next()?;
                Some((
                    Binding {
                        slot: slots.0,
                        value: ValueCow::Owned(Value::String(key)),
                    },
                    Some(Binding {
                        slot: slots.1,
                        value: ValueCow::Owned(value),
                    }),
                ))
            }
        }
    }
}
