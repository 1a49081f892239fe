//! Slot pools backing every graph object.
//!
//! Objects live in a flat, growable vector of slots. A handle is the slot
//! index paired with the slot's generation; removing an object bumps the
//! generation and pushes the index on a free list, so the slot is reused by
//! the next insert while any handle still pointing at the old occupant reads
//! as invalid instead of aliasing the new one.

mod refs;

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

pub use refs::{ObjRef, RefPool, RefStack, ScopedRef};

/// Position of an object inside a [`Pool`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Slot {
    index: u32,
    generation: u32,
}

impl Slot {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

/// Typed wrapper around a [`Slot`].
pub trait PoolHandle: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Wraps a slot.
    fn from_slot(slot: Slot) -> Self;
    /// Unwraps the slot.
    fn slot(self) -> Slot;
}

macro_rules! pool_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        pub struct $name(Slot);

        impl PoolHandle for $name {
            fn from_slot(slot: Slot) -> Self {
                $name(slot)
            }

            fn slot(self) -> Slot {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}v{}", $prefix, self.0.index, self.0.generation)
            }
        }
    };
}

pool_handle!(
    /// Handle to a core graph vertex.
    VertexId,
    "v"
);
pool_handle!(
    /// Handle to a core graph edge.
    EdgeId,
    "e"
);
pool_handle!(
    /// Handle to a condensed branch vertex.
    BranchVertexId,
    "bv"
);
pool_handle!(
    /// Handle to a condensed branch edge.
    BranchEdgeId,
    "be"
);

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Growable slot store with free-list reuse and generation-checked handles.
pub struct Pool<H, T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
    refs: RefStack<H>,
    _marker: PhantomData<fn() -> H>,
}

impl<H: PoolHandle, T> Default for Pool<H, T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<H: PoolHandle, T> Pool<H, T> {
    /// Creates an empty pool with room for `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
            refs: RefStack::default(),
            _marker: PhantomData,
        }
    }

    /// Stores `value` in a free slot (or a new one) and returns its handle.
    pub fn insert(&mut self, value: T) -> H {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            debug_assert!(entry.value.is_none(), "free list points at live slot");
            entry.value = Some(value);
            return H::from_slot(Slot {
                index,
                generation: entry.generation,
            });
        }
        assert!(self.entries.len() < u32::MAX as usize, "pool exhausted");
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        H::from_slot(Slot {
            index,
            generation: 0,
        })
    }

    /// Removes the object behind `handle`, returning it if the handle was live.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let slot = handle.slot();
        let entry = self.entries.get_mut(slot.index())?;
        if entry.generation != slot.generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot.index);
        self.len -= 1;
        Some(value)
    }

    /// Returns whether `handle` still denotes a live object.
    pub fn is_valid(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Shared access to a live object.
    pub fn get(&self, handle: H) -> Option<&T> {
        let slot = handle.slot();
        let entry = self.entries.get(slot.index())?;
        if entry.generation != slot.generation {
            return None;
        }
        entry.value.as_ref()
    }

    /// Mutable access to a live object.
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        let slot = handle.slot();
        let entry = self.entries.get_mut(slot.index())?;
        if entry.generation != slot.generation {
            return None;
        }
        entry.value.as_mut()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no live object.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (live or free).
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Removes every object. Outstanding handles all become invalid.
    pub fn clear(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.value.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.len = 0;
    }

    /// Live handles in slot order.
    pub fn handles(&self) -> Handles<'_, H, T> {
        Handles {
            entries: self.entries.iter().enumerate(),
            _marker: PhantomData,
        }
    }

    /// Live `(handle, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry.value.as_ref().map(|value| {
                (
                    H::from_slot(Slot {
                        index: index as u32,
                        generation: entry.generation,
                    }),
                    value,
                )
            })
        })
    }
}

impl<H: PoolHandle, T> RefPool<H> for Pool<H, T> {
    fn create_ref(&self) -> ObjRef<H> {
        self.refs.create_ref()
    }

    fn release_ref(&self, obj_ref: ObjRef<H>) {
        self.refs.release_ref(obj_ref)
    }

    fn outstanding_refs(&self) -> usize {
        self.refs.outstanding_refs()
    }
}

/// Iterator over the live handles of a [`Pool`].
pub struct Handles<'a, H, T> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Entry<T>>>,
    _marker: PhantomData<fn() -> H>,
}

impl<H: PoolHandle, T> Iterator for Handles<'_, H, T> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        for (index, entry) in self.entries.by_ref() {
            if entry.value.is_some() {
                return Some(H::from_slot(Slot {
                    index: index as u32,
                    generation: entry.generation,
                }));
            }
        }
        None
    }
}
