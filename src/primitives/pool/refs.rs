use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Reusable cursor over a pooled object.
///
/// A reference never owns the object it points at; it can be repointed at
/// any handle without allocating. Whether the target is still alive is the
/// owner pool's business (`Pool::is_valid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjRef<H> {
    target: Option<H>,
}

impl<H: Copy> Default for ObjRef<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy> ObjRef<H> {
    /// Creates a reference pointing at nothing.
    pub fn new() -> Self {
        Self { target: None }
    }

    /// Repoints this reference at whatever `other` denotes.
    pub fn ref_to(&mut self, other: &ObjRef<H>) -> &mut Self {
        self.target = other.target;
        self
    }

    /// Repoints this reference at `handle`.
    pub fn point_at(&mut self, handle: H) -> &mut Self {
        self.target = Some(handle);
        self
    }

    /// The handle currently denoted, if any.
    pub fn get(&self) -> Option<H> {
        self.target
    }

    /// Points this reference at nothing.
    pub fn clear(&mut self) {
        self.target = None;
    }

    /// Whether the reference points at nothing.
    pub fn is_unset(&self) -> bool {
        self.target.is_none()
    }
}

/// Source of scratch references for one handle type.
pub trait RefPool<H: Copy> {
    /// Borrows a reference pointing at nothing.
    fn create_ref(&self) -> ObjRef<H>;

    /// Returns a reference for reuse. The denoted object is untouched.
    fn release_ref(&self, obj_ref: ObjRef<H>);

    /// References handed out and not yet released.
    fn outstanding_refs(&self) -> usize;

    /// Borrows a reference that is released when the guard drops.
    fn scoped_ref(&self) -> ScopedRef<'_, H, Self>
    where
        Self: Sized,
    {
        ScopedRef {
            pool: self,
            obj_ref: self.create_ref(),
        }
    }
}

/// Free list of released references.
#[derive(Debug)]
pub struct RefStack<H> {
    spare: Mutex<Vec<ObjRef<H>>>,
    outstanding: AtomicUsize,
}

impl<H> Default for RefStack<H> {
    fn default() -> Self {
        Self {
            spare: Mutex::new(Vec::new()),
            outstanding: AtomicUsize::new(0),
        }
    }
}

impl<H: Copy> RefPool<H> for RefStack<H> {
    fn create_ref(&self) -> ObjRef<H> {
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        self.spare.lock().pop().unwrap_or_default()
    }

    fn release_ref(&self, mut obj_ref: ObjRef<H>) {
        obj_ref.clear();
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        self.spare.lock().push(obj_ref);
    }

    fn outstanding_refs(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }
}

/// Scoped acquisition of a scratch reference.
pub struct ScopedRef<'a, H: Copy, P: RefPool<H>> {
    pool: &'a P,
    obj_ref: ObjRef<H>,
}

impl<H: Copy, P: RefPool<H>> Deref for ScopedRef<'_, H, P> {
    type Target = ObjRef<H>;

    fn deref(&self) -> &ObjRef<H> {
        &self.obj_ref
    }
}

impl<H: Copy, P: RefPool<H>> DerefMut for ScopedRef<'_, H, P> {
    fn deref_mut(&mut self) -> &mut ObjRef<H> {
        &mut self.obj_ref
    }
}

impl<H: Copy, P: RefPool<H>> Drop for ScopedRef<'_, H, P> {
    fn drop(&mut self) {
        self.pool.release_ref(std::mem::take(&mut self.obj_ref));
    }
}
