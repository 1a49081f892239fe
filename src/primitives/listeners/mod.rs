//! Listener registries.
//!
//! Listeners are shared trait objects compared by the address of their data,
//! never by value. Registries notify over a snapshot of the list, so a
//! listener may add or remove listeners (itself included) while it is being
//! notified.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

/// Add/remove surface shared by every registry flavour.
pub trait ListenerRegistry<L: ?Sized>: Send + Sync {
    /// Registers `listener`. Returns `false` if it was already registered.
    fn add(&self, listener: Arc<L>) -> bool;

    /// Deregisters `listener`. Returns `false` if it was not registered.
    fn remove(&self, listener: &Arc<L>) -> bool;
}

/// Whether two listener handles denote the same listener object.
pub fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Plain ordered registry.
pub struct Listeners<L: ?Sized> {
    list: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> Listeners<L> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current list, in registration order.
    pub fn snapshot(&self) -> SmallVec<[Arc<L>; 4]> {
        self.list.read().iter().cloned().collect()
    }

    /// Calls `f` for every listener registered when the call started.
    pub fn for_each(&self, mut f: impl FnMut(&L)) {
        for listener in self.snapshot() {
            f(&listener);
        }
    }

    /// Whether `listener` is registered.
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.list.read().iter().any(|l| same_listener(l, listener))
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }
}

impl<L: ?Sized + Send + Sync> ListenerRegistry<L> for Listeners<L> {
    fn add(&self, listener: Arc<L>) -> bool {
        let mut list = self.list.write();
        if list.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        list.push(listener);
        true
    }

    fn remove(&self, listener: &Arc<L>) -> bool {
        let mut list = self.list.write();
        match list.iter().position(|l| same_listener(l, listener)) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Facade over another registry that remembers what was added through it.
///
/// A view hands its `ForwardedListeners` out instead of the model's registry;
/// when the view is torn down, [`ForwardedListeners::remove_all`] takes out
/// exactly the listeners that came in through the facade and leaves those of
/// other views alone.
pub struct ForwardedListeners<L: ?Sized> {
    inner: Arc<dyn ListenerRegistry<L>>,
    added: Mutex<Vec<Arc<L>>>,
}

impl<L: ?Sized + Send + Sync> ForwardedListeners<L> {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ListenerRegistry<L>>) -> Self {
        Self {
            inner,
            added: Mutex::new(Vec::new()),
        }
    }

    /// Deregisters every listener added through this facade.
    pub fn remove_all(&self) {
        let added = std::mem::take(&mut *self.added.lock());
        for listener in &added {
            self.inner.remove(listener);
        }
    }

    /// Number of listeners currently forwarded.
    pub fn len(&self) -> usize {
        self.added.lock().len()
    }

    /// Whether nothing is currently forwarded.
    pub fn is_empty(&self) -> bool {
        self.added.lock().is_empty()
    }
}

impl<L: ?Sized + Send + Sync> ListenerRegistry<L> for ForwardedListeners<L> {
    fn add(&self, listener: Arc<L>) -> bool {
        let mut added = self.added.lock();
        if !self.inner.add(listener.clone()) {
            return false;
        }
        added.push(listener);
        true
    }

    fn remove(&self, listener: &Arc<L>) -> bool {
        let mut added = self.added.lock();
        let Some(pos) = added.iter().position(|l| same_listener(l, listener)) else {
            return false;
        };
        added.remove(pos);
        self.inner.remove(listener)
    }
}

type Wrap<O, I> = dyn Fn(Arc<O>) -> Arc<I> + Send + Sync;

/// Registry accepting listeners of one type and installing translated
/// wrappers on a registry of another type.
///
/// The outer listener → wrapper pairing is kept so removing the outer
/// listener removes the very wrapper that was installed for it.
pub struct TranslatingListeners<O: ?Sized, I: ?Sized> {
    inner: Arc<dyn ListenerRegistry<I>>,
    wrap: Box<Wrap<O, I>>,
    installed: Mutex<Vec<(Arc<O>, Arc<I>)>>,
}

impl<O: ?Sized + Send + Sync, I: ?Sized + Send + Sync> TranslatingListeners<O, I> {
    /// Creates a registry installing `wrap(listener)` on `inner`.
    pub fn new(
        inner: Arc<dyn ListenerRegistry<I>>,
        wrap: impl Fn(Arc<O>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            wrap: Box::new(wrap),
            installed: Mutex::new(Vec::new()),
        }
    }

    /// Removes every wrapper installed through this registry from the
    /// inner one.
    pub fn remove_all(&self) {
        let installed = std::mem::take(&mut *self.installed.lock());
        for (_, wrapper) in &installed {
            self.inner.remove(wrapper);
        }
    }

    /// Number of installed wrappers.
    pub fn len(&self) -> usize {
        self.installed.lock().len()
    }

    /// Whether no wrapper is installed.
    pub fn is_empty(&self) -> bool {
        self.installed.lock().is_empty()
    }
}

impl<O: ?Sized + Send + Sync, I: ?Sized + Send + Sync> ListenerRegistry<O>
    for TranslatingListeners<O, I>
{
    fn add(&self, listener: Arc<O>) -> bool {
        let mut installed = self.installed.lock();
        if installed.iter().any(|(outer, _)| same_listener(outer, &listener)) {
            return false;
        }
        let wrapper = (self.wrap)(listener.clone());
        if !self.inner.add(wrapper.clone()) {
            return false;
        }
        installed.push((listener, wrapper));
        true
    }

    fn remove(&self, listener: &Arc<O>) -> bool {
        let mut installed = self.installed.lock();
        let Some(pos) = installed
            .iter()
            .position(|(outer, _)| same_listener(outer, listener))
        else {
            return false;
        };
        let (_, wrapper) = installed.remove(pos);
        self.inner.remove(&wrapper)
    }
}

/// Nestable hold on a model's outward notifications.
///
/// Changes reported while held fold into a single notification, due when the
/// outermost hold is released.
#[derive(Default)]
pub struct NotifyGate {
    state: Mutex<GateState>,
}

#[derive(Default)]
struct GateState {
    held: u32,
    pending: bool,
}

impl NotifyGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one hold.
    pub fn hold(&self) {
        self.state.lock().held += 1;
    }

    /// Records a change. Returns `true` if listeners should hear about it now.
    pub fn changed(&self) -> bool {
        let mut state = self.state.lock();
        state.pending |= state.held > 0;
        state.held == 0
    }

    /// Drops one hold. Returns `true` if that opened the gate on a change
    /// recorded while it was held. Releasing an open gate does nothing.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock();
        if state.held == 0 {
            return false;
        }
        state.held -= 1;
        state.held == 0 && std::mem::take(&mut state.pending)
    }

    /// Whether at least one hold is active.
    pub fn is_held(&self) -> bool {
        self.state.lock().held > 0
    }
}
