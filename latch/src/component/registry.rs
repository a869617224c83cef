use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;

use crate::component::{Component, Identifier, Kind, RawId};
use crate::error::ConflictError;

/// The process-wide component kind registry.
///
/// Maps global identifiers to [`Kind`] records and assigns each one a dense
/// [`RawId`] in registration order. This is the single source of truth for
/// "does a component kind named X exist, and what type implements it."
///
/// The registry uses lock-free reads for identifier lookups via `DashMap`,
/// making the common read path highly performant. Registration takes a mutex
/// around the register-check-insert sequence so concurrent callers observe
/// exactly one `Kind` per identifier, then republishes an immutable snapshot
/// of all known kinds so unrelated readers never block on registration.
///
/// One registry instance is created at startup and passed by handle to every
/// dependent; there is no global.
pub struct Registry {
    /// Map from identifier to registered kind. Lock-free reads via sharded
    /// concurrent hashmap.
    by_id: DashMap<Identifier, Arc<Kind>>,

    /// Immutable snapshot of all registered kinds, indexed by raw id.
    /// Republished after every successful insert.
    snapshot: ArcSwap<Vec<Arc<Kind>>>,

    /// Serializes the register-check-insert sequence and raw id assignment.
    write: Mutex<()>,

    /// Registration notification channels. Disconnected receivers are pruned
    /// on the next send.
    subscribers: Mutex<Vec<Sender<Arc<Kind>>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            snapshot: ArcSwap::from_pointee(Vec::new()),
            write: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a component kind, or return the existing one.
    ///
    /// Thread-safe and idempotent: concurrent callers registering the same
    /// identifier observe exactly one `Kind` created, and losers of the race
    /// receive the winner's instance. Fails with [`ConflictError::KindType`]
    /// if the identifier was previously registered with a different value
    /// type; the original registration stays intact and retrievable.
    pub fn register_if_absent<C: Component>(
        &self,
        id: Identifier,
    ) -> Result<Arc<Kind>, ConflictError> {
        // Fast path: already registered (lock-free read).
        if let Some(existing) = self.by_id.get(&id) {
            return Self::check_type::<C>(existing.value());
        }

        // Slow path: serialize registration so raw ids stay dense and exactly
        // one kind is created per identifier.
        let _guard = self.write.lock().unwrap();

        if let Some(existing) = self.by_id.get(&id) {
            return Self::check_type::<C>(existing.value());
        }

        let raw = RawId::from(self.snapshot.load().len());
        let kind = Arc::new(Kind::new::<C>(id.clone(), raw));
        self.by_id.insert(id, Arc::clone(&kind));

        let mut kinds = Vec::clone(&self.snapshot.load_full());
        kinds.push(Arc::clone(&kind));
        self.snapshot.store(Arc::new(kinds));

        self.notify(&kind);
        log::debug!("registered component kind {kind}");

        Ok(kind)
    }

    /// Get the kind registered under the given identifier, if any.
    ///
    /// Non-blocking lock-free lookup; never waits on in-flight registration.
    #[inline]
    pub fn get(&self, id: &Identifier) -> Option<Arc<Kind>> {
        self.by_id.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Get the kind holding the given raw id, if any.
    #[inline]
    pub fn by_raw(&self, raw: RawId) -> Option<Arc<Kind>> {
        self.snapshot.load().get(raw.index()).map(Arc::clone)
    }

    /// The current immutable snapshot of all registered kinds, indexed by
    /// raw id. Safe to iterate without blocking registration.
    #[inline]
    pub fn kinds(&self) -> Arc<Vec<Arc<Kind>>> {
        self.snapshot.load_full()
    }

    /// Subscribe to registration notifications.
    ///
    /// Every kind registered after this call is delivered on the returned
    /// channel. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<Arc<Kind>> {
        let (sender, receiver) = channel::unbounded();
        self.subscribers.lock().unwrap().push(sender);
        receiver
    }

    /// Number of registered kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Check whether no kinds have been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_type<C: Component>(existing: &Arc<Kind>) -> Result<Arc<Kind>, ConflictError> {
        if existing.is_type::<C>() {
            Ok(Arc::clone(existing))
        } else {
            Err(ConflictError::KindType {
                id: existing.id().clone(),
                existing: existing.type_name(),
                incoming: std::any::type_name::<C>(),
            })
        }
    }

    /// Deliver a newly registered kind to subscribers, pruning any whose
    /// receiver has been dropped.
    fn notify(&self, kind: &Arc<Kind>) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|sender| sender.send(Arc::clone(kind)).is_ok());
    }
}
