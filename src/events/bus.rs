//! In-process event bus.
//!
//! Listeners are keyed by `(event type, listener id)` and invoked in
//! registration order. A stoppable event halts fan-out right after the
//! listener that stopped it. Listener errors are returned to the publisher
//! unchanged; isolating failures is the caller's job.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::FrameworkError;

/// Something that can be published on the bus.
pub trait Event: Send + 'static {
    /// Stoppable events override this; plain events never stop.
    fn is_propagation_stopped(&self) -> bool {
        false
    }
}

/// Receives events of type `E`.
pub trait Listener<E: Event>: Send + Sync {
    fn handle(&self, event: &mut E) -> Result<(), FrameworkError>;
}

impl<E, F> Listener<E> for F
where
    E: Event,
    F: Fn(&mut E) -> Result<(), FrameworkError> + Send + Sync,
{
    fn handle(&self, event: &mut E) -> Result<(), FrameworkError> {
        self(event)
    }
}

#[derive(Clone)]
struct Registration {
    id: String,
    /// Always an `Arc<dyn Listener<E>>` for the `E` this slot is keyed by.
    listener: Arc<dyn Any + Send + Sync>,
}

/// Every listener registration at one instant; see [`EventBus::restore`].
#[derive(Clone, Default)]
pub struct ListenerCheckpoint(HashMap<TypeId, Vec<Registration>>);

#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<TypeId, Vec<Registration>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `E` under `id`.
    ///
    /// Re-registering an id replaces the listener but keeps its position.
    pub fn register<E, L>(&self, id: &str, listener: L)
    where
        E: Event,
        L: Listener<E> + 'static,
    {
        let listener: Arc<dyn Listener<E>> = Arc::new(listener);
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let slot = listeners.entry(TypeId::of::<E>()).or_default();

        match slot.iter_mut().find(|r| r.id == id) {
            Some(existing) => existing.listener = Arc::new(listener),
            None => slot.push(Registration {
                id: id.to_string(),
                listener: Arc::new(listener),
            }),
        }
        tracing::debug!(event = std::any::type_name::<E>(), listener = %id, "Event listener registered");
    }

    /// Remove the listener `id` for `E`. Unknown ids are a no-op.
    pub fn unregister<E: Event>(&self, id: &str) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = listeners.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|r| r.id != id);
        let removed = slot.len() != before;
        if slot.is_empty() {
            listeners.remove(&TypeId::of::<E>());
        }
        if removed {
            tracing::debug!(event = std::any::type_name::<E>(), listener = %id, "Event listener unregistered");
        }
        removed
    }

    /// Listener ids for `E`, in invocation order.
    pub fn listener_ids<E: Event>(&self) -> Vec<String> {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        listeners
            .get(&TypeId::of::<E>())
            .map(|slot| slot.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Invoke every listener for `E` in order, mutating `event` in place.
    ///
    /// The listener list is snapshotted first, so listeners may register or
    /// unregister during the call without affecting this publish.
    pub fn publish<E: Event>(&self, event: &mut E) -> Result<(), FrameworkError> {
        for (id, listener) in self.snapshot::<E>() {
            listener.handle(event).map_err(|err| match err {
                err @ FrameworkError::Listener { .. } => err,
                other => FrameworkError::Listener {
                    id,
                    source: Box::new(other),
                },
            })?;
            if event.is_propagation_stopped() {
                tracing::trace!(event = std::any::type_name::<E>(), "Event propagation stopped");
                break;
            }
        }
        Ok(())
    }

    pub fn checkpoint(&self) -> ListenerCheckpoint {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        ListenerCheckpoint(listeners.clone())
    }

    /// Reset every listener list to what it was at `checkpoint`.
    pub fn restore(&self, checkpoint: ListenerCheckpoint) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        *listeners = checkpoint.0;
        tracing::debug!(event_types = listeners.len(), "Event listeners restored");
    }

    fn snapshot<E: Event>(&self) -> Vec<(String, Arc<dyn Listener<E>>)> {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        listeners
            .get(&TypeId::of::<E>())
            .map(|slot| {
                slot.iter()
                    .filter_map(|r| {
                        r.listener
                            .downcast_ref::<Arc<dyn Listener<E>>>()
                            .map(|listener| (r.id.clone(), listener.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventBus")
            .field("event_types", &listeners.len())
            .finish()
    }
}
