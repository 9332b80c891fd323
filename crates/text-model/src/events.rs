//! Listener registry with deferred, merging delivery.
//!
//! A [`DeferredEmitter`] delivers events to its listeners immediately unless delivery is
//! deferred. While deferred (reference counted, so deferrals nest), fired events are merged
//! into one pending event which is delivered when the outermost deferral ends.

use crate::delta::{DecorationsChangedEvent, ModelContentChangedEvent};

/// Events that can be folded into one.
pub trait MergeEvent: Sized {
    /// Combine `self` with the event fired after it.
    fn merge(self, later: Self) -> Self;
}

impl MergeEvent for ModelContentChangedEvent {
    fn merge(self, later: Self) -> Self {
        ModelContentChangedEvent::merge(self, later)
    }
}

impl MergeEvent for DecorationsChangedEvent {
    fn merge(self, _later: Self) -> Self {
        self
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Boxed listener callback.
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Event emitter with reference-counted deferral.
pub struct DeferredEmitter<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_listener_id: u64,
    defer_count: usize,
    pending: Option<E>,
}

impl<E> Default for DeferredEmitter<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_listener_id: 1,
            defer_count: 0,
            pending: None,
        }
    }
}

impl<E> std::fmt::Debug for DeferredEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredEmitter")
            .field("listeners", &self.listeners.len())
            .field("defer_count", &self.defer_count)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl<E: MergeEvent> DeferredEmitter<E> {
    /// Create an emitter without listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.subscribe_with_id(id, listener);
        id
    }

    /// Register a listener under an id allocated by the caller.
    pub(crate) fn subscribe_with_id<F>(&mut self, id: ListenerId, listener: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.listeners.push((id, Box::new(listener)));
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// `true` while at least one deferral is open.
    pub fn is_deferred(&self) -> bool {
        self.defer_count > 0
    }

    /// Open a deferral.
    pub fn begin_deferred(&mut self) {
        self.defer_count += 1;
    }

    /// Close a deferral; closing the outermost one delivers the pending event.
    pub fn end_deferred(&mut self) {
        self.defer_count = self.defer_count.saturating_sub(1);
        if self.defer_count == 0
            && let Some(event) = self.pending.take()
        {
            self.deliver(&event);
        }
    }

    /// Deliver `event` now, or merge it into the pending event while deferred.
    pub fn fire(&mut self, event: E) {
        if self.defer_count > 0 {
            self.pending = Some(match self.pending.take() {
                Some(pending) => pending.merge(event),
                None => event,
            });
        } else {
            self.deliver(&event);
        }
    }

    /// Drop every listener and any pending event.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.pending = None;
    }

    fn deliver(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct Numbers(Vec<u32>);

    impl MergeEvent for Numbers {
        fn merge(mut self, later: Self) -> Self {
            self.0.extend(later.0);
            self
        }
    }

    fn recording_emitter() -> (DeferredEmitter<Numbers>, Arc<Mutex<Vec<Numbers>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = DeferredEmitter::new();
        let sink = Arc::clone(&seen);
        emitter.subscribe(move |event: &Numbers| sink.lock().unwrap().push(event.clone()));
        (emitter, seen)
    }

    #[test]
    fn test_fire_delivers_immediately() {
        let (mut emitter, seen) = recording_emitter();
        emitter.fire(Numbers(vec![1]));
        emitter.fire(Numbers(vec![2]));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_nested_deferral_delivers_once() {
        let (mut emitter, seen) = recording_emitter();
        emitter.begin_deferred();
        emitter.fire(Numbers(vec![1]));
        emitter.begin_deferred();
        emitter.fire(Numbers(vec![2]));
        emitter.end_deferred();
        assert!(seen.lock().unwrap().is_empty());
        emitter.fire(Numbers(vec![3]));
        emitter.end_deferred();

        assert_eq!(*seen.lock().unwrap(), vec![Numbers(vec![1, 2, 3])]);
    }

    #[test]
    fn test_deferral_without_events_delivers_nothing() {
        let (mut emitter, seen) = recording_emitter();
        emitter.begin_deferred();
        emitter.end_deferred();
        emitter.end_deferred();
        assert!(seen.lock().unwrap().is_empty());
        assert!(!emitter.is_deferred());
    }

    #[test]
    fn test_unsubscribe() {
        let (mut emitter, seen) = recording_emitter();
        let other = emitter.subscribe(|_| {});
        assert_eq!(emitter.listener_count(), 2);
        assert!(emitter.unsubscribe(other));
        assert!(!emitter.unsubscribe(other));
        emitter.fire(Numbers(vec![7]));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
