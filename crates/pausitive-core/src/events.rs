//! Publish/subscribe registry keyed by event kind.
//!
//! Handlers for a kind run in subscription order. Unsubscribing is a
//! `BTreeMap` removal, so it stays O(log n) per kind.

use std::collections::BTreeMap;
use std::fmt;

/// An event that can be routed by kind.
pub trait BusEvent {
    type Kind: Ord + Copy + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription<K> {
    kind: K,
    seq: u64,
}

impl<K: Copy> Subscription<K> {
    pub fn kind(&self) -> K {
        self.kind
    }
}

type Handler<E> = Box<dyn FnMut(&E)>;

pub struct EventBus<E: BusEvent> {
    next_seq: u64,
    handlers: BTreeMap<E::Kind, BTreeMap<u64, Handler<E>>>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            handlers: BTreeMap::new(),
        }
    }

    pub fn subscribe<F>(&mut self, kind: E::Kind, handler: F) -> Subscription<E::Kind>
    where
        F: FnMut(&E) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .insert(seq, Box::new(handler));
        Subscription { kind, seq }
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription<E::Kind>) -> bool {
        let Some(handlers) = self.handlers.get_mut(&subscription.kind) else {
            return false;
        };
        let removed = handlers.remove(&subscription.seq).is_some();
        if handlers.is_empty() {
            self.handlers.remove(&subscription.kind);
        }
        removed
    }

    pub fn publish(&mut self, event: &E) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.values_mut() {
                handler(event);
            }
        }
    }

    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map(BTreeMap::len).unwrap_or(0)
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
