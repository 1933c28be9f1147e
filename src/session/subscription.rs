//! Subscription management
//!
//! A `Subscription` ties a STOMP destination to the id the session chose for
//! it and to the caller's callback. Destinations are unique within a
//! session; inbound MESSAGE frames are routed by id.

use std::collections::HashMap;
use std::fmt;

use crate::stomp::StompFrame;

pub type MessageCallback = Box<dyn FnMut(&StompFrame) + Send>;

pub struct Subscription {
    pub id: String,
    pub destination: String,
    callback: MessageCallback,
}

impl Subscription {
    pub fn new(id: String, destination: String, callback: MessageCallback) -> Self {
        Self {
            id,
            destination,
            callback,
        }
    }

    pub(crate) fn deliver(&mut self, frame: &StompFrame) {
        (self.callback)(frame);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// The subscriptions of one connection, keyed by destination.
#[derive(Debug, Default)]
pub struct Subscriptions {
    by_destination: HashMap<String, Subscription>,
}

impl Subscriptions {
    pub fn contains(&self, destination: &str) -> bool {
        self.by_destination.contains_key(destination)
    }

    /// Add a subscription. A destination already present is left untouched
    /// and `false` is returned.
    pub fn insert(&mut self, subscription: Subscription) -> bool {
        if self.contains(&subscription.destination) {
            return false;
        }
        self.by_destination
            .insert(subscription.destination.clone(), subscription);
        true
    }

    pub fn get(&self, destination: &str) -> Option<&Subscription> {
        self.by_destination.get(destination)
    }

    pub fn remove(&mut self, destination: &str) -> Option<Subscription> {
        self.by_destination.remove(destination)
    }

    pub fn by_id_mut(&mut self, id: &str) -> Option<&mut Subscription> {
        self.by_destination.values_mut().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.by_destination.values()
    }

    pub fn len(&self) -> usize {
        self.by_destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_destination.is_empty()
    }
}
