//! # Subscription registry.
//!
//! Maps each [`Category`] to the ordered list of wrappers registered for it,
//! plus the bus "closed" flag, so both are read and written under one lock.
//!
//! ## Architecture
//! ```text
//! EventBus ── RwLock<Registry>
//!               ├─ closed: bool
//!               └─ subscriptions: HashMap<Category, Vec<Arc<SubscriberWrapper>>>
//!                      "user.login"  → [audit#1, log#1, audit#2]
//!                      "user.logout" → [log#2]
//! ```
//!
//! ## Rules
//! - A category with no wrapper is absent, never present with an empty list.
//! - List order is registration order (only matters for listing).
//! - Registering the same id twice under a category keeps both wrappers;
//!   removal takes the first match.
//! - The registry never starts or stops wrappers; the bus does.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::wrapper::SubscriberWrapper;
use crate::events::Category;

/// Category → wrappers table.
#[derive(Default)]
pub(crate) struct Registry {
    closed: bool,
    subscriptions: HashMap<Category, Vec<Arc<SubscriberWrapper>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the registry closed; returns `false` if it already was.
    pub(crate) fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    /// Appends a wrapper to its category list.
    pub(crate) fn insert(&mut self, wrapper: Arc<SubscriberWrapper>) {
        self.subscriptions
            .entry(wrapper.category().clone())
            .or_default()
            .push(wrapper);
    }

    /// Removes the first wrapper registered under `category` with `id`.
    pub(crate) fn remove(&mut self, category: &str, id: &str) -> Option<Arc<SubscriberWrapper>> {
        let list = self.subscriptions.get_mut(category)?;
        let idx = list.iter().position(|w| w.id() == id)?;
        let wrapper = list.remove(idx);
        if list.is_empty() {
            self.subscriptions.remove(category);
        }
        Some(wrapper)
    }

    /// Wrappers for a category, in registration order.
    pub(crate) fn get(&self, category: &str) -> Option<&[Arc<SubscriberWrapper>]> {
        self.subscriptions.get(category).map(Vec::as_slice)
    }

    /// First wrapper registered under `category` with `id`.
    pub(crate) fn find(&self, category: &str, id: &str) -> Option<&Arc<SubscriberWrapper>> {
        self.subscriptions
            .get(category)?
            .iter()
            .find(|w| w.id() == id)
    }

    /// Clones every wrapper handle (used by shutdown).
    pub(crate) fn wrappers(&self) -> Vec<Arc<SubscriberWrapper>> {
        self.subscriptions.values().flatten().cloned().collect()
    }

    /// `(wrappers, categories)` gauges.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let wrappers = self.subscriptions.values().map(Vec::len).sum();
        (wrappers, self.subscriptions.len())
    }

    /// Category → subscriber ids, sorted by category.
    pub(crate) fn list(&self) -> BTreeMap<Category, Vec<String>> {
        self.subscriptions
            .iter()
            .map(|(c, ws)| (c.clone(), ws.iter().map(|w| w.id().to_string()).collect()))
            .collect()
    }
}
