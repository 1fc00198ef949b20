//! Scoped registrations.
//!
//! Every listener, command handler and node transform registered with the
//! editor hands back a [`Subscription`]. Dropping it unregisters. A
//! [`SubscriptionSet`] collects several so a whole feature can be switched
//! off in one go.

use std::fmt;

pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that releases nothing.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Releases now instead of on drop.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Releases everything, newest first.
    pub fn clear(&mut self) {
        while let Some(subscription) = self.subscriptions.pop() {
            drop(subscription);
        }
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subscriptions.extend(iter);
    }
}

impl FromIterator<Subscription> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = Subscription>>(iter: I) -> Self {
        Self {
            subscriptions: iter.into_iter().collect(),
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.clear();
    }
}
