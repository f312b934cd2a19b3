//! Subscription registry
//!
//! Two indexes kept in step: session → addresses for teardown, and
//! address → sessions for fan-out. An address is present in the reverse index
//! only while at least one session watches it.

use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

use crate::SessionId;

#[derive(Default)]
pub struct SubscriptionRegistry {
    by_session: DashMap<SessionId, HashSet<String>>,
    by_address: DashMap<String, HashSet<SessionId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the subscription is new
    pub fn subscribe(&self, session: SessionId, address: &str) -> bool {
        let added = self
            .by_session
            .entry(session)
            .or_default()
            .insert(address.to_string());

        if added {
            self.by_address
                .entry(address.to_string())
                .or_default()
                .insert(session);
            debug!(%session, address, "subscribed");
        }
        added
    }

    /// Returns true if a subscription was removed
    pub fn unsubscribe(&self, session: SessionId, address: &str) -> bool {
        let removed = match self.by_session.get_mut(&session) {
            Some(mut addresses) => addresses.remove(address),
            None => false,
        };
        if !removed {
            return false;
        }
        self.by_session.remove_if(&session, |_, a| a.is_empty());
        self.forget_reverse(session, address);
        debug!(%session, address, "unsubscribed");
        true
    }

    pub fn sessions_for(&self, address: &str) -> Vec<SessionId> {
        self.by_address
            .get(address)
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn addresses_for(&self, session: SessionId) -> Vec<String> {
        self.by_session
            .get(&session)
            .map(|addresses| addresses.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_watched(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    /// Drop every subscription the session holds. Returns how many there were.
    pub fn teardown(&self, session: SessionId) -> usize {
        let Some((_, addresses)) = self.by_session.remove(&session) else {
            return 0;
        };
        for address in &addresses {
            self.forget_reverse(session, address);
        }
        debug!(%session, count = addresses.len(), "subscriptions torn down");
        addresses.len()
    }

    /// Number of distinct watched addresses
    pub fn address_count(&self) -> usize {
        self.by_address.len()
    }

    fn forget_reverse(&self, session: SessionId, address: &str) {
        if let Some(mut sessions) = self.by_address.get_mut(address) {
            sessions.remove(&session);
        }
        self.by_address.remove_if(address, |_, s| s.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let a = SessionId::new();

        assert!(registry.subscribe(a, "/ch/01/mix/fader"));
        assert!(!registry.subscribe(a, "/ch/01/mix/fader"));
        assert_eq!(registry.sessions_for("/ch/01/mix/fader"), vec![a]);
        assert_eq!(registry.addresses_for(a), vec!["/ch/01/mix/fader".to_string()]);
    }

    #[test]
    fn only_subscribers_are_returned() {
        let registry = SubscriptionRegistry::new();
        let a = SessionId::new();
        let b = SessionId::new();

        registry.subscribe(a, "/lr/mix/fader");
        registry.subscribe(b, "/bus/1/mix/fader");

        assert_eq!(registry.sessions_for("/lr/mix/fader"), vec![a]);
        assert_eq!(registry.sessions_for("/bus/1/mix/fader"), vec![b]);
        assert!(registry.sessions_for("/ch/09/mix/fader").is_empty());
    }

    #[test]
    fn unsubscribe_cleans_reverse_index() {
        let registry = SubscriptionRegistry::new();
        let a = SessionId::new();
        let b = SessionId::new();

        registry.subscribe(a, "/lr/mix/fader");
        registry.subscribe(b, "/lr/mix/fader");

        assert!(registry.unsubscribe(a, "/lr/mix/fader"));
        assert!(!registry.unsubscribe(a, "/lr/mix/fader"));
        assert!(registry.is_watched("/lr/mix/fader"));

        assert!(registry.unsubscribe(b, "/lr/mix/fader"));
        assert!(!registry.is_watched("/lr/mix/fader"));
        assert_eq!(registry.address_count(), 0);
    }

    #[test]
    fn unsubscribe_unknown_session() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.unsubscribe(SessionId::new(), "/lr/mix/fader"));
    }

    #[test]
    fn teardown_removes_both_directions() {
        let registry = SubscriptionRegistry::new();
        let a = SessionId::new();
        let b = SessionId::new();

        registry.subscribe(a, "/ch/01/mix/fader");
        registry.subscribe(a, "/ch/02/mix/fader");
        registry.subscribe(b, "/ch/02/mix/fader");

        assert_eq!(registry.teardown(a), 2);
        assert!(registry.addresses_for(a).is_empty());
        assert!(!registry.is_watched("/ch/01/mix/fader"));
        assert_eq!(registry.sessions_for("/ch/02/mix/fader"), vec![b]);

        assert_eq!(registry.teardown(a), 0);
    }
}
