//! Store change notifications
//!
//! The UI layer subscribes to an explicit observer interface instead of
//! reaching into the store. Events carry the entity kind plus keys, never
//! live borrows, so a subscriber can safely query the store again.

use crate::core::entity::EntityKind;

/// A change in one of the store collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// An entity entered its collection.
    Added { kind: EntityKind, uuid: String },
    /// An entity left its collection (fired after `DeletedByKey`).
    Deleted { kind: EntityKind, uuid: String },
    /// An entity is about to leave its collection, identified by the
    /// rendered domain key (uuid for collections without one).
    DeletedByKey { kind: EntityKind, key: String },
}

/// Token returned by `DataManager::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub(crate) u64);

type Listener = Box<dyn Fn(&StoreEvent)>;

/// Listener registry owned by the store.
#[derive(Default)]
pub(crate) struct EventHub {
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

impl EventHub {
    pub(crate) fn subscribe(&mut self, listener: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        SubscriptionId(id)
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id.0);
        self.listeners.len() != before
    }

    pub(crate) fn emit(&self, event: &StoreEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let mut hub = EventHub::default();
        let seen: Rc<RefCell<Vec<StoreEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = hub.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let event = StoreEvent::Added {
            kind: EntityKind::Order,
            uuid: "u".into(),
        };
        hub.emit(&event);
        assert_eq!(seen.borrow().len(), 1);

        assert!(hub.unsubscribe(id));
        hub.emit(&event);
        assert_eq!(seen.borrow().len(), 1);
        assert!(!hub.unsubscribe(id));
    }
}
