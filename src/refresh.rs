//! Refresh notifications.
//!
//! After every successful modifier or baseline mutation the registry tells
//! its listeners which attribute changed, so a live game bridge can push
//! the new `current_final` into the native attribute system without
//! polling. Notifications are delivered synchronously, on the mutating
//! thread.

use crate::ids::{AttributeId, EntityId};
use parking_lot::Mutex;

/// Observer for attribute changes.
pub trait RefreshListener: Send + Sync {
    /// A scoped mutation changed `attribute` for `entity`.
    fn notify_entity(&self, entity: &EntityId, attribute: &AttributeId);

    /// A global mutation changed `attribute` for every entity.
    fn notify_all(&self, attribute: &AttributeId);
}

/// A single delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Entity(EntityId, AttributeId),
    All(AttributeId),
}

/// Listener that keeps every notification it receives, in order.
///
/// Handy for bridges that batch refreshes until the end of a tick.
///
/// # Examples
///
/// ```rust
/// use attrstat::{AttributeId, RecordingRefresh, RefreshEvent, RefreshListener};
///
/// let recorder = RecordingRefresh::new();
/// recorder.notify_all(&AttributeId::new("armor"));
///
/// assert_eq!(recorder.drain(), vec![RefreshEvent::All(AttributeId::new("armor"))]);
/// assert!(recorder.drain().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingRefresh {
    events: Mutex<Vec<RefreshEvent>>,
}

impl RecordingRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events, leaving the recorder empty.
    pub fn drain(&self) -> Vec<RefreshEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl RefreshListener for RecordingRefresh {
    fn notify_entity(&self, entity: &EntityId, attribute: &AttributeId) {
        self.events
            .lock()
            .push(RefreshEvent::Entity(entity.clone(), attribute.clone()));
    }

    fn notify_all(&self, attribute: &AttributeId) {
        self.events.lock().push(RefreshEvent::All(attribute.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_order() {
        let recorder = RecordingRefresh::new();
        let hero = EntityId::new("hero");
        let speed = AttributeId::new("speed");

        recorder.notify_entity(&hero, &speed);
        recorder.notify_all(&speed);

        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.drain(),
            vec![
                RefreshEvent::Entity(hero, speed.clone()),
                RefreshEvent::All(speed),
            ]
        );
        assert!(recorder.is_empty());
    }
}
