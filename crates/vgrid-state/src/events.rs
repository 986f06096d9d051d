//! Typed, single-threaded event bus.
//!
//! Collaborators report asynchronous completions (segmentation decode,
//! display set removal) as discrete events. Subscribers receive queue
//! handles scoped either to one display set's topic or to the global feed;
//! a handle stops receiving the moment it is unsubscribed, so no event can
//! be delivered against a torn-down viewport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use vgrid_model::{DisplaySetUid, SegmentationId};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Binary decode of a segmentation display set finished.
    SegmentationLoadingComplete { display_set: DisplaySetUid },
    /// Decode progress, as a fraction of segments processed.
    SegmentLoadingComplete {
        display_set: DisplaySetUid,
        percent_complete: f64,
        num_segments: usize,
    },
    /// Binary decode failed; the segmentation stays unloaded.
    SegmentationLoadingFailed {
        display_set: DisplaySetUid,
        message: String,
    },
    SegmentationModified { segmentation: SegmentationId },
    SegmentationRemoved { segmentation: SegmentationId },
    DisplaySetsRemoved { display_sets: Vec<DisplaySetUid> },
}

impl ViewerEvent {
    /// Topic routing: the display set this event concerns, if any.
    pub fn display_set(&self) -> Option<&DisplaySetUid> {
        match self {
            ViewerEvent::SegmentationLoadingComplete { display_set }
            | ViewerEvent::SegmentLoadingComplete { display_set, .. }
            | ViewerEvent::SegmentationLoadingFailed { display_set, .. } => Some(display_set),
            _ => None,
        }
    }
}

type EventQueue = Rc<RefCell<VecDeque<ViewerEvent>>>;

/// Handle returned by [`EventBus::subscribe`]. Drain it to receive events;
/// hand it back to [`EventBus::unsubscribe`] on teardown.
#[derive(Debug)]
pub struct EventSubscription {
    id: u64,
    queue: EventQueue,
}

impl EventSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take all pending events, oldest first.
    pub fn drain(&self) -> Vec<ViewerEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    /// `None` subscribes to the global feed.
    topic: Option<DisplaySetUid>,
    queue: EventQueue,
}

/// Explicit, injected bus; `clear` drops every subscription on session
/// teardown.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one display set's events (`Some`) or everything
    /// (`None`).
    pub fn subscribe(&mut self, topic: Option<DisplaySetUid>) -> EventSubscription {
        self.next_id += 1;
        let queue: EventQueue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.push(Subscriber {
            id: self.next_id,
            topic,
            queue: Rc::clone(&queue),
        });
        EventSubscription {
            id: self.next_id,
            queue,
        }
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &EventSubscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != subscription.id);
        self.subscribers.len() != before
    }

    /// Drop every subscription scoped to a display set topic. Used when the
    /// display set is closed before its events settle.
    pub fn remove_topic(&mut self, display_set: &DisplaySetUid) {
        self.subscribers
            .retain(|s| s.topic.as_ref() != Some(display_set));
    }

    pub fn publish(&mut self, event: &ViewerEvent) {
        let topic = event.display_set();
        for subscriber in &self.subscribers {
            let matches = match (&subscriber.topic, topic) {
                (None, _) => true,
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) => false,
            };
            if matches {
                subscriber.queue.borrow_mut().push_back(event.clone());
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Session teardown: drop all subscriptions.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(value: &str) -> DisplaySetUid {
        DisplaySetUid::new(value).expect("valid uid")
    }

    fn loading_complete(value: &str) -> ViewerEvent {
        ViewerEvent::SegmentationLoadingComplete {
            display_set: uid(value),
        }
    }

    #[test]
    fn topic_subscription_only_sees_its_display_set() {
        let mut bus = EventBus::new();
        let sub_a = bus.subscribe(Some(uid("a")));
        let sub_b = bus.subscribe(Some(uid("b")));

        bus.publish(&loading_complete("a"));

        assert_eq!(sub_a.drain(), vec![loading_complete("a")]);
        assert!(sub_b.is_empty());
    }

    #[test]
    fn global_subscription_sees_everything() {
        let mut bus = EventBus::new();
        let global = bus.subscribe(None);
        bus.publish(&loading_complete("a"));
        bus.publish(&ViewerEvent::DisplaySetsRemoved {
            display_sets: vec![uid("b")],
        });
        assert_eq!(global.drain().len(), 2);
    }

    #[test]
    fn nothing_is_delivered_after_unsubscribe() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(Some(uid("a")));
        assert!(bus.unsubscribe(&sub));
        bus.publish(&loading_complete("a"));
        assert!(sub.is_empty());
        assert!(!bus.unsubscribe(&sub));
    }

    #[test]
    fn remove_topic_cancels_pending_listeners() {
        let mut bus = EventBus::new();
        let doomed = bus.subscribe(Some(uid("a")));
        let survivor = bus.subscribe(Some(uid("b")));
        bus.remove_topic(&uid("a"));
        bus.publish(&loading_complete("a"));
        bus.publish(&loading_complete("b"));
        assert!(doomed.is_empty());
        assert_eq!(survivor.drain().len(), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
