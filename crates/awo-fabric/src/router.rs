use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::event::LedgerEvent;

/// Events buffered per topic before a slow subscriber starts lagging.
const TOPIC_CAPACITY: usize = 256;

/// A named event of one chaincode.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    pub chaincode: String,
    pub event_name: String,
}

impl Topic {
    pub fn new(chaincode: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            chaincode: chaincode.into(),
            event_name: event_name.into(),
        }
    }

    /// Topic an event was emitted under.
    pub fn of(event: &LedgerEvent) -> Self {
        Self::new(event.chaincode.as_str(), event.event_name.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chaincode, self.event_name)
    }
}

/// A broadcast channel receiver for ledger events.
pub type EventStream = broadcast::Receiver<LedgerEvent>;

/// Delivers committed events to the subscribers of their topic.
///
/// A topic's channel is opened by its first subscription and dropped by
/// the first event routed after its last receiver is gone.
pub struct EventRouter {
    topics: Mutex<HashMap<Topic, broadcast::Sender<LedgerEvent>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> EventStream {
        self.topics
            .lock()
            .expect("router lock poisoned")
            .entry(topic)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Route `event` to its topic, returning how many subscribers got it.
    pub fn route(&self, event: &LedgerEvent) -> usize {
        let topic = Topic::of(event);
        let mut topics = self.topics.lock().expect("router lock poisoned");
        let Some(sender) = topics.get(&topic) else {
            return 0;
        };
        match sender.send(event.clone()) {
            Ok(receivers) => receivers,
            Err(_) => {
                topics.remove(&topic);
                0
            }
        }
    }

    /// Live subscriptions across all topics.
    pub fn subscriber_count(&self) -> usize {
        self.topics
            .lock()
            .expect("router lock poisoned")
            .values()
            .map(broadcast::Sender::receiver_count)
            .sum()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
