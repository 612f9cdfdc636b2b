//! Event Notifier.
//!
//! Service modules learn about state changes by subscribing a
//! [`StateObserver`]. Additions are published after the entity is fully
//! indexed; deletions are published before it is unindexed, so an observer
//! can still look the entity up through the [`Network`] it is handed.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{Network, UserId};

/// A state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ServerAdd(String),
    ServerDelete(String),
    ServerEob(String),
    UserAdd(UserId),
    UserDelete(UserId),
    UserNickChange { user: UserId, old: String },
    UserOper(UserId),
    UserDeoper(UserId),
    ChannelAdd(String),
    ChannelDelete(String),
    ChannelJoin { channel: String, user: UserId },
    ChannelPart { channel: String, user: UserId },
    ChannelTsChange { channel: String, old_ts: i64 },
    ChannelTopic(String),
}

impl Event {
    /// Hook name, as service modules know it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServerAdd(_) => "server_add",
            Self::ServerDelete(_) => "server_delete",
            Self::ServerEob(_) => "server_eob",
            Self::UserAdd(_) => "user_add",
            Self::UserDelete(_) => "user_delete",
            Self::UserNickChange { .. } => "user_nickchange",
            Self::UserOper(_) => "user_oper",
            Self::UserDeoper(_) => "user_deoper",
            Self::ChannelAdd(_) => "channel_add",
            Self::ChannelDelete(_) => "channel_delete",
            Self::ChannelJoin { .. } => "channel_join",
            Self::ChannelPart { .. } => "channel_part",
            Self::ChannelTsChange { .. } => "channel_tschange",
            Self::ChannelTopic(_) => "channel_topic",
        }
    }
}

/// Trait for observing network state changes.
///
/// Observers get read access to the network; they cannot mutate it while a
/// dispatch is in flight.
pub trait StateObserver: Send + Sync {
    fn on_event(&self, net: &Network, event: &Event);
}

/// Fan-out to subscribed observers.
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn StateObserver>) {
        self.observers.write().push(observer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn publish(&self, net: &Network, event: &Event) {
        for observer in self.observers.read().iter() {
            observer.on_event(net, event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Logs every event at debug level.
pub struct TraceObserver;

impl StateObserver for TraceObserver {
    fn on_event(&self, net: &Network, event: &Event) {
        match event {
            Event::UserAdd(id) | Event::UserDelete(id) => {
                let nick = net.user(*id).map(|u| u.nick.as_str()).unwrap_or("?");
                debug!(hook = event.name(), nick = %nick, "state event");
            }
            _ => debug!(hook = event.name(), ?event, "state event"),
        }
    }
}

/// Records events in order. Handy for tests and for modules that batch.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Hook names recorded so far, without draining.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }
}

impl StateObserver for EventLog {
    fn on_event(&self, _net: &Network, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::ServerAdd("x".into()).name(), "server_add");
        assert_eq!(
            Event::ChannelTsChange {
                channel: "#x".into(),
                old_ts: 5
            }
            .name(),
            "channel_tschange"
        );
        assert_eq!(
            Event::UserNickChange {
                user: UserId(1),
                old: "a".into()
            }
            .name(),
            "user_nickchange"
        );
    }

    #[test]
    fn test_event_log_drains() {
        let log = EventLog::default();
        *log.events.lock() = vec![Event::ServerEob("hub".into())];
        assert_eq!(log.names(), vec!["server_eob"]);
        assert_eq!(log.take().len(), 1);
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_notifier_counts_subscribers() {
        let notifier = Notifier::new();
        notifier.subscribe(Arc::new(TraceObserver));
        notifier.subscribe(EventLog::new());
        assert_eq!(notifier.subscriber_count(), 2);
    }
}
