//! Notifications emitted by the poll trigger.
//!
//! Consumers (poll UI, overlays, logs) subscribe and receive every event on
//! their own unbounded channel, so a slow consumer never stalls the frame
//! thread. Subscribers that dropped their receiver are pruned on the next
//! emit.

use std::fmt;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::poll::ModifierPoll;
use crate::modifiers::Modifier;

/// An event in the poll trigger's lifecycle.
///
/// Poll events carry the live poll snapshot: tallies read through it keep
/// updating while the poll collects votes.
#[derive(Clone)]
pub enum TriggerEvent {
    /// A new poll opened for votes.
    PollStarted(Arc<ModifierPoll>),
    /// Voting closed; the winner is now computable.
    PollClosed(Arc<ModifierPoll>),
    /// The round is over and the poll is discarded.
    PollEnded(Arc<ModifierPoll>),
    /// A winning modifier was turned on.
    ModifierEnabled(Arc<dyn Modifier>),
    /// An active modifier's duration expired, or the trigger was disabled.
    ModifierDisabled(Arc<dyn Modifier>),
}

impl fmt::Debug for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PollStarted(poll) => f.debug_tuple("PollStarted").field(poll).finish(),
            Self::PollClosed(poll) => f.debug_tuple("PollClosed").field(poll).finish(),
            Self::PollEnded(poll) => f.debug_tuple("PollEnded").field(poll).finish(),
            Self::ModifierEnabled(modifier) => f
                .debug_tuple("ModifierEnabled")
                .field(&modifier.display_name())
                .finish(),
            Self::ModifierDisabled(modifier) => f
                .debug_tuple("ModifierDisabled")
                .field(&modifier.display_name())
                .finish(),
        }
    }
}

/// Fan-out hub for [`TriggerEvent`]s.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Sender<TriggerEvent>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> Receiver<TriggerEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().unwrap().push(sender);
        receiver
    }

    pub(crate) fn emit(&self, event: TriggerEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_every_event() {
        let hub = EventHub::default();
        let first = hub.subscribe();
        let second = hub.subscribe();

        let poll = Arc::new(ModifierPoll::new(Vec::new(), 20.));
        hub.emit(TriggerEvent::PollStarted(poll.clone()));
        hub.emit(TriggerEvent::PollEnded(poll));

        assert_eq!(first.try_iter().count(), 2);
        assert_eq!(second.try_iter().count(), 2);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = EventHub::default();
        let keep = hub.subscribe();
        drop(hub.subscribe());

        let poll = Arc::new(ModifierPoll::new(Vec::new(), 20.));
        hub.emit(TriggerEvent::PollStarted(poll));

        assert_eq!(hub.subscribers.lock().unwrap().len(), 1);
        assert_eq!(keep.try_iter().count(), 1);
    }
}
