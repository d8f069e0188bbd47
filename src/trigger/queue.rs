//! The vote ingestion queue.
//!
//! Decouples chat provider threads from the single vote worker. The queue is
//! unbounded on purpose: chat volume is far below the frame rate, and the
//! producer side must never block a network thread.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::chat::ChatMessage;

/// Producer handle given to chat providers.
///
/// Cloneable; `send` never blocks and never fails from the provider's point
/// of view.
#[derive(Debug, Clone)]
pub struct ChatSender {
    sender: Sender<ChatMessage>,
}

impl ChatSender {
    /// Queues a chat message for the vote worker.
    ///
    /// If the worker is gone (the trigger was dropped) the message is
    /// silently discarded.
    pub fn send(&self, message: ChatMessage) {
        if self.sender.send(message).is_err() {
            debug!("Dropping a chat message: the vote worker is gone.");
        }
    }
}

/// Consumer side, owned by the vote worker.
#[derive(Debug)]
pub(crate) struct VoteQueue {
    pub(crate) receiver: Receiver<ChatMessage>,
}

pub(crate) fn vote_queue() -> (ChatSender, VoteQueue) {
    let (sender, receiver) = unbounded();
    (ChatSender { sender }, VoteQueue { receiver })
}
