//! The vote worker thread.
//!
//! A single dedicated thread owns all vote application: it blocks on the
//! ingestion queue, runs every dequeued chat message through the guard chain
//! and increments tallies. Nothing a chat message contains may take this
//! thread down.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Sender};

use super::queue::VoteQueue;
use super::{vote, Shared};
use crate::chat::ChatMessage;
use crate::utils::catch_and_log;

/// Display name that may vote repeatedly within one round.
///
/// Lets a developer exercise polls from their own chat account without
/// rounding up extra voters.
pub const PRIVILEGED_DISPLAY_NAME: &str = "chaos_rs_dev";

/// Handle to the vote worker thread.
///
/// Dropping it signals shutdown and joins the thread.
pub(crate) struct VoteWorker {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl VoteWorker {
    pub(crate) fn spawn(shared: Arc<Shared>, queue: VoteQueue) -> Self {
        let (shutdown, shutdown_receiver) = bounded(1);

        let handle = thread::Builder::new()
            .name("Vote Worker Thread".to_string())
            .spawn(move || {
                loop {
                    select! {
                        recv(shutdown_receiver) -> _ => return,
                        recv(queue.receiver) -> message => {
                            // A closed queue means the trigger is gone.
                            let Ok(message) = message else { return };
                            catch_and_log("vote application", || apply_vote(&shared, &message));
                        }
                    }
                }
            })
            .unwrap();

        Self {
            shutdown,
            handle: Some(handle),
        }
    }
}

impl Drop for VoteWorker {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Applies one chat message to the live poll.
///
/// Every guard silently drops the message; spectators get no error feedback
/// either way.
pub(crate) fn apply_vote(shared: &Shared, message: &ChatMessage) {
    if !shared.is_enabled() {
        return;
    }

    if !shared.game_loop.is_game_loop_running() {
        return;
    }

    // Snapshot the poll so the frame thread swapping the slot mid-application
    // cannot affect this vote.
    let Some(poll) = shared.current_poll.lock().unwrap().clone() else {
        return;
    };

    let privileged = message.display_name == PRIVILEGED_DISPLAY_NAME;
    if !privileged && shared.voted.lock().unwrap().contains(&message.user_id) {
        return;
    }

    let Some(choice_number) = vote::parse_vote(&message.text) else {
        return;
    };

    let Some(option) = poll.option(choice_number) else {
        trace!(
            "{} voted for {choice_number} which is not in the poll.",
            message.display_name
        );
        return;
    };

    option.record_vote();

    if !privileged {
        shared
            .voted
            .lock()
            .unwrap()
            .insert(message.user_id.clone());
    }

    debug!(
        "{} voted for {}.",
        message.display_name,
        option.modifier().display_name()
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::host::GameLoopObserver;
    use crate::trigger::poll::ModifierPoll;
    use crate::trigger::tests::FlagModifier;

    struct Running(bool);
    impl GameLoopObserver for Running {
        fn is_game_loop_running(&self) -> bool {
            self.0
        }
    }

    fn shared_with_poll(running: bool) -> Shared {
        let shared = Shared::new(Arc::new(Running(running)));
        shared.enabled.store(true, Ordering::SeqCst);

        let poll = ModifierPoll::new(
            vec![FlagModifier::new("Wind"), FlagModifier::new("Low gravity")],
            20.,
        );
        *shared.current_poll.lock().unwrap() = Some(Arc::new(poll));

        shared
    }

    fn message(display_name: &str, user_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            display_name: display_name.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
        }
    }

    fn count(shared: &Shared, choice: u8) -> u32 {
        let poll = shared.current_poll.lock().unwrap().clone().unwrap();
        poll.option(choice).unwrap().count()
    }

    #[test]
    fn second_vote_from_same_user_is_dropped() {
        let shared = shared_with_poll(true);

        apply_vote(&shared, &message("viewer", "42", "1"));
        apply_vote(&shared, &message("viewer", "42", "2"));

        assert_eq!(count(&shared, 1), 1);
        assert_eq!(count(&shared, 2), 0);
    }

    #[test]
    fn dedup_resets_with_a_new_round() {
        let shared = shared_with_poll(true);

        apply_vote(&shared, &message("viewer", "42", "1"));
        assert_eq!(count(&shared, 1), 1);

        // New round: fresh poll, cleared dedup set.
        let poll = ModifierPoll::new(vec![FlagModifier::new("Screen flip")], 20.);
        *shared.current_poll.lock().unwrap() = Some(Arc::new(poll));
        shared.voted.lock().unwrap().clear();

        apply_vote(&shared, &message("viewer", "42", "1"));
        assert_eq!(count(&shared, 1), 1);
    }

    #[test]
    fn privileged_display_name_votes_repeatedly() {
        let shared = shared_with_poll(true);

        for _ in 0..3 {
            apply_vote(&shared, &message(PRIVILEGED_DISPLAY_NAME, "7", "2"));
        }

        assert_eq!(count(&shared, 2), 3);
    }

    #[test]
    fn unparseable_and_out_of_range_votes_are_dropped() {
        let shared = shared_with_poll(true);

        apply_vote(&shared, &message("a", "1", "first one please"));
        apply_vote(&shared, &message("b", "2", ""));
        apply_vote(&shared, &message("c", "3", "9"));

        assert_eq!(count(&shared, 1), 0);
        assert_eq!(count(&shared, 2), 0);
        // A dropped vote must not consume the voter's one vote per round.
        apply_vote(&shared, &message("c", "3", "1"));
        assert_eq!(count(&shared, 1), 1);
    }

    #[test]
    fn votes_are_dropped_while_game_loop_is_stopped() {
        let shared = shared_with_poll(false);

        apply_vote(&shared, &message("viewer", "42", "1"));
        assert_eq!(count(&shared, 1), 0);
    }

    #[test]
    fn votes_are_dropped_while_trigger_is_disabled() {
        let shared = shared_with_poll(true);
        shared.enabled.store(false, Ordering::SeqCst);

        apply_vote(&shared, &message("viewer", "42", "1"));
        assert_eq!(count(&shared, 1), 0);
    }

    #[test]
    fn votes_are_dropped_without_a_poll() {
        let shared = shared_with_poll(true);
        *shared.current_poll.lock().unwrap() = None;

        // Must simply not panic or record anything.
        apply_vote(&shared, &message("viewer", "42", "1"));
        assert!(shared.voted.lock().unwrap().is_empty());
    }
}
