//! Full poll round through the public API, chat votes included.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chaos_rs::chat::ChatMessage;
use chaos_rs::config::PollSettings;
use chaos_rs::host::{EntityHost, GameEntity, GameLoopObserver};
use chaos_rs::modifiers::Modifier;
use chaos_rs::trigger::{PollTrigger, TriggerEvent, TriggerState};

struct TestHost {
    entities: Mutex<Vec<Arc<dyn GameEntity>>>,
}

impl TestHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entities: Mutex::new(Vec::new()),
        })
    }

    fn tick(&self, delta: f32) {
        let entities = self.entities.lock().unwrap().clone();
        for entity in entities {
            entity.update(delta);
        }
    }
}

impl EntityHost for TestHost {
    fn register(&self, entity: Arc<dyn GameEntity>) -> bool {
        self.entities.lock().unwrap().push(entity);
        true
    }

    fn unregister(&self, entity: &Arc<dyn GameEntity>) -> bool {
        let mut entities = self.entities.lock().unwrap();
        let before = entities.len();
        entities.retain(|registered| !Arc::ptr_eq(registered, entity));
        entities.len() != before
    }
}

struct AlwaysRunning;

impl GameLoopObserver for AlwaysRunning {
    fn is_game_loop_running(&self) -> bool {
        true
    }
}

struct FlagModifier {
    name: &'static str,
    enabled: AtomicBool,
}

impl FlagModifier {
    fn new(name: &'static str) -> Arc<dyn Modifier> {
        Arc::new(Self {
            name,
            enabled: AtomicBool::new(false),
        })
    }
}

impl Modifier for FlagModifier {
    fn display_name(&self) -> &str {
        self.name
    }

    fn enable(&self) -> bool {
        !self.enabled.swap(true, Ordering::SeqCst)
    }

    fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

fn message(display_name: &str, user_id: &str, text: &str) -> ChatMessage {
    ChatMessage {
        display_name: display_name.to_string(),
        user_id: user_id.to_string(),
        text: text.to_string(),
    }
}

/// Spins until `condition` holds or a couple of seconds pass. The vote worker
/// runs on its own thread, so tally updates are asynchronous.
fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for the vote worker");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn chat_votes_decide_the_round() {
    let host = TestHost::new();
    let trigger = PollTrigger::new(
        host.clone(),
        Arc::new(AlwaysRunning),
        vec![
            FlagModifier::new("Strong wind"),
            FlagModifier::new("Low gravity"),
            FlagModifier::new("Screen flip"),
            FlagModifier::new("Bouncy floors"),
            FlagModifier::new("Fall damage"),
        ],
        PollSettings::default(),
    );
    let events = trigger.subscribe();
    let chat = trigger.chat_sender();

    trigger.enable().unwrap();

    // The first frame creates the poll.
    host.tick(0.1);
    assert_eq!(trigger.state(), TriggerState::CollectingVotes);
    let poll = trigger.current_poll().unwrap();
    let expected_winner = poll.option(2).unwrap().modifier().clone();

    // Two distinct voters pick choice 2, one picks choice 1. Trailing text
    // after the digit is ignored.
    chat.send(message("alice", "user-1", "2"));
    chat.send(message("bob", "user-2", "2 please!"));
    chat.send(message("carol", "user-3", "1"));
    wait_for(|| poll.option(2).unwrap().count() == 2 && poll.option(1).unwrap().count() == 1);

    // A duplicate vote from the same user id must not count.
    chat.send(message("alice", "user-1", "1"));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(poll.option(1).unwrap().count(), 1);

    // Run out the 20 second collection window.
    for _ in 0..205 {
        host.tick(0.1);
    }
    assert_eq!(trigger.state(), TriggerState::ClosingPoll);

    // And the closing pause.
    for _ in 0..26 {
        host.tick(0.1);
    }
    assert_eq!(trigger.state(), TriggerState::DownTimeBetweenPolls);

    assert!(expected_winner.is_enabled());
    assert!(trigger.current_poll().is_none());

    let active = trigger.active_modifiers();
    assert_eq!(active.len(), 1);
    assert!(Arc::ptr_eq(active[0].modifier(), &expected_winner));
    assert!(active[0].remaining_seconds() > 29. && active[0].remaining_seconds() <= 30.);

    let emitted: Vec<_> = events.try_iter().collect();
    assert!(matches!(emitted[0], TriggerEvent::PollStarted(_)));
    assert!(matches!(&emitted[1], TriggerEvent::PollClosed(poll)
        if poll.find_winning_modifier().unwrap().choice_number() == 2));
    assert!(matches!(&emitted[2], TriggerEvent::ModifierEnabled(modifier)
        if Arc::ptr_eq(modifier, &expected_winner)));
    assert!(matches!(emitted[3], TriggerEvent::PollEnded(_)));
}
