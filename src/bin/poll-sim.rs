//! Headless poll round simulator.
//!
//! Drives the full stack without the host game: an in-process entity host
//! ticked at 10 Hz, flag-backed fake modifiers, and either scripted voters
//! (default) or live Twitch chat via `--twitch <channel>`. Every trigger
//! event is printed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chaos_rs::chat::twitch::TwitchChat;
use chaos_rs::chat::ChatMessage;
use chaos_rs::config::PollSettings;
use chaos_rs::host::{EntityHost, GameEntity, GameLoopObserver};
use chaos_rs::modifiers::meta::{LingeringEffects, RapidPolls};
use chaos_rs::modifiers::Modifier;
use chaos_rs::logging;
use chaos_rs::trigger::{ChatSender, PollTrigger, Tunables};

const TICK: Duration = Duration::from_millis(100);

struct SimHost {
    entities: Mutex<Vec<Arc<dyn GameEntity>>>,
}

impl SimHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entities: Mutex::new(Vec::new()),
        })
    }

    fn tick(&self, delta: f32) {
        let entities = self.entities.lock().unwrap().clone();
        for entity in entities {
            entity.update(delta);
            entity.draw();
        }
    }
}

impl EntityHost for SimHost {
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

struct SimModifier {
    name: &'static str,
    enabled: AtomicBool,
}

impl SimModifier {
    fn new(name: &'static str) -> Arc<dyn Modifier> {
        Arc::new(Self {
            name,
            enabled: AtomicBool::new(false),
        })
    }
}

impl Modifier for SimModifier {
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

/// Sends a random vote from a pool of fake viewers every couple of seconds.
fn scripted_voters(sender: ChatSender, stop: Arc<AtomicBool>) {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let mut viewer = 0u32;

    while !stop.load(Ordering::SeqCst) {
        viewer += 1;
        let choice = rng.gen_range(1..=4);
        sender.send(ChatMessage {
            display_name: format!("viewer_{viewer}"),
            user_id: viewer.to_string(),
            text: format!("{choice}"),
        });

        thread::sleep(Duration::from_millis(rng.gen_range(500..2000)));
    }
}

fn main() {
    logging::init();

    let mut twitch_channel = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--twitch" => match args.next() {
                Some(channel) => twitch_channel = Some(channel),
                None => {
                    eprintln!("--twitch requires a channel name");
                    std::process::exit(1);
                }
            },
            "--help" | "-h" => {
                println!("usage: poll-sim [--twitch <channel>]");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    let host = SimHost::new();
    let tunables = Tunables::default();

    // Meta-modifiers join the candidate pool like any other modifier.
    let modifiers: Vec<Arc<dyn Modifier>> = vec![
        SimModifier::new("Strong wind"),
        SimModifier::new("Low gravity"),
        SimModifier::new("Screen flip"),
        SimModifier::new("Bouncy floors"),
        SimModifier::new("Fall damage"),
        Arc::new(RapidPolls::new(tunables.clone())),
        Arc::new(LingeringEffects::new(tunables.clone())),
    ];

    let trigger = PollTrigger::with_tunables(
        host.clone(),
        Arc::new(AlwaysRunning),
        modifiers,
        PollSettings::default(),
        tunables,
    );

    let events = trigger.subscribe();
    trigger.enable().expect("the simulated game loop is always running");

    let stop_voters = Arc::new(AtomicBool::new(false));
    let _twitch;
    let mut voters = None;

    match twitch_channel {
        Some(channel) => {
            println!("Reading live chat from #{channel}.");
            _twitch = Some(TwitchChat::connect(&channel, trigger.chat_sender()));
        }
        None => {
            println!("Using scripted voters; pass --twitch <channel> for live chat.");
            _twitch = None;
            voters = Some(thread::spawn({
                let sender = trigger.chat_sender();
                let stop = stop_voters.clone();
                move || scripted_voters(sender, stop)
            }));
        }
    }

    // Two minutes of simulated time.
    for _ in 0..1200 {
        host.tick(TICK.as_secs_f32());

        for event in events.try_iter() {
            println!("{event:?}");
        }

        thread::sleep(TICK);
    }

    stop_voters.store(true, Ordering::SeqCst);
    if let Some(voters) = voters {
        let _ = voters.join();
    }
    trigger.disable();
}
