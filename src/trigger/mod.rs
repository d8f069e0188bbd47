//! The chat-poll-driven modifier trigger.
//!
//! The heart of the mod: a state machine cycling through poll rounds. Each
//! round picks up to four currently-disabled modifiers as candidates, lets
//! chat vote on them for twenty seconds, enables the winner for a limited
//! time and then starts over after a short downtime.
//!
//! Three threads touch this state. Chat provider threads only push into the
//! ingestion queue. A dedicated vote worker thread applies votes to the
//! current poll. The game's main thread drives the lifecycle through
//! [`GameEntity::update`] and delivers game-loop start/stop transitions. The
//! only state shared between the worker and the main thread is the current
//! poll slot and the per-option tallies; a vote racing the close transition
//! may be lost, which is accepted (chat is best-effort) rather than
//! synchronized against.

use std::collections::HashSet;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use rand::seq::SliceRandom;
use thiserror::Error;

pub mod countdown;
pub mod events;
pub mod poll;
pub mod queue;
pub mod vote;
mod worker;

use countdown::ActiveModifierCountdown;
use events::EventHub;
pub use events::TriggerEvent;
use poll::ModifierPoll;
pub use queue::ChatSender;
use worker::VoteWorker;
pub use worker::PRIVILEGED_DISPLAY_NAME;

use crate::config::PollSettings;
use crate::host::{EntityHost, GameEntity, GameLoopObserver};
use crate::modifiers::Modifier;
use crate::utils::catch_and_log;

/// Where the trigger is in the poll round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    CreatingPoll,
    CollectingVotes,
    ClosingPoll,
    ExecutingWinningOption,
    DownTimeBetweenPolls,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("the host game refused to register the poll trigger")]
    RegistrationFailed,
    #[error("the game loop is not running")]
    GameLoopNotRunning,
}

/// Runtime scales applied to the trigger's timings.
///
/// Meta-modifiers hold a clone of this handle and adjust the scales; the
/// trigger reads them at the moment of use, so a change takes effect on the
/// next downtime or winner activation.
#[derive(Debug, Clone)]
pub struct Tunables {
    inner: Arc<TunablesInner>,
}

#[derive(Debug)]
struct TunablesInner {
    poll_interval_scale: AtomicU32,
    duration_scale: AtomicU32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            inner: Arc::new(TunablesInner {
                poll_interval_scale: AtomicU32::new(1f32.to_bits()),
                duration_scale: AtomicU32::new(1f32.to_bits()),
            }),
        }
    }
}

impl Tunables {
    /// Multiplier on the downtime between polls.
    pub fn poll_interval_scale(&self) -> f32 {
        f32::from_bits(self.inner.poll_interval_scale.load(Ordering::SeqCst))
    }

    pub fn set_poll_interval_scale(&self, scale: f32) {
        self.inner
            .poll_interval_scale
            .store(scale.to_bits(), Ordering::SeqCst);
    }

    /// Multiplier on how long winning modifiers stay active.
    pub fn duration_scale(&self) -> f32 {
        f32::from_bits(self.inner.duration_scale.load(Ordering::SeqCst))
    }

    pub fn set_duration_scale(&self, scale: f32) {
        self.inner
            .duration_scale
            .store(scale.to_bits(), Ordering::SeqCst);
    }
}

/// State shared between the main thread and the vote worker.
pub(crate) struct Shared {
    pub(crate) enabled: AtomicBool,
    pub(crate) game_loop: Arc<dyn GameLoopObserver>,
    /// The poll of the current round. The main thread swaps the slot between
    /// rounds; the worker clones the `Arc` out and works on the snapshot.
    pub(crate) current_poll: Mutex<Option<Arc<ModifierPoll>>>,
    /// User ids that already voted this round.
    pub(crate) voted: Mutex<HashSet<String>>,
}

impl Shared {
    pub(crate) fn new(game_loop: Arc<dyn GameLoopObserver>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            game_loop,
            current_poll: Mutex::new(None),
            voted: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Lifecycle state owned by the main thread.
struct Lifecycle {
    state: TriggerState,
    elapsed_in_state: f32,
    active: Vec<ActiveModifierCountdown>,
    /// Countdowns cached while the game loop is stopped.
    previously_active: Vec<ActiveModifierCountdown>,
}

impl Lifecycle {
    fn reset(&mut self, state: TriggerState) {
        self.state = state;
        self.elapsed_in_state = 0.;
    }
}

/// The poll trigger.
///
/// Created disabled; [`enable`] registers it with the host's entity list and
/// starts the round cycle. The vote worker thread lives for the whole
/// lifetime of the trigger and is joined on drop.
///
/// [`enable`]: PollTrigger::enable
pub struct PollTrigger {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    modifiers: Vec<Arc<dyn Modifier>>,
    settings: PollSettings,
    tunables: Tunables,
    events: EventHub,
    chat_sender: ChatSender,
    host: Arc<dyn EntityHost>,
    _worker: VoteWorker,
}

impl PollTrigger {
    pub fn new(
        host: Arc<dyn EntityHost>,
        game_loop: Arc<dyn GameLoopObserver>,
        modifiers: Vec<Arc<dyn Modifier>>,
        settings: PollSettings,
    ) -> Arc<Self> {
        Self::with_tunables(host, game_loop, modifiers, settings, Tunables::default())
    }

    /// Like [`new`], with an externally created [`Tunables`] handle.
    ///
    /// Needed when meta-modifiers are part of the candidate list: they must
    /// be built with the handle before the trigger exists.
    ///
    /// [`new`]: PollTrigger::new
    pub fn with_tunables(
        host: Arc<dyn EntityHost>,
        game_loop: Arc<dyn GameLoopObserver>,
        modifiers: Vec<Arc<dyn Modifier>>,
        settings: PollSettings,
        tunables: Tunables,
    ) -> Arc<Self> {
        let (chat_sender, queue) = queue::vote_queue();
        let shared = Arc::new(Shared::new(game_loop));
        let worker = VoteWorker::spawn(shared.clone(), queue);

        Arc::new(Self {
            shared,
            lifecycle: Mutex::new(Lifecycle {
                state: TriggerState::CreatingPoll,
                elapsed_in_state: 0.,
                active: Vec::new(),
                previously_active: Vec::new(),
            }),
            modifiers,
            settings,
            tunables,
            events: EventHub::default(),
            chat_sender,
            host,
            _worker: worker,
        })
    }

    /// Returns the handle chat providers feed messages into.
    pub fn chat_sender(&self) -> ChatSender {
        self.chat_sender.clone()
    }

    pub fn tunables(&self) -> Tunables {
        self.tunables.clone()
    }

    /// Subscribes to trigger notifications.
    ///
    /// Every subscriber receives every event on its own unbounded channel.
    pub fn subscribe(&self) -> Receiver<TriggerEvent> {
        self.events.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_enabled()
    }

    pub fn state(&self) -> TriggerState {
        self.lifecycle.lock().unwrap().state
    }

    pub fn current_poll(&self) -> Option<Arc<ModifierPoll>> {
        self.shared.current_poll.lock().unwrap().clone()
    }

    pub fn active_modifiers(&self) -> Vec<ActiveModifierCountdown> {
        self.lifecycle.lock().unwrap().active.clone()
    }

    /// Registers the trigger with the host and starts the round cycle.
    ///
    /// The game loop must already be running; otherwise the registration is
    /// rolled back and [`TriggerError::GameLoopNotRunning`] is returned. All
    /// transient state from a previous enable is reset.
    pub fn enable(self: &Arc<Self>) -> Result<(), TriggerError> {
        if self.shared.is_enabled() {
            info!("The poll trigger is already enabled.");
            return Ok(());
        }

        let entity: Arc<dyn GameEntity> = self.clone();
        if !self.host.register(entity.clone()) {
            return Err(TriggerError::RegistrationFailed);
        }

        if !self.shared.game_loop.is_game_loop_running() {
            self.host.unregister(&entity);
            return Err(TriggerError::GameLoopNotRunning);
        }

        *self.shared.current_poll.lock().unwrap() = None;
        self.shared.voted.lock().unwrap().clear();

        let mut lifecycle = self.lifecycle.lock().unwrap();
        lifecycle.active.clear();
        lifecycle.previously_active.clear();
        lifecycle.reset(TriggerState::CreatingPoll);
        drop(lifecycle);

        self.shared.enabled.store(true, Ordering::SeqCst);
        info!("Poll trigger enabled.");
        Ok(())
    }

    /// Unregisters the trigger and tears the current round down.
    ///
    /// If a poll is live, a final [`TriggerEvent::PollEnded`] is emitted with
    /// the truncated poll. Every still-active modifier is disabled; cached
    /// (paused) countdowns are dropped since their modifiers were already
    /// disabled when the game loop stopped.
    pub fn disable(self: &Arc<Self>) {
        if !self.shared.enabled.swap(false, Ordering::SeqCst) {
            info!("The poll trigger is already disabled.");
            return;
        }

        let entity: Arc<dyn GameEntity> = self.clone();
        self.host.unregister(&entity);

        if let Some(poll) = self.shared.current_poll.lock().unwrap().take() {
            self.events.emit(TriggerEvent::PollEnded(poll));
        }

        let mut lifecycle = self.lifecycle.lock().unwrap();
        for countdown in lifecycle.active.drain(..) {
            countdown.modifier().disable();
            self.events
                .emit(TriggerEvent::ModifierDisabled(countdown.modifier().clone()));
        }
        lifecycle.previously_active.clear();
        lifecycle.reset(TriggerState::CreatingPoll);
        drop(lifecycle);

        self.shared.voted.lock().unwrap().clear();
        info!("Poll trigger disabled.");
    }

    /// Called when the host game's simulation loop stops (pause or reset).
    ///
    /// Active modifiers are disabled and their countdowns cached with their
    /// remaining durations, so nothing drains while the game stands still.
    /// Safe to call repeatedly.
    pub fn on_game_loop_stopped(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if lifecycle.active.is_empty() {
            return;
        }

        debug!(
            "Game loop stopped; caching {} active modifiers.",
            lifecycle.active.len()
        );

        let cached = mem::take(&mut lifecycle.active);
        for countdown in &cached {
            countdown.modifier().disable();
        }
        lifecycle.previously_active.extend(cached);
    }

    /// Called when the host game's simulation loop starts again.
    ///
    /// Restores every cached modifier with its remaining duration untouched.
    /// Safe to call repeatedly.
    pub fn on_game_loop_started(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if lifecycle.previously_active.is_empty() {
            return;
        }

        debug!(
            "Game loop started; restoring {} cached modifiers.",
            lifecycle.previously_active.len()
        );

        let cached = mem::take(&mut lifecycle.previously_active);
        for countdown in &cached {
            countdown.modifier().enable();
        }
        lifecycle.active.extend(cached);
    }

    fn tick(&self, delta: f32) {
        let mut lifecycle = self.lifecycle.lock().unwrap();

        self.advance_active_modifiers(&mut lifecycle, delta);
        lifecycle.elapsed_in_state += delta;

        match lifecycle.state {
            TriggerState::CreatingPoll => self.create_poll(&mut lifecycle),
            TriggerState::CollectingVotes => self.collect_votes(&mut lifecycle),
            TriggerState::ClosingPoll => {
                if lifecycle.elapsed_in_state >= self.settings.poll_closed_time_seconds {
                    lifecycle.state = TriggerState::ExecutingWinningOption;
                    self.execute_winning_option(&mut lifecycle);
                }
            }
            // Execution normally completes within the transition above;
            // landing here means the previous tick panicked mid-execution.
            TriggerState::ExecutingWinningOption => self.execute_winning_option(&mut lifecycle),
            TriggerState::DownTimeBetweenPolls => {
                let downtime = self.settings.time_between_polls_seconds
                    * self.tunables.poll_interval_scale();
                if lifecycle.elapsed_in_state >= downtime {
                    lifecycle.reset(TriggerState::CreatingPoll);
                }
            }
        }
    }

    /// Updates every active modifier and expires countdowns that ran out.
    fn advance_active_modifiers(&self, lifecycle: &mut Lifecycle, delta: f32) {
        let events = &self.events;

        lifecycle.active.retain_mut(|countdown| {
            countdown.modifier().update(delta);

            if countdown.advance(delta) {
                let modifier = countdown.modifier().clone();
                if !modifier.disable() {
                    warn!("{} was already disabled.", modifier.display_name());
                }

                info!("{} expired.", modifier.display_name());
                events.emit(TriggerEvent::ModifierDisabled(modifier));
                false
            } else {
                true
            }
        });
    }

    fn create_poll(&self, lifecycle: &mut Lifecycle) {
        let candidates: Vec<Arc<dyn Modifier>> = self
            .modifiers
            .iter()
            .filter(|modifier| !modifier.is_enabled())
            .cloned()
            .collect();

        if candidates.is_empty() {
            // Every modifier is already active; retry next tick.
            return;
        }

        // Votes are single digits, so cap the candidate count at 9.
        let max_choices = self.settings.max_choices.clamp(1, 9);
        let chosen: Vec<Arc<dyn Modifier>> = candidates
            .choose_multiple(&mut rand::thread_rng(), max_choices)
            .cloned()
            .collect();

        let poll = Arc::new(ModifierPoll::new(chosen, self.settings.poll_time_seconds));

        self.shared.voted.lock().unwrap().clear();
        *self.shared.current_poll.lock().unwrap() = Some(poll.clone());

        info!("Poll started:\n{}", poll.summary());
        self.events.emit(TriggerEvent::PollStarted(poll));

        lifecycle.reset(TriggerState::CollectingVotes);
    }

    fn collect_votes(&self, lifecycle: &mut Lifecycle) {
        let poll = self.shared.current_poll.lock().unwrap().clone();
        let Some(poll) = poll else {
            warn!("Collecting votes without a current poll; starting over.");
            lifecycle.reset(TriggerState::CreatingPoll);
            return;
        };

        poll.set_time_remaining_seconds(
            (self.settings.poll_time_seconds - lifecycle.elapsed_in_state).max(0.),
        );

        if lifecycle.elapsed_in_state >= self.settings.poll_time_seconds {
            info!("Poll closed:\n{}", poll.summary());
            self.events.emit(TriggerEvent::PollClosed(poll));
            self.shared.voted.lock().unwrap().clear();
            lifecycle.reset(TriggerState::ClosingPoll);
        }
    }

    fn execute_winning_option(&self, lifecycle: &mut Lifecycle) {
        let poll = self.shared.current_poll.lock().unwrap().take();
        let Some(poll) = poll else {
            warn!("Executing the winning option without a current poll; starting over.");
            lifecycle.reset(TriggerState::CreatingPoll);
            return;
        };

        let Some(winner) = poll.find_winning_modifier() else {
            warn!("The poll has no winner; starting over.");
            lifecycle.reset(TriggerState::CreatingPoll);
            return;
        };
        let modifier = winner.modifier().clone();

        if !modifier.enable() {
            warn!("{} was already enabled.", modifier.display_name());
        }
        self.events
            .emit(TriggerEvent::ModifierEnabled(modifier.clone()));

        let duration = self.settings.active_duration_seconds * self.tunables.duration_scale();
        info!("{} enabled for {duration} seconds.", modifier.display_name());
        lifecycle
            .active
            .push(ActiveModifierCountdown::new(modifier, duration));

        self.events.emit(TriggerEvent::PollEnded(poll));
        lifecycle.reset(TriggerState::DownTimeBetweenPolls);
    }
}

impl GameEntity for PollTrigger {
    fn update(&self, delta: f32) {
        if !self.shared.is_enabled() {
            return;
        }

        catch_and_log("poll trigger tick", || self.tick(delta));
    }
}
