//! Boundary traits for the host game.
//!
//! The mod reaches the game exclusively through these traits. Their
//! implementations live in the host-specific glue that performs the actual
//! method interception; nothing in this crate links against the game. Tests
//! and the `poll-sim` binary provide in-process implementations instead.

use std::sync::Arc;

/// An object the host game updates once per frame.
///
/// `update` is called on the game's main thread with the elapsed time since
/// the previous frame, in seconds. `draw` is called afterwards in the same
/// frame; entities without a visual representation keep the default no-op.
pub trait GameEntity: Send + Sync {
    fn update(&self, delta: f32);

    fn draw(&self) {}
}

/// Registration surface of the host game's entity list.
///
/// `register` returns `false` when the host cannot accept the entity (for
/// example because its entity list is not set up yet). `unregister` compares
/// by allocation ([`Arc::ptr_eq`]) and returns `false` for an entity that was
/// not registered; both must be safe to call from any thread.
pub trait EntityHost: Send + Sync {
    fn register(&self, entity: Arc<dyn GameEntity>) -> bool;

    fn unregister(&self, entity: &Arc<dyn GameEntity>) -> bool;
}

/// Tells whether the host game's simulation loop is currently advancing.
///
/// The predicate flips to `false` when the player pauses or resets and back
/// to `true` when the simulation resumes. Host glue that implements it must
/// also forward the corresponding transitions to
/// [`PollTrigger::on_game_loop_started`] and
/// [`PollTrigger::on_game_loop_stopped`] on the game's main thread, and must
/// stop ticking registered entities while the loop is stopped.
///
/// [`PollTrigger::on_game_loop_started`]: crate::trigger::PollTrigger::on_game_loop_started
/// [`PollTrigger::on_game_loop_stopped`]: crate::trigger::PollTrigger::on_game_loop_stopped
pub trait GameLoopObserver: Send + Sync {
    fn is_game_loop_running(&self) -> bool;
}
