//! The gameplay modifier capability.
//!
//! A modifier is a toggleable gameplay effect: strong wind, low gravity, a
//! flipped screen and so on. The concrete effects live in the host-specific
//! glue; this crate only turns them on and off through this trait. The one
//! exception is [`meta`], which ships modifiers that tweak the poll trigger
//! itself.

pub mod meta;

/// A toggleable gameplay effect.
///
/// Implementations must be callable from the game's main thread every frame
/// and must never panic from `enable` or `disable`.
pub trait Modifier: Send + Sync {
    /// Returns the name shown in poll options and notifications.
    fn display_name(&self) -> &str;

    /// Turns the modifier on.
    ///
    /// Returns `false` if the modifier was already enabled. Implementations
    /// should log in that case rather than treat it as an error.
    fn enable(&self) -> bool;

    /// Turns the modifier off.
    ///
    /// Returns `false` if the modifier was already disabled.
    fn disable(&self) -> bool;

    /// Returns `true` if the modifier is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Called once per frame while the modifier is active.
    fn update(&self, _delta: f32) {}
}
