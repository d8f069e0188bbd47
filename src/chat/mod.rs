//! The chat provider boundary.
//!
//! Chat providers deliver [`ChatMessage`]s from whatever thread their network
//! code runs on; the rest of the crate only ever sees this type. A concrete
//! Twitch client lives in [`twitch`]; other providers plug in the same way by
//! feeding a [`ChatSender`].
//!
//! [`ChatSender`]: crate::trigger::ChatSender

pub mod twitch;

/// A single chat message as delivered by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Name to show in notifications.
    pub display_name: String,
    /// Stable per-user identifier, used for one-vote-per-round enforcement.
    pub user_id: String,
    /// The message text.
    pub text: String,
}
