//! Chat-voted gameplay modifier framework for 2D platformers.
//!
//! The crate is built to be loaded into the host game's process. Chat viewers
//! vote on which gameplay modifier gets enabled next; a poll runs every
//! couple of seconds, the winning modifier stays active for a limited time,
//! and the cycle repeats. The host game is reached only through the traits in
//! [`host`], so everything here runs (and is tested) without the game.

#[macro_use]
extern crate tracing;

pub mod chat;
pub mod config;
pub mod host;
pub mod logging;
pub mod modifiers;
pub mod trigger;
pub mod utils;
