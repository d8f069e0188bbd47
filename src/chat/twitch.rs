//! Anonymous Twitch IRC chat client.
//!
//! Connects to Twitch chat read-only with a `justinfan` nick, so no
//! credentials are needed. Runs on its own thread and forwards every PRIVMSG
//! in the channel as a [`ChatMessage`] through the trigger's [`ChatSender`].

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use color_eyre::eyre::{self, Context};
use rand::Rng;

use super::ChatMessage;
use crate::trigger::ChatSender;

const TWITCH_IRC_ADDR: (&str, u16) = ("irc.chat.twitch.tv", 6667);

/// How long a blocking read waits before checking the stop flag.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// A running Twitch chat connection.
///
/// The connection thread reconnects with capped backoff until [`stop`] is
/// called or the handle is dropped; both join the thread.
///
/// [`stop`]: TwitchChat::stop
pub struct TwitchChat {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TwitchChat {
    /// Starts a chat connection thread for the given channel.
    pub fn connect(channel: &str, sender: ChatSender) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let channel = channel.trim_start_matches('#').to_lowercase();

        let handle = thread::Builder::new()
            .name(format!("Twitch Chat Thread (#{channel})"))
            .spawn({
                let stop = stop.clone();
                move || chat_thread(channel, sender, stop)
            })
            .unwrap();

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the connection thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TwitchChat {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn chat_thread(channel: String, sender: ChatSender, stop: Arc<AtomicBool>) {
    let mut reconnect_delay = Duration::from_secs(1);

    while !stop.load(Ordering::SeqCst) {
        match run_connection(&channel, &sender, &stop) {
            Ok(()) => {
                info!("Twitch chat connection closed, reconnecting.");
                reconnect_delay = Duration::from_secs(1);
            }
            Err(err) => {
                error!("Error in the Twitch chat connection: {err:?}");
            }
        }

        // Sleep in short slices so stop() isn't kept waiting.
        let mut remaining = reconnect_delay;
        while !stop.load(Ordering::SeqCst) && !remaining.is_zero() {
            let slice = remaining.min(Duration::from_millis(100));
            thread::sleep(slice);
            remaining -= slice;
        }

        reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

/// Runs a single connection until it drops or `stop` is set.
///
/// `Ok(())` means a graceful close (EOF, server-requested RECONNECT or a stop
/// request); the caller decides whether to reconnect.
fn run_connection(channel: &str, sender: &ChatSender, stop: &AtomicBool) -> eyre::Result<()> {
    let stream = TcpStream::connect(TWITCH_IRC_ADDR).context("error connecting to Twitch IRC")?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .context("error setting the read timeout")?;

    let mut writer = stream.try_clone().context("error cloning the TCP stream")?;
    let mut reader = BufReader::new(stream);

    let nick = format!("justinfan{}", rand::thread_rng().gen_range(10_000..100_000));

    writer
        .write_all(b"CAP REQ :twitch.tv/tags twitch.tv/commands\r\n")
        .context("error requesting capabilities")?;
    writer
        .write_all(format!("NICK {nick}\r\nJOIN #{channel}\r\n").as_bytes())
        .context("error sending NICK and JOIN")?;

    info!("Connecting to Twitch chat #{channel} as {nick}.");

    let mut line = String::new();
    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => (),
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => return Err(err).context("error reading from Twitch chat"),
        }

        if let Some(rest) = line.strip_prefix("PING") {
            let pong = format!("PONG{}\r\n", rest.trim_end_matches(['\r', '\n']));
            writer
                .write_all(pong.as_bytes())
                .context("error replying to PING")?;
            continue;
        }

        if line.contains(" RECONNECT") {
            info!("Twitch requested a reconnect.");
            return Ok(());
        }

        if let Some(message) = parse_privmsg(&line, channel) {
            trace!(
                "Chat message from {}: {}",
                message.display_name,
                message.text
            );
            sender.send(message);
        }
    }
}

/// Extracts a [`ChatMessage`] from a raw IRC line if it is a PRIVMSG for our
/// channel.
///
/// The display name and user id come from the IRCv3 tags requested via `CAP
/// REQ`; both fall back to the login name from the prefix when the tag is
/// missing or empty.
fn parse_privmsg(line: &str, channel: &str) -> Option<ChatMessage> {
    let line = line.trim_end_matches(['\r', '\n']);

    let (tags, rest) = match line.strip_prefix('@') {
        Some(rest) => {
            let (tags, rest) = rest.split_once(' ')?;
            (Some(tags), rest)
        }
        None => (None, line),
    };

    let (prefix, rest) = rest.strip_prefix(':')?.split_once(' ')?;
    let (command, rest) = rest.split_once(' ')?;
    if command != "PRIVMSG" {
        return None;
    }

    let (target, text) = rest.split_once(" :")?;
    if !target.trim_start_matches('#').eq_ignore_ascii_case(channel) {
        return None;
    }

    let login = prefix.split('!').next().unwrap_or_default();
    let tag = |key| {
        tags.and_then(|tags| tag_value(tags, key))
            .filter(|value| !value.is_empty())
    };

    Some(ChatMessage {
        display_name: tag("display-name").unwrap_or(login).to_string(),
        user_id: tag("user-id").unwrap_or(login).to_string(),
        text: text.to_string(),
    })
}

fn tag_value<'a>(tags: &'a str, key: &str) -> Option<&'a str> {
    tags.split(';').find_map(|component| {
        let (k, v) = component.split_once('=')?;
        (k == key).then_some(v)
    })
}
