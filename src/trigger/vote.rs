//! Chat vote parsing.

/// Extracts a poll choice number from a chat message.
///
/// Only the first character after trimming whitespace is read, and it must be
/// a decimal digit: `"42 yes"` votes for choice 4, not 42. Anything else is
/// not a vote.
pub fn parse_vote(text: &str) -> Option<u8> {
    let first = text.trim().chars().next()?;
    first.to_digit(10).map(|digit| digit as u8)
}
