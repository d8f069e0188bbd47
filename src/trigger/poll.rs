//! One poll round: candidate options, vote tallies and winner resolution.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use itertools::Itertools;
use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;

use crate::modifiers::Modifier;

/// One candidate modifier in a poll.
pub struct PollOption {
    /// 1-based choice number, the parse target of chat votes. Stable for the
    /// lifetime of the poll.
    choice_number: u8,
    modifier: Arc<dyn Modifier>,
    count: AtomicU32,
}

impl PollOption {
    pub fn choice_number(&self) -> u8 {
        self.choice_number
    }

    pub fn modifier(&self) -> &Arc<dyn Modifier> {
        &self.modifier
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Adds one vote.
    ///
    /// Called from the vote worker thread; the tally is the only option field
    /// that mutates after construction, hence the atomic.
    pub(crate) fn record_vote(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for PollOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollOption")
            .field("choice_number", &self.choice_number)
            .field("modifier", &self.modifier.display_name())
            .field("count", &self.count())
            .finish()
    }
}

/// A single poll round.
///
/// The candidate set is fixed at creation; tallies mutate while votes are
/// collected; the winner is computed once and cached. A poll is never reused
/// for another round.
pub struct ModifierPoll {
    options: Vec<PollOption>,
    time_remaining_seconds: Mutex<f32>,
    /// Cached winner index. `Some(None)` means "resolved, no winner".
    winner: OnceCell<Option<usize>>,
}

impl ModifierPoll {
    /// Creates a poll with the given candidates, numbered 1 upwards in order.
    pub fn new(candidates: Vec<Arc<dyn Modifier>>, poll_time_seconds: f32) -> Self {
        let options = candidates
            .into_iter()
            .zip(1..)
            .map(|(modifier, choice_number)| PollOption {
                choice_number,
                modifier,
                count: AtomicU32::new(0),
            })
            .collect();

        Self {
            options,
            time_remaining_seconds: Mutex::new(poll_time_seconds),
            winner: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    /// Returns the option with the given choice number, if any.
    pub fn option(&self, choice_number: u8) -> Option<&PollOption> {
        // Choice numbers are 1-based and contiguous by construction.
        (choice_number >= 1)
            .then(|| self.options.get(usize::from(choice_number) - 1))
            .flatten()
    }

    /// Seconds left in the vote collection window, for UI display.
    pub fn time_remaining_seconds(&self) -> f32 {
        *self.time_remaining_seconds.lock().unwrap()
    }

    pub(crate) fn set_time_remaining_seconds(&self, seconds: f32) {
        *self.time_remaining_seconds.lock().unwrap() = seconds;
    }

    /// Resolves the winning option.
    ///
    /// The option with the highest tally wins; ties are broken uniformly at
    /// random among the tied options. The result is computed once and cached:
    /// subsequent calls return the same option even if tallies have moved
    /// since (late votes from the ingestion queue may still land after the
    /// poll closes).
    pub fn find_winning_modifier(&self) -> Option<&PollOption> {
        let index = self.winner.get_or_init(|| {
            let max = self.options.iter().map(PollOption::count).max()?;
            let tied: Vec<usize> = self
                .options
                .iter()
                .enumerate()
                .filter(|(_, option)| option.count() == max)
                .map(|(index, _)| index)
                .collect();

            tied.choose(&mut rand::thread_rng()).copied()
        });

        index.map(|index| &self.options[index])
    }

    /// One line per option, for notifications and logs.
    pub fn summary(&self) -> String {
        self.options
            .iter()
            .map(|option| {
                format!(
                    "{}. {} ({} votes)",
                    option.choice_number,
                    option.modifier.display_name(),
                    option.count()
                )
            })
            .join("\n")
    }
}

impl fmt::Debug for ModifierPoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierPoll")
            .field("options", &self.options)
            .field("time_remaining_seconds", &self.time_remaining_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use expect_test::expect;

    use super::*;

    struct Flag {
        name: &'static str,
        enabled: AtomicBool,
    }

    impl Flag {
        fn new(name: &'static str) -> Arc<dyn Modifier> {
            Arc::new(Self {
                name,
                enabled: AtomicBool::new(false),
            })
        }
    }

    impl Modifier for Flag {
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

    fn poll_of(names: &[&'static str]) -> ModifierPoll {
        ModifierPoll::new(names.iter().map(|name| Flag::new(name)).collect(), 20.)
    }

    #[test]
    fn choice_numbers_are_one_based_and_stable() {
        let poll = poll_of(&["Wind", "Low gravity", "Screen flip"]);

        assert_eq!(poll.option(1).unwrap().modifier().display_name(), "Wind");
        assert_eq!(
            poll.option(3).unwrap().modifier().display_name(),
            "Screen flip"
        );
        assert!(poll.option(0).is_none());
        assert!(poll.option(4).is_none());
    }

    #[test]
    fn winner_is_max_tally() {
        let poll = poll_of(&["Wind", "Low gravity", "Screen flip"]);

        poll.option(2).unwrap().record_vote();
        poll.option(2).unwrap().record_vote();
        poll.option(1).unwrap().record_vote();

        let winner = poll.find_winning_modifier().unwrap();
        assert_eq!(winner.choice_number(), 2);
    }

    #[test]
    fn winner_is_cached_across_late_votes() {
        let poll = poll_of(&["Wind", "Low gravity"]);

        poll.option(1).unwrap().record_vote();

        let first = poll.find_winning_modifier().unwrap();
        assert_eq!(first.choice_number(), 1);

        // A vote landing after resolution must not renegotiate the winner.
        poll.option(2).unwrap().record_vote();
        poll.option(2).unwrap().record_vote();

        let second = poll.find_winning_modifier().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn tie_break_picks_a_tied_option() {
        for _ in 0..20 {
            let poll = poll_of(&["Wind", "Low gravity", "Screen flip"]);

            poll.option(1).unwrap().record_vote();
            poll.option(3).unwrap().record_vote();

            let winner = poll.find_winning_modifier().unwrap();
            assert_ne!(winner.choice_number(), 2);
            assert_eq!(winner.count(), 1);
        }
    }

    #[test]
    fn no_options_no_winner() {
        let poll = ModifierPoll::new(Vec::new(), 20.);
        assert!(poll.find_winning_modifier().is_none());
    }

    #[test]
    fn summary_lists_options_with_tallies() {
        let poll = poll_of(&["Strong wind", "Low gravity", "Bouncy floors"]);
        poll.option(2).unwrap().record_vote();
        poll.option(2).unwrap().record_vote();
        poll.option(3).unwrap().record_vote();

        expect![[r#"
            1. Strong wind (0 votes)
            2. Low gravity (2 votes)
            3. Bouncy floors (1 votes)"#]]
        .assert_eq(&poll.summary());
    }
}
