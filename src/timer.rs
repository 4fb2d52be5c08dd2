/// Generation-tagged timers for the deck and gate state machines
///
/// State machines never own real timers. They schedule entries here with the
/// session-relative time at which they become due, and the host calls `tick`
/// with the current time. Every entry carries a `Token`; when the owner moves
/// on (new commit, terminal transition, reset) it bumps its `Generation`, so an
/// entry scheduled for an earlier generation can never act on newer state.

use std::time::Duration;

/// Identifies the generation a timer entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// Raw counter value (useful for logging)
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic counter handing out tokens
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: u64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its token.
    /// Every previously issued token becomes stale.
    pub fn bump(&mut self) -> Token {
        self.current += 1;
        Token(self.current)
    }

    /// Token of the current generation
    pub fn current(&self) -> Token {
        Token(self.current)
    }

    pub fn is_current(&self, token: Token) -> bool {
        token.0 == self.current
    }
}

/// A pending timer entry
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled<E> {
    pub due: Duration,
    pub token: Token,
    pub event: E,
}

/// Small ordered queue of pending timer entries
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    entries: Vec<Scheduled<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire at `due`
    pub fn schedule(&mut self, due: Duration, token: Token, event: E) {
        // Keep entries ordered by due time; equal times keep insertion order
        let at = self.entries.partition_point(|entry| entry.due <= due);
        self.entries.insert(at, Scheduled { due, token, event });
    }

    /// Drop every entry scheduled under `token`
    pub fn cancel(&mut self, token: Token) {
        self.entries.retain(|entry| entry.token != token);
    }

    /// Drop every pending entry
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Remove and return all entries due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: Duration) -> Vec<Scheduled<E>> {
        let split = self.entries.partition_point(|entry| entry.due <= now);
        self.entries.drain(..split).collect()
    }

    /// Earliest pending due time, if any
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.first().map(|entry| entry.due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shorthand for building session-relative times in milliseconds
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
