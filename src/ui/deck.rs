/// Swipe deck: card-stack presentation of the derived catalog view
///
/// The deck keeps a pointer into the view instead of rotating the view itself.
/// A committed swipe marks the top card as leaving, advances the pointer
/// mid-flight and clears the leaving card once the fly-out has settled. Both
/// deferred steps carry the commit's token, so a timer left over from an
/// earlier commit or an earlier view can never touch the current state.

use std::time::Duration;
use tracing::debug;

use crate::config::DeckConfig;
use crate::media::{ImageOptions, ImageResourceCache, PreloadOutcome, Priority};
use crate::state::catalog::DerivedView;
use crate::state::data::Listing;
use crate::timer::{Generation, Token, TimerQueue};

/// Exit direction of a swiped card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// +1 for right, -1 for left
    pub fn sign(self) -> i8 {
        match self {
            SwipeDirection::Left => -1,
            SwipeDirection::Right => 1,
        }
    }

    /// Direction of a drag. A zero offset falls back to the velocity sign.
    fn of_gesture(offset_px: f64, velocity_px_s: f64) -> Self {
        let lean = if offset_px != 0.0 { offset_px } else { velocity_px_s };
        if lean > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    }
}

/// The card currently flying off the stack
#[derive(Debug, Clone, PartialEq)]
pub struct LeavingCard {
    pub listing: Listing,
    pub direction: SwipeDirection,
    pub token: Token,
}

/// Result of a drag release or nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Committed(SwipeDirection),
    /// Below both thresholds; the card snaps back
    Cancelled,
    /// A previous commit is still animating
    Ignored,
    /// Nothing to swipe
    Empty,
}

/// Keyboard input understood by the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckKey {
    Left,
    Right,
    Enter,
    Space,
}

/// Result of a key press
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Gesture(GestureOutcome),
    /// Open the detail view for this listing
    Select(Listing),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeckTimer {
    Advance,
    Clear,
}

/// Gesture-driven card stack over one derived view
pub struct SwipeDeck {
    view: DerivedView,
    pointer: usize,
    leaving: Option<LeavingCard>,
    busy: bool,
    config: DeckConfig,
    generation: Generation,
    timers: TimerQueue<DeckTimer>,
}

impl SwipeDeck {
    pub fn new(view: DerivedView, config: DeckConfig) -> Self {
        Self {
            view,
            pointer: 0,
            leaving: None,
            busy: false,
            config,
            generation: Generation::new(),
            timers: TimerQueue::new(),
        }
    }

    pub fn view(&self) -> &DerivedView {
        &self.view
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn leaving(&self) -> Option<&LeavingCard> {
        self.leaving.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Top card of the stack
    pub fn current(&self) -> Option<&Listing> {
        self.view.get(self.pointer)
    }

    /// Up to `n` cards starting at the pointer, wrapping around the view.
    /// Never repeats a card, so a view shorter than `n` yields `len` cards.
    pub fn visible_window(&self, n: usize) -> Vec<&Listing> {
        let len = self.len();
        (0..n.min(len))
            .map(|offset| &self.view[(self.pointer + offset) % len])
            .collect()
    }

    /// The configured stack depth
    pub fn stack(&self) -> Vec<&Listing> {
        self.visible_window(self.config.visible_cards)
    }

    /// The card just below the rendered stack, worth preloading now
    pub fn prefetch_target(&self) -> Option<&Listing> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.view.get((self.pointer + self.config.visible_cards) % len)
    }

    /// Base photo URL of the prefetch target
    pub fn prefetch_url(&self, cache: &ImageResourceCache, options: &ImageOptions) -> Option<String> {
        let listing = self.prefetch_target()?;
        Some(cache.urls(&listing.image, options).base.clone())
    }

    /// Preload the prefetch target's photo at low priority.
    /// Call after every pointer change; repeated calls for a loaded photo
    /// never reach the fetcher.
    pub async fn prefetch(
        &self,
        cache: &ImageResourceCache,
        options: &ImageOptions,
    ) -> Option<(String, PreloadOutcome)> {
        let url = self.prefetch_url(cache, options)?;
        let outcome = cache.preload(&url, Priority::Low).await;
        debug!(url = %url, loaded = outcome.is_loaded(), "deck prefetch");
        Some((url, outcome))
    }

    // ========== Input ==========

    /// Drag released with the given horizontal offset and velocity.
    /// Commits when either exceeds its threshold.
    pub fn on_gesture_end(&mut self, offset_px: f64, velocity_px_s: f64, now: Duration) -> GestureOutcome {
        if self.is_empty() {
            return GestureOutcome::Empty;
        }

        let fling = offset_px.abs() > self.config.commit_distance_px
            || velocity_px_s.abs() > self.config.commit_velocity_px_s;
        if !fling {
            return GestureOutcome::Cancelled;
        }

        self.commit(SwipeDirection::of_gesture(offset_px, velocity_px_s), now)
    }

    /// Programmatic swipe, subject to the same busy guard as a drag
    pub fn on_keyboard_nudge(&mut self, direction: SwipeDirection, now: Duration) -> GestureOutcome {
        if self.is_empty() {
            return GestureOutcome::Empty;
        }
        self.commit(direction, now)
    }

    /// Arrow keys swipe; Enter/Space select the top card
    pub fn on_key(&mut self, key: DeckKey, now: Duration) -> KeyOutcome {
        match key {
            DeckKey::Left => KeyOutcome::Gesture(self.on_keyboard_nudge(SwipeDirection::Left, now)),
            DeckKey::Right => KeyOutcome::Gesture(self.on_keyboard_nudge(SwipeDirection::Right, now)),
            DeckKey::Enter | DeckKey::Space => match self.current() {
                Some(listing) => KeyOutcome::Select(listing.clone()),
                None => KeyOutcome::None,
            },
        }
    }

    fn commit(&mut self, direction: SwipeDirection, now: Duration) -> GestureOutcome {
        if self.busy {
            debug!("swipe ignored, previous commit still animating");
            return GestureOutcome::Ignored;
        }

        let Some(top) = self.current().cloned() else {
            return GestureOutcome::Empty;
        };

        let token = self.generation.bump();
        debug!(listing = top.id, direction = direction.sign(), token = token.value(), "swipe committed");

        self.busy = true;
        self.leaving = Some(LeavingCard { listing: top, direction, token });
        self.timers.schedule(
            now + Duration::from_millis(self.config.advance_delay_ms()),
            token,
            DeckTimer::Advance,
        );
        self.timers.schedule(
            now + Duration::from_millis(self.config.clear_delay_ms()),
            token,
            DeckTimer::Clear,
        );

        GestureOutcome::Committed(direction)
    }

    // ========== View changes ==========

    /// The upstream view was re-derived: start over on the new view
    pub fn on_filter_changed(&mut self, view: DerivedView) {
        self.view = view;
        self.pointer = 0;
        self.leaving = None;
        self.busy = false;
        self.timers.cancel_all();
        self.generation.bump();
        debug!(len = self.view.len(), "deck reset for new view");
    }

    /// Reset only if `view` is a different derivation. Returns true on reset.
    pub fn sync_view(&mut self, view: &DerivedView) -> bool {
        if std::sync::Arc::ptr_eq(&self.view, view) {
            return false;
        }
        self.on_filter_changed(view.clone());
        true
    }

    // ========== Timers ==========

    /// Fire due timers. Returns true if the pointer moved.
    pub fn tick(&mut self, now: Duration) -> bool {
        let before = self.pointer;
        for entry in self.timers.drain_due(now) {
            if !self.generation.is_current(entry.token) {
                continue;
            }
            match entry.event {
                DeckTimer::Advance => {
                    let len = self.len();
                    if len > 0 {
                        self.pointer = (self.pointer + 1) % len;
                    }
                }
                DeckTimer::Clear => {
                    if self.leaving.as_ref().is_some_and(|l| l.token == entry.token) {
                        self.leaving = None;
                        self.busy = false;
                    }
                }
            }
        }
        self.pointer != before
    }

    /// When the host should call `tick` next
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Tear the deck down, cancelling pending timers
    pub fn dispose(mut self) {
        self.timers.cancel_all();
    }
}

impl std::fmt::Debug for SwipeDeck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwipeDeck")
            .field("len", &self.view.len())
            .field("pointer", &self.pointer)
            .field("leaving", &self.leaving.as_ref().map(|l| l.listing.id))
            .field("busy", &self.busy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::seed_listings;
    use crate::media::{FetchError, ImageFetcher};
    use crate::timer::ms;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Remembers every URL it was asked for
    #[derive(Default)]
    struct RecordingFetcher {
        requested: Mutex<Vec<(String, Priority)>>,
    }

    #[async_trait]
    impl ImageFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, priority: Priority) -> Result<(), FetchError> {
            self.requested.lock().unwrap().push((url.to_string(), priority));
            Ok(())
        }
    }

    fn deck_of(n: usize) -> SwipeDeck {
        let view: DerivedView = seed_listings().iter().take(n).cloned().collect::<Vec<_>>().into();
        SwipeDeck::new(view, DeckConfig::default())
    }

    fn ids(cards: &[&Listing]) -> Vec<u32> {
        cards.iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_window_wraps_around() {
        let mut deck = deck_of(4);
        deck.on_keyboard_nudge(SwipeDirection::Right, ms(0));
        deck.tick(ms(500));
        deck.on_keyboard_nudge(SwipeDirection::Right, ms(500));
        deck.tick(ms(1_000));
        deck.on_keyboard_nudge(SwipeDirection::Right, ms(1_000));
        deck.tick(ms(1_500));
        assert_eq!(deck.pointer(), 3);
        assert_eq!(ids(&deck.visible_window(3)), vec![4, 1, 2]);
    }

    #[test]
    fn test_window_shorter_than_requested() {
        let deck = deck_of(2);
        assert_eq!(ids(&deck.visible_window(3)), vec![1, 2]);
        assert!(deck_of(0).visible_window(3).is_empty());
    }

    #[test]
    fn test_thresholds() {
        let mut deck = deck_of(3);
        assert_eq!(deck.on_gesture_end(110.0, 620.0, ms(0)), GestureOutcome::Cancelled);
        assert_eq!(deck.on_gesture_end(-40.0, -900.0, ms(0)), GestureOutcome::Committed(SwipeDirection::Left));
    }

    #[test]
    fn test_commit_lifecycle() {
        let mut deck = deck_of(3);
        assert_eq!(
            deck.on_gesture_end(150.0, 0.0, ms(0)),
            GestureOutcome::Committed(SwipeDirection::Right)
        );
        assert!(deck.is_busy());
        assert_eq!(deck.leaving().map(|l| l.listing.id), Some(1));

        deck.tick(ms(190));
        assert_eq!(deck.pointer(), 1);
        assert!(deck.leaving().is_some());

        deck.tick(ms(460));
        assert!(deck.leaving().is_none());
        assert!(!deck.is_busy());
        assert_eq!(deck.next_deadline(), None);
    }

    #[test]
    fn test_no_double_commit() {
        let mut deck = deck_of(3);
        deck.on_gesture_end(200.0, 0.0, ms(0));
        assert_eq!(deck.on_gesture_end(200.0, 0.0, ms(50)), GestureOutcome::Ignored);
        assert_eq!(deck.on_keyboard_nudge(SwipeDirection::Left, ms(60)), GestureOutcome::Ignored);
        deck.tick(ms(1_000));
        assert_eq!(deck.pointer(), 1);
    }

    #[test]
    fn test_single_card_cycles_to_itself() {
        let mut deck = deck_of(1);
        deck.on_gesture_end(-300.0, 0.0, ms(0));
        deck.tick(ms(460));
        assert_eq!(deck.pointer(), 0);
        assert_eq!(deck.current().map(|l| l.id), Some(1));
    }

    #[test]
    fn test_empty_deck_is_inert() {
        let mut deck = deck_of(0);
        assert_eq!(deck.on_gesture_end(500.0, 0.0, ms(0)), GestureOutcome::Empty);
        assert_eq!(deck.on_key(DeckKey::Enter, ms(0)), KeyOutcome::None);
        assert_eq!(deck.on_key(DeckKey::Right, ms(0)), KeyOutcome::Gesture(GestureOutcome::Empty));
        deck.tick(ms(1_000));
        assert!(deck.current().is_none());
        assert!(deck.prefetch_target().is_none());
    }

    #[test]
    fn test_filter_change_discards_pending_timers() {
        let mut deck = deck_of(5);
        deck.on_gesture_end(200.0, 0.0, ms(0));

        let narrower: DerivedView = seed_listings().iter().skip(3).cloned().collect::<Vec<_>>().into();
        deck.on_filter_changed(narrower);
        assert!(!deck.is_busy());
        assert!(deck.leaving().is_none());

        // The old commit's advance must not move the new pointer
        deck.tick(ms(1_000));
        assert_eq!(deck.pointer(), 0);
        assert_eq!(deck.current().map(|l| l.id), Some(4));
    }

    #[test]
    fn test_sync_view_resets_only_on_new_identity() {
        let view: DerivedView = seed_listings();
        let mut deck = SwipeDeck::new(Arc::clone(&view), DeckConfig::default());
        deck.on_keyboard_nudge(SwipeDirection::Right, ms(0));
        deck.tick(ms(500));
        assert!(!deck.sync_view(&view));
        assert_eq!(deck.pointer(), 1);

        let copy: DerivedView = view.to_vec().into();
        assert!(deck.sync_view(&copy));
        assert_eq!(deck.pointer(), 0);
    }

    #[test]
    fn test_enter_selects_top_card() {
        let mut deck = deck_of(3);
        match deck.on_key(DeckKey::Space, ms(0)) {
            KeyOutcome::Select(listing) => assert_eq!(listing.id, 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_prefetch_target_is_below_stack() {
        let deck = deck_of(5);
        assert_eq!(deck.prefetch_target().map(|l| l.id), Some(4));
        let short = deck_of(2);
        assert_eq!(short.prefetch_target().map(|l| l.id), Some(2));
    }

    #[tokio::test]
    async fn test_advance_prefetches_card_below_stack() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let cache = ImageResourceCache::new(fetcher.clone());
        let options = ImageOptions::deck();
        let mut deck = deck_of(6);

        deck.on_gesture_end(-200.0, 0.0, ms(0));
        assert!(!deck.tick(ms(100)));
        assert!(deck.tick(ms(190)));
        assert_eq!(deck.pointer(), 1);

        let expected = cache.urls(&deck.view()[4].image, &options).base.clone();
        let (url, outcome) = deck.prefetch(&cache, &options).await.unwrap();
        assert_eq!(url, expected);
        assert!(outcome.is_loaded());

        // Clearing the leaving card does not move the pointer
        assert!(!deck.tick(ms(460)));
        deck.prefetch(&cache, &options).await;

        let requested = fetcher.requested.lock().unwrap().clone();
        assert_eq!(requested, vec![(expected, Priority::Low)]);
    }

    #[tokio::test]
    async fn test_empty_deck_prefetches_nothing() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let cache = ImageResourceCache::new(fetcher.clone());
        assert!(deck_of(0).prefetch(&cache, &ImageOptions::deck()).await.is_none());
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }
}
