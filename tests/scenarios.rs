//! End-to-end flows across the catalog, deck, gate and preference store.

use std::sync::Arc;

use estate_showcase::config::{CatalogConfig, DeckConfig, GateConfig};
use estate_showcase::device::{
    CapabilitySnapshot, FailureReason, GatePhase, GatePresentation, HostEnvironment, Permission,
    ResourceGate,
};
use estate_showcase::state::{
    seed_listings, CatalogStore, Category, DerivedView, Listing, PreferenceLibrary,
};
use estate_showcase::timer::ms;
use estate_showcase::ui::{GestureOutcome, SwipeDeck, SwipeDirection};

fn seed_store() -> CatalogStore {
    CatalogStore::with_seed(CatalogConfig::default())
}

fn capable_device() -> CapabilitySnapshot {
    CapabilitySnapshot::probe(&HostEnvironment::default())
}

#[test]
fn test_category_filter_keeps_seed_order() {
    let mut store = seed_store();
    assert!(store.set_filter_raw("category", "Villa"));

    let view = store.derived_view();
    let expected: Vec<u32> = seed_listings()
        .iter()
        .filter(|l| l.category == Category::Villa)
        .map(|l| l.id)
        .collect();

    assert_eq!(expected.len(), 2);
    assert_eq!(view.iter().map(|l| l.id).collect::<Vec<_>>(), expected);
}

#[test]
fn test_price_ascending_is_sorted_permutation() {
    let mut store = seed_store();
    assert!(store.set_filter_raw("sort", "price-asc"));

    let view = store.derived_view();
    let prices: Vec<u64> = view.iter().map(|l| l.price).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));

    let mut seed_prices: Vec<u64> = seed_listings().iter().map(|l| l.price).collect();
    let mut sorted = prices.clone();
    seed_prices.sort_unstable();
    sorted.sort_unstable();
    assert_eq!(sorted, seed_prices);
}

#[test]
fn test_committed_swipe_settles_on_next_card() {
    let three: Vec<Listing> = seed_listings().iter().take(3).cloned().collect();
    let view: DerivedView = Arc::from(three);
    let mut deck = SwipeDeck::new(view, DeckConfig::default());

    assert_eq!(
        deck.on_gesture_end(150.0, 0.0, ms(0)),
        GestureOutcome::Committed(SwipeDirection::Right)
    );
    assert!(deck.is_busy());

    deck.tick(ms(460));
    assert_eq!(deck.pointer(), 1);
    assert!(deck.leaving().is_none());
    assert!(!deck.is_busy());
}

#[test]
fn test_reduced_motion_denied_until_override() {
    let snapshot = CapabilitySnapshot::probe(&HostEnvironment {
        prefers_reduced_motion: true,
        ..HostEnvironment::default()
    });
    let mut gate = ResourceGate::new("hero", snapshot, true, false, &GateConfig::default());

    assert_eq!(gate.evaluate(ms(0)), Permission::Denied);
    assert_eq!(gate.presentation(), GatePresentation::OptIn);

    assert_eq!(gate.enable_override(ms(5)), Permission::Allowed);
    assert_eq!(gate.phase(), &GatePhase::Preparing);
}

#[test]
fn test_silent_mount_times_out() {
    let mut gate = ResourceGate::new("hero", capable_device(), true, false, &GateConfig::default());
    gate.evaluate(ms(0));
    gate.set_visible(true, ms(0));
    assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(0) });

    assert!(!gate.tick(ms(11_999)));
    assert!(gate.tick(ms(12_001)));
    assert_eq!(gate.phase(), &GatePhase::Failed(FailureReason::Timeout));
    assert_eq!(gate.presentation(), GatePresentation::StaticFallback);

    // A load arriving after the timeout changes nothing
    assert!(!gate.on_loaded());
}

#[test]
fn test_filter_change_mid_swipe_resets_deck() {
    let mut store = seed_store();
    let mut deck = SwipeDeck::new(store.derived_view(), DeckConfig::default());

    deck.on_gesture_end(-200.0, 0.0, ms(0));
    deck.tick(ms(190));
    assert_eq!(deck.pointer(), 1);

    store.set_filter_raw("category", "Villa");
    assert!(deck.sync_view(&store.derived_view()));
    assert_eq!(deck.pointer(), 0);
    assert!(!deck.is_busy());

    // Timers from the old view are stale
    deck.tick(ms(1_000));
    assert_eq!(deck.pointer(), 0);
    assert_eq!(deck.len(), 2);

    // Same criteria, same view: no reset
    assert!(!deck.sync_view(&store.derived_view()));
}

#[test]
fn test_scene_opt_in_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("showcase.db");

    {
        let library = PreferenceLibrary::open(&path).unwrap();
        let mut prefs = library.load().unwrap();
        prefs.enable_scene("hero");
        library.save(&prefs).unwrap();
    }

    let library = PreferenceLibrary::open(&path).unwrap();
    let prefs = library.load().unwrap();
    let snapshot = CapabilitySnapshot::probe(&HostEnvironment {
        prefers_reduced_motion: true,
        ..HostEnvironment::default()
    });
    let mut gate = ResourceGate::new(
        "hero",
        snapshot,
        prefs.performance.autoload_scenes,
        prefs.scene_enabled("hero"),
        &GateConfig::default(),
    );
    assert_eq!(gate.evaluate(ms(0)), Permission::Allowed);
}
