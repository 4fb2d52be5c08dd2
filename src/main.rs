use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use estate_showcase::device::{CapabilitySnapshot, HostEnvironment, ResourceGate};
use estate_showcase::media::{DiskFetcher, ImageOptions, ImageResourceCache};
use estate_showcase::state::{CatalogStore, PreferenceLibrary};
use estate_showcase::telemetry::PerformanceMonitor;
use estate_showcase::ui::SwipeDeck;
use estate_showcase::{Result, ShowcaseConfig};

/// Name of the gated hero scene
const HERO_SCENE: &str = "hero";

#[derive(Parser, Debug)]
#[command(name = "estate-showcase")]
#[command(version, about, long_about = None)]
struct Args {
    /// Listings JSON file (defaults to the built-in catalog)
    listings: Option<PathBuf>,

    /// Directory holding listing photos to preload
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Initial search query
    #[arg(long)]
    query: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "showcase session failed");
        std::process::exit(1);
    }
}

/// One headless session: load state, derive the view, drive the deck and
/// the hero gate for a moment and report what a host would render.
async fn run() -> Result<()> {
    let started = Instant::now();
    let args = Args::parse();
    let mut monitor = PerformanceMonitor::new();
    monitor.mark_start("startup", started.elapsed());

    let config = ShowcaseConfig::load(&ShowcaseConfig::default_path()?)?;

    let library = PreferenceLibrary::new()?;
    let mut preferences = library.load()?;

    let snapshot = CapabilitySnapshot::probe(&HostEnvironment::from_system());
    info!(
        cores = snapshot.hardware_cores(),
        connection = snapshot.connection_type().as_str(),
        low_end = snapshot.is_low_end_device(),
        "device probed"
    );
    if library.performance_mode()?.unwrap_or(false) {
        preferences.optimize_for_device(&snapshot);
    }

    let mut catalog = match &args.listings {
        Some(path) => CatalogStore::from_json(&std::fs::read_to_string(path)?, config.catalog.clone())?,
        None => CatalogStore::with_seed(config.catalog.clone()),
    };
    catalog.set_view_mode(preferences.visual.default_view_mode);
    if let Some(query) = &args.query {
        catalog.set_filter_raw("query", query);
    }

    let view = catalog.derived_view();
    let stats = catalog.statistics();
    info!(
        total = catalog.listings().len(),
        shown = stats.total_count,
        average_price = stats.average_price,
        "catalog ready"
    );

    // Swipe deck over the derived view
    let mut deck = SwipeDeck::new(view, config.deck.clone());
    for card in deck.stack() {
        info!(id = card.id, title = %card.title, price = card.price, "deck card");
    }

    // Hero scene gate
    let mut hero = ResourceGate::new(
        HERO_SCENE,
        snapshot.clone(),
        preferences.performance.autoload_scenes,
        preferences.scene_enabled(HERO_SCENE),
        &config.gate,
    );
    let permission = hero.evaluate(started.elapsed());
    hero.set_visible(true, started.elapsed());
    info!(?permission, presentation = ?hero.presentation(), "hero gate evaluated");

    // Photo URLs and preloading
    let assets = args.assets.clone().unwrap_or_else(|| PathBuf::from("."));
    let images = ImageResourceCache::new(Arc::new(DiskFetcher::new(assets)));
    let options = ImageOptions::deck().for_device(&snapshot);
    let urls: Vec<String> = deck
        .view()
        .iter()
        .map(|listing| images.urls(&listing.image, &options).base.clone())
        .collect();

    let preload = args.assets.is_some() && preferences.should_preload_images(&snapshot);
    if preload {
        let results = images
            .preload_sequence(&urls, deck.pointer(), config.deck.visible_cards)
            .await;
        let loaded = results.iter().filter(|(_, outcome)| outcome.is_loaded()).count();
        info!(loaded, requested = results.len(), "deck photos preloaded");
    }

    // Without a real asset there is nothing to signal a load, so let one
    // commit play out and stop there.
    deck.on_gesture_end(-180.0, 0.0, started.elapsed());
    while let Some(due) = deck.next_deadline() {
        tokio::time::sleep_until(started + due).await;
        if deck.tick(started.elapsed()) && preload {
            monitor.mark_start("swipe-preload", started.elapsed());
            if let Some((url, outcome)) = deck.prefetch(&images, &options).await {
                info!(url = %url, loaded = outcome.is_loaded(), "next card photo preloaded");
            }
            monitor.mark_end("swipe-preload", started.elapsed());
        }
    }
    if let Some(card) = deck.current() {
        info!(id = card.id, title = %card.title, "deck advanced");
    }

    hero.tick(started.elapsed());
    if let Err(e) = library.save(&preferences) {
        warn!(error = %e, "could not save preferences");
    }

    monitor.update_cache_stats(images.stats());
    monitor.mark_end("startup", started.elapsed());
    info!(score = monitor.score(), cache_hit_rate = images.stats().hit_rate(), "session complete");

    deck.dispose();
    hero.dispose();
    Ok(())
}
