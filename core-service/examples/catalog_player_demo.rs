//! Browse the catalog and play a track on a headless element.
//!
//! Expects a catalog API at `CPC_API_BASE_URL` (default
//! `http://localhost:4000`).
//!
//! Run with:
//! ```bash
//! cargo run --example catalog_player_demo
//!
//! # JSON logs, one genre
//! cargo run --example catalog_player_demo -- json 3
//! ```

use anyhow::Context;
use bridge_traits::log::LogLevel;
use core_catalog::GenreId;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{bootstrap_desktop, HeadlessMediaElement};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    let genre = args
        .get(2)
        .map(|raw| raw.parse::<u64>().map(GenreId))
        .transpose()
        .context("genre must be a numeric id")?;

    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug)
            .with_redaction(true),
    )?;

    let core = bootstrap_desktop()?;
    info!(api = %core.config().api_base_url, "Catalog player ready");

    let browser = core.browser();
    for genre in browser.genres().await? {
        info!(id = %genre.id, name = %genre.name, albums = ?genre.album_count, "Genre");
    }

    let pager = browser.open(genre).await?;
    while pager.has_more() && pager.items().len() < 60 {
        pager.load_more().await?;
    }
    for album in pager.items() {
        info!(
            id = %album.id,
            title = %album.title,
            artist = album.artist_name().unwrap_or("Unknown artist"),
            tracks = album.tracks.len(),
            "Album"
        );
    }

    let (element, media_events) = HeadlessMediaElement::new();
    let element = Arc::new(element);
    let session = core.attach_media_element(element.clone())?;
    {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.pump_media_events(media_events).await });
    }

    let Some(track) = pager
        .items()
        .iter()
        .flat_map(|album| album.sorted_tracks())
        .find(|track| track.is_playable())
    else {
        warn!("No playable track in the listing");
        return Ok(());
    };

    session.play(track).await?;
    session.seek_by(10.0).await?;
    if let Err(err) = session.next().await {
        warn!(error = %err, "Could not advance");
    }

    let snapshot = session.snapshot();
    info!(
        status = ?snapshot.status,
        track = ?snapshot.current_track.as_ref().map(|t| t.title.as_str()),
        duration = ?snapshot.current_track.as_ref().and_then(|t| t.formatted_duration()),
        "Playback state"
    );

    element.finish();
    session.pause().await?;
    Ok(())
}
