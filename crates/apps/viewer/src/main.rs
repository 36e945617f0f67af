mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use catalog::{CatalogSource, FixtureCatalog, HttpCatalog};
use clap::Parser;
use engine::{HeadlessEngine, HeadlessFactory, LayerPaint, MapEngine};
use feeds::{Article, FeedClient, Ticker};
use layers::{category_for_layer, derive_layers};
use overlay::{fetcher_for_root, Flow, IconAtlas, OverlaySession, PointerEvent, SessionMessage};
use runtime::LivenessToken;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Args;

#[derive(Debug, Serialize)]
struct LayerSummary {
    id: String,
    visible: bool,
    marker: &'static str,
}

#[derive(Debug, Serialize)]
struct FocusSummary {
    id: String,
    title: String,
    popup_html: Option<String>,
}

#[derive(Debug, Serialize)]
struct MapSummary {
    catalog: String,
    events: usize,
    layers: Vec<LayerSummary>,
    rendered: usize,
    /// Symbols the current selection exposes to pointer input.
    interactive: usize,
    hidden_base_layers: Vec<String>,
    focused: Option<FocusSummary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    /// Absent when the map could not be mounted.
    map: Option<MapSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_error: Option<String>,
    headlines: Vec<Article>,
}

fn summarize(session: &OverlaySession<HeadlessFactory>, catalog: &str) -> Option<MapSummary> {
    let engine: &HeadlessEngine = session.controller().engine()?;
    let layers = engine
        .layer_ids()
        .into_iter()
        .filter_map(|id| engine.layer(id))
        .map(|l| LayerSummary {
            id: l.id.clone(),
            visible: l.visible,
            marker: match l.paint {
                LayerPaint::Symbol { .. } => "glyph",
                LayerPaint::Circle { .. } => "fallback",
            },
        })
        .collect();
    let hidden_base_layers = engine
        .style_layers()
        .into_iter()
        .filter(|l| !l.visible && category_for_layer(&l.id).is_none())
        .map(|l| l.id)
        .collect();

    Some(MapSummary {
        catalog: catalog.to_string(),
        events: session.catalogue().len(),
        layers,
        rendered: engine.rendered_features().len(),
        interactive: derive_layers(session.catalogue(), session.selection())
            .iter()
            .map(|l| l.interactive_count())
            .sum(),
        hidden_base_layers,
        focused: session.focused().map(|f| FocusSummary {
            id: f.event.id.clone(),
            title: f.event.title.clone(),
            popup_html: engine.popup().map(|p| p.html.clone()),
        }),
    })
}

/// Paints the overlay, then applies the requested toggles and click.
async fn drive_map(session: &mut OverlaySession<HeadlessFactory>, args: &Args) {
    // The headless style is available as soon as the engine exists.
    session.handle(SessionMessage::StyleLoaded).ok();
    if let Err(err) = session.run_until_ready().await {
        error!(error = %err, "overlay failed to paint");
    }
    info!(events = session.catalogue().len(), "overlay ready");

    for category in args.toggles() {
        if let Err(err) = session.handle(SessionMessage::Toggle(*category)) {
            warn!(%category, error = %err, "toggle failed");
        }
    }

    if let Some(at) = args.click {
        let point = session.controller().engine().and_then(|e| e.project(at));
        match point {
            Some(point) => {
                if let Err(err) = session.handle(SessionMessage::Pointer(PointerEvent::Click(point))) {
                    warn!(error = %err, "click failed");
                }
            }
            None => warn!(lng = at.lng, lat = at.lat, "click position is not facing the camera"),
        }
    }
}

/// Keeps the session loop (if any) and the ticker running for `secs`.
async fn keep_running(session: Option<&mut OverlaySession<HeadlessFactory>>, secs: u64) {
    let deadline = tokio::time::sleep(Duration::from_secs(secs));
    tokio::pin!(deadline);
    let Some(session) = session else {
        deadline.await;
        return;
    };
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            step = session.step() => match step {
                Ok(Flow::Stopped) => break,
                Ok(Flow::Continue) => {}
                Err(err) => error!(error = %err, "overlay update failed"),
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let http = reqwest::Client::new();

    let catalog: Arc<dyn CatalogSource> = match &args.catalog_url {
        Some(url) => Arc::new(HttpCatalog::new(http.clone(), url.clone())),
        None => Arc::new(FixtureCatalog::demo()),
    };
    let catalog_name = catalog.name().to_string();
    let atlas = IconAtlas::new(fetcher_for_root(http.clone(), &args.icon_root));

    let mut session = OverlaySession::new(
        HeadlessFactory::with_dark_basemap(),
        args.surface_config(),
        catalog,
        atlas,
        args.initial_selection(),
    );

    // A map failure stays with the map; the feed runs either way.
    let (token, map_error) = match session.mount() {
        Ok(token) => (token, None),
        Err(err) => {
            error!(error = %err, "map unavailable; continuing without the overlay");
            (LivenessToken::new(), Some(err.to_string()))
        }
    };

    let ticker = args.feed_url.as_ref().map(|url| {
        Ticker::start(
            FeedClient::new(http.clone(), url.clone()),
            Duration::from_secs(args.feed_interval_secs.max(1)),
            token.clone(),
        )
    });

    if map_error.is_none() {
        drive_map(&mut session, &args).await;
    }
    if args.run_secs > 0 {
        let live = map_error.is_none().then_some(&mut session);
        keep_running(live, args.run_secs).await;
    }

    let headlines = match &ticker {
        Some(t) => t.articles().await,
        None => Vec::new(),
    };
    let summary = Summary {
        map: summarize(&session, &catalog_name),
        map_error,
        headlines,
    };

    session.handle(SessionMessage::Teardown).ok();
    token.revoke();
    if let Some(t) = ticker {
        t.stop().await;
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => {
            println!("{text}");
            if summary.map_error.is_some() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("viewer: failed to encode summary: {err}");
            ExitCode::from(1)
        }
    }
}
