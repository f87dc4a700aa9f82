//! Pyramid Viewer - headless deep-zoom tile viewer.
//!
//! Runs the viewer against a real tile source and prints what it would draw.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_viewer::{
    config::{Cli, Command, PlanConfig, RenderConfig, SourceArgs, ViewArgs},
    create_s3_client, parse_s3_uri, Compositor, FileTileLoader, Frame, FrameRecorder,
    HttpTileLoader, LayerInfo, LoadOutcome, PayloadKind, RetryingLoader, S3TileLoader, TileKey,
    TileLoader, ViewError, Viewer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Render(config) => run_render(config).await,
        Command::Plan(config) => run_plan(config),
    }
}

// =============================================================================
// Render Command
// =============================================================================

#[derive(Serialize)]
struct RenderReport {
    layer: u32,
    tiles_requested: usize,
    loads_failed: usize,
    frame: Frame,
}

async fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let loader = match build_loader(&config).await {
        Ok(loader) => loader,
        Err(e) => {
            error!("Failed to create tile loader: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let loader = RetryingLoader::new(loader, config.retry_policy());

    let mut viewer = Viewer::new(loader, FrameRecorder::new(), config.view.viewport());
    if let Err(e) = setup_view(&mut viewer, &config.source, &config.view) {
        error!("Failed to set up view: {}", e);
        return ExitCode::FAILURE;
    }

    let tiles_requested = match viewer.fetch() {
        Ok(started) => started,
        Err(e) => {
            error!("Fetch failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(tiles = tiles_requested, "waiting for tile loads");

    let mut loads_failed = 0;
    while let Some(outcome) = viewer.next_event().await {
        if let LoadOutcome::Failed { .. } = outcome {
            loads_failed += 1;
        }
    }
    if loads_failed > 0 {
        warn!(failed = loads_failed, "some tile payloads could not be loaded");
    }

    viewer.draw();
    let layer = viewer.layer();
    let Some(frame) = viewer.into_compositor().take_last_frame() else {
        error!("No frame was rendered");
        return ExitCode::FAILURE;
    };
    info!(drawn = frame.draws.len(), "frame complete");

    let report = RenderReport {
        layer,
        tiles_requested,
        loads_failed,
        frame,
    };
    print_json(&report)
}

/// Pick a loader from the tile location's scheme.
async fn build_loader(config: &RenderConfig) -> Result<Arc<dyn TileLoader>, String> {
    let location = config.source.tiles.as_str();

    if location.starts_with("http://") || location.starts_with("https://") {
        let loader = HttpTileLoader::new(config.load_timeout()).map_err(|e| e.to_string())?;
        return Ok(Arc::new(loader));
    }

    if location.starts_with("s3://") {
        let (bucket, _) = parse_s3_uri(location)
            .ok_or_else(|| format!("Invalid S3 location: {}", location))?;
        let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
        return Ok(Arc::new(S3TileLoader::new(client, bucket)));
    }

    Ok(Arc::new(FileTileLoader::new()))
}

/// Apply source and view settings in the order the viewer expects: source,
/// layer, then the camera.
fn setup_view<L, C>(
    viewer: &mut Viewer<L, C>,
    source: &SourceArgs,
    view: &ViewArgs,
) -> Result<(), ViewError>
where
    L: TileLoader + 'static,
    C: Compositor,
{
    let metadata = source.metadata()?;
    let resolver = source.resolver();
    viewer.set_source(metadata, move |key: TileKey, kind: PayloadKind| {
        resolver.resolve(key, kind)
    })?;

    if let Some(layer) = view.layer {
        viewer.set_layer(layer);
    }

    let (centre_x, centre_y) = viewer
        .pyramid()
        .and_then(|p| p.layer(viewer.layer()))
        .map(|info| (info.width as f64 / 2.0, info.height as f64 / 2.0))
        .unwrap_or_default();

    viewer.set_scale(view.scale)?;
    viewer.set_angle(view.angle)?;
    viewer.set_origin(
        view.origin_x.unwrap_or(centre_x),
        view.origin_y.unwrap_or(centre_y),
    )?;
    viewer.set_light_position(view.light_x, view.light_y)?;
    // Checked by validate()
    viewer.set_lines(view.overlay_lines().unwrap_or_default());

    debug!(layer = viewer.layer(), pan = ?viewer.view().pan(), "view ready");
    Ok(())
}

// =============================================================================
// Plan Command
// =============================================================================

#[derive(Serialize)]
struct PlannedTile {
    key: TileKey,
    locations: Vec<String>,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    layers: &'a [LayerInfo],
    layer: u32,
    max_tiles: usize,
    tiles: Vec<PlannedTile>,
}

fn run_plan(config: PlanConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // Never fetches, so the loader is never called
    let mut viewer = Viewer::new(
        FileTileLoader::new(),
        FrameRecorder::new(),
        config.view.viewport(),
    );
    if let Err(e) = setup_view(&mut viewer, &config.source, &config.view) {
        error!("Failed to set up view: {}", e);
        return ExitCode::FAILURE;
    }

    let resolver = config.source.resolver();
    let kinds = PayloadKind::required(viewer.is_relight());
    let tiles = viewer
        .visible_tiles()
        .into_iter()
        .map(|key| PlannedTile {
            key,
            locations: kinds
                .iter()
                .map(|&kind| resolver.resolve(key, kind))
                .collect(),
        })
        .collect();

    let Some(pyramid) = viewer.pyramid() else {
        error!("No source set");
        return ExitCode::FAILURE;
    };
    let report = PlanReport {
        layers: pyramid.layers(),
        layer: viewer.layer(),
        max_tiles: viewer.cache().max_tiles(),
        tiles,
    };
    print_json(&report)
}

// =============================================================================
// Helpers
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so stdout stays valid JSON.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_viewer=debug"
    } else {
        "pyramid_viewer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
