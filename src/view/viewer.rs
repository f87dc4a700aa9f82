//! The viewer: view state, tile fetching and drawing.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use super::event::{LoadEvent, LoadOutcome};
use super::grid::TileRange;
use crate::error::{LoadError, ViewError};
use crate::geometry::{Point, Size, ViewState};
use crate::io::{LoadRequest, TileLoader, TileUrlResolver};
use crate::pyramid::{PyramidModel, RelightCoefficients, SourceMetadata};
use crate::render::{
    Compositor, DrawInstruction, Frame, LayerLine, LightDirection, RelightUniforms, ScreenLine,
};
use crate::tile::{capacity_for, PayloadKind, Tile, TileCache, TileGeneration, TileKey};

/// Layer shown right after a source is set.
const INITIAL_LAYER: i64 = 1;

/// The pyramid being viewed and where its tiles come from.
struct Source {
    pyramid: PyramidModel,
    resolver: Box<dyn TileUrlResolver>,
}

/// A pan/zoom/rotate view over a tiled image pyramid.
///
/// The viewer owns all view and cache state. Loads run as tokio tasks and
/// report back over a channel; completions are applied one at a time by
/// [`Viewer::next_event`] or [`Viewer::drain_events`], so the cache is only
/// ever touched from the task that owns the viewer.
///
/// # Usage
///
/// ```ignore
/// let mut viewer = Viewer::new(loader, compositor, Size::new(1024.0, 768.0));
/// viewer.set_source(metadata, DeepZoomResolver::from_descriptor(url, "jpg"))?;
/// viewer.set_layer(3);
/// viewer.set_origin(512.0, 384.0)?;
/// viewer.fetch()?;
/// while let Some(outcome) = viewer.next_event().await {
///     // every completed tile has already been drawn
/// }
/// ```
///
/// [`Viewer::fetch`] spawns tasks and must be called from within a tokio
/// runtime.
pub struct Viewer<L, C> {
    loader: Arc<L>,
    compositor: C,
    view: ViewState,
    source: Option<Source>,
    layer: u32,
    cache: TileCache,

    /// Coefficients of relighting mode; `None` draws plain tiles
    relight: Option<RelightCoefficients>,
    light: LightDirection,
    lines: Vec<LayerLine>,

    next_generation: u64,
    pending: usize,
    events_tx: UnboundedSender<LoadEvent>,
    events_rx: UnboundedReceiver<LoadEvent>,
}

impl<L, C> Viewer<L, C>
where
    L: TileLoader + 'static,
    C: Compositor,
{
    /// Create a viewer with no source.
    pub fn new(loader: L, compositor: C, viewport: Size) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            loader: Arc::new(loader),
            compositor,
            view: ViewState::new(viewport),
            source: None,
            layer: 0,
            cache: TileCache::new(0),
            relight: None,
            light: LightDirection::default(),
            lines: Vec::new(),
            next_generation: 0,
            pending: 0,
            events_tx,
            events_rx,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn pyramid(&self) -> Option<&PyramidModel> {
        self.source.as_ref().map(|s| &s.pyramid)
    }

    /// Current layer (0 = coarsest).
    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn is_relight(&self) -> bool {
        self.relight.is_some()
    }

    pub fn light(&self) -> LightDirection {
        self.light
    }

    pub fn lines(&self) -> &[LayerLine] {
        &self.lines
    }

    /// Loads started but not yet applied.
    pub fn pending_loads(&self) -> usize {
        self.pending
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    pub fn into_compositor(self) -> C {
        self.compositor
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Show a new pyramid.
    ///
    /// The cache is cleared and the view drops to layer 1 (or 0 for a
    /// single-layer pyramid). Loads still in flight for the previous source
    /// are ignored when they complete.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if the metadata does not describe a
    /// valid pyramid; the viewer is left unchanged.
    pub fn set_source<R>(&mut self, metadata: SourceMetadata, resolver: R) -> Result<(), ViewError>
    where
        R: TileUrlResolver + 'static,
    {
        let pyramid = PyramidModel::new(
            metadata.max_size,
            metadata.tile_size,
            metadata.resolution_count,
        )?;

        let max_tiles = capacity_for(self.view.viewport(), pyramid.tile_size());
        info!(
            width = pyramid.max_size().width,
            height = pyramid.max_size().height,
            tile_width = pyramid.tile_size().width,
            tile_height = pyramid.tile_size().height,
            layers = pyramid.layer_count(),
            max_tiles,
            relight = metadata.relight.is_some(),
            "source set"
        );

        self.cache.clear();
        self.cache.set_max_tiles(max_tiles);
        self.relight = metadata.relight;
        self.source = Some(Source {
            pyramid,
            resolver: Box::new(resolver),
        });
        self.set_layer(INITIAL_LAYER);
        Ok(())
    }

    /// Switch relighting on (with the given coefficients) or off.
    ///
    /// Switching mode clears the cache, since cached tiles wait for a
    /// different set of payloads. Replacing the coefficients alone keeps it.
    pub fn set_relight(&mut self, relight: Option<RelightCoefficients>) {
        if self.relight.is_some() != relight.is_some() {
            info!(relight = relight.is_some(), "rendering mode changed, clearing cache");
            self.cache.clear();
        }
        self.relight = relight;
    }

    /// Set the light position, `x` and `y` in `[-1, 1]`.
    ///
    /// Weights are derived from this and the view angle on every draw.
    pub fn set_light_position(&mut self, x: f64, y: f64) -> Result<(), ViewError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ViewError::NonFinite("light position"));
        }
        debug!(x, y, "light position set");
        self.light = LightDirection::new(x, y);
        Ok(())
    }

    /// Replace the overlay lines. Coordinates are in the current layer.
    pub fn set_lines(&mut self, lines: Vec<LayerLine>) {
        self.lines = lines;
    }

    // =========================================================================
    // View Changes
    // =========================================================================

    /// Select the layer to display, clamped to the pyramid. Returns the
    /// layer actually selected.
    pub fn set_layer(&mut self, level: i64) -> u32 {
        self.cache.tick();

        let Some(source) = &self.source else {
            return self.layer;
        };
        self.layer = source.pyramid.clamp_layer(level);

        if let Some(info) = source.pyramid.layer(self.layer) {
            info!(
                layer = self.layer,
                width = info.width,
                height = info.height,
                "layer set"
            );
        }
        self.layer
    }

    /// Centre the viewport on layer point `(x, y)` and rotate about it.
    pub fn set_origin(&mut self, x: f64, y: f64) -> Result<(), ViewError> {
        self.view.set_origin(x, y)?;
        self.cache.tick();
        debug!(x, y, "origin set");
        Ok(())
    }

    /// Set the rotation in degrees, positive is counter-clockwise.
    pub fn set_angle(&mut self, angle: f64) -> Result<(), ViewError> {
        self.view.set_angle(angle)?;
        self.cache.tick();
        Ok(())
    }

    /// Set the number of layer pixels per screen pixel.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), ViewError> {
        self.view.set_scale(scale)?;
        self.cache.tick();
        Ok(())
    }

    /// Set the pan offset in layer pixels.
    pub fn set_pan(&mut self, layer_left: f64, layer_top: f64) -> Result<(), ViewError> {
        self.view.set_pan(layer_left, layer_top)?;
        self.cache.tick();
        Ok(())
    }

    /// Change the viewport size. The cache budget follows; cached tiles are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidViewport`] for non-finite or negative
    /// sides; the viewer is left unchanged.
    pub fn resize(&mut self, viewport: Size) -> Result<(), ViewError> {
        self.view.resize(viewport)?;
        if let Some(source) = &self.source {
            let max_tiles = capacity_for(viewport, source.pyramid.tile_size());
            debug!(
                width = viewport.width,
                height = viewport.height,
                max_tiles,
                "viewport resized"
            );
            self.cache.set_max_tiles(max_tiles);
        }
        Ok(())
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Cells of the current layer that cover the viewport.
    pub fn visible_tiles(&self) -> Vec<TileKey> {
        let Some(source) = &self.source else {
            return Vec::new();
        };
        let Some(info) = source.pyramid.layer(self.layer) else {
            return Vec::new();
        };
        let tile = source.pyramid.tile_size();

        let range = TileRange::covering(
            self.view.visible_layer_rect(),
            tile.width as f64,
            tile.height as f64,
            info.width as f64,
            info.height as f64,
        );

        range
            .cells()
            .filter(|&(col, row)| info.contains_tile(col, row))
            .map(|(col, row)| TileKey::new(self.layer, col, row))
            .collect()
    }

    /// Start loads for every visible tile of the current layer that is not
    /// cached yet, then draw what is ready.
    ///
    /// Returns the number of tiles whose loads were started.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Cache`] if the cache bookkeeping is violated.
    pub fn fetch(&mut self) -> Result<usize, ViewError> {
        let now = self.cache.tick();

        let evicted = self
            .cache
            .evict_if_over_capacity(self.layer)
            .map_err(|e| {
                error!(error = %e, "cache eviction failed");
                ViewError::from(e)
            })?;
        if !evicted.is_empty() {
            debug!(count = evicted.len(), remaining = self.cache.len(), "evicted tiles");
        }

        let mut started = 0;
        for key in self.visible_tiles() {
            // A hit counts as a use
            if self.cache.get(&key).is_some() {
                continue;
            }
            self.start_tile(key)?;
            started += 1;
        }

        debug!(now, layer = self.layer, started, pending = self.pending, "fetch");
        self.draw();
        Ok(started)
    }

    /// Insert `key` in the loading state and spawn one load per payload.
    fn start_tile(&mut self, key: TileKey) -> Result<(), ViewError> {
        let Some(source) = &self.source else {
            return Ok(());
        };

        let kinds = PayloadKind::required(self.relight.is_some());
        let generation = TileGeneration(self.next_generation);
        self.next_generation += 1;

        self.cache
            .insert(Tile::new(key, generation, kinds))
            .map_err(|e| {
                error!(%key, error = %e, "tile insert failed");
                ViewError::from(e)
            })?;

        for &kind in kinds {
            let request = LoadRequest {
                key,
                kind,
                location: source.resolver.resolve(key, kind),
                tile_size: source.pyramid.tile_size(),
            };
            debug!(%key, %kind, location = %request.location, "loading tile payload");

            let loader = Arc::clone(&self.loader);
            let events = self.events_tx.clone();
            let location = request.location.clone();
            let load = tokio::spawn(async move { loader.load(&request).await });

            // Every started load reports exactly once, even if the load task dies
            tokio::spawn(async move {
                let result = match load.await {
                    Ok(result) => result,
                    Err(e) => Err(LoadError::Aborted {
                        location,
                        message: e.to_string(),
                    }),
                };
                // The receiver lives as long as the viewer
                let _ = events.send(LoadEvent {
                    key,
                    generation,
                    kind,
                    result,
                });
            });
            self.pending += 1;
        }

        Ok(())
    }

    // =========================================================================
    // Completions
    // =========================================================================

    /// Wait for the next load to complete and apply it.
    ///
    /// Returns `None` once no loads are outstanding.
    pub async fn next_event(&mut self) -> Option<LoadOutcome> {
        if self.pending == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Apply every completion that has already arrived, without waiting.
    pub fn drain_events(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while self.pending > 0 {
            match self.events_rx.try_recv() {
                Ok(event) => outcomes.push(self.apply(event)),
                Err(_) => break,
            }
        }
        outcomes
    }

    /// Wait for every outstanding load and apply it.
    pub async fn settle(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_event().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn apply(&mut self, event: LoadEvent) -> LoadOutcome {
        self.pending = self.pending.saturating_sub(1);
        let LoadEvent {
            key,
            generation,
            kind,
            result,
        } = event;

        let tile = match self.cache.peek_mut(&key) {
            Some(tile) if tile.generation() == generation => tile,
            _ => {
                debug!(%key, %kind, "ignoring completion for evicted tile");
                return LoadOutcome::Stale { key, kind };
            }
        };

        let texture = match result {
            Ok(texture) => texture,
            Err(e) => {
                warn!(%key, %kind, error = %e, "tile load failed");
                return LoadOutcome::Failed { key, kind };
            }
        };

        if !tile.set_payload(kind, texture) {
            debug!(%key, %kind, "ignoring unexpected payload");
            return LoadOutcome::Stale { key, kind };
        }

        if tile.is_ready() {
            debug!(%key, "tile ready");
            self.draw();
            LoadOutcome::Ready { key }
        } else {
            debug!(%key, %kind, "payload arrived, tile still loading");
            LoadOutcome::Partial { key, kind }
        }
    }

    // =========================================================================
    // Draw
    // =========================================================================

    /// Hand the compositor a frame of every ready tile in view, coarse
    /// layers first. Returns the number of tiles drawn.
    pub fn draw(&mut self) -> usize {
        self.cache.tick();

        let mut frame = Frame {
            viewport: self.view.viewport(),
            ..Frame::default()
        };

        if let Some(source) = &self.source {
            if let Some(info) = source.pyramid.layer(self.layer) {
                let tile = source.pyramid.tile_size();
                let rect = self.view.visible_layer_rect();
                let scale = self.view.scale();
                let rotation = self.view.angle();

                for z in 0..=self.layer {
                    // One tile of layer z covers 2^(layer - z) tiles of the
                    // current layer
                    let factor = 2f64.powi((self.layer - z) as i32);
                    let tile_w = tile.width as f64 * factor;
                    let tile_h = tile.height as f64 * factor;

                    let range = TileRange::covering(
                        rect,
                        tile_w,
                        tile_h,
                        info.width as f64,
                        info.height as f64,
                    );

                    for (col, row) in range.cells() {
                        let key = TileKey::new(z, col, row);
                        let Some(textures) = self.cache.get(&key).and_then(Tile::textures) else {
                            continue;
                        };

                        let corner = Point::new(col as f64 * tile_w, row as f64 * tile_h);
                        frame.draws.push(DrawInstruction {
                            key,
                            textures,
                            origin: self.view.layer_to_screen(corner),
                            size: Size::new(tile_w / scale, tile_h / scale),
                            rotation,
                        });
                    }
                }
            }
        }

        frame.relight = self.relight.as_ref().map(|coefficients| {
            RelightUniforms::new(self.light.weights(self.view.angle()), coefficients)
        });

        frame.lines = self
            .lines
            .iter()
            .map(|line| ScreenLine {
                start: self.view.layer_to_screen(Point::new(line.x1, line.y1)),
                end: self.view.layer_to_screen(Point::new(line.x2, line.y2)),
            })
            .collect();

        let drawn = frame.draws.len();
        debug!(drawn, lines = frame.lines.len(), "draw");
        self.compositor.render(&frame);
        drawn
    }
}

// =============================================================================
// Tests
// =============================================================================
