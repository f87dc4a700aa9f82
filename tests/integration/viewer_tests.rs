//! Fetch/draw orchestration tests.
//!
//! Tests verify:
//! - Only missing tiles of the current layer are requested
//! - Coarse layers are drawn under the current layer while it loads
//! - Draw geometry follows pan, scale and rotation
//! - Failed and stale loads never corrupt the cache
//! - The cache stays bounded while panning

use pyramid_viewer::{
    LayerLine, LoadOutcome, PayloadKind, Point, Size, TileKey, Viewer, EVICTION_TARGET,
};

use super::test_utils::{
    large_source, location, make_key, small_source, GatedLoader, RecordingCompositor,
    TrackingLoader,
};

fn tracking_viewer() -> (TrackingLoader, Viewer<TrackingLoader, RecordingCompositor>) {
    let loader = TrackingLoader::new();
    let viewer = Viewer::new(
        loader.clone(),
        RecordingCompositor::new(),
        Size::new(512.0, 512.0),
    );
    (loader, viewer)
}

fn gated_viewer() -> (GatedLoader, Viewer<GatedLoader, RecordingCompositor>) {
    let loader = GatedLoader::new();
    let viewer = Viewer::new(
        loader.clone(),
        RecordingCompositor::new(),
        Size::new(512.0, 512.0),
    );
    (loader, viewer)
}

// =============================================================================
// Fetch
// =============================================================================

#[tokio::test]
async fn test_fetch_requests_visible_tiles_once() {
    let (loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(500.0, 500.0).unwrap();

    // Viewport covers 244..756 on both axes: columns and rows 0..3
    assert_eq!(viewer.fetch().unwrap(), 9);
    let outcomes = viewer.settle().await;
    assert_eq!(outcomes.len(), 9);
    assert!(outcomes.iter().all(LoadOutcome::is_ready));
    assert_eq!(loader.request_count(), 9);

    let requests = loader.get_requests().await;
    assert!(requests.iter().all(|r| r.key.layer == 3));
    assert!(requests.iter().all(|r| r.kind == PayloadKind::Base));
    assert!(requests
        .iter()
        .any(|r| r.location == "3/2_2.base" && r.key == make_key(3, 2, 2)));

    let frame = viewer.compositor().last_frame();
    assert_eq!(frame.draws.len(), 9);

    // Nothing new to load
    assert_eq!(viewer.fetch().unwrap(), 0);
    assert_eq!(loader.request_count(), 9);
}

#[tokio::test]
async fn test_fetch_skips_tiles_outside_grid() {
    let (loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(-1000.0, -1000.0).unwrap();

    assert_eq!(viewer.fetch().unwrap(), 0);
    assert_eq!(viewer.pending_loads(), 0);
    assert_eq!(loader.request_count(), 0);
}

#[tokio::test]
async fn test_fetch_touches_cached_tiles() {
    let (_loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(500.0, 500.0).unwrap();
    viewer.fetch().unwrap();
    viewer.settle().await;

    let key = make_key(3, 0, 0);
    let before = viewer.cache().peek(&key).unwrap().last_used();
    viewer.fetch().unwrap();
    let after = viewer.cache().peek(&key).unwrap().last_used();
    assert!(after > before);
    assert_eq!(after, viewer.cache().now());
}

// =============================================================================
// Draw
// =============================================================================

#[tokio::test]
async fn test_coarse_tiles_drawn_under_sharp() {
    let (gates, mut viewer) = gated_viewer();
    viewer.set_source(small_source(), location).unwrap();

    // Layer 0 is 125x125: one tile
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    gates.open(PayloadKind::Base, 1);
    assert_eq!(viewer.fetch().unwrap(), 1);
    viewer.settle().await;

    // Layer 2 is 500x500: 2x2 tiles, all still loading
    viewer.set_layer(2);
    viewer.set_origin(250.0, 250.0).unwrap();
    assert_eq!(viewer.fetch().unwrap(), 4);
    assert!(viewer.drain_events().is_empty());

    let frame = viewer.compositor().last_frame();
    assert_eq!(frame.draws.len(), 1);
    let placeholder = &frame.draws[0];
    assert_eq!(placeholder.key, make_key(0, 0, 0));
    // One layer 0 tile spans four layer 2 tiles each way
    assert_eq!(placeholder.size, Size::new(1024.0, 1024.0));
    assert_eq!(placeholder.origin, Point::new(6.0, 6.0));

    gates.open(PayloadKind::Base, 4);
    let outcomes = viewer.settle().await;
    assert_eq!(outcomes.len(), 4);

    assert_eq!(
        viewer.compositor().last_keys(),
        vec![
            make_key(0, 0, 0),
            make_key(2, 0, 0),
            make_key(2, 1, 0),
            make_key(2, 0, 1),
            make_key(2, 1, 1),
        ]
    );

    let frame = viewer.compositor().last_frame();
    let sharp = &frame.draws[4];
    assert_eq!(sharp.size, Size::new(256.0, 256.0));
    assert_eq!(sharp.origin, Point::new(262.0, 262.0));
}

#[tokio::test]
async fn test_draw_follows_scale_and_rotation() {
    let (_loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_scale(2.0).unwrap();
    viewer.set_angle(90.0).unwrap();
    viewer.set_origin(500.0, 500.0).unwrap();

    let centre = viewer.view().screen_to_layer(Point::new(256.0, 256.0));
    assert!((centre.x - 500.0).abs() < 1e-9 && (centre.y - 500.0).abs() < 1e-9);

    viewer.fetch().unwrap();
    viewer.settle().await;

    let frame = viewer.compositor().last_frame();
    assert!(!frame.draws.is_empty());
    for draw in &frame.draws {
        assert_eq!(draw.rotation, 90.0);
        assert_eq!(draw.size, Size::new(128.0, 128.0));

        let corner = Point::new(draw.key.col as f64 * 256.0, draw.key.row as f64 * 256.0);
        let expected = viewer.view().layer_to_screen(corner);
        assert!((draw.origin.x - expected.x).abs() < 1e-9);
        assert!((draw.origin.y - expected.y).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_overlay_lines_follow_view() {
    let (_loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(500.0, 500.0).unwrap();
    viewer.set_lines(vec![LayerLine::new(244.0, 244.0, 500.0, 500.0)]);

    viewer.draw();
    let frame = viewer.compositor().last_frame();
    assert_eq!(frame.lines.len(), 1);
    assert_eq!(frame.lines[0].start, Point::new(0.0, 0.0));
    assert_eq!(frame.lines[0].end, Point::new(256.0, 256.0));
    assert!(frame.relight.is_none());
}

#[tokio::test]
async fn test_draw_advances_clock() {
    let (_loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    let before = viewer.cache().now();
    viewer.draw();
    viewer.draw();
    assert_eq!(viewer.cache().now(), before + 2);
    assert_eq!(viewer.compositor().frames.len(), 2);
}

// =============================================================================
// Failures and Late Arrivals
// =============================================================================

#[tokio::test]
async fn test_failed_load_leaves_tile_loading() {
    let (loader, mut viewer) = tracking_viewer();
    let broken = make_key(3, 1, 1);
    loader.fail(location(broken, PayloadKind::Base));

    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(500.0, 500.0).unwrap();
    viewer.fetch().unwrap();

    let outcomes = viewer.settle().await;
    let failed: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, LoadOutcome::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].key(), broken);

    let tile = viewer.cache().peek(&broken).unwrap();
    assert!(!tile.is_ready());
    assert!(!viewer.compositor().last_keys().contains(&broken));
    assert_eq!(viewer.compositor().last_frame().draws.len(), 8);

    // The failed tile is still cached, so it is not retried
    assert_eq!(viewer.fetch().unwrap(), 0);
}

#[tokio::test]
async fn test_completion_for_replaced_source_ignored() {
    let (gates, mut viewer) = gated_viewer();
    let key = make_key(0, 0, 0);

    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    assert_eq!(viewer.fetch().unwrap(), 1);

    // Same key, new tile: the first load is now stale
    viewer.set_source(small_source(), location).unwrap();
    assert!(viewer.cache().is_empty());
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    assert_eq!(viewer.fetch().unwrap(), 1);
    assert_eq!(viewer.pending_loads(), 2);

    gates.open(PayloadKind::Base, 2);
    let outcomes = viewer.settle().await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.contains(&LoadOutcome::Ready { key }));
    assert!(outcomes.contains(&LoadOutcome::Stale {
        key,
        kind: PayloadKind::Base
    }));

    assert_eq!(viewer.cache().len(), 1);
    assert!(viewer.cache().peek(&key).unwrap().is_ready());
}

// =============================================================================
// Cache Bounds
// =============================================================================

#[tokio::test]
async fn test_resize_keeps_cached_tiles() {
    let (_loader, mut viewer) = tracking_viewer();
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(3);
    viewer.set_origin(500.0, 500.0).unwrap();
    viewer.fetch().unwrap();
    viewer.settle().await;
    assert_eq!(viewer.cache().max_tiles(), 27);

    viewer.resize(Size::new(1024.0, 1024.0)).unwrap();
    assert_eq!(viewer.cache().max_tiles(), 75);
    assert_eq!(viewer.cache().len(), 9);
}

#[tokio::test]
async fn test_panning_keeps_cache_bounded() {
    let (loader, mut viewer) = tracking_viewer();
    viewer.set_source(large_source(), location).unwrap();
    let max_tiles = viewer.cache().max_tiles();
    assert_eq!(max_tiles, 27);

    // Coarse layers first: layer 0 is 250px, layer 1 is 500px
    viewer.set_layer(0);
    viewer.set_origin(125.0, 125.0).unwrap();
    viewer.fetch().unwrap();
    viewer.settle().await;
    viewer.set_layer(1);
    viewer.set_origin(250.0, 250.0).unwrap();
    viewer.fetch().unwrap();
    viewer.settle().await;

    // Pan across the 4000px layer
    viewer.set_layer(4);
    let mut evicted_any = false;
    for step in 0..8 {
        viewer
            .set_origin(256.0 + 512.0 * step as f64, 2000.0)
            .unwrap();
        let before = viewer.cache().len();
        let started = viewer.fetch().unwrap();
        let after = viewer.cache().len();

        if after < before + started {
            evicted_any = true;
            assert!(after - started <= (EVICTION_TARGET * max_tiles as f64) as usize);
        }
        assert!(after <= max_tiles + started);
        viewer.settle().await;
    }

    assert!(evicted_any);
    assert!(loader.request_count() > max_tiles);

    // Placeholders for the whole image survive
    let coarse: Vec<TileKey> = viewer
        .cache()
        .keys()
        .iter()
        .copied()
        .filter(|k| k.layer <= 1)
        .collect();
    assert_eq!(coarse.len(), 5);
}
