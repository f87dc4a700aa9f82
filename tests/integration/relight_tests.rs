//! Relighting (RTI) mode integration tests.
//!
//! Tests verify:
//! - A tile is only drawn once base and both coefficient images arrived
//! - Any arrival order of the three payloads works
//! - Frames carry weights that stay fixed relative to the scene
//! - Switching rendering mode resets the cache

use std::sync::{Arc, Mutex};

use pyramid_viewer::{LoadOutcome, PayloadKind, RelightCoefficients, Size, TileKey, Viewer};

use super::test_utils::{
    location, make_key, relight_coefficients, small_source, GatedLoader, RecordingCompositor,
    TrackingLoader,
};

const EPS: f32 = 1e-6;

fn assert_vec(actual: [f32; 3], expected: [f32; 3]) {
    for i in 0..3 {
        assert!(
            (actual[i] - expected[i]).abs() < EPS,
            "{actual:?} != {expected:?}"
        );
    }
}

/// A relighting viewer showing the single layer 0 tile.
fn relight_viewer() -> (GatedLoader, Viewer<GatedLoader, RecordingCompositor>) {
    let loader = GatedLoader::new();
    let mut viewer = Viewer::new(
        loader.clone(),
        RecordingCompositor::new(),
        Size::new(512.0, 512.0),
    );
    viewer
        .set_source(small_source().with_relight(relight_coefficients()), location)
        .unwrap();
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    (loader, viewer)
}

// =============================================================================
// Readiness
// =============================================================================

#[tokio::test]
async fn test_base_alone_is_not_drawn() {
    let (gates, mut viewer) = relight_viewer();
    let key = make_key(0, 0, 0);

    assert_eq!(viewer.fetch().unwrap(), 1);
    assert_eq!(viewer.pending_loads(), 3);

    gates.open(PayloadKind::Base, 1);
    assert_eq!(
        viewer.next_event().await,
        Some(LoadOutcome::Partial {
            key,
            kind: PayloadKind::Base
        })
    );

    let tile = viewer.cache().peek(&key).unwrap();
    assert!(tile.is_payload_ready(PayloadKind::Base));
    assert!(!tile.is_ready());

    viewer.draw();
    let frame = viewer.compositor().last_frame();
    assert!(frame.draws.is_empty());
    assert!(frame.relight.is_some());

    gates.open(PayloadKind::HighCoefficients, 1);
    assert_eq!(
        viewer.next_event().await,
        Some(LoadOutcome::Partial {
            key,
            kind: PayloadKind::HighCoefficients
        })
    );

    gates.open(PayloadKind::LowCoefficients, 1);
    assert_eq!(viewer.next_event().await, Some(LoadOutcome::Ready { key }));
    assert_eq!(viewer.next_event().await, None);

    let frame = viewer.compositor().last_frame();
    assert_eq!(frame.draws.len(), 1);
    assert!(frame.draws[0].textures.coefficients.is_some());
}

#[tokio::test]
async fn test_reverse_arrival_order() {
    let (gates, mut viewer) = relight_viewer();
    let key = make_key(0, 0, 0);
    viewer.fetch().unwrap();

    gates.open(PayloadKind::LowCoefficients, 1);
    let first = viewer.next_event().await.unwrap();
    assert!(!first.is_ready());

    gates.open(PayloadKind::HighCoefficients, 1);
    let second = viewer.next_event().await.unwrap();
    assert!(!second.is_ready());
    assert!(viewer.compositor().last_frame().draws.is_empty());

    gates.open(PayloadKind::Base, 1);
    assert_eq!(viewer.next_event().await, Some(LoadOutcome::Ready { key }));
    assert_eq!(viewer.compositor().last_keys(), vec![key]);
}

#[tokio::test]
async fn test_payloads_requested_base_high_low() {
    let resolved: Arc<Mutex<Vec<(TileKey, PayloadKind)>>> = Arc::default();
    let recorder = Arc::clone(&resolved);

    let mut viewer = Viewer::new(
        GatedLoader::new(),
        RecordingCompositor::new(),
        Size::new(512.0, 512.0),
    );
    viewer
        .set_source(
            small_source().with_relight(relight_coefficients()),
            move |key: TileKey, kind: PayloadKind| {
                recorder.lock().unwrap().push((key, kind));
                location(key, kind)
            },
        )
        .unwrap();
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    viewer.fetch().unwrap();

    let key = make_key(0, 0, 0);
    assert_eq!(
        *resolved.lock().unwrap(),
        vec![
            (key, PayloadKind::Base),
            (key, PayloadKind::HighCoefficients),
            (key, PayloadKind::LowCoefficients),
        ]
    );
}

// =============================================================================
// Lighting
// =============================================================================

#[tokio::test]
async fn test_frame_carries_uniforms() {
    let (_gates, mut viewer) = relight_viewer();
    viewer.set_light_position(1.0, 0.0).unwrap();
    viewer.draw();

    let uniforms = viewer.compositor().last_frame().relight.unwrap();
    assert_vec(uniforms.l_weight, [1.0, 0.0, 1.0]);
    assert_vec(uniforms.h_weight, [1.0, 0.0, 0.0]);
    assert_vec(uniforms.h_scale, [2.0, 2.0, 2.0]);
    assert_vec(uniforms.l_scale, [1.5, 1.5, 1.5]);
    assert_vec(uniforms.h_offset, [128.0 / 255.0, 128.0 / 255.0, 0.0]);
    assert_vec(uniforms.l_offset, [64.0 / 255.0; 3]);
}

#[tokio::test]
async fn test_light_turns_with_view() {
    let (_gates, mut viewer) = relight_viewer();
    viewer.set_light_position(1.0, 0.0).unwrap();
    viewer.set_angle(90.0).unwrap();
    viewer.draw();

    let uniforms = viewer.compositor().last_frame().relight.unwrap();
    assert_vec(uniforms.l_weight, [0.0, 1.0, 1.0]);
    assert_vec(uniforms.h_weight, [0.0, 1.0, 0.0]);

    // Setting the light again after rotating gives the same answer
    viewer.set_light_position(1.0, 0.0).unwrap();
    viewer.draw();
    let again = viewer.compositor().last_frame().relight.unwrap();
    assert_eq!(again, uniforms);
}

#[tokio::test]
async fn test_invalid_light_rejected() {
    let (_gates, mut viewer) = relight_viewer();
    assert!(viewer.set_light_position(f64::NAN, 0.0).is_err());
    assert_eq!(viewer.light().x, 0.0);
}

// =============================================================================
// Mode Switching
// =============================================================================

#[tokio::test]
async fn test_mode_switch_resets_cache() {
    let loader = TrackingLoader::new();
    let mut viewer = Viewer::new(
        loader.clone(),
        RecordingCompositor::new(),
        Size::new(512.0, 512.0),
    );
    viewer.set_source(small_source(), location).unwrap();
    viewer.set_layer(0);
    viewer.set_origin(62.5, 62.5).unwrap();
    viewer.fetch().unwrap();
    viewer.settle().await;
    assert_eq!(loader.request_count(), 1);
    assert!(!viewer.is_relight());

    viewer.set_relight(Some(relight_coefficients()));
    assert!(viewer.is_relight());
    assert!(viewer.cache().is_empty());

    viewer.fetch().unwrap();
    viewer.settle().await;
    assert_eq!(loader.request_count(), 4);
    let frame = viewer.compositor().last_frame();
    assert_eq!(frame.draws.len(), 1);
    assert!(frame.draws[0].textures.coefficients.is_some());

    // New coefficients, same mode: tiles are kept
    let other = RelightCoefficients::from_arrays(&[1.0; 6], &[0.0; 6]).unwrap();
    viewer.set_relight(Some(other));
    assert_eq!(viewer.cache().len(), 1);
    viewer.draw();
    let uniforms = viewer.compositor().last_frame().relight.unwrap();
    assert_vec(uniforms.h_scale, [1.0, 1.0, 1.0]);

    viewer.set_relight(None);
    assert!(viewer.cache().is_empty());
}
