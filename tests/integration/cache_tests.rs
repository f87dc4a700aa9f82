//! Tile cache and pyramid integration tests.
//!
//! Tests verify:
//! - Capacity derived from the viewport
//! - Eviction trims to 80% and keeps the most precious tiles
//! - Coarse layers outlive stale fine tiles
//! - Bookkeeping violations are reported, not absorbed

use std::collections::HashMap;

use pyramid_viewer::{
    badness, capacity_for, CacheError, Dimensions, EvictionWeights, PayloadKind, PyramidModel,
    Size, Tile, TileCache, TileGeneration, TileKey,
};

use super::test_utils::make_key;

fn loading_tile(key: TileKey) -> Tile {
    Tile::new(key, TileGeneration(0), PayloadKind::PLAIN)
}

// =============================================================================
// Pyramid
// =============================================================================

#[test]
fn test_pyramid_layers() {
    let pyramid =
        PyramidModel::new(Dimensions::new(1000, 1000), Dimensions::new(256, 256), 4).unwrap();

    let finest = pyramid.layer(3).unwrap();
    assert_eq!((finest.width, finest.height), (1000, 1000));
    assert_eq!((finest.tiles_across, finest.tiles_down), (4, 4));

    let coarsest = pyramid.layer(0).unwrap();
    assert_eq!((coarsest.width, coarsest.height), (125, 125));
    assert_eq!((coarsest.tiles_across, coarsest.tiles_down), (1, 1));
    assert_eq!(coarsest.shrink, 8);
}

// =============================================================================
// Capacity and Eviction
// =============================================================================

#[test]
fn test_capacity_for_viewport() {
    assert_eq!(
        capacity_for(Size::new(512.0, 512.0), Dimensions::new(256, 256)),
        27
    );
    // A viewport one pixel wider than a tile straddles three columns
    assert_eq!(
        capacity_for(Size::new(258.0, 258.0), Dimensions::new(256, 256)),
        27
    );
}

#[test]
fn test_eviction_keeps_most_precious() {
    let mut cache = TileCache::new(27);
    let weights = EvictionWeights::default();

    for i in 0..30u32 {
        cache.tick();
        cache.insert(loading_tile(make_key(i % 5, i, 0))).unwrap();
    }
    assert_eq!(cache.len(), 30);

    let last_used: HashMap<TileKey, u64> = cache
        .keys()
        .iter()
        .map(|k| (*k, cache.peek(k).unwrap().last_used()))
        .collect();

    cache.tick();
    let now = cache.now();
    let evicted = cache.evict_if_over_capacity(4).unwrap();

    assert!(cache.len() <= 22);
    assert_eq!(cache.len() + evicted.len(), 30);

    let score = |key: &TileKey| badness(&weights, now, 4, key.layer, last_used[key]);
    let worst_survivor = cache.keys().iter().map(score).max().unwrap();
    let best_evicted = evicted.iter().map(score).min().unwrap();
    assert!(worst_survivor <= best_evicted);

    for key in &evicted {
        assert!(!cache.contains(key));
    }
}

#[test]
fn test_eviction_not_triggered_at_capacity() {
    let mut cache = TileCache::new(10);
    for col in 0..10 {
        cache.insert(loading_tile(make_key(3, col, 0))).unwrap();
    }
    assert!(cache.evict_if_over_capacity(3).unwrap().is_empty());
    assert_eq!(cache.len(), 10);
}

#[test]
fn test_coarse_layers_survive() {
    let mut cache = TileCache::new(10);

    // Old coarse tiles
    cache.insert(loading_tile(make_key(0, 0, 0))).unwrap();
    cache.insert(loading_tile(make_key(1, 0, 0))).unwrap();
    cache.insert(loading_tile(make_key(1, 1, 0))).unwrap();
    for _ in 0..50 {
        cache.tick();
    }

    // Fresh tiles on the current and a neighbouring layer
    for col in 0..5 {
        cache.insert(loading_tile(make_key(6, col, 0))).unwrap();
    }
    for col in 0..5 {
        cache.insert(loading_tile(make_key(5, col, 0))).unwrap();
    }

    let evicted = cache.evict_if_over_capacity(6).unwrap();
    assert_eq!(cache.len(), 8);
    assert_eq!(evicted.len(), 5);

    assert!(cache.contains(&make_key(0, 0, 0)));
    assert!(cache.contains(&make_key(1, 0, 0)));
    assert!(cache.contains(&make_key(1, 1, 0)));
    assert!(evicted.iter().all(|k| k.layer == 5));
}

#[test]
fn test_custom_weights_change_order() {
    // Pure recency: coarse tiles get no protection
    let weights = EvictionWeights {
        recency: 1,
        layer_distance: 0,
        coarse_bonus: 0,
        coarse_threshold: 0,
    };
    let mut cache = TileCache::with_weights(2, weights);

    cache.insert(loading_tile(make_key(0, 0, 0))).unwrap();
    cache.tick();
    cache.insert(loading_tile(make_key(4, 0, 0))).unwrap();
    cache.tick();
    cache.insert(loading_tile(make_key(4, 1, 0))).unwrap();

    let evicted = cache.evict_if_over_capacity(4).unwrap();
    assert_eq!(evicted, vec![make_key(0, 0, 0), make_key(4, 0, 0)]);
    assert_eq!(cache.keys(), &[make_key(4, 1, 0)]);
}

// =============================================================================
// Bookkeeping
// =============================================================================

#[test]
fn test_duplicate_insert_rejected() {
    let mut cache = TileCache::new(10);
    let key = make_key(2, 1, 1);
    cache.insert(loading_tile(key)).unwrap();

    let err = cache.insert(loading_tile(key)).unwrap_err();
    assert_eq!(err, CacheError::DuplicateTile { key });
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.keys(), &[key]);
}

#[test]
fn test_pop_empty_rejected() {
    let mut cache = TileCache::new(10);
    assert_eq!(cache.pop().unwrap_err(), CacheError::EmptyTileList);
}

#[test]
fn test_get_touches_peek_does_not() {
    let mut cache = TileCache::new(10);
    let key = make_key(1, 0, 0);
    cache.insert(loading_tile(key)).unwrap();

    cache.tick();
    cache.tick();
    assert_eq!(cache.peek(&key).unwrap().last_used(), 0);
    assert_eq!(cache.get(&key).unwrap().last_used(), 2);
    assert!(cache.get(&make_key(9, 9, 9)).is_none());
    assert!(!cache.contains(&make_key(9, 9, 9)));
}
