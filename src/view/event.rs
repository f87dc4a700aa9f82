use crate::error::LoadError;
use crate::tile::{PayloadKind, Texture, TileGeneration, TileKey};

/// Completion of one payload load, sent from the load task to the viewer.
#[derive(Debug)]
pub(crate) struct LoadEvent {
    pub key: TileKey,
    pub generation: TileGeneration,
    pub kind: PayloadKind,
    pub result: Result<Texture, LoadError>,
}

/// What applying a load completion did to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The last missing payload arrived; the tile is drawable and a redraw
    /// was issued.
    Ready { key: TileKey },

    /// A payload arrived but the tile still waits for others.
    Partial { key: TileKey, kind: PayloadKind },

    /// The load failed. The payload stays missing.
    Failed { key: TileKey, kind: PayloadKind },

    /// The tile this load was issued for is gone.
    Stale { key: TileKey, kind: PayloadKind },
}

impl LoadOutcome {
    pub fn key(&self) -> TileKey {
        match self {
            LoadOutcome::Ready { key }
            | LoadOutcome::Partial { key, .. }
            | LoadOutcome::Failed { key, .. }
            | LoadOutcome::Stale { key, .. } => *key,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Ready { .. })
    }
}
