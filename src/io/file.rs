use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{decode_tile, LoadRequest, TileLoader};
use crate::error::LoadError;
use crate::tile::Texture;

/// Loads tiles from the local filesystem.
///
/// Relative locations are joined onto an optional root directory; absolute
/// locations are read as they are.
#[derive(Debug, Clone, Default)]
pub struct FileTileLoader {
    root: Option<PathBuf>,
}

impl FileTileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        let location = location.strip_prefix("file://").unwrap_or(location);
        match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl TileLoader for FileTileLoader {
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError> {
        let path = self.path_for(&request.location);
        debug!(path = %path.display(), key = %request.key, kind = %request.kind, "reading tile");

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                LoadError::NotFound(path.display().to_string())
            } else {
                LoadError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        decode_tile(&data, &request.location, request.tile_size)
    }
}
