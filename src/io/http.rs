use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{decode_tile, LoadRequest, TileLoader};
use crate::error::LoadError;
use crate::tile::Texture;

/// Default per-request timeout.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads tiles over HTTP(S).
///
/// The request location is used as the URL as-is.
#[derive(Clone)]
pub struct HttpTileLoader {
    client: Client,
}

impl HttpTileLoader {
    /// Create a loader whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a loader around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TileLoader for HttpTileLoader {
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError> {
        let url = &request.location;
        debug!(url = %url, key = %request.key, kind = %request.kind, "GET tile");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Connection(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(LoadError::NotFound(url.clone())),
            status if !status.is_success() => {
                return Err(LoadError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LoadError::Connection(e.to_string()))?;

        decode_tile(&body, url, request.tile_size)
    }
}
