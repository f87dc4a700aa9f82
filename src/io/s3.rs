use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{decode_tile, LoadRequest, TileLoader};
use crate::error::LoadError;
use crate::tile::Texture;

/// Loads tiles from S3 or S3-compatible storage (MinIO, GCS, etc.).
///
/// Locations may be full `s3://bucket/key` URIs or bare object keys, which
/// are read from the loader's default bucket.
#[derive(Clone)]
pub struct S3TileLoader {
    client: Client,
    bucket: String,
}

impl S3TileLoader {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Split a location into (bucket, key).
    fn object_for<'a>(&'a self, location: &'a str) -> (&'a str, &'a str) {
        match parse_s3_uri(location) {
            Some((bucket, key)) => (bucket, key),
            None => (self.bucket.as_str(), location.trim_start_matches('/')),
        }
    }
}

/// Parse `s3://bucket/key` into its parts.
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return None;
    }
    Some((bucket, key))
}

#[async_trait]
impl TileLoader for S3TileLoader {
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError> {
        let (bucket, key) = self.object_for(&request.location);
        debug!(bucket, key, tile = %request.key, kind = %request.kind, "GetObject tile");

        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if is_not_found || status_is_404 {
                    LoadError::NotFound(format!("s3://{}/{}", bucket, key))
                } else {
                    LoadError::S3(e.to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| LoadError::Connection(e.to_string()))?
            .into_bytes();

        decode_tile(&data, &request.location, request.tile_size)
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // Custom endpoints need path-style addressing
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(s3_config)
}
