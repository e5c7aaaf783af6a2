use std::collections::HashMap;
use std::path::PathBuf;

use image::RgbaImage;
use regen_protocol::AssetId;
use thiserror::Error;

/// Loads image assets by symbolic name.
///
/// Implementations must be deterministic: the same id always yields the same
/// pixels, otherwise compositing stops being idempotent.
pub trait AssetResolver: Send + Sync {
    fn load(&self, asset: &AssetId) -> Result<RgbaImage, AssetLoadError>;
}

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("asset {asset} could not be found")]
    Missing { asset: AssetId },
    #[error("failed to decode asset {asset} from {path:?}: {source}")]
    Decode {
        asset: AssetId,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl AssetLoadError {
    pub fn asset(&self) -> &AssetId {
        match self {
            AssetLoadError::Missing { asset } | AssetLoadError::Decode { asset, .. } => asset,
        }
    }
}

/// Resolves asset ids as paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileAssetResolver {
    root: PathBuf,
}

impl FileAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, asset: &AssetId) -> PathBuf {
        self.root.join(asset.as_str())
    }
}

impl AssetResolver for FileAssetResolver {
    fn load(&self, asset: &AssetId) -> Result<RgbaImage, AssetLoadError> {
        let path = self.path_for(asset);
        if !path.is_file() {
            return Err(AssetLoadError::Missing {
                asset: asset.clone(),
            });
        }
        let image = image::open(&path).map_err(|source| AssetLoadError::Decode {
            asset: asset.clone(),
            path: path.clone(),
            source,
        })?;
        tracing::trace!(
            target: "regen_sim::assets",
            asset = %asset,
            path = %path.display(),
            "asset.decoded"
        );
        Ok(image.into_rgba8())
    }
}

/// Asset store backed by decoded images held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    images: HashMap<AssetId, RgbaImage>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: AssetId, image: RgbaImage) -> Option<RgbaImage> {
        self.images.insert(asset, image)
    }

    pub fn with(mut self, asset: impl Into<AssetId>, image: RgbaImage) -> Self {
        self.images.insert(asset.into(), image);
        self
    }

    pub fn remove(&mut self, asset: &AssetId) -> Option<RgbaImage> {
        self.images.remove(asset)
    }
}

impl AssetResolver for InMemoryAssets {
    fn load(&self, asset: &AssetId) -> Result<RgbaImage, AssetLoadError> {
        self.images
            .get(asset)
            .cloned()
            .ok_or_else(|| AssetLoadError::Missing {
                asset: asset.clone(),
            })
    }
}
