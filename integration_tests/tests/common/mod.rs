#![allow(dead_code)]

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use regen_sim::{CatalogVariant, InMemoryAssets, InterventionCatalog, SimulationController};

pub const FRAME_WIDTH: u32 = 12;
pub const FRAME_HEIGHT: u32 = 8;

/// In-memory stand-ins for every asset a catalog references.
///
/// The base image is opaque; every other asset gets its own translucent
/// colour so overlay combinations render distinguishably.
pub fn lab_assets(catalog: &InterventionCatalog) -> InMemoryAssets {
    let mut assets = InMemoryAssets::new();
    for (index, asset) in catalog.referenced_assets().into_iter().enumerate() {
        let image = if asset == *catalog.base_image() {
            RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([32, 24, 40, 255]))
        } else {
            let step = (index as u32 * 37 % 200) as u8;
            RgbaImage::from_pixel(
                FRAME_WIDTH,
                FRAME_HEIGHT,
                Rgba([55 + step, 200 - step / 2, step, 140]),
            )
        };
        assets.insert(asset, image);
    }
    assets
}

pub fn session(variant: CatalogVariant, seed: u64) -> SimulationController {
    let catalog = InterventionCatalog::variant(variant);
    let assets = Arc::new(lab_assets(&catalog));
    SimulationController::with_seed(catalog, assets, seed)
}

pub fn standard_session(seed: u64) -> SimulationController {
    session(CatalogVariant::Standard, seed)
}
