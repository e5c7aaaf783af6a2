use std::sync::Arc;

use image::{imageops, RgbaImage};
use regen_protocol::{AssetId, CategoryKind};

use crate::assets::{AssetLoadError, AssetResolver};
use crate::catalog::InterventionCatalog;
use crate::selection::SelectionSnapshot;

/// Canvas stacking order, bottom to top. Cell layers sit beneath scaffolds.
pub const OVERLAY_ORDER: [CategoryKind; 3] = [
    CategoryKind::SupportCell,
    CategoryKind::Astrocyte,
    CategoryKind::Scaffold,
];

/// Overlay assets implied by `snapshot`, in stacking order.
///
/// At most one layer per category: the first active member that declares an
/// overlay.
pub fn overlay_layers(
    catalog: &InterventionCatalog,
    snapshot: &SelectionSnapshot,
) -> Vec<AssetId> {
    OVERLAY_ORDER
        .iter()
        .filter_map(|kind| {
            snapshot.active_in(*kind).iter().find_map(|id| {
                catalog
                    .intervention(*kind, id)
                    .and_then(|intervention| intervention.overlay.clone())
            })
        })
        .collect()
}

/// Source-over blends `overlays` onto a copy of `base`.
///
/// Overlays are anchored at the top-left corner; any part extending past the
/// base is clipped.
pub fn composite<'a>(
    base: &RgbaImage,
    overlays: impl IntoIterator<Item = &'a RgbaImage>,
) -> RgbaImage {
    let mut canvas = base.clone();
    for overlay in overlays {
        imageops::overlay(&mut canvas, overlay, 0, 0);
    }
    canvas
}

/// A steady-state canvas together with the overlay layers it was built from.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub layers: Vec<AssetId>,
    pub image: Arc<RgbaImage>,
}

/// Renders the steady-state canvas for a selection.
///
/// The last render is memoized on its layer list, so asking again for an
/// unchanged selection returns the same buffer without touching the resolver.
pub struct Compositor {
    catalog: Arc<InterventionCatalog>,
    assets: Arc<dyn AssetResolver>,
    memo: Option<Rendered>,
}

impl Compositor {
    pub fn new(catalog: Arc<InterventionCatalog>, assets: Arc<dyn AssetResolver>) -> Self {
        Self {
            catalog,
            assets,
            memo: None,
        }
    }

    pub fn render(&mut self, snapshot: &SelectionSnapshot) -> Result<Rendered, AssetLoadError> {
        let layers = overlay_layers(&self.catalog, snapshot);
        if let Some(memo) = self.memo.as_ref().filter(|memo| memo.layers == layers) {
            return Ok(memo.clone());
        }

        let base = self.assets.load(self.catalog.base_image())?;
        let overlays = layers
            .iter()
            .map(|asset| self.assets.load(asset))
            .collect::<Result<Vec<_>, _>>()?;
        let image = Arc::new(composite(&base, &overlays));

        tracing::debug!(
            target: "regen_sim::compositor",
            revision = snapshot.revision(),
            layers = layers.len(),
            width = image.width(),
            height = image.height(),
            "canvas.rendered"
        );
        let rendered = Rendered { layers, image };
        self.memo = Some(rendered.clone());
        Ok(rendered)
    }

    /// Drops the memoized canvas, forcing the next render to reload assets.
    pub fn invalidate(&mut self) {
        self.memo = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::InMemoryAssets;
    use crate::catalog::CatalogVariant;
    use crate::selection::SelectionStore;
    use image::Rgba;
    use regen_protocol::InterventionId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAssets {
        inner: InMemoryAssets,
        loads: AtomicUsize,
    }

    impl AssetResolver for CountingAssets {
        fn load(&self, asset: &AssetId) -> Result<RgbaImage, AssetLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(asset)
        }
    }

    fn solid(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(rgba))
    }

    fn standard_assets() -> InMemoryAssets {
        InMemoryAssets::new()
            .with("icons/injured_axon_gap.png", solid([10, 10, 10, 255]))
            .with("gifs/schwann_cell_overlay.png", solid([200, 0, 0, 128]))
            .with("gifs/astrocyte_overlay.png", solid([0, 200, 0, 128]))
            .with("gifs/laminin_overlay.png", solid([0, 0, 200, 255]))
            .with("gifs/hydrogel_overlay.png", solid([0, 0, 0, 0]))
    }

    #[test]
    fn layers_follow_fixed_stacking_order() {
        let catalog = InterventionCatalog::builtin();
        let mut store = SelectionStore::new(Arc::clone(&catalog));
        store
            .activate(CategoryKind::Scaffold, &InterventionId::new("Laminin"))
            .expect("scaffold accepted");
        store
            .activate(CategoryKind::Astrocyte, &InterventionId::new("Astrocyte"))
            .expect("astrocyte accepted");
        store
            .activate(CategoryKind::SupportCell, &InterventionId::new("Schwann"))
            .expect("support accepted");
        store
            .activate(CategoryKind::IntrinsicProgram, &InterventionId::new("KLF7"))
            .expect("program accepted");

        let layers = overlay_layers(&catalog, &store.snapshot());
        assert_eq!(
            layers,
            vec![
                AssetId::new("gifs/schwann_cell_overlay.png"),
                AssetId::new("gifs/astrocyte_overlay.png"),
                AssetId::new("gifs/laminin_overlay.png"),
            ]
        );
    }

    #[test]
    fn folded_astrocyte_renders_on_the_support_layer() {
        let catalog = InterventionCatalog::variant(CatalogVariant::AstrocyteFolded);
        let mut store = SelectionStore::new(Arc::clone(&catalog));
        store
            .activate(CategoryKind::SupportCell, &InterventionId::new("Astrocyte"))
            .expect("astrocyte accepted");
        assert_eq!(
            overlay_layers(&catalog, &store.snapshot()),
            vec![AssetId::new("gifs/astrocyte_overlay.png")]
        );
    }

    #[test]
    fn empty_selection_renders_the_base_image() {
        let assets = standard_assets();
        let base = assets
            .load(&AssetId::new("icons/injured_axon_gap.png"))
            .expect("base present");
        let mut compositor = Compositor::new(InterventionCatalog::builtin(), Arc::new(assets));
        let rendered = compositor
            .render(&SelectionSnapshot::default())
            .expect("render succeeds");
        assert!(rendered.layers.is_empty());
        assert_eq!(rendered.image.as_raw(), base.as_raw());
    }

    #[test]
    fn opaque_top_layer_wins_and_transparent_layer_is_invisible() {
        let base = solid([10, 10, 10, 255]);
        let clear = solid([255, 255, 255, 0]);
        let opaque = solid([0, 0, 200, 255]);
        assert_eq!(composite(&base, [&clear]).as_raw(), base.as_raw());
        assert_eq!(composite(&base, [&clear, &opaque]).as_raw(), opaque.as_raw());
    }

    #[test]
    fn half_transparent_overlay_blends_with_base() {
        let base = solid([0, 0, 0, 255]);
        let overlay = solid([200, 100, 0, 128]);
        let out = composite(&base, [&overlay]);
        let pixel = out.get_pixel(0, 0).0;
        assert_eq!(pixel[3], 255);
        assert!((95..=105).contains(&pixel[0]), "{pixel:?}");
        assert!((45..=55).contains(&pixel[1]), "{pixel:?}");
        assert_eq!(pixel[2], 0);
    }

    #[test]
    fn smaller_overlay_is_anchored_top_left() {
        let base = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let patch = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = composite(&base, [&patch]);
        assert_eq!(out.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn repeated_renders_are_identical_and_memoized() {
        let catalog = InterventionCatalog::builtin();
        let counting = Arc::new(CountingAssets {
            inner: standard_assets(),
            loads: AtomicUsize::new(0),
        });
        let mut compositor = Compositor::new(Arc::clone(&catalog), counting.clone());
        let mut store = SelectionStore::new(catalog);
        store
            .activate(CategoryKind::SupportCell, &InterventionId::new("Schwann"))
            .expect("support accepted");
        let snapshot = store.snapshot();

        let first = compositor.render(&snapshot).expect("first render");
        let loads_after_first = counting.loads.load(Ordering::SeqCst);
        let second = compositor.render(&snapshot).expect("second render");
        assert!(Arc::ptr_eq(&first.image, &second.image));
        assert_eq!(first.layers, second.layers);
        assert_eq!(counting.loads.load(Ordering::SeqCst), loads_after_first);

        compositor.invalidate();
        let third = compositor.render(&snapshot).expect("third render");
        assert_eq!(first.image.as_raw(), third.image.as_raw());
        assert!(counting.loads.load(Ordering::SeqCst) > loads_after_first);
    }

    #[test]
    fn missing_overlay_surfaces_as_load_failure() {
        let catalog = InterventionCatalog::builtin();
        let mut compositor = Compositor::new(Arc::clone(&catalog), Arc::new(standard_assets()));
        let mut store = SelectionStore::new(catalog);
        store
            .activate(CategoryKind::Scaffold, &InterventionId::new("BDNF"))
            .expect("scaffold accepted");
        let err = compositor
            .render(&store.snapshot())
            .expect_err("BDNF overlay is not loaded");
        assert_eq!(err.asset().as_str(), "gifs/BDNF_overlay.png");
    }

    #[test]
    fn render_reports_the_layers_it_stacked() {
        let catalog = InterventionCatalog::builtin();
        let mut compositor = Compositor::new(Arc::clone(&catalog), Arc::new(standard_assets()));
        let mut store = SelectionStore::new(Arc::clone(&catalog));
        store
            .activate(CategoryKind::Scaffold, &InterventionId::new("Laminin"))
            .expect("scaffold accepted");
        store
            .activate(CategoryKind::SupportCell, &InterventionId::new("Schwann"))
            .expect("support accepted");
        let snapshot = store.snapshot();

        let rendered = compositor.render(&snapshot).expect("render succeeds");
        assert_eq!(rendered.layers, overlay_layers(&catalog, &snapshot));
        assert_eq!(rendered.layers.len(), 2);
        let memoized = compositor.render(&snapshot).expect("memoized render");
        assert_eq!(memoized.layers, rendered.layers);
    }
}
