//! GPU textures for image handles, released when no state owner remains.

use std::collections::HashMap;

use client_core::ImageHandle;
use eframe::egui;
use egui::TextureHandle;
use shared::domain::HandleId;

const MAX_PREVIEW_DIMENSION: u32 = 1024;

#[derive(Default)]
pub struct TextureCache {
    // `None` records a decode failure so it is not retried every frame.
    entries: HashMap<HandleId, Option<TextureHandle>>,
}

impl TextureCache {
    pub fn get_or_load(
        &mut self,
        ctx: &egui::Context,
        image: &ImageHandle,
    ) -> Option<TextureHandle> {
        self.entries
            .entry(image.id())
            .or_insert_with(|| match decode_preview_image(image.bytes()) {
                Ok(color_image) => Some(ctx.load_texture(
                    format!("image:{}", image.id().0),
                    color_image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(err) => {
                    tracing::warn!(name = image.name(), "failed to decode preview: {err}");
                    None
                }
            })
            .clone()
    }

    /// Drops every texture whose handle is not in `live`; returns how many.
    pub fn prune(&mut self, live: &[HandleId]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id));
        let released = before - self.entries.len();
        if released > 0 {
            tracing::debug!(released, "released textures");
        }
        released
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn contains(&self, id: HandleId) -> bool {
        self.entries.contains_key(&id)
    }
}

pub fn decode_preview_image(bytes: &[u8]) -> Result<egui::ColorImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = dynamic
        .thumbnail(MAX_PREVIEW_DIMENSION, MAX_PREVIEW_DIMENSION)
        .to_rgba8();
    let size = [resized.width() as usize, resized.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, resized.as_raw()))
}

#[cfg(test)]
mod tests {
    use client_core::transforms::encode_png;

    use super::*;

    fn png(width: u32, height: u32) -> ImageHandle {
        let raster = image::RgbaImage::from_pixel(width, height, image::Rgba([1, 2, 3, 255]));
        ImageHandle::new("tile.png", "image/png", encode_png(&raster).expect("png"))
    }

    #[test]
    fn decodes_small_images_at_full_size() {
        let handle = png(5, 3);
        let color = decode_preview_image(handle.bytes()).expect("decode");
        assert_eq!(color.size, [5, 3]);
    }

    #[test]
    fn large_previews_are_downscaled() {
        let handle = png(2048, 512);
        let color = decode_preview_image(handle.bytes()).expect("decode");
        assert_eq!(color.size[0], 1024);
        assert!(color.size[1] <= 256);
    }

    #[test]
    fn prune_keeps_only_live_handles() {
        let ctx = egui::Context::default();
        let mut cache = TextureCache::default();
        let kept = png(2, 2);
        let released = png(2, 2);
        let broken = ImageHandle::new("broken.png", "image/png", vec![1, 2, 3]);

        assert!(cache.get_or_load(&ctx, &kept).is_some());
        assert!(cache.get_or_load(&ctx, &released).is_some());
        assert!(cache.get_or_load(&ctx, &broken).is_none());
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.prune(&[kept.id()]), 2);
        assert!(cache.contains(kept.id()));
        assert!(!cache.contains(released.id()));
        assert!(!cache.contains(broken.id()));
    }

    #[test]
    fn repeated_lookups_reuse_the_texture() {
        let ctx = egui::Context::default();
        let mut cache = TextureCache::default();
        let handle = png(3, 3);
        let first = cache.get_or_load(&ctx, &handle).expect("texture");
        let second = cache.get_or_load(&ctx, &handle).expect("texture");
        assert_eq!(first.id(), second.id());
        assert_eq!(cache.len(), 1);
    }
}
