use image::RgbaImage;
use std::collections::HashMap;

/// Finished bitmaps: one per texture page, plus optional per-CLUT variants.
#[derive(Clone, Debug, Default)]
pub struct TextureSet {
    pub(crate) textures: Vec<RgbaImage>,
    pub(crate) variants: HashMap<(u16, u16), RgbaImage>,
}

impl TextureSet {
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn texture(&self, texture_id: u16) -> Option<&RgbaImage> {
        self.textures.get(usize::from(texture_id))
    }

    pub fn textures(&self) -> &[RgbaImage] {
        &self.textures
    }

    /// Bitmap of `texture_id` drawn with `clut`. Falls back to the page
    /// bitmap when that variant was never built.
    pub fn texture_with_clut(&self, texture_id: u16, clut: u16) -> Option<&RgbaImage> {
        if let Some(variant) = self.variants.get(&(texture_id, clut)) {
            return Some(variant);
        }
        log::warn!(
            "no CLUT {clut:#06x} variation of texture {texture_id}, returning the default version"
        );
        self.texture(texture_id)
    }

    pub fn has_variant(&self, texture_id: u16, clut: u16) -> bool {
        self.variants.contains_key(&(texture_id, clut))
    }

    /// Variant keys sorted by texture id, then CLUT.
    pub fn variant_keys(&self) -> Vec<(u16, u16)> {
        let mut keys: Vec<_> = self.variants.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}
