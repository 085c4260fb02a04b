use crate::clut::{fingerprint, greyscale_palette, Palette, CHROMA_KEY};
use crate::page::{TexturePage, TexturePages};
use crate::set::TextureSet;
use crate::{CrmFile, TEXTURE_SIZE};
use image::RgbaImage;
use serde::Deserialize;
use srmodel::Model;
use std::collections::HashMap;

const QUANTUM: u32 = 16;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    /// Pages no polygon references stay greyscale instead of borrowing the
    /// most common CLUT of the whole file.
    pub always_use_greyscale_for_missing_palettes: bool,
    /// Gives fully transparent textures a uniform alpha of 128.
    pub unhide_completely_transparent_textures: bool,
    /// Also build one bitmap per (texture, CLUT) pair.
    pub use_each_unique_texture_clut_variation: bool,
    /// Snaps polygon UV rectangles outwards to a 16 texel grid.
    pub quantize_bounds: bool,
    /// Start from greyscale pages instead of the chroma key.
    pub draw_greyscale_first: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            always_use_greyscale_for_missing_palettes: false,
            unhide_completely_transparent_textures: false,
            use_each_unique_texture_clut_variation: false,
            quantize_bounds: true,
            draw_greyscale_first: false,
        }
    }
}

/// What one polygon contributes to its texture page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureUse {
    pub texture_id: u16,
    pub clut: u16,
    pub texels: [[u8; 2]; 3],
    pub color: u32,
    pub visible: bool,
    pub texture_used: bool,
}

/// Collects the texture footprint of every polygon of `model`.
pub fn texture_uses(model: &Model) -> Vec<TextureUse> {
    model
        .polygons
        .iter()
        .filter_map(|polygon| {
            let material = model.material_of(polygon)?;
            Some(TextureUse {
                texture_id: material.texture_id,
                clut: polygon.clut,
                texels: polygon.texels,
                color: material.color,
                visible: material.visible,
                texture_used: material.texture_used,
            })
        })
        .collect()
}

/// Half-open texel rectangle `[min, max)` on one page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UvRect {
    pub u_min: u32,
    pub u_max: u32,
    pub v_min: u32,
    pub v_max: u32,
}

impl UvRect {
    pub fn is_empty(&self) -> bool {
        self.u_min >= self.u_max || self.v_min >= self.v_max
    }
}

pub fn uv_rect(texels: &[[u8; 2]; 3], quantize: bool) -> UvRect {
    let us = texels.map(|[u, _]| u32::from(u));
    let vs = texels.map(|[_, v]| u32::from(v));
    let mut rect = UvRect {
        u_min: us.iter().copied().min().unwrap_or(0),
        u_max: us.iter().copied().max().unwrap_or(0),
        v_min: vs.iter().copied().min().unwrap_or(0),
        v_max: vs.iter().copied().max().unwrap_or(0),
    };
    if quantize {
        rect.u_min -= rect.u_min % QUANTUM;
        rect.v_min -= rect.v_min % QUANTUM;
        rect.u_max = rect.u_max.div_ceil(QUANTUM) * QUANTUM;
        rect.v_max = rect.v_max.div_ceil(QUANTUM) * QUANTUM;
        rect.u_max = rect.u_max.min(TEXTURE_SIZE);
        rect.v_max = rect.v_max.min(TEXTURE_SIZE);
    }
    rect
}

/// Fingerprints written to the texels of one page during a single build.
#[derive(Debug, Default)]
struct Ownership {
    owners: HashMap<u32, u64>,
}

impl Ownership {
    /// Decides whether a write may land. A texel already holding a different
    /// color only changes hands when `may_override` is set.
    fn claim(&mut self, offset: u32, print: u64, may_override: bool) -> bool {
        match self.owners.get(&offset) {
            Some(&owner) if owner != print && !may_override => false,
            _ => {
                self.owners.insert(offset, print);
                true
            }
        }
    }
}

fn paint(page: &TexturePage, palette: &Palette) -> RgbaImage {
    RgbaImage::from_fn(TEXTURE_SIZE, TEXTURE_SIZE, |x, y| {
        palette[usize::from(page.pixel(x, y))]
    })
}

/// Every page drawn with the greyscale palette.
pub fn build_greyscale_textures(crm: &CrmFile) -> TextureSet {
    let pages = TexturePages::new(crm, true);
    let grey = greyscale_palette();
    TextureSet {
        textures: pages.iter().map(|page| paint(page, &grey)).collect(),
        variants: HashMap::new(),
    }
}

/// Rebuilds every page of `crm` from the polygons that sample it.
pub fn build_textures(crm: &CrmFile, uses: &[TextureUse], options: &TextureOptions) -> TextureSet {
    let mut pages = TexturePages::new(crm, options.always_use_greyscale_for_missing_palettes);

    let mut usable = Vec::with_capacity(uses.len());
    for texture_use in uses {
        if pages.register_clut(usize::from(texture_use.texture_id), texture_use.clut) {
            usable.push(texture_use);
        } else {
            log::warn!(
                "polygon references texture {} but the file has {} pages, skipping",
                texture_use.texture_id,
                pages.len()
            );
        }
    }

    let grey = greyscale_palette();
    let mut textures: Vec<RgbaImage> = pages
        .iter()
        .map(|page| {
            if options.draw_greyscale_first {
                paint(page, &grey)
            } else {
                RgbaImage::from_pixel(TEXTURE_SIZE, TEXTURE_SIZE, CHROMA_KEY)
            }
        })
        .collect();
    let mut ownership: Vec<Ownership> = pages.iter().map(|_| Ownership::default()).collect();
    let mut variants = HashMap::new();

    for texture_use in usable {
        let id = usize::from(texture_use.texture_id);
        let palette = pages.palette(texture_use.clut);
        let Some(page) = pages.get(id) else {
            continue;
        };

        if options.use_each_unique_texture_clut_variation {
            variants
                .entry((texture_use.texture_id, texture_use.clut))
                .or_insert_with(|| paint(page, &palette));
        }

        let rect = uv_rect(&texture_use.texels, options.quantize_bounds);
        let may_override = texture_use.visible && texture_use.texture_used;
        for y in rect.v_min..rect.v_max {
            for x in rect.u_min..rect.u_max {
                let color = palette[usize::from(page.pixel(x, y))];
                if ownership[id].claim(y * TEXTURE_SIZE + x, fingerprint(color), may_override) {
                    textures[id].put_pixel(x, y, color);
                }
            }
        }
    }

    for (id, texture) in textures.iter_mut().enumerate() {
        let common = pages.common_palette(id);
        let Some(page) = pages.get(id) else {
            continue;
        };

        let mut any_visible = false;
        for (x, y, pixel) in texture.enumerate_pixels_mut() {
            if pixel[3] > 1 {
                any_visible = true;
            }
            if pixel[3] == CHROMA_KEY[3] {
                *pixel = common[usize::from(page.pixel(x, y))];
            }
        }

        if !any_visible && options.unhide_completely_transparent_textures {
            for pixel in texture.pixels_mut() {
                if pixel[3] < 2 {
                    pixel[3] = 128;
                }
            }
        }
    }

    log::debug!(
        "built {} textures from {} polygons, {} CLUT variants",
        textures.len(),
        uses.len(),
        variants.len()
    );

    TextureSet { textures, variants }
}
