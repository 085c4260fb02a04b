use crate::clut::{greyscale_palette, read_palette, Palette};
use crate::{CrmFile, PAGE_WORDS, TEXTURE_SIZE};
use std::collections::{BTreeMap, HashMap};

const SIDE: usize = TEXTURE_SIZE as usize;

/// One 256x256 plane of 8-bit palette indices and the CLUTs polygons used
/// with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TexturePage {
    pub index: usize,
    pixels: Vec<u8>,
    clut_refs: BTreeMap<u16, u32>,
}

impl TexturePage {
    /// Cuts page `index` out of the plane. Pages are tiled row-major, each
    /// word holds two texels with the left one in the low byte.
    pub fn cut(crm: &CrmFile, index: usize) -> Self {
        let per_row = (crm.width / PAGE_WORDS).max(1);
        let origin_x = (index % per_row) * PAGE_WORDS;
        let origin_y = (index / per_row) * SIDE;

        let mut pixels = vec![0u8; SIDE * SIDE];
        for y in 0..SIDE {
            for wx in 0..PAGE_WORDS {
                let word = crm
                    .word(origin_x + wx, origin_y + y)
                    .unwrap_or_default();
                let [lo, hi] = word.to_le_bytes();
                pixels[y * SIDE + wx * 2] = lo;
                pixels[y * SIDE + wx * 2 + 1] = hi;
            }
        }

        Self {
            index,
            pixels,
            clut_refs: BTreeMap::new(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * SIDE + x as usize]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn register_clut(&mut self, clut: u16) {
        *self.clut_refs.entry(clut).or_insert(0) += 1;
    }

    pub fn clut_refs(&self) -> &BTreeMap<u16, u32> {
        &self.clut_refs
    }

    pub fn ref_count(&self, clut: u16) -> u32 {
        self.clut_refs.get(&clut).copied().unwrap_or(0)
    }

    /// CLUT with the most references; the lowest id wins a tie.
    pub fn most_common_clut(&self) -> Option<u16> {
        most_common(&self.clut_refs)
    }
}

fn most_common(refs: &BTreeMap<u16, u32>) -> Option<u16> {
    let mut best: Option<(u16, u32)> = None;
    for (&clut, &count) in refs {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((clut, count));
        }
    }
    best.map(|(clut, _)| clut)
}

/// All pages of one CRM plane plus the palettes resolved so far.
#[derive(Clone, Debug)]
pub struct TexturePages<'a> {
    crm: &'a CrmFile,
    pages: Vec<TexturePage>,
    palettes: HashMap<u16, Palette>,
    greyscale_for_missing: bool,
}

impl<'a> TexturePages<'a> {
    pub fn new(crm: &'a CrmFile, greyscale_for_missing: bool) -> Self {
        let pages = (0..crm.page_count())
            .map(|index| TexturePage::cut(crm, index))
            .collect();
        Self {
            crm,
            pages,
            palettes: HashMap::new(),
            greyscale_for_missing,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TexturePage> {
        self.pages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TexturePage> {
        self.pages.iter()
    }

    /// Returns false when the texture id has no page.
    pub fn register_clut(&mut self, texture_id: usize, clut: u16) -> bool {
        match self.pages.get_mut(texture_id) {
            Some(page) => {
                page.register_clut(clut);
                true
            }
            None => false,
        }
    }

    /// Palette of `clut`. A CLUT outside the plane decodes as greyscale.
    pub fn palette(&mut self, clut: u16) -> Palette {
        if let Some(palette) = self.palettes.get(&clut) {
            return *palette;
        }
        let palette = read_palette(self.crm, clut).unwrap_or_else(|| {
            log::warn!("CLUT {clut:#06x} lies outside the texture plane, using greyscale");
            greyscale_palette()
        });
        self.palettes.insert(clut, palette);
        palette
    }

    /// Most referenced CLUT over every page.
    pub fn global_common_clut(&self) -> Option<u16> {
        let mut totals = BTreeMap::new();
        for page in &self.pages {
            for (&clut, &count) in page.clut_refs() {
                *totals.entry(clut).or_insert(0u32) += count;
            }
        }
        most_common(&totals)
    }

    /// Palette used for texels no polygon claimed.
    pub fn common_palette(&mut self, index: usize) -> Palette {
        let own = self.pages.get(index).and_then(TexturePage::most_common_clut);
        let clut = match own {
            Some(clut) => Some(clut),
            None if self.greyscale_for_missing => None,
            None => self.global_common_clut(),
        };
        match clut {
            Some(clut) => self.palette(clut),
            None => greyscale_palette(),
        }
    }
}
