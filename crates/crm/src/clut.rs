use crate::CrmFile;
use image::Rgba;

pub const PALETTE_LEN: usize = 256;

/// Marks texels no polygon has claimed yet.
pub const CHROMA_KEY: Rgba<u8> = Rgba([128, 128, 128, 1]);

pub type Palette = [Rgba<u8>; PALETTE_LEN];

/// Position of a CLUT inside the VRAM plane, in words.
pub fn clut_origin(clut: u16) -> (usize, usize) {
    (usize::from(clut & 0x3F) * 16, usize::from(clut >> 6))
}

fn expand5(v: u16) -> u8 {
    ((u32::from(v) * 255 + 15) / 31) as u8
}

/// PSX 15-bit color. An all-zero word is the transparent color.
pub fn psx_color(word: u16) -> Rgba<u8> {
    if word == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let r = expand5(word & 0x1F);
    let g = expand5((word >> 5) & 0x1F);
    let b = expand5((word >> 10) & 0x1F);
    Rgba([r, g, b, 255])
}

pub fn greyscale_palette() -> Palette {
    let mut palette = [Rgba([0, 0, 0, 255]); PALETTE_LEN];
    for (i, color) in palette.iter_mut().enumerate() {
        // Index fits a byte.
        let level = i as u8;
        *color = Rgba([level, level, level, 255]);
    }
    palette
}

/// Reads the 256 colors of `clut`, or `None` when the row does not fit the
/// plane.
pub fn read_palette(crm: &CrmFile, clut: u16) -> Option<Palette> {
    let (x, y) = clut_origin(clut);
    if x.checked_add(PALETTE_LEN)? > crm.width {
        return None;
    }
    let mut palette = [Rgba([0, 0, 0, 0]); PALETTE_LEN];
    for (i, color) in palette.iter_mut().enumerate() {
        *color = psx_color(crm.word(x + i, y)?);
    }
    Some(palette)
}

/// 64-bit key used to tell two writes of one texel apart.
pub fn fingerprint(color: Rgba<u8>) -> u64 {
    let [r, g, b, a] = color.0;
    (u64::from(a) << 56) | (u64::from(r) << 48) | (u64::from(g) << 40) | (u64::from(b) << 32)
}
