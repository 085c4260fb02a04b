//! PlayStation indexed textures (`.crm`) of Soul Reaver.
//!
//! A CRM file is a 16-bit VRAM image: 8-bit texel pages and the CLUT rows
//! that color them share one plane. Textures are rebuilt per page by
//! replaying which polygon used which CLUT over which part of the page.

pub mod clut;
pub mod decoder;
pub mod error;
pub mod page;
pub mod set;

use crate::error::Error;
use common::ByteCursor;
use std::fs;
use std::path::Path;

pub use decoder::{
    build_greyscale_textures, build_textures, texture_uses, uv_rect, TextureOptions, TextureUse,
    UvRect,
};
pub use page::{TexturePage, TexturePages};
pub use set::TextureSet;

pub type Result<T> = core::result::Result<T, Error>;

/// Width and height of one texture page in texels.
pub const TEXTURE_SIZE: u32 = 256;
/// One page row spans this many 16-bit words (two texels per word).
pub const PAGE_WORDS: usize = 128;

const WIDTH_OFFSET: u64 = 28;
const PIXELS_OFFSET: u64 = 36;

/// Raw VRAM plane of a CRM file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrmFile {
    /// Row length in 16-bit words.
    pub width: usize,
    pub height: usize,
    pub words: Vec<u16>,
}

impl CrmFile {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        parse_crm(&bytes)
    }

    pub fn word(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width {
            return None;
        }
        self.words.get(y.checked_mul(self.width)?.checked_add(x)?).copied()
    }

    /// Number of whole 256x256 pages in the plane.
    pub fn page_count(&self) -> usize {
        (self.width / PAGE_WORDS) * (self.height / TEXTURE_SIZE as usize)
    }
}

pub fn parse_crm(bytes: &[u8]) -> Result<CrmFile> {
    let mut cursor = ByteCursor::new(bytes);
    cursor.seek(WIDTH_OFFSET)?;
    let width = cursor.read_i32()?;
    let height = cursor.read_i32()?;
    if width < 0 || height < 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let count = u64::from(width.unsigned_abs())
        .checked_mul(u64::from(height.unsigned_abs()))
        .ok_or(Error::IntegerOverflow)?;
    let needed = count.checked_mul(2).ok_or(Error::IntegerOverflow)?;
    let available = bytes.len().saturating_sub(PIXELS_OFFSET as usize);
    if needed > available as u64 {
        return Err(Error::TruncatedPixels { needed, available });
    }

    cursor.seek(PIXELS_OFFSET)?;
    let words = cursor.read_u16_array(usize::try_from(count).map_err(|_| Error::IntegerOverflow)?)?;
    let file = CrmFile {
        width: width as usize,
        height: height as usize,
        words,
    };
    log::debug!(
        "crm plane {}x{} words, {} pages",
        file.width,
        file.height,
        file.page_count()
    );
    Ok(file)
}

#[cfg(test)]
mod tests;
