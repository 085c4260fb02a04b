//! Spectral realm overlay. Only the alternate arrays of a [`Geometry`] are
//! touched; the base arrays keep the material realm state.

use crate::error::Error;
use crate::geometry::Geometry;
use crate::Result;
use common::ByteCursor;

const INDEX_END: i32 = -1;
const RGB_MASK: u32 = 0x00FF_FFFF;
const ALPHA_MASK: u32 = 0xFF00_0000;

/// Replaces the RGB part of every alternate color with the value from the
/// spectral color table. Alpha stays as it was.
pub fn apply_spectral_colors(
    cursor: &mut ByteCursor<'_>,
    geometry: &mut Geometry,
    table_at: u64,
) -> Result<()> {
    cursor.seek(table_at)?;
    for color in &mut geometry.alt_colors {
        let shifted = cursor.read_u32()?;
        *color = (*color & ALPHA_MASK) | (shifted & RGB_MASK);
    }
    Ok(())
}

/// Walks the `-1` terminated index stream; each entry takes the next record of
/// the spectral vertex table as the alternate position of that vertex.
pub fn apply_spectral_positions(
    cursor: &mut ByteCursor<'_>,
    geometry: &mut Geometry,
    index_stream_at: u64,
    vertex_table_at: u64,
) -> Result<usize> {
    let mut index_at = index_stream_at;
    let mut vertex_at = vertex_table_at;
    let mut patched = 0usize;

    loop {
        cursor.seek(index_at)?;
        let index = cursor.read_i32()?;
        index_at = cursor.position();
        if index == INDEX_END {
            break;
        }

        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < geometry.alt_positions.len())
            .ok_or(Error::SpectralIndexOutOfRange {
                index,
                vertex_count: geometry.alt_positions.len(),
            })?;

        cursor.seek(vertex_at)?;
        let x = cursor.read_i16()?;
        let y = cursor.read_i16()?;
        let z = cursor.read_i16()?;
        vertex_at = cursor.position();

        geometry.alt_positions[slot] = [f32::from(x), f32::from(y), f32::from(z)];
        patched += 1;
    }

    Ok(patched)
}
