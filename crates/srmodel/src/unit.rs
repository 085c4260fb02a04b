use crate::error::Error;
use crate::geometry::{decode_uv, Geometry};
use crate::material::MaterialList;
use crate::octree::{decode_octree, finalize};
use crate::spectral::{apply_spectral_colors, apply_spectral_positions};
use crate::{absolute, GeometrySource, Model, ModelLocation, Result};
use common::ByteCursor;

const VERTEX_COUNT: u64 = 0x0C;
const VERTEX_TABLE: u64 = 0x18;
const SPECTRAL_INDEX_STREAM: u64 = 0x2C;
const SPECTRAL_VERTEX_TABLE: u64 = 0x34;
const SPECTRAL_COLOR_TABLE: u64 = 0x3C;
const OCTREE_GROUP_COUNT: u64 = 0x40;
const OCTREE_GROUP_TABLE: u64 = 0x44;

const VERTEX_STRIDE: u64 = 0x10;

/// Header fields of a unit (area) model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitModelHeader {
    pub vertex_count: u32,
    pub vertex_table: u32,
    pub spectral_index_stream: u32,
    pub spectral_vertex_table: u32,
    pub spectral_color_table: u32,
    pub group_count: u32,
    pub group_table: u32,
}

pub fn read_unit_header(cursor: &mut ByteCursor<'_>, model_data: u64) -> Result<UnitModelHeader> {
    Ok(UnitModelHeader {
        vertex_count: cursor.read_u32_at(model_data + VERTEX_COUNT)?,
        vertex_table: cursor.read_u32_at(model_data + VERTEX_TABLE)?,
        spectral_index_stream: cursor.read_u32_at(model_data + SPECTRAL_INDEX_STREAM)?,
        spectral_vertex_table: cursor.read_u32_at(model_data + SPECTRAL_VERTEX_TABLE)?,
        spectral_color_table: cursor.read_u32_at(model_data + SPECTRAL_COLOR_TABLE)?,
        group_count: cursor.read_u32_at(model_data + OCTREE_GROUP_COUNT)?,
        group_table: cursor.read_u32_at(model_data + OCTREE_GROUP_TABLE)?,
    })
}

/// Decodes the single model of a unit file: vertices, spectral overlay and
/// the octree, flattened into one polygon list.
pub fn parse_unit_model(bytes: &[u8], loc: &ModelLocation<'_>) -> Result<Model> {
    let mut cursor = ByteCursor::new(bytes);
    let model_data = u64::from(loc.model_data);
    if !cursor.contains(model_data) {
        return Err(Error::ModelOutOfBounds {
            pointer: model_data,
            len: bytes.len(),
        });
    }

    let header = read_unit_header(&mut cursor, model_data)?;
    let vertex_start = absolute(loc.data_start, header.vertex_table);
    cursor.ensure_table("vertex", vertex_start, header.vertex_count, VERTEX_STRIDE)?;

    let mut geometry = Geometry::with_capacity(header.vertex_count as usize);
    cursor.seek(vertex_start)?;
    for _ in 0..header.vertex_count {
        let x = cursor.read_i16()?;
        let y = cursor.read_i16()?;
        let z = cursor.read_i16()?;
        cursor.skip(2)?;
        let color = cursor.read_u32()?;
        let u = cursor.read_u16()?;
        let v = cursor.read_u16()?;
        geometry.push_vertex(
            [f32::from(x), f32::from(y), f32::from(z)],
            color,
            [decode_uv(u, loc.platform), decode_uv(v, loc.platform)],
        );
    }

    if header.spectral_color_table != 0 {
        let table_at = absolute(loc.data_start, header.spectral_color_table);
        apply_spectral_colors(&mut cursor, &mut geometry, table_at)?;
    }
    if header.spectral_vertex_table != 0 {
        let patched = apply_spectral_positions(
            &mut cursor,
            &mut geometry,
            absolute(loc.data_start, header.spectral_index_stream),
            absolute(loc.data_start, header.spectral_vertex_table),
        )?;
        log::debug!("unit model {}: {} spectral vertices", loc.name, patched);
    }

    let decoded = decode_octree(
        &mut cursor,
        loc.data_start,
        absolute(loc.data_start, header.group_table),
        header.group_count,
    )?;
    let mut materials = MaterialList::with_default();
    let mut polygons = Vec::new();
    let tree = finalize(decoded, &geometry, &mut materials, &mut polygons)?;

    log::debug!(
        "unit model {}: {} vertices, {} polygons, {} meshes, {} materials",
        loc.name,
        geometry.vertex_count(),
        polygons.len(),
        tree.meshes.len(),
        materials.len()
    );

    Ok(Model {
        name: loc.name.to_string(),
        index: loc.index,
        platform: loc.platform,
        geometry,
        polygons,
        materials: materials.into_vec(),
        source: GeometrySource::Octree(tree),
    })
}
