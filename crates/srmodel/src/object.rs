//! Object (actor/prop) models: explicit vertex and polygon tables.
//!
//! ```text
//! model + 0x00  vertex count          u32
//! model + 0x04  vertex table          u32 ptr   8 bytes/vertex: x,y,z i16, normal u16
//! model + 0x08  normal count/table    (unused here)
//! model + 0x10  polygon count         u32
//! model + 0x14  polygon table         u32 ptr  12 bytes/polygon
//!
//! polygon: v0,v1,v2 u16 | flags u16 | material ptr u32 (0 = untextured)
//! material: u0,v0 u8 clut u16 | u1,v1 u8 tpage u16 | u2,v2 u8 pad u16 | color u32
//! ```

use crate::error::Error;
use crate::geometry::Geometry;
use crate::material::{Material, MaterialList, DEFAULT_COLOR};
use crate::{
    absolute, GeometrySource, Model, ModelLocation, Polygon, Result,
};
use common::ByteCursor;

const VERTEX_STRIDE: u64 = 0x08;
const POLYGON_STRIDE: u64 = 0x0C;
const MATERIAL_SIZE: u64 = 0x10;

pub const POLYGON_FLAG_HIDDEN: u16 = 0x0002;

struct PolygonRecord {
    vertices: [u32; 3],
    flags: u16,
    material: u32,
}

struct MaterialRecord {
    texels: [[u8; 2]; 3],
    clut: u16,
    tpage: u16,
    color: u32,
}

pub fn parse_object_model(bytes: &[u8], loc: &ModelLocation<'_>) -> Result<Model> {
    let mut cursor = ByteCursor::new(bytes);
    let model_data = u64::from(loc.model_data);
    if !cursor.contains(model_data) {
        return Err(Error::ModelOutOfBounds {
            pointer: model_data,
            len: bytes.len(),
        });
    }

    cursor.seek(model_data)?;
    let vertex_count = cursor.read_u32()?;
    let vertex_start = absolute(loc.data_start, cursor.read_u32()?);
    cursor.seek(model_data + 0x10)?;
    let polygon_count = cursor.read_u32()?;
    let polygon_start = absolute(loc.data_start, cursor.read_u32()?);

    cursor.ensure_table("vertex", vertex_start, vertex_count, VERTEX_STRIDE)?;
    cursor.ensure_table("polygon", polygon_start, polygon_count, POLYGON_STRIDE)?;

    let mut geometry = read_vertices(&mut cursor, vertex_start, vertex_count)?;
    let mut materials = MaterialList::with_default();
    let vertex_limit = geometry.vertex_count();
    let mut polygons = Vec::with_capacity(polygon_count as usize);

    for p in 0..u64::from(polygon_count) {
        cursor.seek(polygon_start + p * POLYGON_STRIDE)?;
        let record = read_polygon(&mut cursor)?;
        let polygon_idx = polygons.len();
        for &vertex in &record.vertices {
            if vertex as usize >= vertex_limit {
                return Err(Error::VertexIndexOutOfRange {
                    polygon: polygon_idx,
                    vertex,
                    vertex_count: vertex_limit,
                });
            }
        }

        let visible = record.flags & POLYGON_FLAG_HIDDEN == 0;
        let (material, texels, clut) = if record.material == 0 {
            (Material::new(0, DEFAULT_COLOR, visible), [[0u8; 2]; 3], 0)
        } else {
            let offset = absolute(loc.data_start, record.material);
            cursor.ensure_table("material", offset, 1, MATERIAL_SIZE)?;
            cursor.seek(offset)?;
            let m = read_material(&mut cursor)?;
            (
                Material::new(u32::from(m.tpage), m.color, visible),
                m.texels,
                m.clut,
            )
        };

        // The last polygon to touch a vertex decides its color and UV.
        for (corner, &vertex) in record.vertices.iter().enumerate() {
            let v = vertex as usize;
            geometry.colors[v] = material.color;
            geometry.alt_colors[v] = material.color;
            geometry.uvs[v] = [
                f32::from(texels[corner][0]) / 255.0,
                f32::from(texels[corner][1]) / 255.0,
            ];
        }

        polygons.push(Polygon {
            vertices: record.vertices,
            material: materials.intern(material),
            texels,
            clut,
        });
    }

    log::debug!(
        "object model {} #{}: {} vertices, {} polygons, {} materials",
        loc.name,
        loc.index,
        geometry.vertex_count(),
        polygons.len(),
        materials.len()
    );

    Ok(Model {
        name: loc.name.to_string(),
        index: loc.index,
        platform: loc.platform,
        geometry,
        polygons,
        materials: materials.into_vec(),
        source: GeometrySource::Flat,
    })
}

fn read_vertices(cursor: &mut ByteCursor<'_>, start: u64, count: u32) -> Result<Geometry> {
    let mut geometry = Geometry::with_capacity(count as usize);
    cursor.seek(start)?;
    for _ in 0..count {
        let x = cursor.read_i16()?;
        let y = cursor.read_i16()?;
        let z = cursor.read_i16()?;
        let _normal = cursor.read_u16()?;
        geometry.push_vertex(
            [f32::from(x), f32::from(y), f32::from(z)],
            DEFAULT_COLOR,
            [0.0, 0.0],
        );
    }
    Ok(geometry)
}

fn read_polygon(cursor: &mut ByteCursor<'_>) -> Result<PolygonRecord> {
    let v0 = cursor.read_u16()?;
    let v1 = cursor.read_u16()?;
    let v2 = cursor.read_u16()?;
    let flags = cursor.read_u16()?;
    let material = cursor.read_u32()?;
    Ok(PolygonRecord {
        vertices: [u32::from(v0), u32::from(v1), u32::from(v2)],
        flags,
        material,
    })
}

fn read_material(cursor: &mut ByteCursor<'_>) -> Result<MaterialRecord> {
    let u0 = cursor.read_u8()?;
    let v0 = cursor.read_u8()?;
    let clut = cursor.read_u16()?;
    let u1 = cursor.read_u8()?;
    let v1 = cursor.read_u8()?;
    let tpage = cursor.read_u16()?;
    let u2 = cursor.read_u8()?;
    let v2 = cursor.read_u8()?;
    let _pad = cursor.read_u16()?;
    let color = cursor.read_u32()?;
    Ok(MaterialRecord {
        texels: [[u0, v0], [u1, v1], [u2, v2]],
        clut,
        tpage,
        color,
    })
}
