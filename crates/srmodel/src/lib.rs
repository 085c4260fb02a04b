//! Model decoding for Soul Reaver unit (area) and object files.
//!
//! Both model kinds end up in the same flat representation: a [`Geometry`]
//! buffer, a polygon list and a deduplicated material table. Unit models are
//! stored as an octree of compressed triangle strips and are flattened while
//! decoding; the tree itself stays reachable through [`GeometrySource::Octree`].

pub mod error;
pub mod geometry;
pub mod material;
pub mod object;
pub mod octree;
pub mod spectral;
pub mod unit;

use crate::error::Error;
use serde::Deserialize;

pub use geometry::{decode_uv, uv_to_texel, Geometry};
pub use material::{Material, MaterialList};
pub use object::parse_object_model;
pub use octree::{Mesh, Octree, TreeGroup, TreeNode};
pub use unit::parse_unit_model;

pub type Result<T> = core::result::Result<T, Error>;

/// Target platform of a file. Decides texture storage and UV encoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Unresolved,
    Psx,
    Pc,
    Dreamcast,
}

impl Platform {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Psx => "PlayStation",
            Self::Pc => "PC",
            Self::Dreamcast => "Dreamcast",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Polygon {
    pub vertices: [u32; 3],
    pub material: usize,
    /// Texel coordinates of the three corners on the 256x256 page.
    pub texels: [[u8; 2]; 3],
    pub clut: u16,
}

#[derive(Clone, Debug)]
pub enum GeometrySource {
    /// Polygons came straight from a polygon table.
    Flat,
    /// Polygons were flattened out of an octree of strips.
    Octree(Octree),
}

#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub index: usize,
    pub platform: Platform,
    pub geometry: Geometry,
    pub polygons: Vec<Polygon>,
    pub materials: Vec<Material>,
    pub source: GeometrySource,
}

impl Model {
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn material_of(&self, polygon: &Polygon) -> Option<&Material> {
        self.materials.get(polygon.material)
    }

    pub fn octree(&self) -> Option<&Octree> {
        match &self.source {
            GeometrySource::Octree(tree) => Some(tree),
            GeometrySource::Flat => None,
        }
    }
}

/// Where a model lives inside a file and how it should be interpreted.
#[derive(Clone, Debug)]
pub struct ModelLocation<'a> {
    pub name: &'a str,
    pub index: usize,
    /// Origin all file pointers are relative to.
    pub data_start: u32,
    /// Absolute offset of the model record.
    pub model_data: u32,
    pub platform: Platform,
}

pub(crate) fn absolute(data_start: u32, pointer: u32) -> u64 {
    u64::from(data_start) + u64::from(pointer)
}
