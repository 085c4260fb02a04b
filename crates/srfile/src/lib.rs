//! Reader for Soul Reaver unit and object files (PlayStation and PC builds,
//! including the pre-release revisions).
//!
//! A file starts with a relocation table; everything after it is addressed by
//! pointers relative to the data start. Units hold a single area model and the
//! level tables, objects hold a table of explicit models.

pub mod error;
pub mod intro;
pub mod object;
pub mod unit;
pub mod version;

use crate::error::Error;
use serde::Deserialize;
use srmodel::{Model, ModelLocation, Platform};
use std::fs;
use std::path::Path;

pub use intro::Intro;
pub use version::{FormatVersion, OffsetSchema, VersionResolver};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Unit,
    Object,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Object => "object",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Skips platform detection when set.
    pub forced_platform: Option<Platform>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Portal {
    /// Name of the adjacent unit.
    pub name: String,
}

/// One decoded unit or object file.
#[derive(Clone, Debug)]
pub struct SrFile {
    pub kind: AssetKind,
    pub version: FormatVersion,
    pub platform: Platform,
    pub name: String,
    pub data_start: u64,
    pub portals: Vec<Portal>,
    pub intros: Vec<Intro>,
    pub object_names: Vec<String>,
    pub models: Vec<Model>,
}

impl SrFile {
    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.iter().find(|model| model.index == index)
    }

    pub fn polygon_count(&self) -> usize {
        self.models.iter().map(Model::polygon_count).sum()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub data_start: u64,
    pub kind: AssetKind,
}

/// Reads the relocation header: the data start is the first word rounded to
/// 2 KiB sectors, and a zero second word marks a unit.
pub fn read_relocation(bytes: &[u8]) -> Result<Relocation> {
    let mut cursor = common::ByteCursor::new(bytes);
    let first = cursor.read_u32()?;
    let second = cursor.read_u32()?;
    let data_start = (u64::from(first >> 9) << 11) + 0x800;
    let len = u64::try_from(bytes.len()).map_err(|_| Error::IntegerOverflow)?;
    if data_start >= len {
        return Err(Error::RelocationOutOfBounds {
            data_start,
            len: bytes.len(),
        });
    }
    Ok(Relocation {
        data_start,
        kind: if second == 0 {
            AssetKind::Unit
        } else {
            AssetKind::Object
        },
    })
}

pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<SrFile> {
    let relocation = read_relocation(bytes)?;
    log::debug!(
        "{} file, data starts at {:#x}",
        relocation.kind.label(),
        relocation.data_start
    );
    match relocation.kind {
        AssetKind::Unit => unit::parse_unit(bytes, relocation.data_start, options),
        AssetKind::Object => object::parse_object(bytes, relocation.data_start, options),
    }
}

pub fn parse_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<SrFile> {
    let bytes = fs::read(path.as_ref())?;
    parse_bytes(&bytes, options)
}

pub(crate) fn model_location<'a>(
    name: &'a str,
    index: usize,
    data_start: u64,
    model_data: u64,
    platform: Platform,
) -> Result<ModelLocation<'a>> {
    Ok(ModelLocation {
        name,
        index,
        data_start: u32::try_from(data_start).map_err(|_| Error::IntegerOverflow)?,
        model_data: u32::try_from(model_data).map_err(|_| Error::IntegerOverflow)?,
        platform,
    })
}
