//! Format revisions and the field offsets each of them uses.
//!
//! Later revisions carry a magic value somewhere in the unit header; the
//! earliest prototype has none and is only ever reached by elimination. The
//! probes are therefore ordered newest first.

use crate::error::Error;
use crate::Result;
use common::ByteCursor;
use srmodel::Platform;

pub const ALPHA_19990123_X_MAGIC: u32 = 0x3C20_4127;
pub const ALPHA_19990123_MAGIC: u32 = 0x3C20_4128;
pub const ALPHA_19990204_MAGIC: u32 = 0x3C20_4129;
pub const ALPHA_19990216_MAGIC: u32 = 0x3C20_4131;
pub const BETA_19990512_MAGIC: u32 = 0x3C20_4139;
pub const RETAIL_MAGIC: u32 = 0x3C20_413B;

/// Object files whose name sits right after a short header are prototypes.
pub const PROTO_OBJECT_NAME_POINTER: u32 = 0x3C;
pub const OBJECT_NAME_POINTER: u64 = 0x24;
pub const OBJECT_PLATFORM_FLAG: u64 = 0x44;

const PC_TEXTURE_FLAG: u64 = 0xFFFF_FFFF_FFFF_FFFF;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    #[default]
    Unresolved,
    Proto19981025,
    Alpha19990123X,
    Alpha19990123,
    Alpha19990204,
    Alpha19990216,
    Beta19990512,
    Retail,
}

impl FormatVersion {
    pub const KNOWN: [FormatVersion; 7] = [
        FormatVersion::Proto19981025,
        FormatVersion::Alpha19990123X,
        FormatVersion::Alpha19990123,
        FormatVersion::Alpha19990204,
        FormatVersion::Alpha19990216,
        FormatVersion::Beta19990512,
        FormatVersion::Retail,
    ];

    pub fn magic(self) -> Option<u32> {
        match self {
            Self::Unresolved | Self::Proto19981025 => None,
            Self::Alpha19990123X => Some(ALPHA_19990123_X_MAGIC),
            Self::Alpha19990123 => Some(ALPHA_19990123_MAGIC),
            Self::Alpha19990204 => Some(ALPHA_19990204_MAGIC),
            Self::Alpha19990216 => Some(ALPHA_19990216_MAGIC),
            Self::Beta19990512 => Some(BETA_19990512_MAGIC),
            Self::Retail => Some(RETAIL_MAGIC),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Proto19981025 => "prototype 1998-10-25",
            Self::Alpha19990123X => "alpha 1999-01-23 (x)",
            Self::Alpha19990123 => "alpha 1999-01-23",
            Self::Alpha19990204 => "alpha 1999-02-04",
            Self::Alpha19990216 => "alpha 1999-02-16",
            Self::Beta19990512 => "beta 1999-05-12",
            Self::Retail => "retail",
        }
    }

    /// Revisions older than the beta only shipped on PlayStation.
    pub fn is_pre_beta(self) -> bool {
        matches!(
            self,
            Self::Proto19981025
                | Self::Alpha19990123X
                | Self::Alpha19990123
                | Self::Alpha19990204
                | Self::Alpha19990216
        )
    }

    pub fn schema(self) -> Option<&'static OffsetSchema> {
        SCHEMAS.iter().find(|schema| schema.versions.contains(&self))
    }
}

/// Header offsets and record strides of one group of revisions. All offsets
/// are relative to the data start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetSchema {
    pub versions: &'static [FormatVersion],
    /// Offset of the portal table pointer inside the terrain record.
    pub portal_connection: u64,
    pub portal_stride: u64,
    pub intro_table: u64,
    pub intro_stride: u64,
    pub object_names: u64,
    pub unit_name: u64,
    /// Location of the 64-bit PC/PSX texture flag, if the revision has one.
    pub texture_flag: Option<u64>,
}

pub static SCHEMAS: [OffsetSchema; 4] = [
    OffsetSchema {
        versions: &[FormatVersion::Proto19981025],
        portal_connection: 0x3C,
        portal_stride: 0x58,
        intro_table: 0x84,
        intro_stride: 0x48,
        object_names: 0x98,
        unit_name: 0xA4,
        texture_flag: None,
    },
    OffsetSchema {
        versions: &[
            FormatVersion::Alpha19990123X,
            FormatVersion::Alpha19990123,
            FormatVersion::Alpha19990204,
        ],
        portal_connection: 0x30,
        portal_stride: 0x5C,
        intro_table: 0x70,
        intro_stride: 0x50,
        object_names: 0x84,
        unit_name: 0x90,
        texture_flag: None,
    },
    OffsetSchema {
        versions: &[FormatVersion::Alpha19990216],
        portal_connection: 0x30,
        portal_stride: 0x5C,
        intro_table: 0x74,
        intro_stride: 0x4C,
        object_names: 0x88,
        unit_name: 0x94,
        texture_flag: None,
    },
    OffsetSchema {
        versions: &[FormatVersion::Beta19990512, FormatVersion::Retail],
        portal_connection: 0x30,
        portal_stride: 0x5C,
        intro_table: 0x78,
        intro_stride: 0x4C,
        object_names: 0x8C,
        unit_name: 0x98,
        texture_flag: Some(0x9C),
    },
];

/// One header location and the revisions whose magic may be found there.
#[derive(Clone, Debug)]
pub struct Probe {
    pub offset: u64,
    pub accepts: &'static [FormatVersion],
}

pub static UNIT_PROBES: [Probe; 3] = [
    Probe {
        offset: 0xF0,
        accepts: &[FormatVersion::Retail, FormatVersion::Beta19990512],
    },
    Probe {
        offset: 0xE4,
        accepts: &[FormatVersion::Alpha19990216],
    },
    Probe {
        offset: 0xE0,
        accepts: &[
            FormatVersion::Alpha19990204,
            FormatVersion::Alpha19990123X,
            FormatVersion::Alpha19990123,
        ],
    },
];

#[derive(Clone, Debug)]
pub struct VersionResolver {
    probes: &'static [Probe],
    fallback: Option<FormatVersion>,
}

impl VersionResolver {
    pub const fn new(probes: &'static [Probe], fallback: Option<FormatVersion>) -> Self {
        Self { probes, fallback }
    }

    /// Resolver for unit headers: every magic probe, then the prototype.
    pub const fn units() -> Self {
        Self::new(&UNIT_PROBES, Some(FormatVersion::Proto19981025))
    }

    pub fn resolve(&self, cursor: &mut ByteCursor<'_>, data_start: u64) -> Result<FormatVersion> {
        for probe in self.probes {
            let at = data_start
                .checked_add(probe.offset)
                .ok_or(Error::IntegerOverflow)?;
            // A header too short for this probe just does not match it.
            let Ok(value) = cursor.read_u32_at(at) else {
                continue;
            };
            if let Some(version) = probe
                .accepts
                .iter()
                .copied()
                .find(|version| version.magic() == Some(value))
            {
                log::debug!("unit version {} (magic at {:#x})", version.label(), at);
                return Ok(version);
            }
        }

        match self.fallback {
            Some(version) => {
                log::debug!("no unit magic matched, assuming {}", version.label());
                Ok(version)
            }
            None => Err(Error::UnknownVersion { data_start }),
        }
    }
}

pub fn resolve_unit_version(cursor: &mut ByteCursor<'_>, data_start: u64) -> Result<FormatVersion> {
    VersionResolver::units().resolve(cursor, data_start)
}

pub fn resolve_object_version(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
) -> Result<FormatVersion> {
    let name_pointer = cursor.read_u32_at(data_start + OBJECT_NAME_POINTER)?;
    Ok(if name_pointer == PROTO_OBJECT_NAME_POINTER {
        FormatVersion::Proto19981025
    } else {
        FormatVersion::Retail
    })
}

pub fn unit_platform(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
    schema: &OffsetSchema,
    version: FormatVersion,
    forced: Option<Platform>,
) -> Result<Platform> {
    if let Some(platform) = forced {
        return Ok(platform);
    }
    if version.is_pre_beta() {
        return Ok(Platform::Psx);
    }
    match schema.texture_flag {
        Some(flag) => read_texture_flag(cursor, data_start + flag),
        None => Ok(Platform::Psx),
    }
}

pub fn object_platform(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
    version: FormatVersion,
    forced: Option<Platform>,
) -> Result<Platform> {
    if let Some(platform) = forced {
        return Ok(platform);
    }
    if version == FormatVersion::Proto19981025 {
        return Ok(Platform::Psx);
    }
    read_texture_flag(cursor, data_start + OBJECT_PLATFORM_FLAG)
}

fn read_texture_flag(cursor: &mut ByteCursor<'_>, at: u64) -> Result<Platform> {
    cursor.seek(at)?;
    Ok(if cursor.read_u64()? == PC_TEXTURE_FLAG {
        Platform::Pc
    } else {
        Platform::Psx
    })
}
