//! Unit (area) files: one terrain model plus the level tables around it.

use crate::error::Error;
use crate::intro::read_intros;
use crate::version::{resolve_unit_version, unit_platform, OffsetSchema};
use crate::{model_location, AssetKind, ParseOptions, Portal, Result, SrFile};
use common::{clean_name, clean_object_name, ByteCursor};
use srmodel::parse_unit_model;

pub const NAME_TABLE_END: u8 = 0xFF;
pub const NAME_RECORD_SIZE: u64 = 0x10;
/// Object files always reference the player, even where the unit's own name
/// table forgot it.
pub const PLAYER_OBJECT: &str = "raziel";

const PORTAL_NAME_LEN: usize = 12;

pub(crate) fn parse_unit(bytes: &[u8], data_start: u64, options: &ParseOptions) -> Result<SrFile> {
    let mut cursor = ByteCursor::new(bytes);
    let version = resolve_unit_version(&mut cursor, data_start)?;
    let schema = version
        .schema()
        .ok_or(Error::UnknownVersion { data_start })?;

    let terrain = data_start + u64::from(cursor.read_u32_at(data_start)?);
    let portals = read_portals(&mut cursor, data_start, terrain, schema)?;
    let intros = read_intros(&mut cursor, data_start, schema)?;
    let mut object_names = read_object_names(&mut cursor, data_start, schema)?;

    let unit_name_at = data_start + u64::from(cursor.read_u32_at(data_start + schema.unit_name)?);
    cursor.seek(unit_name_at)?;
    let name = clean_name(&cursor.read_chars(8)?);

    let platform = unit_platform(
        &mut cursor,
        data_start,
        schema,
        version,
        options.forced_platform,
    )?;

    if intros.iter().any(|intro| intro.file_name == PLAYER_OBJECT)
        && !object_names.iter().any(|object| object == PLAYER_OBJECT)
    {
        object_names.push(PLAYER_OBJECT.to_string());
    }

    let mut models = Vec::with_capacity(1);
    let loc = model_location(&name, 0, data_start, terrain, platform)?;
    match parse_unit_model(bytes, &loc) {
        Ok(model) => models.push(model),
        Err(err) => log::warn!("skipping area model of unit {name}: {err}"),
    }

    log::debug!(
        "unit {name}: {} ({}), {} portals, {} intros, {} object names",
        version.label(),
        platform.label(),
        portals.len(),
        intros.len(),
        object_names.len()
    );

    Ok(SrFile {
        kind: AssetKind::Unit,
        version,
        platform,
        name,
        data_start,
        portals,
        intros,
        object_names,
        models,
    })
}

fn read_portals(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
    terrain: u64,
    schema: &OffsetSchema,
) -> Result<Vec<Portal>> {
    let table = data_start + u64::from(cursor.read_u32_at(terrain + schema.portal_connection)?);
    let count = cursor.read_u32_at(table)?;
    let first = table + 4;
    cursor.ensure_table("portal", first, count, schema.portal_stride)?;

    let mut portals = Vec::with_capacity(count as usize);
    for i in 0..u64::from(count) {
        cursor.seek(first + schema.portal_stride * i)?;
        portals.push(Portal {
            name: clean_name(&cursor.read_chars(PORTAL_NAME_LEN)?),
        });
    }
    Ok(portals)
}

/// Scans 16-byte name records until a record starts with 0xFF.
pub(crate) fn read_object_names(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
    schema: &OffsetSchema,
) -> Result<Vec<String>> {
    let mut at = data_start + u64::from(cursor.read_u32_at(data_start + schema.object_names)?);
    let mut names = Vec::new();
    loop {
        cursor.seek(at)?;
        if cursor.read_u8()? == NAME_TABLE_END {
            break;
        }
        cursor.seek(at)?;
        names.push(clean_object_name(&cursor.read_chars(8)?));
        at += NAME_RECORD_SIZE;
    }
    Ok(names)
}
