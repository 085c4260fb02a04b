//! Object files: actors and props with one or more explicit models.

use crate::version::{object_platform, resolve_object_version, OBJECT_NAME_POINTER};
use crate::{model_location, AssetKind, ParseOptions, Result, SrFile};
use common::{clean_object_name, ByteCursor};
use srmodel::parse_object_model;

const MODEL_COUNT: u64 = 0x08;

pub(crate) fn parse_object(bytes: &[u8], data_start: u64, options: &ParseOptions) -> Result<SrFile> {
    let mut cursor = ByteCursor::new(bytes);
    let version = resolve_object_version(&mut cursor, data_start)?;

    let name_at = data_start + u64::from(cursor.read_u32_at(data_start + OBJECT_NAME_POINTER)?);
    cursor.seek(name_at)?;
    let name = clean_object_name(&cursor.read_chars(8)?);

    let platform = object_platform(&mut cursor, data_start, version, options.forced_platform)?;

    cursor.seek(data_start + MODEL_COUNT)?;
    let model_count = cursor.read_u16()?;
    let anim_count = cursor.read_u16()?;
    let model_table = data_start + u64::from(cursor.read_u32()?);

    let mut models = Vec::with_capacity(usize::from(model_count));
    for m in 0..model_count {
        let slot = model_table + 4 * u64::from(m);
        let pointer = match cursor.read_u32_at(slot) {
            Ok(pointer) => pointer,
            Err(err) => {
                log::warn!("skipping model {m} of {name}: table entry unreadable: {err}");
                continue;
            }
        };
        let model_data = data_start + u64::from(pointer);
        if !cursor.contains(model_data) {
            log::warn!(
                "skipping model {m} of {name}: pointer {model_data:#x} is outside the file ({} bytes)",
                bytes.len()
            );
            continue;
        }

        let loc = model_location(&name, usize::from(m), data_start, model_data, platform)?;
        match parse_object_model(bytes, &loc) {
            Ok(model) => models.push(model),
            Err(err) => log::warn!("skipping model {m} of {name}: {err}"),
        }
    }

    log::debug!(
        "object {name}: {} ({}), {}/{} models, {} animations",
        version.label(),
        platform.label(),
        models.len(),
        model_count,
        anim_count
    );

    Ok(SrFile {
        kind: AssetKind::Object,
        version,
        platform,
        name,
        data_start,
        portals: Vec::new(),
        intros: Vec::new(),
        object_names: Vec::new(),
        models,
    })
}
