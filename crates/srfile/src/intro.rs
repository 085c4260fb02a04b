//! Spawn ("intro") records of a unit.
//!
//! ```text
//! +0x00 name        8 chars
//! +0x08             8 unused
//! +0x10 index       i32
//! +0x14 id          i32
//! +0x18 rotation    3 x i16, 12-bit fixed point angle
//! +0x1E             2 unused
//! +0x20 position    3 x i16
//! +0x26             10 unused
//! +0x30 commands    u32 ptr, 0 = none
//! ```

use crate::version::OffsetSchema;
use crate::Result;
use common::{clean_object_name, ByteCursor};
use std::f32::consts::TAU;

pub const ANGLE_SCALE: f32 = TAU / 4096.0;

pub const COMMAND_END: u16 = 0;
pub const COMMAND_MONSTER_AGE: u16 = 6;
pub const COMMAND_MODEL_INDEX: u16 = 18;

#[derive(Clone, Debug, PartialEq)]
pub struct Intro {
    /// Object name with the unique id appended, e.g. `raziel-1`.
    pub name: String,
    /// Object file this intro spawns.
    pub file_name: String,
    pub index: i32,
    pub id: i32,
    /// Radians per axis.
    pub rotation: [f32; 3],
    pub position: [f32; 3],
    pub monster_age: Option<i32>,
    pub model_index: Option<i32>,
}

pub fn angle_from_raw(raw: i16) -> f32 {
    ANGLE_SCALE * f32::from(raw)
}

pub(crate) fn read_intros(
    cursor: &mut ByteCursor<'_>,
    data_start: u64,
    schema: &OffsetSchema,
) -> Result<Vec<Intro>> {
    cursor.seek(data_start + schema.intro_table)?;
    let count = cursor.read_u32()?;
    let table = data_start + u64::from(cursor.read_u32()?);
    cursor.ensure_table("intro", table, count, schema.intro_stride)?;

    let mut intros = Vec::with_capacity(count as usize);
    for i in 0..u64::from(count) {
        cursor.seek(table + schema.intro_stride * i)?;
        let raw_name = cursor.read_chars(8)?;
        cursor.skip(8)?;
        let index = cursor.read_i32()?;
        let id = cursor.read_i32()?;
        let rotation = [
            angle_from_raw(cursor.read_i16()?),
            angle_from_raw(cursor.read_i16()?),
            angle_from_raw(cursor.read_i16()?),
        ];
        cursor.skip(2)?;
        let position = [
            f32::from(cursor.read_i16()?),
            f32::from(cursor.read_i16()?),
            f32::from(cursor.read_i16()?),
        ];
        cursor.skip(10)?;
        let commands = cursor.read_u32()?;

        let file_name = clean_object_name(&raw_name);
        let mut intro = Intro {
            name: format!("{file_name}-{id}"),
            file_name,
            index,
            id,
            rotation,
            position,
            monster_age: None,
            model_index: None,
        };
        if commands != 0 {
            read_commands(cursor, data_start + u64::from(commands), &mut intro)?;
        }
        intros.push(intro);
    }

    log::debug!("{} intros", intros.len());
    Ok(intros)
}

/// Walks `(command u16, parameter count u16, parameters...)` until command 0.
fn read_commands(cursor: &mut ByteCursor<'_>, start: u64, intro: &mut Intro) -> Result<()> {
    let mut at = start;
    loop {
        cursor.seek(at)?;
        let command = cursor.read_u16()?;
        if command == COMMAND_END {
            return Ok(());
        }
        let params = cursor.read_u16()?;
        match command {
            COMMAND_MONSTER_AGE => intro.monster_age = Some(cursor.read_i32()?),
            COMMAND_MODEL_INDEX => intro.model_index = Some(cursor.read_i32()?),
            _ => {}
        }
        at += 4 + 4 * u64::from(params);
    }
}
