pub mod error;

use crate::error::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::WINDOWS_1252;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub type Result<T> = core::result::Result<T, Error>;

/// Random-access little-endian reader over an in-memory asset buffer.
///
/// Every read reports the offset it started at when it runs past the end of
/// the buffer, so callers can surface the failing table in their own errors.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(bytes),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.inner.get_ref()
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Returns true when `offset` addresses a byte inside the buffer.
    pub fn contains(&self, offset: u64) -> bool {
        usize::try_from(offset).is_ok_and(|off| off < self.len())
    }

    /// Moves to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let in_range = usize::try_from(offset).is_ok_and(|off| off <= self.len());
        if !in_range {
            return Err(Error::SeekOutOfBounds {
                offset,
                len: self.len(),
            });
        }
        self.inner.set_position(offset);
        Ok(())
    }

    pub fn skip(&mut self, count: u64) -> Result<()> {
        let target = self
            .position()
            .checked_add(count)
            .ok_or(Error::IntegerOverflow)?;
        self.seek(target)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let offset = self.position();
        self.inner
            .read_u8()
            .map_err(|_| self.out_of_bounds(offset, 1))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let offset = self.position();
        self.inner
            .read_u16::<LittleEndian>()
            .map_err(|_| self.out_of_bounds(offset, 2))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let offset = self.position();
        self.inner
            .read_i16::<LittleEndian>()
            .map_err(|_| self.out_of_bounds(offset, 2))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let offset = self.position();
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|_| self.out_of_bounds(offset, 4))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let offset = self.position();
        self.inner
            .read_i32::<LittleEndian>()
            .map_err(|_| self.out_of_bounds(offset, 4))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let offset = self.position();
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|_| self.out_of_bounds(offset, 8))
    }

    /// Reads `count` consecutive u16 values.
    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>> {
        let offset = self.position();
        let size = u64::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(2))
            .ok_or(Error::IntegerOverflow)?;
        if !self.fits(offset, size) {
            return Err(self.out_of_bounds(offset, size));
        }
        let mut out = vec![0u16; count];
        self.inner
            .read_u16_into::<LittleEndian>(&mut out)
            .map_err(|_| self.out_of_bounds(offset, size))?;
        Ok(out)
    }

    /// Reads a fixed-length character run, NUL bytes included.
    pub fn read_chars(&mut self, count: usize) -> Result<String> {
        let offset = self.position();
        let size = u64::try_from(count).map_err(|_| Error::IntegerOverflow)?;
        if !self.fits(offset, size) {
            return Err(self.out_of_bounds(offset, size));
        }
        let start = usize::try_from(offset).map_err(|_| Error::IntegerOverflow)?;
        let raw = &self.bytes()[start..start + count];
        self.inner.set_position(offset + size);
        let (decoded, _, _) = WINDOWS_1252.decode(raw);
        Ok(decoded.into_owned())
    }

    /// Seeks to `offset` and reads one u32 there.
    pub fn read_u32_at(&mut self, offset: u64) -> Result<u32> {
        self.seek(offset)?;
        self.read_u32()
    }

    /// Checks that `count` records of `stride` bytes starting at `offset` lie
    /// inside the buffer, before any of them is read.
    pub fn ensure_table(
        &self,
        label: &'static str,
        offset: u64,
        count: u32,
        stride: u64,
    ) -> Result<()> {
        let size = u64::from(count)
            .checked_mul(stride)
            .ok_or(Error::IntegerOverflow)?;
        offset.checked_add(size).ok_or(Error::IntegerOverflow)?;
        if !self.fits(offset, size) {
            return Err(Error::TableOutOfBounds {
                label,
                offset,
                count,
            });
        }
        Ok(())
    }

    fn fits(&self, offset: u64, size: u64) -> bool {
        offset
            .checked_add(size)
            .and_then(|end| usize::try_from(end).ok())
            .is_some_and(|end| end <= self.len())
    }

    fn out_of_bounds(&self, offset: u64, size: u64) -> Error {
        Error::OutOfBounds {
            offset,
            size,
            len: self.len(),
        }
    }
}

/// Cuts a fixed-length name at its first NUL and trims surrounding blanks.
pub fn clean_name(raw: &str) -> String {
    let used = raw.find('\0').unwrap_or(raw.len());
    raw[..used].trim().to_string()
}

/// Object names are padded with underscores to eight characters.
pub fn clean_object_name(raw: &str) -> String {
    clean_name(raw).trim_end_matches('_').to_string()
}

pub fn collect_files_recursive(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}
