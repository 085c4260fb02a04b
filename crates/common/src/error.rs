use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("read of {size} bytes at {offset:#x} runs past the end of the buffer ({len} bytes)")]
    #[diagnostic(code(common::out_of_bounds))]
    OutOfBounds { offset: u64, size: u64, len: usize },

    #[error("seek to {offset:#x} is outside the buffer ({len} bytes)")]
    #[diagnostic(code(common::seek_out_of_bounds))]
    SeekOutOfBounds { offset: u64, len: usize },

    #[error("{label} table of {count} records at {offset:#x} does not fit the buffer")]
    #[diagnostic(code(common::table_out_of_bounds))]
    TableOutOfBounds {
        label: &'static str,
        offset: u64,
        count: u32,
    },

    #[error("integer overflow")]
    #[diagnostic(code(common::integer_overflow))]
    IntegerOverflow,
}
