use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("resource file reading error")]
    #[diagnostic(code(srfile::io_error))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(srfile::read))]
    Read(#[from] common::error::Error),

    #[error(transparent)]
    #[diagnostic(code(srfile::model))]
    Model(#[from] srmodel::error::Error),

    #[error("file is too small for its relocation header (data starts at {data_start:#x}, file has {len} bytes)")]
    #[diagnostic(code(srfile::relocation_out_of_bounds))]
    RelocationOutOfBounds { data_start: u64, len: usize },

    #[error("no known format version matches the unit header at {data_start:#x}")]
    #[diagnostic(
        code(srfile::unknown_version),
        help("the file may not be a Soul Reaver unit, or it uses an unlisted revision")
    )]
    UnknownVersion { data_start: u64 },

    #[error("integer overflow")]
    #[diagnostic(code(srfile::integer_overflow))]
    IntegerOverflow,
}
