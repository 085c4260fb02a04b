use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("texture file reading error")]
    #[diagnostic(code(crm::io_error))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(crm::read))]
    Read(#[from] common::error::Error),

    #[error("invalid image dimensions {width}x{height} (words x rows)")]
    #[diagnostic(code(crm::invalid_dimensions))]
    InvalidDimensions { width: i32, height: i32 },

    #[error("pixel data needs {needed} bytes, file has {available} after the header")]
    #[diagnostic(code(crm::truncated_pixels))]
    TruncatedPixels { needed: u64, available: usize },

    #[error("integer overflow")]
    #[diagnostic(code(crm::integer_overflow))]
    IntegerOverflow,
}
