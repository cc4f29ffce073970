use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JpegError {
    /// Missing SOI, or an APP0/APP1 signature that is neither JFIF nor Exif.
    #[error("Not a JPEG stream: {0}")]
    NotJpeg(String),
    #[error("Unsupported encoding: {0}")]
    Unsupported(String),
    #[error("Bad image: {0}")]
    BadImage(String),
    #[error("Out of memory")]
    OutOfMemory(#[from] TryReserveError),
    #[error("Input truncated")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid encoder parameter: {0}")]
    InvalidParameter(String),
    #[error("No Huffman code assigned to symbol {0:#04x}")]
    MissingHuffmanCode(u8),
}

pub type Result<T> = std::result::Result<T, JpegError>;

pub(crate) fn bad_image(msg: impl Into<String>) -> JpegError {
    JpegError::BadImage(msg.into())
}
