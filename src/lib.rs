#![cfg_attr(feature = "simd", feature(portable_simd))]

/// The decoder takes as input compressed image data and table specifications, and by means of a
/// specific set of procedures generates as output `digital reconstructed image data`.
pub mod decoder;

/// The encoder takes as input digital source image data and table specifications, and by means
/// of a specified set of procedures generates as output compressed image data.
pub mod encoder;

pub mod dispatch;
pub mod error;
pub mod image;

mod assembler;
mod bitreader;
mod bitwriter;
mod block;
mod coding;
mod color_spaces;
mod fdct;
pub(crate) mod frame_header;
pub(crate) mod huffman_table;
pub(crate) mod huffman_tree;
mod idct;
mod jfif;
pub(crate) mod marker;
mod mcu;
mod progress;
pub(crate) mod quantization_table;
mod rgb_to_grayscale;
pub(crate) mod scan_header;
mod segment;
mod standard_tables;

pub use decoder::{DecodeOptions, Decoder};
pub use encoder::{Encoder, EncoderOptions, Sampling};
pub use error::{JpegError, Result};
pub use image::{Image, PixelFormat, Surface};
