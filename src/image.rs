use crate::error::{JpegError, Result};
use crate::rgb_to_grayscale::{grayscale_to_rgb, rgb_to_grayscale};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel, indexing a gray-ramp palette.
    Gray8,
    /// Three bytes per pixel: red, green, blue.
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
        }
    }
}

/// Line-addressable pixel storage. The codec reads source rows and writes decoded spans only
/// through this interface.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn format(&self) -> PixelFormat;

    /// Row `y`, `width * bytes_per_pixel` bytes long.
    fn read_line(&self, y: usize) -> &[u8];

    /// Stores packed `pixels` at column `x` of row `y`. Pixels past the right edge are dropped.
    fn write_span(&mut self, x: usize, y: usize, pixels: &[u8]);
}

/// An owned raster in one of the supported pixel formats.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
    palette: Option<Vec<[u8; 3]>>,
}

fn gray_ramp() -> Vec<[u8; 3]> {
    (0..=255u8).map(|v| [v, v, v]).collect()
}

impl Image {
    /// Allocates a zeroed image. Allocation failure is reported, not aborted on.
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(JpegError::InvalidParameter(format!(
                "image dimensions {width}x{height}"
            )));
        }

        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| JpegError::InvalidParameter(format!("image {width}x{height} is too large")))?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len)?;
        pixels.resize(len, 0);

        Ok(Self::with_pixels(width, height, format, pixels))
    }

    /// Wraps packed pixel rows, e.g. from an image file.
    pub fn from_raw(width: usize, height: usize, format: PixelFormat, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height * format.bytes_per_pixel() {
            return Err(JpegError::InvalidParameter(format!(
                "{} bytes do not hold a {width}x{height} {format:?} image",
                pixels.len()
            )));
        }

        Ok(Self::with_pixels(width, height, format, pixels))
    }

    fn with_pixels(width: usize, height: usize, format: PixelFormat, pixels: Vec<u8>) -> Self {
        let palette = (format == PixelFormat::Gray8).then(gray_ramp);

        Image {
            width,
            height,
            format,
            pixels,
            palette,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// The 256-entry gray ramp of a `Gray8` image.
    pub fn palette(&self) -> Option<&[[u8; 3]]> {
        self.palette.as_deref()
    }

    fn stride(&self) -> usize {
        self.width * self.format.bytes_per_pixel()
    }

    /// Converts to another pixel depth: RGB is reduced to luma with integer weights, gray is
    /// replicated into all three channels.
    pub fn convert(self, target: PixelFormat) -> Result<Image> {
        if self.format == target {
            return Ok(self);
        }

        let mut out = Image::new(self.width, self.height, target)?;
        let (src_stride, dst_stride) = (self.stride(), out.stride());

        for (src, dst) in self
            .pixels
            .chunks_exact(src_stride)
            .zip(out.pixels.chunks_exact_mut(dst_stride))
        {
            match target {
                PixelFormat::Gray8 => rgb_to_grayscale(src, dst),
                PixelFormat::Rgb24 => grayscale_to_rgb(src, dst),
            }
        }

        Ok(out)
    }
}

impl Surface for Image {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn read_line(&self, y: usize) -> &[u8] {
        let stride = self.stride();
        &self.pixels[y * stride..(y + 1) * stride]
    }

    fn write_span(&mut self, x: usize, y: usize, pixels: &[u8]) {
        let bpp = self.format.bytes_per_pixel();
        let stride = self.stride();
        if y >= self.height || x >= self.width {
            return;
        }

        let row = &mut self.pixels[y * stride..(y + 1) * stride];
        let start = x * bpp;
        let len = pixels.len().min(stride - start);
        row[start..start + len].copy_from_slice(&pixels[..len]);
    }
}
