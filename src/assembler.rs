use std::ops::Range;

use crate::block::Block;
use crate::dispatch::Kernels;
use crate::error::Result;
use crate::frame_header::FrameHeader;
use crate::image::Surface;

/// Reconstructed samples of one component, a whole number of blocks wide and high.
#[derive(Debug, Clone)]
pub(crate) struct Plane {
    pub(crate) width: usize,
    pub(crate) data: Vec<u8>,
}

impl Plane {
    pub(crate) fn new(width: usize, height: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(width * height)?;
        data.resize(width * height, 0);

        Ok(Plane { width, data })
    }

    pub(crate) fn store_block(&mut self, block_row: usize, block_col: usize, samples: &[u8; 64]) {
        let start = block_row * Block::WIDTH * self.width;
        let band = &mut self.data[start..start + Block::WIDTH * self.width];
        write_block(band, self.width, block_col, samples);
    }

    pub(crate) fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

/// Copies an 8x8 sample block into column `block_col` of an 8-row band of a plane.
pub(crate) fn write_block(band: &mut [u8], width: usize, block_col: usize, samples: &[u8; 64]) {
    let x = block_col * Block::WIDTH;
    for (y, row) in samples.chunks_exact(Block::WIDTH).enumerate() {
        let start = y * width + x;
        band[start..start + Block::WIDTH].copy_from_slice(row);
    }
}

/// Writes image rows `rows` to `surface` from component planes whose first row lies at MCU row
/// `mcu_row`. Chroma samples are replicated over the luma samples they cover; grayscale frames
/// copy luma straight through.
pub(crate) fn assemble<S: Surface + ?Sized>(
    frame: &FrameHeader,
    planes: &[Plane],
    mcu_row: usize,
    rows: Range<usize>,
    surface: &mut S,
    kernels: &dyn Kernels,
) {
    let width = frame.image_width;
    let (max_h, max_v) = (frame.max_horizontal(), frame.max_vertical());
    let plane_row = |component: usize, y: usize| {
        let v = frame.components[component].vertical_sampling;
        y * v / max_v - mcu_row * v * Block::WIDTH
    };

    if frame.is_grayscale() {
        for y in rows {
            surface.write_span(0, y, &planes[0].row(plane_row(0, y))[..width]);
        }
        return;
    }

    let mut channels = [vec![0u8; width], vec![0u8; width], vec![0u8; width]];
    let mut rgb = vec![0u8; width * 3];

    for y in rows {
        for (component, channel) in channels.iter_mut().enumerate() {
            let h = frame.components[component].horizontal_sampling;
            let source = planes[component].row(plane_row(component, y));

            match h == max_h {
                true => channel.copy_from_slice(&source[..width]),
                false => channel
                    .iter_mut()
                    .enumerate()
                    .for_each(|(x, sample)| *sample = source[x * h / max_h]),
            }
        }

        kernels.ycbcr_to_rgb(&channels[0], &channels[1], &channels[2], &mut rgb);
        surface.write_span(0, y, &rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::CodingProcess;
    use crate::dispatch::ScalarKernels;
    use crate::image::{Image, PixelFormat};
    use crate::segment::Segment;
    use anyhow::Result;

    fn frame(width: u16, height: u16, luma: u8) -> Result<FrameHeader> {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.extend([3, 1, luma, 0, 2, 0x11, 1, 3, 0x11, 1]);

        Ok(FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&payload))?)
    }

    #[test]
    fn test_store_block() -> Result<()> {
        let mut plane = Plane::new(16, 16)?;
        let mut samples = [0u8; 64];
        samples.iter_mut().enumerate().for_each(|(i, s)| *s = i as u8);

        plane.store_block(1, 1, &samples);

        assert_eq!(plane.row(8)[8..], samples[..8]);
        assert_eq!(plane.row(15)[15], 63);
        assert_eq!(plane.row(7), &[0u8; 16]);

        Ok(())
    }

    #[test]
    fn test_chroma_is_replicated_in_411() -> Result<()> {
        let frame = frame(12, 10, 0x22)?;

        let mut luma = Plane::new(16, 16)?;
        luma.data.fill(128);
        let mut cb = Plane::new(8, 8)?;
        cb.data.fill(128);
        let mut cr = Plane::new(8, 8)?;
        cr.data.fill(128);
        // one red chroma sample covering luma columns 2..4 of rows 4..6
        cr.data[2 * 8 + 1] = 255;

        let mut image = Image::new(12, 10, PixelFormat::Rgb24)?;
        assemble(&frame, &[luma, cb, cr], 0, 0..10, &mut image, &ScalarKernels);

        let red = |x: usize, y: usize| image.read_line(y)[x * 3];
        assert_eq!(red(0, 0), 128);
        assert!(red(2, 4) > 200 && red(3, 5) > 200);
        assert_eq!(red(4, 4), 128);
        assert_eq!(red(2, 6), 128);

        Ok(())
    }

    #[test]
    fn test_second_mcu_row_band() -> Result<()> {
        let payload = [8, 0, 20, 0, 5, 1, 1, 0x11, 0];
        let gray = FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&payload))?;

        let mut band = Plane::new(8, 8)?;
        for y in 0..8 {
            band.data[y * 8..(y + 1) * 8].fill(y as u8 + 10);
        }

        let mut image = Image::new(5, 20, PixelFormat::Gray8)?;
        assemble(&gray, &[band], 2, 16..20, &mut image, &ScalarKernels);

        assert_eq!(image.read_line(16), &[10; 5]);
        assert_eq!(image.read_line(19), &[13; 5]);
        assert_eq!(image.read_line(15), &[0; 5]);

        Ok(())
    }
}
