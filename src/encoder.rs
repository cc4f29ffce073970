use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;

use crate::bitwriter::BitWriter;
use crate::block::{zigzag, Block};
use crate::coding::CodingProcess;
use crate::dispatch::{self, Kernels};
use crate::encoder::entropy::{
    encode_block, slot, standard_specs, FrequencyCounter, HuffmanWriter, SymbolSink,
};
use crate::error::{JpegError, Result};
use crate::frame_header::{Component, FrameHeader};
use crate::huffman_table::{HuffmanClass, HuffmanSpec};
use crate::huffman_tree::HuffmanTree;
use crate::image::{PixelFormat, Surface};
use crate::jfif;
use crate::marker::Marker;
use crate::mcu::McuLayout;
use crate::quantization_table::EncodeQuantTable;
use crate::scan_header::{ScanComponentSelector, ScanHeader};
use crate::standard_tables::{CHROMINANCE_QUANT, LUMINANCE_QUANT};

pub(crate) mod entropy;

/// Largest payload a COM chunk can carry.
const MAX_COMMENT_LEN: usize = u16::MAX as usize - 2;

/// Chroma subsampling of a colour encode, named after the luma sampling factors it implies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Sampling {
    /// Luma and chroma at full resolution.
    #[default]
    S444,
    /// Chroma halved horizontally (h=2, v=1).
    S422,
    /// Chroma halved in both directions (h=2, v=2).
    S411,
}

impl Sampling {
    /// Luma `(h, v)` sampling factors.
    pub fn luma_factors(&self) -> (usize, usize) {
        match self {
            Sampling::S444 => (1, 1),
            Sampling::S422 => (2, 1),
            Sampling::S411 => (2, 2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// 1..=100, clamped.
    pub quality: u8,
    pub sampling: Sampling,

    /// Write a single luma component. Gray sources are always encoded this way.
    pub greyscale: bool,

    /// Build per-image Huffman tables from a counting pass instead of the Annex K ones.
    pub optimize: bool,

    /// MCUs between restart markers; 0 disables them.
    pub restart_interval: u16,

    /// COM chunk text. `None` writes a default naming the crate version.
    pub comment: Option<String>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            quality: 75,
            sampling: Sampling::S444,
            greyscale: false,
            optimize: false,
            restart_interval: 0,
            comment: None,
        }
    }
}

/// Quantized, zig-zag ordered blocks of one component, row-major over its block grid.
struct ComponentBlocks {
    cols: usize,
    blocks: Vec<Block>,
}

impl ComponentBlocks {
    fn block(&self, row: usize, col: usize) -> &Block {
        &self.blocks[row * self.cols + col]
    }
}

/// Level-shifted samples of one component, padded to whole MCUs.
struct SamplePlane {
    width: usize,
    height: usize,
    data: Vec<i16>,
}

impl SamplePlane {
    fn new(width: usize, height: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(width * height)?;
        data.resize(width * height, 0);
        Ok(SamplePlane { width, height, data })
    }

    fn row_mut(&mut self, y: usize) -> &mut [i16] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    /// Averages `fx x fy` cells into one sample, rounding to nearest.
    fn downsample(&self, fx: usize, fy: usize) -> Result<SamplePlane> {
        let mut out = SamplePlane::new(self.width / fx, self.height / fy)?;
        let count = (fx * fy) as i32;

        for y in 0..out.height {
            for x in 0..out.width {
                let mut sum = 0i32;
                for sy in 0..fy {
                    let row = (y * fy + sy) * self.width;
                    for sx in 0..fx {
                        sum += self.data[row + x * fx + sx] as i32;
                    }
                }
                out.data[y * out.width + x] = (sum + count / 2).div_euclid(count) as i16;
            }
        }

        Ok(out)
    }
}

/// Baseline JPEG encoder. One instance can encode any number of surfaces.
pub struct Encoder {
    options: EncoderOptions,
    kernels: &'static dyn Kernels,
}

impl Encoder {
    pub fn new(options: EncoderOptions) -> Result<Self> {
        if let Some(comment) = &options.comment {
            if comment.len() > MAX_COMMENT_LEN {
                return Err(JpegError::InvalidParameter(format!(
                    "comment of {} bytes does not fit a COM chunk",
                    comment.len()
                )));
            }
        }

        Ok(Encoder {
            options,
            kernels: dispatch::select(),
        })
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encodes `surface` into a complete JFIF stream.
    pub fn encode<S: Surface + ?Sized>(&self, surface: &S) -> Result<Vec<u8>> {
        let (width, height) = (surface.width(), surface.height());
        if width == 0 || height == 0 || width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(JpegError::InvalidParameter(format!(
                "image dimensions {width}x{height}"
            )));
        }

        let frame = self.frame_header(surface);
        let quality = self.options.quality.clamp(1, 100);
        info!(
            "encoding {width}x{height}, {} components, quality {quality}",
            frame.components.len()
        );

        let quant = [
            EncodeQuantTable::with_quality(&LUMINANCE_QUANT, quality),
            EncodeQuantTable::with_quality(&CHROMINANCE_QUANT, quality),
        ];

        let planes = self.sample_planes(&frame, surface)?;
        let coefficients = planes
            .iter()
            .enumerate()
            .map(|(c, plane)| self.transform(plane, &quant[c.min(1)]))
            .collect::<Vec<_>>();

        let components: Vec<usize> = (0..frame.components.len()).collect();
        let layout = McuLayout::for_scan(&frame, &components);
        let interval = self.options.restart_interval as usize;

        let specs = match self.options.optimize {
            true => optimized_specs(&layout, &coefficients, interval)?,
            false => standard_specs(),
        };

        let mut writer = BitWriter::with_capacity(width * height / 4);
        self.write_headers(&mut writer, &frame, &quant, &specs);

        let mut huffman = HuffmanWriter::new(writer, &specs)?;
        encode_scan(&mut huffman, &layout, &coefficients, interval)?;

        let mut writer = huffman.into_writer();
        writer.write_marker(Marker::EOI);
        debug!("encoded {} bytes", writer.len());

        Ok(writer.into_bytes())
    }

    /// Encodes `surface` and writes the stream to `path`.
    pub fn encode_to_file<S: Surface + ?Sized>(
        &self,
        surface: &S,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = self.encode(surface)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn frame_header<S: Surface + ?Sized>(&self, surface: &S) -> FrameHeader {
        let greyscale = self.options.greyscale || surface.format() == PixelFormat::Gray8;

        let components = match greyscale {
            true => vec![Component::from(1, 1, 1, 0)],
            false => {
                let (h, v) = self.options.sampling.luma_factors();
                vec![
                    Component::from(1, h, v, 0),
                    Component::from(2, 1, 1, 1),
                    Component::from(3, 1, 1, 1),
                ]
            }
        };

        FrameHeader {
            process: CodingProcess::BaselineDct,
            image_height: surface.height(),
            image_width: surface.width(),
            components,
        }
    }

    /// Reads the surface into level-shifted component planes padded to whole MCUs by
    /// replicating the last column and row, then subsamples chroma.
    fn sample_planes<S: Surface + ?Sized>(
        &self,
        frame: &FrameHeader,
        surface: &S,
    ) -> Result<Vec<SamplePlane>> {
        let (mcu_width, mcu_height) = frame.mcu_size();
        let (mcus_x, mcus_y) = frame.mcus();
        let (padded_width, padded_height) = (mcus_x * mcu_width, mcus_y * mcu_height);
        let (width, height) = (frame.image_width, frame.image_height);

        let mut full = (0..frame.components.len())
            .map(|_| SamplePlane::new(padded_width, padded_height))
            .collect::<Result<Vec<_>>>()?;

        let mut gray = vec![0i16; width];
        let mut spare = [vec![0i16; width], vec![0i16; width]];

        for y in 0..padded_height {
            let line = surface.read_line(y.min(height - 1));

            match surface.format() {
                PixelFormat::Gray8 => {
                    let row = full[0].row_mut(y);
                    for (out, &v) in row.iter_mut().zip(line) {
                        *out = v as i16 - 128;
                    }
                }
                PixelFormat::Rgb24 if full.len() == 1 => {
                    let [cb, cr] = &mut spare;
                    self.kernels.rgb_to_ycbcr(line, &mut gray, cb, cr);
                    full[0].row_mut(y)[..width].copy_from_slice(&gray);
                }
                PixelFormat::Rgb24 => {
                    let [luma, cb, cr] = &mut full[..] else {
                        return Err(JpegError::InvalidParameter(
                            "colour encode needs three planes".to_string(),
                        ));
                    };
                    self.kernels.rgb_to_ycbcr(
                        line,
                        &mut luma.row_mut(y)[..width],
                        &mut cb.row_mut(y)[..width],
                        &mut cr.row_mut(y)[..width],
                    );
                }
            }

            for plane in full.iter_mut() {
                let row = plane.row_mut(y);
                let last = row[width - 1];
                row[width..].fill(last);
            }
        }

        let (max_h, max_v) = (frame.max_horizontal(), frame.max_vertical());
        full.into_iter()
            .zip(&frame.components)
            .map(|(plane, c)| {
                let (fx, fy) = (max_h / c.horizontal_sampling, max_v / c.vertical_sampling);
                match (fx, fy) {
                    (1, 1) => Ok(plane),
                    _ => plane.downsample(fx, fy),
                }
            })
            .collect()
    }

    /// Forward DCT and quantization of every block of one plane, in parallel.
    fn transform(&self, plane: &SamplePlane, quant: &EncodeQuantTable) -> ComponentBlocks {
        let cols = plane.width / Block::WIDTH;
        let rows = plane.height / Block::WIDTH;
        let kernels = self.kernels;

        let blocks = (0..rows * cols)
            .into_par_iter()
            .map(|index| {
                let (row, col) = (index / cols, index % cols);
                let mut samples = Block::zeroed();
                for y in 0..Block::WIDTH {
                    let start = (row * Block::WIDTH + y) * plane.width + col * Block::WIDTH;
                    samples.0[y * Block::WIDTH..(y + 1) * Block::WIDTH]
                        .copy_from_slice(&plane.data[start..start + Block::WIDTH]);
                }
                zigzag(&quant.quantize(&kernels.fdct(&samples)))
            })
            .collect();

        ComponentBlocks { cols, blocks }
    }

    fn write_headers(
        &self,
        writer: &mut BitWriter,
        frame: &FrameHeader,
        quant: &[EncodeQuantTable; 2],
        specs: &[HuffmanSpec],
    ) {
        let color = !frame.is_grayscale();

        writer.write_marker(Marker::SOI);
        writer.write_segment(Marker::APP0, &jfif::app0_payload());

        let comment = self
            .options
            .comment
            .clone()
            .unwrap_or_else(|| format!("Generated by jpeg_codec {}", env!("CARGO_PKG_VERSION")));
        writer.write_segment(Marker::COM, comment.as_bytes());

        let mut payload = vec![];
        quant[0].write(0, &mut payload);
        if color {
            quant[1].write(1, &mut payload);
        }
        writer.write_segment(Marker::DQT, &payload);

        payload.clear();
        frame.write(&mut payload);
        writer.write_segment(Marker::SOF0, &payload);

        payload.clear();
        for (chroma, id) in [(false, 0), (true, 1)] {
            if chroma && !color {
                break;
            }
            for class in [HuffmanClass::DC, HuffmanClass::AC] {
                specs[slot(class, chroma)].write(class, id, &mut payload);
            }
        }
        writer.write_segment(Marker::DHT, &payload);

        if self.options.restart_interval > 0 {
            writer.write_segment(Marker::DRI, &self.options.restart_interval.to_be_bytes());
        }

        let scan = ScanHeader {
            components: (0..frame.components.len())
                .map(|component| {
                    let table = (component > 0) as u8;
                    ScanComponentSelector {
                        component,
                        dc_destination_id: table,
                        ac_destination_id: table,
                    }
                })
                .collect(),
            start_of_spectral_selection: 0,
            end_of_spectral_selection: 63,
            successive_approx_high: 0,
            successive_approx_low: 0,
        };
        payload.clear();
        scan.write(frame, &mut payload);
        writer.write_segment(Marker::SOS, &payload);
    }
}

/// Runs the single interleaved scan into `sink`, restarting every `interval` MCUs.
fn encode_scan<S: SymbolSink>(
    sink: &mut S,
    layout: &McuLayout,
    coefficients: &[ComponentBlocks],
    interval: usize,
) -> Result<()> {
    let mut predictors = vec![0i32; coefficients.len()];

    for my in 0..layout.mcus_y {
        for mx in 0..layout.mcus_x {
            let index = my * layout.mcus_x + mx;
            if interval > 0 && index > 0 && index % interval == 0 {
                sink.restart(((index / interval - 1) % 8) as u8);
                predictors.fill(0);
            }

            for entry in &layout.blocks {
                let c = entry.component;
                let (row, col) = layout.block_position(mx, my, entry);
                encode_block(sink, coefficients[c].block(row, col), &mut predictors[c], c > 0)?;
            }
        }
    }

    Ok(())
}

/// Gather pass over the scan, then one length-limited table per used slot.
fn optimized_specs(
    layout: &McuLayout,
    coefficients: &[ComponentBlocks],
    interval: usize,
) -> Result<Vec<HuffmanSpec>> {
    let mut counter = FrequencyCounter::new();
    encode_scan(&mut counter, layout, coefficients, interval)?;

    let mut specs = standard_specs();
    for (spec, freqs) in specs.iter_mut().zip(counter.freqs.iter()) {
        if freqs.iter().any(|&f| f > 0) {
            *spec = HuffmanTree::build(freqs)?;
        }
    }

    debug!(
        "optimized Huffman tables: {:?} symbols",
        specs.iter().map(|s| s.symbols.len()).collect::<Vec<_>>()
    );
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::image::Image;
    use anyhow::Result;

    fn gradient(width: usize, height: usize) -> Result<Image> {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.extend([(x * 255 / width) as u8, (y * 255 / height) as u8, 96]);
            }
        }
        Ok(Image::from_raw(width, height, PixelFormat::Rgb24, pixels)?)
    }

    /// Segment markers in stream order, up to SOS.
    fn header_markers(bytes: &[u8]) -> Vec<u8> {
        let mut markers = vec![bytes[1]];
        let mut i = 2;
        while i + 4 <= bytes.len() {
            let code = bytes[i + 1];
            markers.push(code);
            if code == 0xDA {
                break;
            }
            i += 2 + u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        }
        markers
    }

    #[test]
    fn test_header_order() -> Result<()> {
        let image = gradient(20, 12)?;
        let options = EncoderOptions {
            restart_interval: 2,
            ..Default::default()
        };
        let bytes = Encoder::new(options)?.encode(&image)?;

        assert_eq!(
            header_markers(&bytes),
            vec![0xD8, 0xE0, 0xFE, 0xDB, 0xC0, 0xC4, 0xDD, 0xDA]
        );
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);

        let comment = format!("Generated by jpeg_codec {}", env!("CARGO_PKG_VERSION"));
        assert!(bytes.windows(comment.len()).any(|w| w == comment.as_bytes()));

        Ok(())
    }

    #[test]
    fn test_optimized_tables_are_smaller() -> Result<()> {
        let image = gradient(64, 48)?;

        let standard = Encoder::new(EncoderOptions::default())?.encode(&image)?;
        let optimized = Encoder::new(EncoderOptions {
            optimize: true,
            ..Default::default()
        })?
        .encode(&image)?;
        assert!(optimized.len() < standard.len());

        let a = Decoder::from_bytes(standard).decode()?;
        let b = Decoder::from_bytes(optimized).decode()?;
        assert_eq!(a, b);

        Ok(())
    }

    #[test]
    fn test_greyscale_option() -> Result<()> {
        let image = gradient(17, 9)?;
        let options = EncoderOptions {
            greyscale: true,
            ..Default::default()
        };
        let bytes = Encoder::new(options)?.encode(&image)?;
        let decoded = Decoder::from_bytes(bytes).decode()?;

        assert_eq!(decoded.format(), PixelFormat::Gray8);
        assert_eq!((decoded.width(), decoded.height()), (17, 9));

        Ok(())
    }

    #[test]
    fn test_downsample_rounds() -> Result<()> {
        let mut plane = SamplePlane::new(4, 2)?;
        plane.data.copy_from_slice(&[1, 2, -3, -4, 3, 4, -5, -5]);

        let halved = plane.downsample(2, 1)?;
        assert_eq!(halved.data, vec![2, -3, 4, -5]);

        let quartered = plane.downsample(2, 2)?;
        assert_eq!(quartered.data, vec![3, -4]);

        Ok(())
    }

    #[test]
    fn test_rejects_oversized_comment() {
        let options = EncoderOptions {
            comment: Some("x".repeat(MAX_COMMENT_LEN + 1)),
            ..Default::default()
        };
        assert!(matches!(
            Encoder::new(options),
            Err(JpegError::InvalidParameter(_))
        ));
    }
}
