use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::{DynamicImage, GrayImage, RgbImage};
use log::info;

use jpeg_codec::{
    DecodeOptions, Decoder, Encoder, EncoderOptions, Image, PixelFormat, Sampling, Surface,
};

#[derive(Parser)]
#[command(version, about = "Baseline/progressive JPEG decoder and baseline JPEG encoder")]
struct Opt {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a JPEG into a PNG, PPM or PGM file
    Decode {
        /// Input JPEG file
        input: PathBuf,

        /// Output image file; the format follows the extension
        output: PathBuf,

        /// Convert the decoded image to grayscale
        #[arg(long)]
        gray: bool,
    },

    /// Encode a PNG, PPM or PGM image as a baseline JPEG
    Encode {
        /// Input image file
        input: PathBuf,

        /// Output JPEG file
        output: PathBuf,

        #[arg(long, default_value_t = 75, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        #[arg(long, value_enum, default_value_t = SamplingArg::S444)]
        sampling: SamplingArg,

        /// Write a single luma component
        #[arg(long)]
        greyscale: bool,

        /// Build per-image Huffman tables
        #[arg(long)]
        optimize: bool,

        /// MCUs between restart markers, 0 for none
        #[arg(long, default_value_t = 0)]
        restart: u16,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum SamplingArg {
    #[value(name = "444")]
    S444,
    #[value(name = "422")]
    S422,
    #[value(name = "411")]
    S411,
}

impl From<SamplingArg> for Sampling {
    fn from(arg: SamplingArg) -> Self {
        match arg {
            SamplingArg::S444 => Sampling::S444,
            SamplingArg::S422 => Sampling::S422,
            SamplingArg::S411 => Sampling::S411,
        }
    }
}

fn decode(input: PathBuf, output: PathBuf, gray: bool) -> Result<()> {
    let options = DecodeOptions {
        target: gray.then_some(PixelFormat::Gray8),
    };
    let decoded = Decoder::from_file_path(&input)
        .with_context(|| format!("opening {}", input.display()))?
        .with_options(options)
        .decode()
        .with_context(|| format!("decoding {}", input.display()))?;

    let (width, height) = (decoded.width() as u32, decoded.height() as u32);
    let format = decoded.format();
    let pixels = decoded.into_raw();

    let out = match format {
        PixelFormat::Gray8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        PixelFormat::Rgb24 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
    };
    let Some(out) = out else {
        bail!("decoded buffer does not match {width}x{height}");
    };

    out.save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}

fn encode(input: PathBuf, output: PathBuf, options: EncoderOptions) -> Result<()> {
    let source = image::open(&input).with_context(|| format!("reading {}", input.display()))?;
    let (width, height) = (source.width() as usize, source.height() as usize);

    let surface = match source {
        DynamicImage::ImageLuma8(gray) => Image::from_raw(width, height, PixelFormat::Gray8, gray.into_raw())?,
        other => Image::from_raw(width, height, PixelFormat::Rgb24, other.to_rgb8().into_raw())?,
    };

    Encoder::new(options)?
        .encode_to_file(&surface, &output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    match Opt::parse().command {
        Command::Decode { input, output, gray } => decode(input, output, gray),
        Command::Encode {
            input,
            output,
            quality,
            sampling,
            greyscale,
            optimize,
            restart,
        } => encode(
            input,
            output,
            EncoderOptions {
                quality,
                sampling: sampling.into(),
                greyscale,
                optimize,
                restart_interval: restart,
                comment: None,
            },
        ),
    }
}
