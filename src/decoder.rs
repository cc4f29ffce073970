use std::fs::File;
use std::path::Path;

use log::{debug, trace, warn};
use memmap::Mmap;

use crate::assembler::assemble;
use crate::bitreader::BitReader;
use crate::coding::CodingProcess;
use crate::decoder::coefficient_store::CoefficientStore;
use crate::dispatch::{self, Kernels};
use crate::error::{bad_image, JpegError, Result};
use crate::frame_header::FrameHeader;
use crate::huffman_table::{HuffmanClass, HuffmanTable};
use crate::image::{Image, PixelFormat};
use crate::jfif;
use crate::marker::{Marker, MarkerType};
use crate::progress::ProgressReporter;
use crate::quantization_table::QuantizationTable;
use crate::scan_header::{ScanHeader, ScanKind};

mod baseline;
mod coefficient_store;
mod progressive;

/// Caller-selectable decode settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Output depth. `None` keeps the stream's own: `Gray8` for one component, `Rgb24` for three.
    pub target: Option<PixelFormat>,
}

enum Source {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for Source {
    fn as_ref(&self) -> &[u8] {
        match self {
            Source::Mapped(mmap) => mmap,
            Source::Owned(bytes) => bytes,
        }
    }
}

/// The decoder takes as input compressed image data and table specifications, and by means of a
/// specific set of procedures generates as output digital reconstructed image data.
pub struct Decoder {
    source: Source,
    options: DecodeOptions,
    kernels: &'static dyn Kernels,
}

impl Decoder {
    pub fn from_file(file: File) -> Result<Self> {
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::with_source(Source::Mapped(mmap)))
    }

    pub fn from_file_path(file_path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(file_path)?;
        Decoder::from_file(file)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_source(Source::Owned(bytes))
    }

    fn with_source(source: Source) -> Self {
        Decoder {
            source,
            options: DecodeOptions::default(),
            kernels: dispatch::select(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn decode(&self) -> Result<Image> {
        self.run(None)
    }

    /// Decodes while reporting percentage progress to `observer`, which sees each value once.
    pub fn decode_with_progress(&self, mut observer: impl FnMut(u8)) -> Result<Image> {
        self.run(Some(&mut observer as &mut dyn FnMut(u8)))
    }

    fn run(&self, observer: Option<&mut dyn FnMut(u8)>) -> Result<Image> {
        let data = self.source.as_ref();
        debug!("decoding {} bytes", data.len());

        let session = Session::new(data, self.kernels, ProgressReporter::new(observer));
        let image = session.run()?;

        match self.options.target {
            Some(target) => image.convert(target),
            None => Ok(image),
        }
    }
}

/// Huffman tables resolved for one scan, indexed by frame component.
pub(crate) struct ScanTables {
    dc: Vec<Option<HuffmanTable>>,
    ac: Vec<Option<HuffmanTable>>,
}

impl ScanTables {
    pub(crate) fn dc(&self, component: usize) -> Result<&HuffmanTable> {
        self.dc[component]
            .as_ref()
            .ok_or_else(|| bad_image("scan uses an undefined DC Huffman table"))
    }

    pub(crate) fn ac(&self, component: usize) -> Result<&HuffmanTable> {
        self.ac[component]
            .as_ref()
            .ok_or_else(|| bad_image("scan uses an undefined AC Huffman table"))
    }
}

/// Tracks the RSTn markers expected every `interval` MCUs of a scan.
pub(crate) struct Restarts {
    interval: usize,
    next: u8,
}

impl Restarts {
    pub(crate) fn new(interval: usize) -> Self {
        Restarts { interval, next: 0 }
    }

    /// Called before MCU `index`. Returns true when a restart marker was consumed there, after
    /// which the caller resets its DC predictors and end-of-band run.
    pub(crate) fn before_mcu(&mut self, reader: &mut BitReader, index: usize) -> Result<bool> {
        if self.interval == 0 || index == 0 || index % self.interval != 0 {
            return Ok(false);
        }

        let code = reader.next_marker()?;
        match Marker::from_u8(code).and_then(|m| m.restart_index()) {
            Some(found) if found == self.next => {
                trace!("RST{found} before MCU {index}");
                self.next = (self.next + 1) & 7;
                Ok(true)
            }
            Some(found) => Err(bad_image(format!(
                "expected RST{} before MCU {index}, found RST{found}",
                self.next
            ))),
            None => Err(bad_image(format!(
                "expected RST{} before MCU {index}, found marker 0xFF{code:02X}",
                self.next
            ))),
        }
    }
}

/// State of one decode call: the byte cursor, every table installed so far, the frame and the
/// output being built.
pub(crate) struct Session<'a, 'p> {
    pub(crate) reader: BitReader<'a>,
    pub(crate) kernels: &'static dyn Kernels,
    pub(crate) progress: ProgressReporter<'p>,

    frame: Option<FrameHeader>,
    dc_tables: [Option<HuffmanTable>; 4],
    ac_tables: [Option<HuffmanTable>; 4],
    quant_tables: [Option<QuantizationTable>; 4],

    /// Quantization table in force when each frame component was first scanned.
    latched: Vec<Option<QuantizationTable>>,

    pub(crate) restart_interval: usize,
    pub(crate) store: Option<CoefficientStore>,
    pub(crate) image: Option<Image>,
    scans: usize,

    seen_app0: bool,
    seen_app1: bool,
}

impl<'a, 'p> Session<'a, 'p> {
    fn new(data: &'a [u8], kernels: &'static dyn Kernels, progress: ProgressReporter<'p>) -> Self {
        Session {
            reader: BitReader::new(data),
            kernels,
            progress,
            frame: None,
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            quant_tables: Default::default(),
            latched: vec![],
            restart_interval: 0,
            store: None,
            image: None,
            scans: 0,
            seen_app0: false,
            seen_app1: false,
        }
    }

    fn check_start_of_image(&mut self) -> Result<()> {
        match self.reader.data.get(..Marker::SIZE) {
            Some(&[0xFF, code]) if code == Marker::SOI as u8 => {
                self.reader.position = Marker::SIZE;
                Ok(())
            }
            _ => Err(JpegError::NotJpeg("missing SOI marker".to_string())),
        }
    }

    fn run(mut self) -> Result<Image> {
        self.check_start_of_image()?;

        loop {
            let code = self.reader.next_marker()?;

            let Some(marker) = Marker::from_u8(code) else {
                warn!("skipping reserved marker 0xFF{code:02X}");
                self.reader.read_segment()?;
                continue;
            };

            match marker {
                Marker::EOI => return self.finish(),
                Marker::SOS => self.read_scan()?,
                Marker::DHT => self.read_huffman_tables()?,
                Marker::DQT => self.read_quantization_tables()?,
                Marker::DRI => self.read_restart_interval()?,
                Marker::APP0 | Marker::APP1 => self.read_application(marker)?,
                Marker::SOF0 | Marker::SOF2 => self.read_frame(marker)?,
                m if m.is_unsupported_frame() => self.read_frame(m)?,
                m if m == Marker::JPG || matches!(m.kind(), MarkerType::StandAlone) => {
                    return Err(bad_image(format!("unexpected marker {marker:?}")));
                }
                _ => {
                    let segment = self.reader.read_segment()?;
                    trace!("skipping {marker:?} chunk, {} bytes", segment.len());
                }
            }
        }
    }

    fn read_frame(&mut self, marker: Marker) -> Result<()> {
        let process = CodingProcess::from_marker(marker)?;
        if self.frame.is_some() {
            return Err(bad_image("more than one frame header"));
        }

        let mut segment = self.reader.read_segment()?;
        let frame = FrameHeader::parse(process, &mut segment)?;
        segment.finish()?;

        if process.is_progressive() {
            self.store = Some(CoefficientStore::new(&frame)?);
        }
        self.latched = vec![None; frame.components.len()];
        self.frame = Some(frame);

        Ok(())
    }

    fn read_huffman_tables(&mut self) -> Result<()> {
        let mut segment = self.reader.read_segment()?;

        for table in HuffmanTable::parse_dht(&mut segment)? {
            let id = table.id as usize;
            match table.class {
                HuffmanClass::DC => self.dc_tables[id] = Some(table),
                HuffmanClass::AC => self.ac_tables[id] = Some(table),
            }
        }

        segment.finish()
    }

    fn read_quantization_tables(&mut self) -> Result<()> {
        let mut segment = self.reader.read_segment()?;

        for table in QuantizationTable::parse_dqt(&mut segment)? {
            let id = table.id as usize;
            self.quant_tables[id] = Some(table);
        }

        segment.finish()
    }

    fn read_restart_interval(&mut self) -> Result<()> {
        let mut segment = self.reader.read_segment()?;
        self.restart_interval = segment.read_u16()? as usize;
        debug!("restart interval {}", self.restart_interval);

        segment.finish()
    }

    /// The first APP0 and APP1 chunks before the frame are checked for their JFIF and Exif
    /// signatures; any others are skipped.
    fn read_application(&mut self, marker: Marker) -> Result<()> {
        let mut segment = self.reader.read_segment()?;
        let before_frame = self.frame.is_none();

        match marker {
            Marker::APP0 if before_frame && !self.seen_app0 => {
                self.seen_app0 = true;
                jfif::check_app0(&mut segment)?;
            }
            Marker::APP1 if before_frame && !self.seen_app1 => {
                self.seen_app1 = true;
                jfif::check_app1(&mut segment)?;
            }
            _ => {
                trace!("skipping {marker:?} chunk, {} bytes", segment.len());
                segment.skip_rest();
            }
        }

        segment.finish()
    }

    fn read_scan(&mut self) -> Result<()> {
        let frame = self
            .frame
            .clone()
            .ok_or_else(|| bad_image("scan before frame header"))?;

        let mut segment = self.reader.read_segment()?;
        let scan = ScanHeader::parse(&frame, &mut segment)?;
        segment.finish()?;

        self.latch_quantization_tables(&frame, &scan)?;
        let tables = self.scan_tables(&frame, &scan);
        self.reader.reset_bits();

        let streaming = !frame.process.is_progressive()
            && self.scans == 0
            && scan.components.len() == frame.components.len();

        if streaming {
            baseline::decode_scan(self, &frame, &scan, &tables)?;
        } else {
            if self.image.is_some() {
                return Err(bad_image("scan after every component was already decoded"));
            }
            if self.store.is_none() {
                self.store = Some(CoefficientStore::new(&frame)?);
            }
            progressive::decode_scan(self, &frame, &scan, &tables)?;
        }

        self.scans += 1;
        Ok(())
    }

    fn latch_quantization_tables(&mut self, frame: &FrameHeader, scan: &ScanHeader) -> Result<()> {
        for selector in &scan.components {
            let c = selector.component;
            if self.latched[c].is_some() {
                continue;
            }

            let id = frame.components[c].qt_table_id as usize;
            let table = self.quant_tables[id]
                .clone()
                .ok_or_else(|| bad_image(format!("quantization table {id} is not defined")))?;
            self.latched[c] = Some(table);
        }

        Ok(())
    }

    fn scan_tables(&self, frame: &FrameHeader, scan: &ScanHeader) -> ScanTables {
        let kind = scan.kind();
        let needs_dc = matches!(kind, ScanKind::Sequential | ScanKind::DcFirst);
        let needs_ac = matches!(kind, ScanKind::Sequential | ScanKind::AcFirst | ScanKind::AcRefine);

        let mut tables = ScanTables {
            dc: vec![None; frame.components.len()],
            ac: vec![None; frame.components.len()],
        };

        for selector in &scan.components {
            if needs_dc {
                tables.dc[selector.component] =
                    self.dc_tables[selector.dc_destination_id as usize].clone();
            }
            if needs_ac {
                tables.ac[selector.component] =
                    self.ac_tables[selector.ac_destination_id as usize].clone();
            }
        }

        tables
    }

    /// Dequantization tables for every frame component, as latched by their first scan.
    pub(crate) fn dequant_tables(&self, frame: &FrameHeader) -> Result<Vec<[i32; 64]>> {
        frame
            .components
            .iter()
            .zip(self.latched.iter())
            .map(|(component, latched)| {
                latched
                    .as_ref()
                    .or(self.quant_tables[component.qt_table_id as usize].as_ref())
                    .map(|table| table.dequant)
                    .ok_or_else(|| {
                        bad_image(format!(
                            "component {} has no quantization table",
                            component.component_id
                        ))
                    })
            })
            .collect()
    }

    pub(crate) fn native_format(frame: &FrameHeader) -> PixelFormat {
        match frame.is_grayscale() {
            true => PixelFormat::Gray8,
            false => PixelFormat::Rgb24,
        }
    }

    pub(crate) fn report_progress(&mut self) {
        self.progress.update(self.reader.position, self.reader.data.len());
    }

    fn finish(mut self) -> Result<Image> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| bad_image("end of image before a frame header"))?;
        if self.scans == 0 {
            return Err(bad_image("end of image before any scan"));
        }

        let image = match (self.image.take(), self.store.take()) {
            (Some(image), _) => image,
            (None, Some(store)) => {
                let dequant = self.dequant_tables(&frame)?;
                let planes = store.inverse_transform(&dequant, self.kernels)?;

                let mut image = Image::new(
                    frame.image_width,
                    frame.image_height,
                    Self::native_format(&frame),
                )?;
                assemble(&frame, &planes, 0, 0..frame.image_height, &mut image, self.kernels);
                image
            }
            (None, None) => return Err(bad_image("no image data was decoded")),
        };

        self.progress.finish();
        debug!("decoded {} scan(s)", self.scans);

        Ok(image)
    }
}
