use log::trace;

use crate::block::{Block, ZIGZAG};
use crate::error::{bad_image, JpegError, Result};
use crate::segment::Segment;

/// AAN scale factors `cos(k*pi/16) * sqrt(2)` for k > 0, 1 for k = 0.
const AAN_SCALE: [f64; 8] = [
    1.0,
    1.387039845,
    1.306562965,
    1.175875602,
    1.0,
    0.785694958,
    0.541196100,
    0.275899379,
];

fn aan_factor(natural_index: usize) -> f64 {
    AAN_SCALE[natural_index / Block::WIDTH] * AAN_SCALE[natural_index % Block::WIDTH]
}

/// The set of 64 quantization values used to dequantize the DCT coefficients of one table
/// destination, stored in natural order and pre-scaled for the AAN inverse transform.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    /// Tq: one of four possible destinations at the decoder.
    pub(crate) id: u8,

    /// Qk, natural order.
    #[cfg(test)]
    pub(crate) values: [u16; 64],

    /// `Qk * AAN(k)` in 2.2 fixed point (`Qk * AAN(k) * 4`, rounded).
    pub(crate) dequant: [i32; 64],
}

impl QuantizationTable {
    pub(crate) fn from(id: u8, zigzag_values: &[u8]) -> Result<Self> {
        let mut values = [0u16; 64];
        for (k, &q) in zigzag_values.iter().enumerate().take(64) {
            if q == 0 {
                return Err(bad_image(format!("quantization table {id} holds a zero step")));
            }
            values[ZIGZAG[k]] = q as u16;
        }

        let mut dequant = [0i32; 64];
        for (i, d) in dequant.iter_mut().enumerate() {
            let scaled = (values[i] as f64 * aan_factor(i) * 16384.0) as i32;
            *d = (scaled + (1 << 11)) >> 12;
        }

        Ok(QuantizationTable {
            id,
            #[cfg(test)]
            values,
            dequant,
        })
    }

    /// Parses every table carried by one DQT segment. Only 8-bit precision is accepted.
    pub(crate) fn parse_dqt(segment: &mut Segment) -> Result<Vec<QuantizationTable>> {
        let mut tables = vec![];

        while !segment.is_empty() {
            let info = segment.read_u8()?;
            let (precision, id) = (info >> 4, info & 0x0F);

            if id > 3 {
                return Err(bad_image(format!("invalid quantization table id {id}")));
            }
            if precision != 0 {
                return Err(JpegError::Unsupported(
                    "16-bit quantization table precision".to_string(),
                ));
            }

            trace!("DQT table {id}");
            tables.push(QuantizationTable::from(id, segment.read_bytes(64)?)?);
        }

        Ok(tables)
    }
}

/// Encoder-side table: quality-scaled steps plus the reciprocals used by `quantize`.
#[derive(Debug, Clone)]
pub struct EncodeQuantTable {
    /// Steps in natural order.
    steps: [u16; 64],

    /// `65536 / step`, natural order.
    reciprocal: [i32; 64],
}

impl EncodeQuantTable {
    /// Scales an Annex K base table. Quality 100 uses the base divided by 15; below that the
    /// IJG percentage curve applies. Every step is clamped to `1..=255`.
    pub(crate) fn with_quality(base: &[u8; 64], quality: u8) -> Self {
        let quality = quality.clamp(1, 100) as u32;
        let percent = match quality {
            100 => None,
            q if q < 50 => Some(5000 / q),
            q => Some(200 - 2 * q),
        };

        let mut steps = [0u16; 64];
        let mut reciprocal = [0i32; 64];
        for (i, &b) in base.iter().enumerate() {
            let value = match percent {
                None => b as u32 / 15,
                Some(p) => b as u32 * p / 100,
            };
            steps[i] = value.clamp(1, 255) as u16;
            reciprocal[i] = (1 << 16) / steps[i] as i32;
        }

        EncodeQuantTable { steps, reciprocal }
    }

    /// Quantizes forward-DCT output (scaled by 8) to `round(c / (8 * step))`.
    pub fn quantize(&self, coefficients: &Block) -> Block {
        let mut out = Block::zeroed();
        for (i, (&c, &r)) in coefficients.0.iter().zip(self.reciprocal.iter()).enumerate() {
            let magnitude = ((c as i32).abs() * r + (1 << 18)) >> 19;
            out.0[i] = match c < 0 {
                true => -magnitude as i16,
                false => magnitude as i16,
            };
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn step(&self, natural_index: usize) -> u16 {
        self.steps[natural_index]
    }

    /// Inverse of `quantize`, back into the forward-DCT output scale.
    #[cfg(test)]
    pub(crate) fn dequantize(&self, quantized: &Block) -> [i32; 64] {
        let mut out = [0i32; 64];
        for (i, o) in out.iter_mut().enumerate() {
            *o = quantized.0[i] as i32 * self.steps[i] as i32 * 8;
        }
        out
    }

    /// Appends `Pq/Tq` and the 64 steps in zig-zag order to a DQT payload.
    pub(crate) fn write(&self, id: u8, payload: &mut Vec<u8>) {
        payload.push(id);
        payload.extend(ZIGZAG.iter().map(|&n| self.steps[n] as u8));
    }
}
