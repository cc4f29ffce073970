use log::debug;

use crate::block::Block;
use crate::{color_spaces, fdct, idct};

/// The inner loops a codec session calls per block or per row. Implementations must agree
/// bit for bit, so a stream decodes identically whichever set was selected.
pub trait Kernels: Sync {
    fn name(&self) -> &'static str;

    /// Inverse DCT of a natural-order quantized block against an AAN-prescaled table.
    fn idct(&self, coefficients: &Block, dequant: &[i32; 64]) -> [u8; 64] {
        idct::idct(coefficients, dequant)
    }

    /// Forward DCT of level-shifted samples, scaled by 8.
    fn fdct(&self, samples: &Block) -> Block {
        fdct::fdct(samples)
    }

    fn ycbcr_to_rgb(&self, y: &[u8], cb: &[u8], cr: &[u8], rgb: &mut [u8]);

    fn rgb_to_ycbcr(&self, rgb: &[u8], y: &mut [i16], cb: &mut [i16], cr: &mut [i16]) {
        color_spaces::rgb_to_ycbcr(rgb, y, cb, cr)
    }
}

pub struct ScalarKernels;

impl Kernels for ScalarKernels {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn ycbcr_to_rgb(&self, y: &[u8], cb: &[u8], cr: &[u8], rgb: &mut [u8]) {
        color_spaces::ycbcr_to_rgb(y, cb, cr, rgb)
    }
}

#[cfg(feature = "simd")]
pub struct SimdKernels;

#[cfg(feature = "simd")]
impl Kernels for SimdKernels {
    fn name(&self) -> &'static str {
        "simd"
    }

    fn ycbcr_to_rgb(&self, y: &[u8], cb: &[u8], cr: &[u8], rgb: &mut [u8]) {
        color_spaces::simd::ycbcr_to_rgb(y, cb, cr, rgb)
    }
}

/// Picks the kernel set for a new decoder or encoder.
pub fn select() -> &'static dyn Kernels {
    #[cfg(feature = "simd")]
    let kernels: &'static dyn Kernels = &SimdKernels;
    #[cfg(not(feature = "simd"))]
    let kernels: &'static dyn Kernels = &ScalarKernels;

    debug!("using {} kernels", kernels.name());
    kernels
}
