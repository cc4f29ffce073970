//! Fixed-point conversion between RGB and YCbCr, one row at a time.

#[inline(always)]
fn clamp_sample(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}

/// Converts one row of full-resolution Y, Cb, Cr samples into packed RGB triples.
pub(crate) fn ycbcr_to_rgb(y: &[u8], cb: &[u8], cr: &[u8], rgb: &mut [u8]) {
    for (((&y, &cb), &cr), px) in y.iter().zip(cb).zip(cr).zip(rgb.chunks_exact_mut(3)) {
        let y = (y as i32) << 8;
        let cb = cb as i32 - 128;
        let cr = cr as i32 - 128;

        px[0] = clamp_sample((y + 359 * cr) >> 8);
        px[1] = clamp_sample((y - 88 * cb - 183 * cr) >> 8);
        px[2] = clamp_sample((y + 453 * cb) >> 8);
    }
}

/// Converts packed RGB triples into level-shifted Y, Cb, Cr samples, each centred on zero.
pub(crate) fn rgb_to_ycbcr(rgb: &[u8], y: &mut [i16], cb: &mut [i16], cr: &mut [i16]) {
    for (((px, y), cb), cr) in rgb.chunks_exact(3).zip(y.iter_mut()).zip(cb.iter_mut()).zip(cr.iter_mut()) {
        let (r, g, b) = (px[0] as i32, px[1] as i32, px[2] as i32);

        *y = (((76 * r + 151 * g + 29 * b) >> 8) - 128) as i16;
        *cb = ((-43 * r - 85 * g + 128 * b) >> 8) as i16;
        *cr = ((128 * r - 107 * g - 21 * b) >> 8) as i16;
    }
}

#[cfg(feature = "simd")]
pub(crate) mod simd {
    use std::simd::prelude::*;

    const LANES: usize = 8;

    /// Vector form of [`super::ycbcr_to_rgb`]; the arithmetic is identical lane by lane.
    pub(crate) fn ycbcr_to_rgb(y: &[u8], cb: &[u8], cr: &[u8], rgb: &mut [u8]) {
        let len = y.len().min(cb.len()).min(cr.len()).min(rgb.len() / 3);
        let whole = len - len % LANES;

        let zero = i32x8::splat(0);
        let max = i32x8::splat(255);

        for i in (0..whole).step_by(LANES) {
            let ys = u8x8::from_slice(&y[i..i + LANES]).cast::<i32>() << i32x8::splat(8);
            let cbs = u8x8::from_slice(&cb[i..i + LANES]).cast::<i32>() - i32x8::splat(128);
            let crs = u8x8::from_slice(&cr[i..i + LANES]).cast::<i32>() - i32x8::splat(128);

            let r = ((ys + i32x8::splat(359) * crs) >> i32x8::splat(8)).simd_clamp(zero, max);
            let g = ((ys - i32x8::splat(88) * cbs - i32x8::splat(183) * crs) >> i32x8::splat(8))
                .simd_clamp(zero, max);
            let b = ((ys + i32x8::splat(453) * cbs) >> i32x8::splat(8)).simd_clamp(zero, max);

            let (r, g, b) = (r.to_array(), g.to_array(), b.to_array());
            for lane in 0..LANES {
                let px = &mut rgb[(i + lane) * 3..(i + lane) * 3 + 3];
                px[0] = r[lane] as u8;
                px[1] = g[lane] as u8;
                px[2] = b[lane] as u8;
            }
        }

        super::ycbcr_to_rgb(&y[whole..len], &cb[whole..len], &cr[whole..len], &mut rgb[whole * 3..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_gray_round_trip() -> Result<()> {
        for v in [0u8, 1, 64, 127, 128, 200, 255] {
            let (mut y, mut cb, mut cr) = ([0i16], [0i16], [0i16]);
            rgb_to_ycbcr(&[v, v, v], &mut y, &mut cb, &mut cr);

            assert!((y[0] + 128 - v as i16).abs() <= 1);
            assert!(cb[0].abs() <= 1 && cr[0].abs() <= 1);

            let mut rgb = [0u8; 3];
            ycbcr_to_rgb(&[(y[0] + 128) as u8], &[(cb[0] + 128) as u8], &[(cr[0] + 128) as u8], &mut rgb);
            for c in rgb {
                assert!((c as i16 - v as i16).abs() <= 2, "{v} -> {rgb:?}");
            }
        }

        Ok(())
    }

    #[test]
    fn test_primaries_round_trip() -> Result<()> {
        let colours = [[255u8, 0, 0], [0, 255, 0], [0, 0, 255], [30, 140, 220], [250, 250, 10]];

        for colour in colours {
            let (mut y, mut cb, mut cr) = ([0i16], [0i16], [0i16]);
            rgb_to_ycbcr(&colour, &mut y, &mut cb, &mut cr);

            let mut rgb = [0u8; 3];
            let shift = |v: i16| (v + 128).clamp(0, 255) as u8;
            ycbcr_to_rgb(&[shift(y[0])], &[shift(cb[0])], &[shift(cr[0])], &mut rgb);

            for (a, b) in rgb.iter().zip(colour.iter()) {
                assert!((*a as i16 - *b as i16).abs() <= 4, "{colour:?} -> {rgb:?}");
            }
        }

        Ok(())
    }

    #[test]
    fn test_output_is_clamped() -> Result<()> {
        let mut rgb = [0u8; 6];
        ycbcr_to_rgb(&[255, 0], &[255, 0], &[255, 0], &mut rgb);

        assert_eq!(rgb[0], 255);
        assert_eq!(rgb[2], 255);
        assert_eq!(rgb[3], 0);
        assert_eq!(rgb[5], 0);

        Ok(())
    }
}
