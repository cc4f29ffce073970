use crate::block::Block;

// AAN constants in 8-bit fixed point.
const IFIX_1_082392200: i32 = 277;
const IFIX_1_414213562: i32 = 362;
const IFIX_1_847759065: i32 = 473;
const IFIX_2_613125930: i32 = 669;

/// Dequantized inputs are clamped to this magnitude so every pass stays within `i32`.
const PRODUCT_LIMIT: i32 = 1 << 20;

#[inline(always)]
fn mul(x: i32, c: i32) -> i32 {
    ((x as i64 * c as i64) >> 8) as i32
}

/// One 8-point AAN butterfly over `v`, in place.
#[inline(always)]
fn butterfly(v: &mut [i32; 8]) {
    let tmp10 = v[0] + v[4];
    let tmp11 = v[0] - v[4];
    let tmp13 = v[2] + v[6];
    let tmp12 = mul(v[2] - v[6], IFIX_1_414213562) - tmp13;

    let tmp0 = tmp10 + tmp13;
    let tmp3 = tmp10 - tmp13;
    let tmp1 = tmp11 + tmp12;
    let tmp2 = tmp11 - tmp12;

    let z13 = v[5] + v[3];
    let z10 = v[5] - v[3];
    let z11 = v[1] + v[7];
    let z12 = v[1] - v[7];

    let tmp7 = z11 + z13;
    let tmp11 = mul(z11 - z13, IFIX_1_414213562);
    let z5 = mul(z10 + z12, IFIX_1_847759065);
    let tmp10 = mul(z12, IFIX_1_082392200) - z5;
    let tmp12 = mul(z10, -IFIX_2_613125930) + z5;

    let tmp6 = tmp12 - tmp7;
    let tmp5 = tmp11 - tmp6;
    let tmp4 = tmp10 + tmp5;

    *v = [
        tmp0 + tmp7,
        tmp1 + tmp6,
        tmp2 + tmp5,
        tmp3 - tmp4,
        tmp3 + tmp4,
        tmp2 - tmp5,
        tmp1 - tmp6,
        tmp0 - tmp7,
    ];
}

/// Fixed-point AAN inverse DCT. `coefficients` are quantized values in natural order,
/// `dequant` the matching AAN-prescaled table. Output samples are level-shifted by +128 and
/// clamped to `0..=255`.
///
/// Columns go first; a column whose AC terms are all zero is filled with its DC product, and
/// a workspace row whose AC terms are all zero yields a flat output row.
pub fn idct(coefficients: &Block, dequant: &[i32; 64]) -> [u8; 64] {
    let mut workspace = [0i32; 64];

    for col in 0..Block::WIDTH {
        let input = |row: usize| {
            let i = row * Block::WIDTH + col;
            (coefficients.0[i] as i32 * dequant[i]).clamp(-PRODUCT_LIMIT, PRODUCT_LIMIT)
        };

        if (1..Block::WIDTH).all(|row| coefficients.0[row * Block::WIDTH + col] == 0) {
            let dc = input(0);
            for row in 0..Block::WIDTH {
                workspace[row * Block::WIDTH + col] = dc;
            }
            continue;
        }

        let mut v = [0i32; 8];
        for (row, value) in v.iter_mut().enumerate() {
            *value = input(row);
        }
        butterfly(&mut v);
        for (row, value) in v.iter().enumerate() {
            workspace[row * Block::WIDTH + col] = *value;
        }
    }

    let mut output = [0u8; 64];
    for (row, out) in output.chunks_exact_mut(Block::WIDTH).enumerate() {
        let mut v = [0i32; 8];
        v.copy_from_slice(&workspace[row * Block::WIDTH..(row + 1) * Block::WIDTH]);

        if v[1..].iter().all(|x| *x == 0) {
            out.fill(descale(v[0]));
            continue;
        }

        butterfly(&mut v);
        for (o, value) in out.iter_mut().zip(v.iter()) {
            *o = descale(*value);
        }
    }

    output
}

#[inline(always)]
fn descale(x: i32) -> u8 {
    ((x >> 5) + 128).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdct::fdct;
    use crate::quantization_table::{EncodeQuantTable, QuantizationTable};
    use crate::standard_tables::LUMINANCE_QUANT;
    use anyhow::Result;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn flat_table() -> Result<QuantizationTable> {
        Ok(QuantizationTable::from(0, &[1u8; 64])?)
    }

    #[test]
    fn test_dc_only_block_is_flat() -> Result<()> {
        let table = flat_table()?;

        for dc in [-1024i16, -300, -1, 0, 1, 77, 500, 1016] {
            let mut block = Block::zeroed();
            block.0[0] = dc;

            let samples = idct(&block, &table.dequant);
            assert!(samples.iter().all(|s| *s == samples[0]), "dc {dc}");

            let expected = (128 + dc as i32 / 8).clamp(0, 255);
            assert!((samples[0] as i32 - expected).abs() <= 1, "dc {dc}");
        }

        Ok(())
    }

    fn reference_idct(coefficients: &Block, steps: &[u16; 64]) -> [f64; 64] {
        let c = |u: usize| if u == 0 { FRAC_1_SQRT_2 } else { 1.0 };
        let mut out = [0f64; 64];

        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0.0;
                for v in 0..8 {
                    for u in 0..8 {
                        let f = coefficients.0[v * 8 + u] as f64 * steps[v * 8 + u] as f64;
                        sum += c(u)
                            * c(v)
                            * f
                            * (((2 * x + 1) * u) as f64 * PI / 16.0).cos()
                            * (((2 * y + 1) * v) as f64 * PI / 16.0).cos();
                    }
                }
                out[y * 8 + x] = sum / 4.0 + 128.0;
            }
        }

        out
    }

    #[test]
    fn test_matches_reference_transform() -> Result<()> {
        let table = QuantizationTable::from(0, &[16u8; 64])?;
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let mut block = Block::zeroed();
            block.0[0] = rng.random_range(-60..60);
            for v in 0..3 {
                for u in 0..3 {
                    if u + v > 0 {
                        block.0[v * 8 + u] = rng.random_range(-8..=8);
                    }
                }
            }

            let samples = idct(&block, &table.dequant);
            let reference = reference_idct(&block, &table.values);
            for i in 0..64 {
                let expected = reference[i].clamp(0.0, 255.0);
                assert!((samples[i] as f64 - expected).abs() <= 2.0, "sample {i}");
            }
        }

        Ok(())
    }

    #[test]
    fn test_forward_then_inverse() -> Result<()> {
        let mut pixels = Block::zeroed();
        for y in 0..8 {
            for x in 0..8 {
                pixels.0[y * 8 + x] = (x * 5 + y * 3) as i16 - 40;
            }
        }

        let encode_table = EncodeQuantTable::with_quality(&[16u8; 64], 50);
        let table = QuantizationTable::from(0, &[16u8; 64])?;
        let samples = idct(&encode_table.quantize(&fdct(&pixels)), &table.dequant);

        for i in 0..64 {
            let original = pixels.0[i] as i32 + 128;
            assert!((samples[i] as i32 - original).abs() <= 6, "sample {i}");
        }

        Ok(())
    }

    #[test]
    fn test_extreme_coefficients_do_not_overflow() -> Result<()> {
        let table = QuantizationTable::from(0, &LUMINANCE_QUANT)?;
        let block = Block([i16::MAX; 64]);

        let samples = idct(&block, &table.dequant);
        assert_eq!(samples.len(), 64);

        Ok(())
    }
}
