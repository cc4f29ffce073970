use crate::block::Block;

// Cosine constants in 13-bit fixed point.
const FIX_0_298631336: i32 = 2446;
const FIX_0_390180644: i32 = 3196;
const FIX_0_541196100: i32 = 4433;
const FIX_0_765366865: i32 = 6270;
const FIX_0_899976223: i32 = 7373;
const FIX_1_175875602: i32 = 9633;
const FIX_1_501321110: i32 = 12299;
const FIX_1_847759065: i32 = 15137;
const FIX_1_961570560: i32 = 16069;
const FIX_2_053119869: i32 = 16819;
const FIX_2_562915447: i32 = 20995;
const FIX_3_072711026: i32 = 25172;

/// One 8-point pass over the samples at `data[offset + k * stride]`. Even outputs are scaled by
/// `even`, the rest shifted right by `odd_shift`.
#[inline(always)]
fn pass(data: &mut [i32; 64], offset: usize, stride: usize, even: impl Fn(i32) -> i32, odd_shift: u32) {
    let at = |k: usize| offset + k * stride;
    let d = |k: usize| data[at(k)];

    let tmp0 = d(0) + d(7);
    let tmp7 = d(0) - d(7);
    let tmp1 = d(1) + d(6);
    let tmp6 = d(1) - d(6);
    let tmp2 = d(2) + d(5);
    let tmp5 = d(2) - d(5);
    let tmp3 = d(3) + d(4);
    let tmp4 = d(3) - d(4);

    let tmp10 = tmp0 + tmp3;
    let tmp13 = tmp0 - tmp3;
    let tmp11 = tmp1 + tmp2;
    let tmp12 = tmp1 - tmp2;

    let z1 = (tmp12 + tmp13) * FIX_0_541196100;
    let out2 = (z1 + tmp13 * FIX_0_765366865) >> odd_shift;
    let out6 = (z1 - tmp12 * FIX_1_847759065) >> odd_shift;

    let z1 = tmp4 + tmp7;
    let z2 = tmp5 + tmp6;
    let z3 = tmp4 + tmp6;
    let z4 = tmp5 + tmp7;
    let z5 = (z3 + z4) * FIX_1_175875602;

    let tmp4 = tmp4 * FIX_0_298631336;
    let tmp5 = tmp5 * FIX_2_053119869;
    let tmp6 = tmp6 * FIX_3_072711026;
    let tmp7 = tmp7 * FIX_1_501321110;
    let z1 = z1 * -FIX_0_899976223;
    let z2 = z2 * -FIX_2_562915447;
    let z3 = z3 * -FIX_1_961570560 + z5;
    let z4 = z4 * -FIX_0_390180644 + z5;

    data[at(0)] = even(tmp10 + tmp11);
    data[at(4)] = even(tmp10 - tmp11);
    data[at(2)] = out2;
    data[at(6)] = out6;
    data[at(7)] = (tmp4 + z1 + z3) >> odd_shift;
    data[at(5)] = (tmp5 + z2 + z4) >> odd_shift;
    data[at(3)] = (tmp6 + z2 + z3) >> odd_shift;
    data[at(1)] = (tmp7 + z1 + z4) >> odd_shift;
}

/// Integer (islow) forward DCT of level-shifted samples in natural order. The result is the
/// true DCT scaled by 8, which the quantizer divides back out.
pub fn fdct(samples: &Block) -> Block {
    let mut data = [0i32; 64];
    for (d, s) in data.iter_mut().zip(samples.0.iter()) {
        *d = *s as i32;
    }

    for row in 0..Block::WIDTH {
        pass(&mut data, row * Block::WIDTH, 1, |x| x << 2, 11);
    }
    for col in 0..Block::WIDTH {
        pass(&mut data, col, Block::WIDTH, |x| x >> 2, 15);
    }

    let mut out = Block::zeroed();
    for (o, d) in out.0.iter_mut().zip(data.iter()) {
        *o = *d as i16;
    }
    out
}
