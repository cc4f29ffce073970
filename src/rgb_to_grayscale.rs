/// Integer luma weights out of 256.
const R_WEIGHT: u32 = 77;
const G_WEIGHT: u32 = 150;
const B_WEIGHT: u32 = 29;

/// Reduces packed RGB triples in `src` to one gray byte each in `dst`.
pub(crate) fn rgb_to_grayscale(src: &[u8], dst: &mut [u8]) {
    for (px, gray) in src.chunks_exact(3).zip(dst.iter_mut()) {
        let luma = px[0] as u32 * R_WEIGHT + px[1] as u32 * G_WEIGHT + px[2] as u32 * B_WEIGHT;
        *gray = ((luma + 128) >> 8) as u8;
    }
}

/// Expands gray bytes into packed RGB triples.
pub(crate) fn grayscale_to_rgb(src: &[u8], dst: &mut [u8]) {
    for (&gray, px) in src.iter().zip(dst.chunks_exact_mut(3)) {
        px.fill(gray);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_rgb_to_grayscale() -> Result<()> {
        let src = [255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255];
        let mut dst = [0u8; 5];
        rgb_to_grayscale(&src, &mut dst);

        assert_eq!(dst, [255, 0, 77, 149, 29]);

        Ok(())
    }

    #[test]
    fn test_grayscale_to_rgb() -> Result<()> {
        let mut dst = [0u8; 6];
        grayscale_to_rgb(&[9, 200], &mut dst);

        assert_eq!(dst, [9, 9, 9, 200, 200, 200]);

        Ok(())
    }
}
