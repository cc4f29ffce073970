/// `ZIGZAG[k]` is the natural (row-major) index of the k-th coefficient in zig-zag scan order.
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// 64 signed coefficients (or level-shifted samples) of one 8x8 tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block(pub [i16; Block::LEN]);

impl Block {
    pub(crate) const WIDTH: usize = 8;
    pub(crate) const LEN: usize = Self::WIDTH * Self::WIDTH;

    pub const fn zeroed() -> Self {
        Block([0; Self::LEN])
    }

    pub fn dc(&self) -> i16 {
        self.0[0]
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Reorders a natural-order block into zig-zag scan order.
pub fn zigzag(natural: &Block) -> Block {
    let mut out = Block::zeroed();
    for (k, &n) in ZIGZAG.iter().enumerate() {
        out.0[k] = natural.0[n];
    }
    out
}

/// Reorders a zig-zag-ordered block back into natural order.
pub fn unzigzag(scan: &Block) -> Block {
    let mut out = Block::zeroed();
    for (k, &n) in ZIGZAG.iter().enumerate() {
        out.0[n] = scan.0[k];
    }
    out
}
