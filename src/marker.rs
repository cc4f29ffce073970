mod code;

pub(crate) enum MarkerType {
    Segment,
    StandAlone,
}

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Hash, Eq)]
pub(crate) enum Marker {
    GLOBAL = 0xFF,
    STUFF = 0x00,

    /// Start of Frame markers, non-differential, Huffman coding
    /// Baseline DCT
    SOF0 = 0xC0,

    /// Extended sequential DCT
    SOF1 = 0xC1,

    /// Progressive DCT
    SOF2 = 0xC2,

    /// Lossless (sequential)
    SOF3 = 0xC3,

    /// Start of Frame markers, differential, Huffman coding
    /// Differential sequential DCT
    SOF5 = 0xC5,

    /// Differential progressive DCT
    SOF6 = 0xC6,

    /// Differential lossless (sequential)
    SOF7 = 0xC7,

    /// Reserved for JPEG extensions
    JPG = 0xC8,

    /// Start of Frame markers, non-differential, arithmetic coding
    /// Extended Sequential DCT
    SOF9 = 0xC9,

    /// Progressive DCT
    SOF10 = 0xCA,

    /// Lossless (sequential)
    SOF11 = 0xCB,

    /// Start of Frame markers, differential, arithmetic coding
    /// Differential sequential DCT
    SOF13 = 0xCD,

    /// Differential progressive DCT
    SOF14 = 0xCE,

    /// Differential lossless (sequential)
    SOF15 = 0xCF,

    /// Huffman table specification
    DHT = 0xC4,

    /// Define arithmetic coding conditioning(s)
    DAC = 0xCC,

    /// Restart with modulo 8 count "M"
    RST0 = 0xD0,
    RST1 = 0xD1,
    RST2 = 0xD2,
    RST3 = 0xD3,
    RST4 = 0xD4,
    RST5 = 0xD5,
    RST6 = 0xD6,
    RST7 = 0xD7,

    /// Start of image
    SOI = 0xD8,

    /// End of image
    EOI = 0xD9,

    /// Start of scan
    SOS = 0xDA,

    /// Define quantization table(s)
    DQT = 0xDB,

    /// Define number of lines
    DNL = 0xDC,

    /// Define restart interval
    DRI = 0xDD,

    /// Define hierarchical progression
    DHP = 0xDE,

    /// Expand reference components
    EXP = 0xDF,

    /// Reserved for application segments
    APP0 = 0xE0,
    APP1 = 0xE1,
    APP2 = 0xE2,
    APP3 = 0xE3,
    APP4 = 0xE4,
    APP5 = 0xE5,
    APP6 = 0xE6,
    APP7 = 0xE7,
    APP8 = 0xE8,
    APP9 = 0xE9,
    APPA = 0xEA,
    APPB = 0xEB,
    APPC = 0xEC,
    APPD = 0xED,
    APPE = 0xEE,
    APPF = 0xEF,

    /// Comment
    COM = 0xFE,

    /// For temporary private use in arithmetic coding
    TEM = 0x01,
}
