use crate::marker::{Marker, MarkerType};

impl Marker {
    pub(crate) const SIZE: usize = 2;

    /// Maps the low byte of a `0xFFxx` marker code. Reserved codes (`0x02..=0xBF`) and the
    /// JPGn extension range have no variant and map to `None`.
    pub(crate) fn from_u8(b: u8) -> Option<Marker> {
        use crate::marker::Marker::*;

        let marker = match b {
            0x01 => TEM,
            0xC0 => SOF0,
            0xC1 => SOF1,
            0xC2 => SOF2,
            0xC3 => SOF3,
            0xC4 => DHT,
            0xC5 => SOF5,
            0xC6 => SOF6,
            0xC7 => SOF7,
            0xC8 => JPG,
            0xC9 => SOF9,
            0xCA => SOF10,
            0xCB => SOF11,
            0xCC => DAC,
            0xCD => SOF13,
            0xCE => SOF14,
            0xCF => SOF15,
            0xD0 => RST0,
            0xD1 => RST1,
            0xD2 => RST2,
            0xD3 => RST3,
            0xD4 => RST4,
            0xD5 => RST5,
            0xD6 => RST6,
            0xD7 => RST7,
            0xD8 => SOI,
            0xD9 => EOI,
            0xDA => SOS,
            0xDB => DQT,
            0xDC => DNL,
            0xDD => DRI,
            0xDE => DHP,
            0xDF => EXP,
            0xE0 => APP0,
            0xE1 => APP1,
            0xE2 => APP2,
            0xE3 => APP3,
            0xE4 => APP4,
            0xE5 => APP5,
            0xE6 => APP6,
            0xE7 => APP7,
            0xE8 => APP8,
            0xE9 => APP9,
            0xEA => APPA,
            0xEB => APPB,
            0xEC => APPC,
            0xED => APPD,
            0xEE => APPE,
            0xEF => APPF,
            0xFE => COM,
            _ => return None,
        };

        Some(marker)
    }

    /// Some markers stand alone, that is, they are not the start of a marker segment.
    pub(crate) fn kind(&self) -> MarkerType {
        match self {
            Marker::RST0
            | Marker::RST1
            | Marker::RST2
            | Marker::RST3
            | Marker::RST4
            | Marker::RST5
            | Marker::RST6
            | Marker::RST7
            | Marker::SOI
            | Marker::EOI
            | Marker::TEM => MarkerType::StandAlone,
            _ => MarkerType::Segment,
        }
    }

    /// Start-of-frame codes for processes this codec does not implement.
    pub(crate) fn is_unsupported_frame(&self) -> bool {
        matches!(
            self,
            Marker::SOF1
                | Marker::SOF3
                | Marker::SOF5
                | Marker::SOF6
                | Marker::SOF7
                | Marker::SOF9
                | Marker::SOF10
                | Marker::SOF11
                | Marker::SOF13
                | Marker::SOF14
                | Marker::SOF15
        )
    }

    /// The modulo-8 count of a restart marker.
    pub(crate) fn restart_index(&self) -> Option<u8> {
        let code = *self as u8;
        (Marker::RST0 as u8..=Marker::RST7 as u8)
            .contains(&code)
            .then(|| code - Marker::RST0 as u8)
    }

    pub(crate) fn restart(index: u8) -> Marker {
        use crate::marker::Marker::*;

        [RST0, RST1, RST2, RST3, RST4, RST5, RST6, RST7][(index & 7) as usize]
    }

    pub(crate) fn to_u16(&self) -> u16 {
        u16::from_be_bytes([Marker::GLOBAL as u8, *self as u8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_from_u8() -> Result<()> {
        assert_eq!(Marker::from_u8(0xD8), Some(Marker::SOI));
        assert_eq!(Marker::from_u8(0xC2), Some(Marker::SOF2));
        assert_eq!(Marker::from_u8(0x02), None);
        assert_eq!(Marker::from_u8(0xF3), None);

        Ok(())
    }

    #[test]
    fn test_restart_markers() -> Result<()> {
        for i in 0..8u8 {
            let marker = Marker::restart(i);
            assert_eq!(marker.restart_index(), Some(i));
            assert!(matches!(marker.kind(), MarkerType::StandAlone));
        }
        assert_eq!(Marker::restart(9), Marker::RST1);
        assert_eq!(Marker::SOS.restart_index(), None);
        assert_eq!(Marker::EOI.to_u16(), 0xFFD9);

        Ok(())
    }
}
