/// JPEG marker bytes, always preceded by 0xFF in the stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Marker {
    /// Start of image
    Soi,
    /// End of image
    Eoi,
    /// Baseline DCT frame
    Sof0,
    /// Any other start-of-frame (extended, progressive, lossless,
    /// differential, arithmetic); all outside the supported subset
    SofOther(u8),
    /// Huffman table specification
    Dht,
    /// Quantization table specification
    Dqt,
    /// Start of scan
    Sos,
    /// Restart interval definition
    Dri,
    /// Restart marker 0..=7
    Rst(u8),
    /// Application segment 0..=15
    App(u8),
    /// Comment
    Com,
    /// Anything else; skipped via its declared length
    Other(u8),
}

impl Marker {
    pub(crate) fn from_byte(byte: u8) -> Marker {
        match byte {
            0xD8 => Marker::Soi,
            0xD9 => Marker::Eoi,
            0xC0 => Marker::Sof0,
            0xC1..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => Marker::SofOther(byte),
            0xC4 => Marker::Dht,
            0xDB => Marker::Dqt,
            0xDA => Marker::Sos,
            0xDD => Marker::Dri,
            0xD0..=0xD7 => Marker::Rst(byte & 0x07),
            0xE0..=0xEF => Marker::App(byte & 0x0F),
            0xFE => Marker::Com,
            other => Marker::Other(other),
        }
    }

    /// Standalone markers carry no length-prefixed payload.
    pub(crate) fn standalone(&self) -> bool {
        matches!(self, Marker::Soi | Marker::Eoi | Marker::Rst(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(Marker::from_byte(0xD8), Marker::Soi);
        assert_eq!(Marker::from_byte(0xC0), Marker::Sof0);
        assert_eq!(Marker::from_byte(0xC2), Marker::SofOther(0xC2));
        assert_eq!(Marker::from_byte(0xD3), Marker::Rst(3));
        assert_eq!(Marker::from_byte(0xE0), Marker::App(0));
        assert_eq!(Marker::from_byte(0x01), Marker::Other(0x01));
    }

    #[test]
    fn test_standalone() {
        assert!(Marker::Soi.standalone());
        assert!(Marker::Rst(7).standalone());
        assert!(!Marker::Dht.standalone());
        assert!(!Marker::App(0).standalone());
    }
}
