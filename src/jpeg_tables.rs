use once_cell::sync::Lazy;

/// Zig-zag scan order: natural-order index of the k-th coefficient from low
/// to high spatial frequency.
pub(crate) const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Base luminance quantization table (natural order).
pub(crate) const QUANT_LUMA: [u8; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69,
    56, 14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104,
    113, 92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

/// Base chrominance quantization table (natural order).
pub(crate) const QUANT_CHROMA: [u8; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99,
    99, 47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

/// Quantization table as transmitted in DQT: 64 byte entries in zig-zag
/// order, so the k-th zig-zag coefficient dequantizes by `values[k]`.
#[derive(Debug, Clone)]
pub(crate) struct QuantTable {
    pub(crate) values: [u8; 64],
}

/// Scales a base table for the requested quality (clamped to [1, 100]);
/// every entry lands in [1, 255] so dequantization can never multiply by
/// zero.
pub(crate) fn scale_quant_table(base: &[u8; 64], quality: u8) -> [u8; 64] {
    let quality = quality.clamp(1, 100) as u32;
    let scale = if quality < 50 {
        5000 / quality
    } else {
        200 - 2 * quality
    };

    let mut out = [0u8; 64];
    for (i, &b) in base.iter().enumerate() {
        let scaled = (b as u32 * scale + 50) / 100;
        out[i] = scaled.clamp(1, 255) as u8;
    }
    out
}

// Standard Huffman table specifications (counts per code length, then the
// symbols in code order).

pub(crate) const STD_DC_LUMA_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub(crate) const STD_DC_LUMA_VALS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub(crate) const STD_DC_CHROMA_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
pub(crate) const STD_DC_CHROMA_VALS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub(crate) const STD_AC_LUMA_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
pub(crate) const STD_AC_LUMA_VALS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61,
    0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52,
    0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25,
    0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45,
    0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64,
    0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83,
    0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99,
    0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3,
    0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8,
    0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

pub(crate) const STD_AC_CHROMA_BITS: [u8; 16] =
    [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
pub(crate) const STD_AC_CHROMA_VALS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61,
    0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33,
    0x52, 0xF0, 0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18,
    0x19, 0x1A, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44,
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63,
    0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A,
    0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97,
    0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA,
    0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
    0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

/// Encode-side Huffman book: symbol -> (code, code length). Symbols with
/// length 0 are absent from the table and must never be emitted.
pub(crate) struct EncodeTable {
    codes: [u16; 256],
    lengths: [u8; 256],
}

impl EncodeTable {
    /// Derives canonical codes from a counts-per-length + symbols spec, the
    /// same assignment rule the decoder walks.
    fn from_spec(bits: &[u8; 16], vals: &[u8]) -> Self {
        let mut codes = [0u16; 256];
        let mut lengths = [0u8; 256];

        let mut code = 0u16;
        let mut k = 0usize;
        for (i, &count) in bits.iter().enumerate() {
            for _ in 0..count {
                let symbol = vals[k] as usize;
                codes[symbol] = code;
                lengths[symbol] = i as u8 + 1;
                code += 1;
                k += 1;
            }
            code <<= 1;
        }

        EncodeTable { codes, lengths }
    }

    pub(crate) fn code(&self, symbol: u8) -> (u16, u8) {
        let (code, length) = (self.codes[symbol as usize], self.lengths[symbol as usize]);
        debug_assert!(length > 0, "symbol {:#04x} has no code", symbol);
        (code, length)
    }
}

pub(crate) static DC_LUMA_BOOK: Lazy<EncodeTable> =
    Lazy::new(|| EncodeTable::from_spec(&STD_DC_LUMA_BITS, &STD_DC_LUMA_VALS));
pub(crate) static AC_LUMA_BOOK: Lazy<EncodeTable> =
    Lazy::new(|| EncodeTable::from_spec(&STD_AC_LUMA_BITS, &STD_AC_LUMA_VALS));
pub(crate) static DC_CHROMA_BOOK: Lazy<EncodeTable> =
    Lazy::new(|| EncodeTable::from_spec(&STD_DC_CHROMA_BITS, &STD_DC_CHROMA_VALS));
pub(crate) static AC_CHROMA_BOOK: Lazy<EncodeTable> =
    Lazy::new(|| EncodeTable::from_spec(&STD_AC_CHROMA_BITS, &STD_AC_CHROMA_VALS));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_corners() {
        assert_eq!(&ZIGZAG[..8], &[0, 1, 8, 16, 9, 2, 3, 10]);
        assert_eq!(ZIGZAG[63], 63);
        // A permutation: every natural index appears exactly once.
        let mut seen = [false; 64];
        for &z in ZIGZAG.iter() {
            assert!(!seen[z]);
            seen[z] = true;
        }
    }

    #[test]
    fn test_quality_scaling() {
        // Quality 50 leaves the base table unchanged.
        assert_eq!(scale_quant_table(&QUANT_LUMA, 50), QUANT_LUMA);

        // Quality 100 floors every entry at 1.
        let q100 = scale_quant_table(&QUANT_LUMA, 100);
        assert!(q100.iter().all(|&v| v == 1));

        // Quality 1 saturates at 255.
        let q1 = scale_quant_table(&QUANT_LUMA, 1);
        assert!(q1.iter().all(|&v| v == 255));

        // Out-of-range qualities clamp instead of wrapping.
        assert_eq!(scale_quant_table(&QUANT_LUMA, 0), q1);
    }

    #[test]
    fn test_dc_luma_book_codes() {
        // Canonical assignment for the standard DC luminance spec: symbol 0
        // gets the single 2-bit code 00, symbols 1..=5 follow at 3 bits.
        let (code, len) = DC_LUMA_BOOK.code(0);
        assert_eq!((code, len), (0b00, 2));
        let (code, len) = DC_LUMA_BOOK.code(1);
        assert_eq!((code, len), (0b010, 3));
        let (code, len) = DC_LUMA_BOOK.code(5);
        assert_eq!((code, len), (0b110, 3));
    }

    #[test]
    fn test_ac_books_cover_rle_symbols() {
        for book in [&AC_LUMA_BOOK, &AC_CHROMA_BOOK] {
            let (_, eob_len) = book.code(0x00);
            let (_, zrl_len) = book.code(0xF0);
            assert!(eob_len > 0);
            assert!(zrl_len > 0);
        }
    }
}
