use crate::error::{Error, Result};
use crate::huffman::BitSource;

/// MSB-first bit reader for the entropy-coded segment.
///
/// A 0xFF data byte is always followed by a 0x00 stuffing byte, which is
/// skipped. A 0xFF followed by anything else is a marker: the segment is
/// over and every further bit read fails.
pub(crate) struct ScanReader<'a> {
    data: &'a [u8],
    pos: usize,
    current: u8,
    bits_left: u8,
    at_marker: bool,
}

impl<'a> ScanReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        ScanReader {
            data,
            pos: 0,
            current: 0,
            bits_left: 0,
            at_marker: false,
        }
    }

    /// Reads `n` bits, most-significant first, as an unsigned integer.
    pub(crate) fn read_bits(&mut self, n: u8) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.next_bit()?;
        }
        Ok(value)
    }

    /// Drops any buffered partial byte. Only needed if restart support is
    /// ever added; kept for parity with the writer.
    #[allow(dead_code)]
    pub(crate) fn align_to_byte(&mut self) {
        self.bits_left = 0;
    }

    fn fetch_byte(&mut self) -> Result<()> {
        if self.at_marker {
            return Err(Error::malformed("scan: read past marker"));
        }
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::malformed("scan: entropy segment truncated"))?;
        self.pos += 1;

        if byte == 0xFF {
            match self.data.get(self.pos) {
                Some(0x00) => self.pos += 1, // stuffing byte
                _ => {
                    self.at_marker = true;
                    return Err(Error::malformed(
                        "scan: marker inside entropy-coded segment",
                    ));
                }
            }
        }

        self.current = byte;
        self.bits_left = 8;
        Ok(())
    }
}

impl BitSource for ScanReader<'_> {
    fn next_bit(&mut self) -> Result<u32> {
        if self.bits_left == 0 {
            self.fetch_byte()?;
        }
        self.bits_left -= 1;
        Ok(((self.current >> self.bits_left) & 1) as u32)
    }
}
