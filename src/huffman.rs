use crate::error::{Error, Result};

/// Longest code either container can declare (DEFLATE caps at 15, the
/// entropy-coded segment tables at 16).
pub(crate) const MAX_CODE_LENGTH: usize = 16;

/// One bit of an entropy-coded stream, in stream order. Implemented by the
/// LSB-first DEFLATE reader and the MSB-first scan reader so the canonical
/// decode walk below serves both.
pub(crate) trait BitSource {
    fn next_bit(&mut self) -> Result<u32>;
}

/// Decode-side canonical Huffman table: per-length counts plus the symbols
/// sorted by code length (ties broken by symbol order).
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTable {
    counts: [u32; MAX_CODE_LENGTH + 1],
    symbols: Vec<u16>,
}

impl HuffmanTable {
    /// Builds from one code length per symbol (0 = unused), the DEFLATE
    /// transmission form.
    pub(crate) fn from_code_lengths(lengths: &[u8]) -> Result<Self> {
        let mut counts = [0u32; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(Error::malformed(format!(
                    "huffman: code length {} exceeds {}",
                    len, MAX_CODE_LENGTH
                )));
            }
            if len > 0 {
                counts[len as usize] += 1;
            }
        }

        let mut symbols = Vec::new();
        for target in 1..=MAX_CODE_LENGTH as u8 {
            for (symbol, &len) in lengths.iter().enumerate() {
                if len == target {
                    symbols.push(symbol as u16);
                }
            }
        }

        let table = HuffmanTable { counts, symbols };
        table.check_kraft()?;
        Ok(table)
    }

    /// Builds from counts-per-length plus symbols already sorted by length,
    /// the DHT transmission form.
    pub(crate) fn from_counts_and_symbols(counts_by_length: &[u8; 16], symbols: &[u8]) -> Result<Self> {
        let total: usize = counts_by_length.iter().map(|&c| c as usize).sum();
        if total != symbols.len() {
            return Err(Error::malformed(format!(
                "huffman: counts declare {} symbols, {} provided",
                total,
                symbols.len()
            )));
        }

        let mut counts = [0u32; MAX_CODE_LENGTH + 1];
        for (i, &c) in counts_by_length.iter().enumerate() {
            counts[i + 1] = c as u32;
        }

        let table = HuffmanTable {
            counts,
            symbols: symbols.iter().map(|&s| s as u16).collect(),
        };
        table.check_kraft()?;
        Ok(table)
    }

    /// Decodes one symbol with the first/index walk, one bit at a time.
    pub(crate) fn decode<B: BitSource>(&self, bits: &mut B) -> Result<u16> {
        let mut code = 0u32;
        let mut first = 0u32;
        let mut index = 0u32;

        for len in 1..=MAX_CODE_LENGTH {
            code |= bits.next_bit()?;
            let count = self.counts[len];
            if code.wrapping_sub(first) < count {
                return Ok(self.symbols[(index + (code - first)) as usize]);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Err(Error::malformed("huffman: code exceeds maximum length"))
    }

    // A code space that is over-subscribed at any length can produce codes
    // that alias each other; reject the table outright. Incomplete tables
    // are legal (single-symbol distance trees occur in real streams).
    fn check_kraft(&self) -> Result<()> {
        let mut remaining: i64 = 1;
        for len in 1..=MAX_CODE_LENGTH {
            remaining <<= 1;
            remaining -= self.counts[len] as i64;
            if remaining < 0 {
                return Err(Error::malformed(format!(
                    "huffman: over-subscribed code space at length {}",
                    len
                )));
            }
        }
        Ok(())
    }
}
