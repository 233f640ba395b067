use crate::bitreader::BitReader;
use crate::checksum::Adler32;
use crate::error::{Error, Result};
use crate::huffman::HuffmanTable;

/// Length codes 257..=285: (base, extra bits).
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance codes 0..=29: (base, extra bits).
const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length alphabet in dynamic blocks.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

const END_OF_BLOCK: u16 = 256;

/// Inflates a zlib-wrapped DEFLATE stream and verifies the Adler-32 trailer.
pub(crate) fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    // 2-byte prelude + at least the 4-byte trailer.
    if data.len() < 6 {
        return Err(Error::malformed("inflate: stream too short"));
    }

    let mut reader = BitReader::new(data);

    let cmf = reader.read_bits(8)? as u32;
    let flg = reader.read_bits(8)? as u32;

    if cmf & 0x0F != 8 {
        return Err(Error::malformed(format!(
            "inflate: compression method {} is not deflate",
            cmf & 0x0F
        )));
    }
    if (cmf >> 4) > 7 {
        return Err(Error::malformed("inflate: window size exceeds 32 KiB"));
    }
    if (cmf * 256 + flg) % 31 != 0 {
        return Err(Error::malformed("inflate: header check failed"));
    }
    if flg & 0x20 != 0 {
        return Err(Error::unsupported("inflate: preset dictionary"));
    }

    let mut out = Vec::new();
    loop {
        let bfinal = reader.read_bits(1)?;
        let btype = reader.read_bits(2)?;

        match btype {
            0 => inflate_stored(&mut reader, &mut out)?,
            1 => {
                let (litlen, dist) = fixed_tables()?;
                inflate_block(&mut reader, &litlen, &dist, &mut out)?;
            }
            2 => {
                let (litlen, dist) = read_dynamic_tables(&mut reader)?;
                inflate_block(&mut reader, &litlen, &dist, &mut out)?;
            }
            _ => return Err(Error::malformed("inflate: invalid block type 3")),
        }

        if bfinal == 1 {
            break;
        }
    }

    reader.align_to_byte();
    let trailer_at = reader.byte_position();
    let trailer = data
        .get(trailer_at..trailer_at + 4)
        .ok_or_else(|| Error::malformed("inflate: missing adler32 trailer"))?;
    let declared = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = Adler32::of(&out);
    if declared != actual {
        return Err(Error::malformed(format!(
            "inflate: adler32 mismatch, declared {:08x} computed {:08x}",
            declared, actual
        )));
    }

    Ok(out)
}

fn inflate_stored(reader: &mut BitReader, out: &mut Vec<u8>) -> Result<()> {
    reader.align_to_byte();
    let len = reader.read_u16_le()?;
    let nlen = reader.read_u16_le()?;
    if len != !nlen {
        return Err(Error::malformed(format!(
            "inflate: stored block length check failed ({:04x} vs {:04x})",
            len, nlen
        )));
    }
    for _ in 0..len {
        out.push(reader.read_byte()?);
    }
    Ok(())
}

/// RFC 1951 fixed tables: literal/length codes of 8/9/7/8 bits, five-bit
/// distance codes.
fn fixed_tables() -> Result<(HuffmanTable, HuffmanTable)> {
    let mut litlen_lengths = [0u8; 288];
    litlen_lengths[0..144].fill(8);
    litlen_lengths[144..256].fill(9);
    litlen_lengths[256..280].fill(7);
    litlen_lengths[280..288].fill(8);

    let litlen = HuffmanTable::from_code_lengths(&litlen_lengths)?;
    let dist = HuffmanTable::from_code_lengths(&[5u8; 32])?;
    Ok((litlen, dist))
}

fn read_dynamic_tables(reader: &mut BitReader) -> Result<(HuffmanTable, HuffmanTable)> {
    let hlit = reader.read_bits(5)? as usize + 257;
    let hdist = reader.read_bits(5)? as usize + 1;
    let hclen = reader.read_bits(4)? as usize + 4;

    let mut cl_lengths = [0u8; 19];
    for &slot in CODE_LENGTH_ORDER.iter().take(hclen) {
        cl_lengths[slot] = reader.read_bits(3)? as u8;
    }
    let cl_table = HuffmanTable::from_code_lengths(&cl_lengths)?;

    let total = hlit + hdist;
    let mut lengths = Vec::with_capacity(total);
    while lengths.len() < total {
        let sym = cl_table.decode(reader)?;
        match sym {
            0..=15 => lengths.push(sym as u8),
            16 => {
                let prev = *lengths
                    .last()
                    .ok_or_else(|| Error::malformed("inflate: repeat with no prior length"))?;
                let count = reader.read_bits(2)? as usize + 3;
                for _ in 0..count {
                    lengths.push(prev);
                }
            }
            17 => {
                let count = reader.read_bits(3)? as usize + 3;
                lengths.extend(std::iter::repeat(0).take(count));
            }
            18 => {
                let count = reader.read_bits(7)? as usize + 11;
                lengths.extend(std::iter::repeat(0).take(count));
            }
            _ => return Err(Error::malformed("inflate: invalid code-length symbol")),
        }
    }
    if lengths.len() != total {
        return Err(Error::malformed(
            "inflate: code length run overflows declared counts",
        ));
    }

    let litlen = HuffmanTable::from_code_lengths(&lengths[..hlit])?;
    let dist = HuffmanTable::from_code_lengths(&lengths[hlit..])?;
    Ok((litlen, dist))
}

/// The literal/length + distance loop shared by fixed and dynamic blocks.
fn inflate_block(
    reader: &mut BitReader,
    litlen: &HuffmanTable,
    dist: &HuffmanTable,
    out: &mut Vec<u8>,
) -> Result<()> {
    loop {
        let sym = litlen.decode(reader)?;
        if sym < END_OF_BLOCK {
            out.push(sym as u8);
            continue;
        }
        if sym == END_OF_BLOCK {
            return Ok(());
        }

        let len_index = (sym - 257) as usize;
        if len_index >= LENGTH_BASE.len() {
            return Err(Error::malformed(format!(
                "inflate: invalid length code {} at offset {}",
                sym,
                out.len()
            )));
        }
        let mut length = LENGTH_BASE[len_index] as usize;
        length += reader.read_bits(LENGTH_EXTRA[len_index])? as usize;

        let dist_sym = dist.decode(reader)? as usize;
        if dist_sym >= DIST_BASE.len() {
            return Err(Error::malformed(format!(
                "inflate: invalid distance code {} at offset {}",
                dist_sym,
                out.len()
            )));
        }
        let mut distance = DIST_BASE[dist_sym] as usize;
        distance += reader.read_bits(DIST_EXTRA[dist_sym])? as usize;

        if distance > out.len() {
            return Err(Error::malformed(format!(
                "inflate: distance {} reaches past output of {} bytes",
                distance,
                out.len()
            )));
        }

        // Forward byte-wise copy so length > distance repeats the tail.
        let start = out.len() - distance;
        for i in 0..length {
            let byte = out[start + i];
            out.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::deflate_stored;
    use anyhow::Result;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// LSB-first bit accumulator for hand-assembling deflate streams.
    struct BitSink {
        bytes: Vec<u8>,
        byte: u8,
        nbits: u8,
    }

    impl BitSink {
        fn new() -> Self {
            BitSink {
                bytes: Vec::new(),
                byte: 0,
                nbits: 0,
            }
        }

        fn push_bit(&mut self, bit: u32) {
            self.byte |= (bit as u8 & 1) << self.nbits;
            self.nbits += 1;
            if self.nbits == 8 {
                self.bytes.push(self.byte);
                self.byte = 0;
                self.nbits = 0;
            }
        }

        /// Header fields and extra bits: LSB-first integer.
        fn push_value(&mut self, value: u32, len: u8) {
            for i in 0..len {
                self.push_bit((value >> i) & 1);
            }
        }

        /// Huffman codes: most-significant code bit first.
        fn push_code(&mut self, code: u32, len: u8) {
            for i in (0..len).rev() {
                self.push_bit((code >> i) & 1);
            }
        }

        fn into_zlib(mut self, payload_for_adler: &[u8]) -> Vec<u8> {
            if self.nbits > 0 {
                self.bytes.push(self.byte);
            }
            let mut stream = vec![0x78, 0x01];
            stream.extend_from_slice(&self.bytes);
            stream.extend_from_slice(&Adler32::of(payload_for_adler).to_be_bytes());
            stream
        }
    }

    #[test]
    fn test_stored_round_trip() -> Result<()> {
        let payload = b"stored block payload".to_vec();
        let stream = deflate_stored(&payload);
        assert_eq!(inflate(&stream)?, payload);
        Ok(())
    }

    #[test]
    fn test_stored_round_trip_random_sizes() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0x1A2B3C4D);
        for &size in &[0usize, 1, 255, 65535, 65536, 200 * 1024] {
            let payload: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
            let stream = deflate_stored(&payload);
            assert_eq!(inflate(&stream)?, payload, "size {}", size);
        }
        Ok(())
    }

    #[test]
    fn test_fixed_block_with_backreference() -> Result<()> {
        // "aaaaaa" as one literal 'a' plus a length-5 distance-1
        // back-reference, which exercises run-length expansion.
        let mut sink = BitSink::new();
        sink.push_value(1, 1); // BFINAL
        sink.push_value(1, 2); // BTYPE fixed
        sink.push_code(0x30 + 97, 8); // literal 'a'
        sink.push_code(259 - 256, 7); // length symbol 259 = 5
        sink.push_code(0, 5); // distance symbol 0 = 1
        sink.push_code(0, 7); // end of block

        assert_eq!(inflate(&sink.into_zlib(b"aaaaaa"))?, b"aaaaaa");
        Ok(())
    }

    #[test]
    fn test_dynamic_block_hello() -> Result<()> {
        // Hand-assembled dynamic-Huffman stream for "Hello, Hello, Hello.":
        // literals "Hello, ", a length-12 distance-7 back-reference, '.',
        // EOB. Nine literal/length symbols all get 4-bit codes; the single
        // distance symbol (code 5, base 7) gets a 1-bit code.
        let expected = b"Hello, Hello, Hello.";
        let mut sink = BitSink::new();
        sink.push_value(1, 1); // BFINAL
        sink.push_value(2, 2); // BTYPE dynamic
        sink.push_value(9, 5); // HLIT: 266 - 257
        sink.push_value(5, 5); // HDIST: 6 - 1
        sink.push_value(14, 4); // HCLEN: 18 - 4

        // Code-length alphabet: symbols {0, 1, 4, 17, 18} all length 3,
        // transmitted in the permuted order up to symbol 1 (18 slots).
        for len in [0u32, 3, 3, 3, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 3] {
            sink.push_value(len, 3);
        }

        // Canonical CL codes by ascending symbol: 0=000, 1=001, 4=010,
        // 17=011, 18=100.
        let cl_zero = (0b000, 3u8);
        let cl_one = (0b001, 3u8);
        let cl_four = (0b010, 3u8);
        let cl_rep3 = (0b011, 3u8); // symbol 17, 3 extra bits
        let cl_rep11 = (0b100, 3u8); // symbol 18, 7 extra bits

        // 266 literal/length code lengths: 4s at the used symbols, zeros
        // elsewhere, compressed with 17/18 runs.
        let push_len_4 = |sink: &mut BitSink| sink.push_code(cl_four.0, cl_four.1);
        let push_zeros = |sink: &mut BitSink, n: u32| match n {
            0 => {}
            1 | 2 => {
                for _ in 0..n {
                    sink.push_code(cl_zero.0, cl_zero.1);
                }
            }
            3..=10 => {
                sink.push_code(cl_rep3.0, cl_rep3.1);
                sink.push_value(n - 3, 3);
            }
            _ => {
                sink.push_code(cl_rep11.0, cl_rep11.1);
                sink.push_value(n - 11, 7);
            }
        };

        push_zeros(&mut sink, 32); // 0..=31
        push_len_4(&mut sink); // 32 ' '
        push_zeros(&mut sink, 11); // 33..=43
        push_len_4(&mut sink); // 44 ','
        push_zeros(&mut sink, 1); // 45
        push_len_4(&mut sink); // 46 '.'
        push_zeros(&mut sink, 25); // 47..=71
        push_len_4(&mut sink); // 72 'H'
        push_zeros(&mut sink, 28); // 73..=100
        push_len_4(&mut sink); // 101 'e'
        push_zeros(&mut sink, 6); // 102..=107
        push_len_4(&mut sink); // 108 'l'
        push_zeros(&mut sink, 2); // 109..=110
        push_len_4(&mut sink); // 111 'o'
        push_zeros(&mut sink, 138); // 112..=249
        push_zeros(&mut sink, 6); // 250..=255
        push_len_4(&mut sink); // 256 EOB
        push_zeros(&mut sink, 8); // 257..=264
        push_len_4(&mut sink); // 265 length base 11

        // 6 distance code lengths: five zeros then a 1-bit code for
        // symbol 5.
        push_zeros(&mut sink, 5);
        sink.push_code(cl_one.0, cl_one.1);

        // Canonical 4-bit literal/length codes by ascending symbol:
        // ' '=0, ','=1, '.'=2, 'H'=3, 'e'=4, 'l'=5, 'o'=6, EOB=7, 265=8.
        let code_of = |byte: u8| -> u32 {
            match byte {
                b' ' => 0,
                b',' => 1,
                b'.' => 2,
                b'H' => 3,
                b'e' => 4,
                b'l' => 5,
                b'o' => 6,
                _ => unreachable!(),
            }
        };

        for &byte in b"Hello, " {
            sink.push_code(code_of(byte), 4);
        }
        sink.push_code(8, 4); // length symbol 265
        sink.push_value(1, 1); // extra bit: 11 + 1 = 12
        sink.push_code(0, 1); // distance symbol 5
        sink.push_value(0, 1); // extra bit: 7 + 0 = 7
        sink.push_code(code_of(b'.'), 4);
        sink.push_code(7, 4); // EOB

        assert_eq!(inflate(&sink.into_zlib(expected))?, expected);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_prelude() {
        // Valid pair would need (cmf * 256 + flg) % 31 == 0.
        assert!(inflate(&[0x78, 0x02, 0, 0, 0, 0, 0]).is_err());
        // Method 7 is not deflate.
        assert!(inflate(&[0x77, 0x01, 0, 0, 0, 0, 0]).is_err());
        // FDICT set (0x7820 passes the mod-31 check).
        assert!(inflate(&[0x78, 0x20, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_rejects_nlen_mismatch() {
        // Stored block whose NLEN is not the complement of LEN.
        let stream = [0x78, 0x01, 0x01, 0x02, 0x00, 0x00, 0x00, 0, 0, 0, 0];
        assert!(inflate(&stream).is_err());
    }

    #[test]
    fn test_rejects_invalid_block_type() {
        let mut sink = BitSink::new();
        sink.push_value(1, 1);
        sink.push_value(3, 2); // BTYPE 11
        assert!(inflate(&sink.into_zlib(b"")).is_err());
    }

    #[test]
    fn test_rejects_distance_too_far() {
        // Fixed block opening with a back-reference before any output.
        let mut sink = BitSink::new();
        sink.push_value(1, 1);
        sink.push_value(1, 2);
        sink.push_code(257 - 256, 7); // length symbol 257 = 3
        sink.push_code(0, 5); // distance 1, but output is empty
        assert!(inflate(&sink.into_zlib(b"")).is_err());
    }
}
