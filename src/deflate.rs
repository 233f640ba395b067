use crate::checksum::Adler32;

const MAX_STORED_BLOCK: usize = 65535;

/// Wraps raw bytes in a zlib stream of stored (uncompressed) DEFLATE
/// blocks: `78 01` prelude, blocks of at most 65535 bytes framed by
/// LEN/NLEN, big-endian Adler-32 trailer.
pub(crate) fn deflate_stored(data: &[u8]) -> Vec<u8> {
    // Prelude, one 5-byte header per block, trailer.
    let block_count = data.len().div_ceil(MAX_STORED_BLOCK).max(1);
    let mut out = Vec::with_capacity(2 + data.len() + block_count * 5 + 4);
    out.push(0x78);
    out.push(0x01);

    let mut chunks = data.chunks(MAX_STORED_BLOCK).peekable();
    if chunks.peek().is_none() {
        // Zero-length input still needs one (empty, final) block.
        out.push(0x01);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(!0u16).to_le_bytes());
    }
    while let Some(chunk) = chunks.next() {
        let bfinal = chunks.peek().is_none();
        out.push(bfinal as u8); // BFINAL bit, BTYPE 00
        let len = chunk.len() as u16;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(chunk);
    }

    out.extend_from_slice(&Adler32::of(data).to_be_bytes());
    out
}
