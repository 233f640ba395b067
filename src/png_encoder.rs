use crate::checksum::Crc32;
use crate::deflate::deflate_stored;
use crate::image::PixelBuffer;
use crate::png_decoder::PNG_SIGNATURE;

/// Encodes a pixel buffer as a PNG: signature, IHDR, a single IDAT whose
/// zlib stream uses stored blocks with every row filtered as type 0, IEND.
pub fn encode_png(image: &PixelBuffer) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&PNG_SIGNATURE);

    write_chunk(&mut out, b"IHDR", &ihdr_payload(image));
    write_chunk(&mut out, b"IDAT", &idat_payload(image));
    write_chunk(&mut out, b"IEND", &[]);

    out
}

fn ihdr_payload(image: &PixelBuffer) -> Vec<u8> {
    let mut payload = Vec::with_capacity(13);
    payload.extend_from_slice(&(image.width as u32).to_be_bytes());
    payload.extend_from_slice(&(image.height as u32).to_be_bytes());
    payload.push(8); // bit depth
    payload.push(if image.channels == 4 { 6 } else { 2 });
    payload.push(0); // compression
    payload.push(0); // filter method
    payload.push(0); // interlace
    payload
}

fn idat_payload(image: &PixelBuffer) -> Vec<u8> {
    // Filter-type byte 0 in front of each raw row, then the stored-block
    // zlib wrap around the whole sequence.
    let stride = image.width * image.channels;
    let mut raw = Vec::with_capacity(image.height * (1 + stride));
    for y in 0..image.height {
        raw.push(0);
        raw.extend_from_slice(&image.data[y * stride..(y + 1) * stride]);
    }
    deflate_stored(&raw)
}

/// Chunk framing: big-endian length, type, payload, CRC-32 of type+payload.
fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(payload);

    let mut crc = Crc32::new();
    crc.update(chunk_type);
    crc.update(payload);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png_decoder::decode_png;
    use anyhow::Result;

    fn tiny_rgb() -> Result<PixelBuffer> {
        Ok(PixelBuffer::new(
            2,
            2,
            3,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        )?)
    }

    #[test]
    fn test_idat_wraps_stored_zlib() -> Result<()> {
        let image = tiny_rgb()?;
        let payload = idat_payload(&image);
        assert_eq!(&payload[..2], &[0x78, 0x01]);
        // Trailer is the Adler-32 of the filtered rows.
        assert!(payload.len() >= 6);
        Ok(())
    }

    #[test]
    fn test_encode_decode_identity() -> Result<()> {
        let image = tiny_rgb()?;
        let encoded = encode_png(&image);
        let decoded = decode_png(&encoded)?;
        assert_eq!(decoded, image);
        Ok(())
    }

    #[test]
    fn test_rgba_round_trip() -> Result<()> {
        let image = PixelBuffer::new(1, 2, 4, vec![1, 2, 3, 4, 5, 6, 7, 8])?;
        let decoded = decode_png(&encode_png(&image))?;
        assert_eq!(decoded, image);
        Ok(())
    }

    #[test]
    fn test_chunk_order() -> Result<()> {
        let encoded = encode_png(&tiny_rgb()?);
        let ihdr = 8 + 4;
        assert_eq!(&encoded[ihdr..ihdr + 4], b"IHDR");
        // IHDR spans 4 + 4 + 13 + 4 bytes after the signature.
        let idat = 8 + 25 + 4;
        assert_eq!(&encoded[idat..idat + 4], b"IDAT");
        assert_eq!(&encoded[encoded.len() - 8..encoded.len() - 4], b"IEND");
        Ok(())
    }
}
