use crate::bitwriter::BitWriter;
use crate::color_spaces::rgb_to_ycbcr;
use crate::dct::Dct;
use crate::image::PixelBuffer;
use crate::jpeg_tables::{
    scale_quant_table, AC_CHROMA_BOOK, AC_LUMA_BOOK, DC_CHROMA_BOOK, DC_LUMA_BOOK, EncodeTable,
    QUANT_CHROMA, QUANT_LUMA, STD_AC_CHROMA_BITS, STD_AC_CHROMA_VALS, STD_AC_LUMA_BITS,
    STD_AC_LUMA_VALS, STD_DC_CHROMA_BITS, STD_DC_CHROMA_VALS, STD_DC_LUMA_BITS, STD_DC_LUMA_VALS,
    ZIGZAG,
};
use log::debug;

/// Encodes a pixel buffer as a baseline JFIF stream with three 1x1-sampled
/// YCbCr components and the standard Huffman tables. An alpha channel, if
/// present, is dropped. Quality is clamped to [1, 100].
pub fn encode_jpeg(image: &PixelBuffer, quality: u8) -> Vec<u8> {
    let luma_table = scale_quant_table(&QUANT_LUMA, quality);
    let chroma_table = scale_quant_table(&QUANT_CHROMA, quality);
    debug!(
        "jpeg: encoding {}x{} at quality {}",
        image.width, image.height, quality
    );

    let mut writer = BitWriter::new();
    write_headers(
        &mut writer,
        image.width,
        image.height,
        &luma_table,
        &chroma_table,
    );
    writer.set_stuffing(true);

    let dct = Dct::new();
    let mut prev_dc = [0i32; 3];

    // 8x8 blocks in raster order; edge blocks replicate the last row and
    // column of the image.
    let mut block_y = [0.0f32; 64];
    let mut block_cb = [0.0f32; 64];
    let mut block_cr = [0.0f32; 64];

    let mut y = 0;
    while y < image.height {
        let mut x = 0;
        while x < image.width {
            for by in 0..8 {
                for bx in 0..8 {
                    let px = (x + bx).min(image.width - 1);
                    let py = (y + by).min(image.height - 1);
                    let offset = image.offset(px, py);
                    let (luma, cb, cr) = rgb_to_ycbcr(
                        image.data[offset],
                        image.data[offset + 1],
                        image.data[offset + 2],
                    );
                    block_y[by * 8 + bx] = luma;
                    block_cb[by * 8 + bx] = cb;
                    block_cr[by * 8 + bx] = cr;
                }
            }

            encode_block(
                &mut writer,
                &quantize(&dct.forward(&block_y), &luma_table),
                &mut prev_dc[0],
                &DC_LUMA_BOOK,
                &AC_LUMA_BOOK,
            );
            encode_block(
                &mut writer,
                &quantize(&dct.forward(&block_cb), &chroma_table),
                &mut prev_dc[1],
                &DC_CHROMA_BOOK,
                &AC_CHROMA_BOOK,
            );
            encode_block(
                &mut writer,
                &quantize(&dct.forward(&block_cr), &chroma_table),
                &mut prev_dc[2],
                &DC_CHROMA_BOOK,
                &AC_CHROMA_BOOK,
            );

            x += 8;
        }
        y += 8;
    }

    writer.write_marker(0xD9); // EOI
    writer.into_bytes()
}

/// Divides by the quantization table (round half away from zero) and
/// reorders into zig-zag sequence.
fn quantize(frequencies: &[f32; 64], table: &[u8; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (k, entry) in out.iter_mut().enumerate() {
        let natural = ZIGZAG[k];
        *entry = (frequencies[natural] / table[natural] as f32).round() as i32;
    }
    out
}

/// Number of magnitude bits needed for |value|.
fn bit_size(magnitude: u32) -> u8 {
    (32 - magnitude.leading_zeros()) as u8
}

/// Sign-magnitude bit pattern: non-negative values verbatim, negative
/// values offset by 2^size - 1.
fn magnitude_bits(value: i32, size: u8) -> u32 {
    if value < 0 {
        (value + (1 << size) - 1) as u32
    } else {
        value as u32
    }
}

/// DC difference then run-length coded AC coefficients, EOB only when a
/// zero run reaches coefficient 63.
fn encode_block(
    writer: &mut BitWriter,
    block: &[i32; 64],
    prev_dc: &mut i32,
    dc_book: &EncodeTable,
    ac_book: &EncodeTable,
) {
    let dc = block[0];
    let diff = dc - *prev_dc;
    *prev_dc = dc;

    let size = bit_size(diff.unsigned_abs());
    let (code, length) = dc_book.code(size);
    writer.write_bits(code as u32, length);
    if size > 0 {
        writer.write_bits(magnitude_bits(diff, size), size);
    }

    let mut run = 0u32;
    for &value in block[1..].iter() {
        if value == 0 {
            run += 1;
            continue;
        }
        while run >= 16 {
            let (code, length) = ac_book.code(0xF0); // ZRL
            writer.write_bits(code as u32, length);
            run -= 16;
        }

        let size = bit_size(value.unsigned_abs());
        let (code, length) = ac_book.code(((run as u8) << 4) | size);
        writer.write_bits(code as u32, length);
        writer.write_bits(magnitude_bits(value, size), size);
        run = 0;
    }

    if run > 0 {
        let (code, length) = ac_book.code(0x00); // EOB
        writer.write_bits(code as u32, length);
    }
}

fn write_headers(
    writer: &mut BitWriter,
    width: usize,
    height: usize,
    luma_table: &[u8; 64],
    chroma_table: &[u8; 64],
) {
    writer.write_marker(0xD8); // SOI

    // APP0: JFIF 1.01, no density units, 1:1 aspect, no thumbnail.
    writer.write_marker(0xE0);
    writer.write_bits(16, 16);
    for &byte in b"JFIF\0" {
        writer.write_bits(byte as u32, 8);
    }
    writer.write_bits(0x0101, 16);
    writer.write_bits(0x00, 8);
    writer.write_bits(0x0001, 16);
    writer.write_bits(0x0001, 16);
    writer.write_bits(0x00, 8);
    writer.write_bits(0x00, 8);

    // DQT: luma as table 0, chroma as table 1, both zig-zag ordered.
    writer.write_marker(0xDB);
    writer.write_bits(2 + 65 + 65, 16);
    writer.write_bits(0x00, 8);
    for k in 0..64 {
        writer.write_bits(luma_table[ZIGZAG[k]] as u32, 8);
    }
    writer.write_bits(0x01, 8);
    for k in 0..64 {
        writer.write_bits(chroma_table[ZIGZAG[k]] as u32, 8);
    }

    // SOF0: three 1x1 components, ids 1..=3, quant tables 0/1/1.
    writer.write_marker(0xC0);
    writer.write_bits(17, 16);
    writer.write_bits(8, 8);
    writer.write_bits(height as u32, 16);
    writer.write_bits(width as u32, 16);
    writer.write_bits(3, 8);
    writer.write_bits(1, 8);
    writer.write_bits(0x11, 8);
    writer.write_bits(0, 8);
    writer.write_bits(2, 8);
    writer.write_bits(0x11, 8);
    writer.write_bits(1, 8);
    writer.write_bits(3, 8);
    writer.write_bits(0x11, 8);
    writer.write_bits(1, 8);

    // DHT: the four standard tables.
    writer.write_marker(0xC4);
    let dht_length = 2 + 4 * (1 + 16) + 12 + 162 + 12 + 162;
    writer.write_bits(dht_length, 16);
    write_huffman_spec(writer, 0x00, &STD_DC_LUMA_BITS, &STD_DC_LUMA_VALS);
    write_huffman_spec(writer, 0x10, &STD_AC_LUMA_BITS, &STD_AC_LUMA_VALS);
    write_huffman_spec(writer, 0x01, &STD_DC_CHROMA_BITS, &STD_DC_CHROMA_VALS);
    write_huffman_spec(writer, 0x11, &STD_AC_CHROMA_BITS, &STD_AC_CHROMA_VALS);

    // SOS: full spectral range, no successive approximation.
    writer.write_marker(0xDA);
    writer.write_bits(12, 16);
    writer.write_bits(3, 8);
    writer.write_bits(1, 8);
    writer.write_bits(0x00, 8);
    writer.write_bits(2, 8);
    writer.write_bits(0x11, 8);
    writer.write_bits(3, 8);
    writer.write_bits(0x11, 8);
    writer.write_bits(0, 8);
    writer.write_bits(63, 8);
    writer.write_bits(0, 8);
}

fn write_huffman_spec(writer: &mut BitWriter, info: u8, bits: &[u8; 16], vals: &[u8]) {
    writer.write_bits(info as u32, 8);
    for &count in bits {
        writer.write_bits(count as u32, 8);
    }
    for &val in vals {
        writer.write_bits(val as u32, 8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg_decoder::decode_jpeg;
    use anyhow::Result;

    #[test]
    fn test_size_and_magnitude_encoding() {
        // diff = -3: two bits, pattern 00; diff = +3: two bits, pattern 11.
        assert_eq!(bit_size(3), 2);
        assert_eq!(magnitude_bits(-3, 2), 0b00);
        assert_eq!(magnitude_bits(3, 2), 0b11);

        assert_eq!(bit_size(0), 0);
        assert_eq!(bit_size(1), 1);
        assert_eq!(bit_size(255), 8);
        assert_eq!(magnitude_bits(-1, 1), 0);
        assert_eq!(magnitude_bits(-255, 8), 0);
    }

    #[test]
    fn test_stream_framing() -> Result<()> {
        let image = PixelBuffer::new(8, 8, 3, vec![200; 8 * 8 * 3])?;
        let encoded = encode_jpeg(&image, 75);

        assert_eq!(&encoded[..2], &[0xFF, 0xD8]);
        assert_eq!(&encoded[2..4], &[0xFF, 0xE0]);
        assert_eq!(&encoded[6..11], b"JFIF\0");
        assert_eq!(&encoded[encoded.len() - 2..], &[0xFF, 0xD9]);
        Ok(())
    }

    #[test]
    fn test_entropy_segment_is_stuffed() -> Result<()> {
        // Busy noise maximizes the chance of raw 0xFF bytes appearing in
        // the coded stream; every one of them must be followed by 0x00.
        let mut data = Vec::new();
        for i in 0..(32 * 32 * 3) as u32 {
            data.push((i.wrapping_mul(2654435761) >> 13) as u8);
        }
        let image = PixelBuffer::new(32, 32, 3, data)?;
        let encoded = encode_jpeg(&image, 95);

        // Entropy segment starts after the 12-byte SOS segment.
        let sos = encoded
            .windows(2)
            .position(|w| w == [0xFF, 0xDA])
            .expect("SOS present");
        let entropy = &encoded[sos + 14..];

        let mut i = 0;
        while i + 1 < entropy.len() {
            if entropy[i] == 0xFF {
                let next = entropy[i + 1];
                let is_final_eoi = next == 0xD9 && i + 2 == entropy.len();
                assert!(
                    next == 0x00 || is_final_eoi,
                    "unstuffed 0xFF {:02x} at {}",
                    next,
                    i
                );
                i += 2;
                continue;
            }
            i += 1;
        }
        Ok(())
    }

    #[test]
    fn test_solid_gray_round_trips_exactly() -> Result<()> {
        let image = PixelBuffer::new(16, 16, 3, vec![128; 16 * 16 * 3])?;
        let decoded = decode_jpeg(&encode_jpeg(&image, 90))?;
        assert_eq!(decoded.data, image.data);
        Ok(())
    }

    #[test]
    fn test_solid_color_round_trips_closely() -> Result<()> {
        let mut data = Vec::new();
        for _ in 0..(24 * 24) {
            data.extend_from_slice(&[180, 90, 45]);
        }
        let image = PixelBuffer::new(24, 24, 3, data)?;
        let decoded = decode_jpeg(&encode_jpeg(&image, 90))?;

        for (a, b) in image.data.iter().zip(decoded.data.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 4, "{} vs {}", a, b);
        }
        Ok(())
    }

    #[test]
    fn test_alpha_channel_ignored() -> Result<()> {
        let rgba = PixelBuffer::new(8, 8, 4, vec![128; 8 * 8 * 4])?;
        let rgb = PixelBuffer::new(8, 8, 3, vec![128; 8 * 8 * 3])?;
        assert_eq!(encode_jpeg(&rgba, 80), encode_jpeg(&rgb, 80));
        Ok(())
    }

    #[test]
    fn test_non_multiple_of_eight_dimensions() -> Result<()> {
        let image = PixelBuffer::new(5, 3, 3, vec![77; 5 * 3 * 3])?;
        let decoded = decode_jpeg(&encode_jpeg(&image, 85))?;
        assert_eq!((decoded.width, decoded.height), (5, 3));
        for (a, b) in image.data.iter().zip(decoded.data.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 4);
        }
        Ok(())
    }
}
