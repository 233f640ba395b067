use crate::checksum::Crc32;
use crate::error::{Error, Result};
use crate::image::PixelBuffer;
use crate::inflate::inflate;
use log::debug;

pub(crate) const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

struct Ihdr {
    width: usize,
    height: usize,
    channels: usize,
}

/// Decodes a PNG byte stream into a pixel buffer.
///
/// Supported subset: 8-bit depth, truecolor (2) and truecolor+alpha (6),
/// compression 0, filter method 0, no interlacing. Chunk CRCs are verified
/// over type + payload; ancillary chunks are skipped.
pub fn decode_png(data: &[u8]) -> Result<PixelBuffer> {
    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return Err(Error::FormatSignature(
            "png: missing 8-byte signature".into(),
        ));
    }

    let mut cursor = PNG_SIGNATURE.len();
    let mut header: Option<Ihdr> = None;
    let mut idat = Vec::new();
    let mut first = true;

    loop {
        let (chunk_type, payload, next) = read_chunk(data, cursor)?;
        cursor = next;

        match &chunk_type {
            b"IHDR" => {
                if !first {
                    return Err(Error::malformed("png: IHDR must be the first chunk"));
                }
                header = Some(parse_ihdr(payload)?);
            }
            b"IDAT" => {
                if header.is_none() {
                    return Err(Error::malformed("png: IDAT before IHDR"));
                }
                idat.extend_from_slice(payload);
            }
            b"IEND" => break,
            _ => {
                if first {
                    return Err(Error::malformed("png: IHDR must be the first chunk"));
                }
                debug!(
                    "png: skipping chunk {}",
                    String::from_utf8_lossy(&chunk_type)
                );
            }
        }
        first = false;

        if cursor >= data.len() {
            break;
        }
    }

    let header = header.ok_or_else(|| Error::malformed("png: no IHDR chunk"))?;
    if idat.is_empty() {
        return Err(Error::malformed("png: no IDAT chunks"));
    }
    debug!("png: {} bytes of compressed image data", idat.len());

    let decompressed = inflate(&idat)?;
    let pixels = unfilter_scanlines(&decompressed, header.width, header.height, header.channels)?;

    PixelBuffer::new(header.width, header.height, header.channels, pixels)
}

/// Returns (type, payload, offset past the CRC) and verifies the CRC.
fn read_chunk(data: &[u8], cursor: usize) -> Result<([u8; 4], &[u8], usize)> {
    let header = data
        .get(cursor..cursor + 8)
        .ok_or_else(|| Error::malformed("png: truncated chunk header"))?;
    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let chunk_type = [header[4], header[5], header[6], header[7]];

    let payload_start = cursor + 8;
    let payload = data
        .get(payload_start..payload_start + length)
        .ok_or_else(|| Error::malformed("png: chunk payload truncated"))?;

    let crc_start = payload_start + length;
    let declared = data
        .get(crc_start..crc_start + 4)
        .ok_or_else(|| Error::malformed("png: chunk CRC truncated"))?;
    let declared = u32::from_be_bytes([declared[0], declared[1], declared[2], declared[3]]);

    let mut crc = Crc32::new();
    crc.update(&chunk_type);
    crc.update(payload);
    let actual = crc.finalize();
    if declared != actual {
        return Err(Error::malformed(format!(
            "png: CRC mismatch in {} chunk",
            String::from_utf8_lossy(&chunk_type)
        )));
    }

    Ok((chunk_type, payload, crc_start + 4))
}

fn parse_ihdr(payload: &[u8]) -> Result<Ihdr> {
    if payload.len() != 13 {
        return Err(Error::malformed(format!(
            "png: IHDR is {} bytes, expected 13",
            payload.len()
        )));
    }

    let width = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let height = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
    let bit_depth = payload[8];
    let color_type = payload[9];
    let compression = payload[10];
    let filter = payload[11];
    let interlace = payload[12];

    debug!(
        "png: {}x{}, depth {}, color type {}",
        width, height, bit_depth, color_type
    );

    if width == 0 || height == 0 {
        return Err(Error::malformed("png: zero image dimension"));
    }
    if compression != 0 {
        return Err(Error::malformed(format!(
            "png: unknown compression method {}",
            compression
        )));
    }
    if filter != 0 {
        return Err(Error::malformed(format!(
            "png: unknown filter method {}",
            filter
        )));
    }
    if interlace != 0 {
        return Err(Error::unsupported("png: interlaced images"));
    }
    if bit_depth != 8 {
        return Err(Error::unsupported(format!(
            "png: bit depth {} (only 8 is handled)",
            bit_depth
        )));
    }
    let channels = match color_type {
        2 => 3,
        6 => 4,
        other => {
            return Err(Error::unsupported(format!(
                "png: color type {} (only truecolor 2 and truecolor+alpha 6)",
                other
            )))
        }
    };

    Ok(Ihdr {
        width,
        height,
        channels,
    })
}

/// Selects whichever of a (left), b (above), c (above-left) is nearest to
/// a + b - c, ties broken in that order.
pub(crate) fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reconstructs filtered scanlines: each row is a filter-type byte followed
/// by width * bpp filtered bytes. All arithmetic wraps modulo 256.
fn unfilter_scanlines(
    data: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<Vec<u8>> {
    let stride = width * bytes_per_pixel;
    let expected = height * (1 + stride);
    if data.len() != expected {
        return Err(Error::malformed(format!(
            "png: {} bytes of scanline data, expected {}",
            data.len(),
            expected
        )));
    }

    let mut out = Vec::with_capacity(height * stride);
    let mut prev_row = vec![0u8; stride];
    let mut row = vec![0u8; stride];

    for y in 0..height {
        let line = &data[y * (1 + stride)..(y + 1) * (1 + stride)];
        let filter_type = line[0];
        let filtered = &line[1..];

        for x in 0..stride {
            let a = if x >= bytes_per_pixel {
                row[x - bytes_per_pixel]
            } else {
                0
            };
            let b = prev_row[x];
            let c = if x >= bytes_per_pixel {
                prev_row[x - bytes_per_pixel]
            } else {
                0
            };

            row[x] = match filter_type {
                0 => filtered[x],
                1 => filtered[x].wrapping_add(a),
                2 => filtered[x].wrapping_add(b),
                3 => filtered[x].wrapping_add((((a as u16) + (b as u16)) / 2) as u8),
                4 => filtered[x].wrapping_add(paeth_predictor(a, b, c)),
                other => {
                    return Err(Error::malformed(format!(
                        "png: invalid filter type {} on row {}",
                        other, y
                    )))
                }
            };
        }

        out.extend_from_slice(&row);
        std::mem::swap(&mut prev_row, &mut row);
    }

    Ok(out)
}
