use crate::error::{Error, Result};
use crate::frame_header::{FrameComponent, FrameHeader};
use crate::huffman::HuffmanTable;
use crate::jpeg_tables::QuantTable;
use crate::marker::Marker;
use crate::scan_header::{ScanComponentSelector, ScanHeader};
use log::debug;

/// Everything the entropy decoder needs, collected by walking the marker
/// segments up to SOS. The entropy-coded segment is the tail of the input
/// starting right after the SOS header.
pub(crate) struct ParsedJpeg<'a> {
    pub(crate) frame: FrameHeader,
    pub(crate) quant_tables: [Option<QuantTable>; 4],
    pub(crate) dc_tables: [Option<HuffmanTable>; 4],
    pub(crate) ac_tables: [Option<HuffmanTable>; 4],
    pub(crate) entropy: &'a [u8],
}

pub(crate) fn parse_jpeg(data: &[u8]) -> Result<ParsedJpeg<'_>> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::FormatSignature("jpeg: missing SOI marker".into()));
    }

    let mut pos = 2;
    let mut frame: Option<FrameHeader> = None;
    let mut quant_tables: [Option<QuantTable>; 4] = [None, None, None, None];
    let mut dc_tables: [Option<HuffmanTable>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffmanTable>; 4] = [None, None, None, None];

    loop {
        if data.get(pos) != Some(&0xFF) {
            return Err(Error::malformed(format!(
                "jpeg: expected marker at offset {}",
                pos
            )));
        }
        // 0xFF bytes may be repeated as fill ahead of the marker code.
        while data.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let byte = *data
            .get(pos)
            .ok_or_else(|| Error::malformed("jpeg: truncated marker"))?;
        pos += 1;
        if byte == 0x00 {
            return Err(Error::malformed(format!(
                "jpeg: stray stuffed byte at offset {}",
                pos - 1
            )));
        }

        let marker = Marker::from_byte(byte);
        if marker.standalone() {
            match marker {
                Marker::Eoi => {
                    return Err(Error::malformed("jpeg: end of image before any scan"))
                }
                _ => continue,
            }
        }

        let (payload, next) = read_segment(data, pos)?;
        pos = next;

        match marker {
            Marker::Sof0 => {
                if frame.is_some() {
                    return Err(Error::malformed("jpeg: duplicate frame header"));
                }
                frame = Some(parse_sof0(payload)?);
            }
            Marker::SofOther(code) => {
                return Err(Error::unsupported(format!(
                    "jpeg: frame type {:#04x} (only baseline sequential DCT)",
                    code
                )));
            }
            Marker::Dht => parse_dht(payload, &mut dc_tables, &mut ac_tables)?,
            Marker::Dqt => parse_dqt(payload, &mut quant_tables)?,
            Marker::Dri => {
                if payload.len() != 2 {
                    return Err(Error::malformed("jpeg: bad DRI length"));
                }
                let interval = u16::from_be_bytes([payload[0], payload[1]]);
                if interval != 0 {
                    return Err(Error::unsupported("jpeg: restart intervals"));
                }
            }
            Marker::Sos => {
                let mut frame =
                    frame.ok_or_else(|| Error::malformed("jpeg: SOS before frame header"))?;
                let scan = parse_sos(payload)?;
                apply_scan(&mut frame, &scan, &dc_tables, &ac_tables)?;
                return Ok(ParsedJpeg {
                    frame,
                    quant_tables,
                    dc_tables,
                    ac_tables,
                    entropy: &data[pos..],
                });
            }
            Marker::App(n) => debug!("jpeg: skipping APP{} segment ({} bytes)", n, payload.len()),
            Marker::Com => debug!("jpeg: skipping comment ({} bytes)", payload.len()),
            Marker::Other(code) => {
                debug!("jpeg: skipping marker {:#04x} ({} bytes)", code, payload.len())
            }
            Marker::Soi | Marker::Eoi | Marker::Rst(_) => unreachable!(),
        }
    }
}

/// Reads a 16-bit big-endian length (which includes itself) and returns the
/// payload plus the offset just past it.
fn read_segment(data: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let bytes = data
        .get(pos..pos + 2)
        .ok_or_else(|| Error::malformed("jpeg: truncated segment length"))?;
    let length = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    if length < 2 {
        return Err(Error::malformed(format!(
            "jpeg: segment length {} at offset {}",
            length, pos
        )));
    }
    let payload = data
        .get(pos + 2..pos + length)
        .ok_or_else(|| Error::malformed("jpeg: segment payload truncated"))?;
    Ok((payload, pos + length))
}

fn parse_sof0(payload: &[u8]) -> Result<FrameHeader> {
    if payload.len() < 6 {
        return Err(Error::malformed("jpeg: frame header truncated"));
    }

    let precision = payload[0];
    if precision != 8 {
        return Err(Error::unsupported(format!(
            "jpeg: sample precision {} (only 8-bit)",
            precision
        )));
    }

    let image_height = u16::from_be_bytes([payload[1], payload[2]]) as usize;
    let image_width = u16::from_be_bytes([payload[3], payload[4]]) as usize;
    if image_width == 0 || image_height == 0 {
        return Err(Error::malformed("jpeg: zero image dimension"));
    }

    let component_count = payload[5] as usize;
    if component_count != 1 && component_count != 3 {
        return Err(Error::unsupported(format!(
            "jpeg: {} components (only grayscale and YCbCr)",
            component_count
        )));
    }
    if payload.len() != 6 + component_count * 3 {
        return Err(Error::malformed("jpeg: frame header length mismatch"));
    }

    let mut components = Vec::with_capacity(component_count);
    for i in 0..component_count {
        let base = 6 + i * 3;
        let id = payload[base];
        let sampling = payload[base + 1];
        let (h, v) = (sampling >> 4, sampling & 0x0F);
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(Error::malformed(format!(
                "jpeg: sampling factors {}x{} for component {}",
                h, v, id
            )));
        }
        let quant_table_id = payload[base + 2];
        if quant_table_id > 3 {
            return Err(Error::malformed(format!(
                "jpeg: quantization table id {}",
                quant_table_id
            )));
        }
        components.push(FrameComponent::from(id, h, v, quant_table_id));
    }

    debug!(
        "jpeg: {}x{}, {} components",
        image_width, image_height, component_count
    );

    Ok(FrameHeader {
        image_height,
        image_width,
        components,
    })
}

/// A DHT payload holds one or more tables: an info byte (class in the high
/// nibble, destination in the low), 16 per-length counts, then the symbols.
fn parse_dht(
    payload: &[u8],
    dc_tables: &mut [Option<HuffmanTable>; 4],
    ac_tables: &mut [Option<HuffmanTable>; 4],
) -> Result<()> {
    let mut pos = 0;
    while pos < payload.len() {
        let info = payload[pos];
        pos += 1;
        let class = info >> 4;
        let id = (info & 0x0F) as usize;
        if class > 1 {
            return Err(Error::malformed(format!("jpeg: huffman class {}", class)));
        }
        if id > 3 {
            return Err(Error::malformed(format!("jpeg: huffman table id {}", id)));
        }

        let counts: [u8; 16] = payload
            .get(pos..pos + 16)
            .ok_or_else(|| Error::malformed("jpeg: DHT counts truncated"))?
            .try_into()
            .unwrap();
        pos += 16;

        let symbol_count: usize = counts.iter().map(|&c| c as usize).sum();
        let symbols = payload
            .get(pos..pos + symbol_count)
            .ok_or_else(|| Error::malformed("jpeg: DHT symbols truncated"))?;
        pos += symbol_count;

        let table = HuffmanTable::from_counts_and_symbols(&counts, symbols)?;
        if class == 0 {
            dc_tables[id] = Some(table);
        } else {
            ac_tables[id] = Some(table);
        }
    }
    Ok(())
}

/// A DQT payload holds one or more tables: an info byte (precision in the
/// high nibble, destination in the low), then 64 zig-zag-ordered entries.
fn parse_dqt(payload: &[u8], quant_tables: &mut [Option<QuantTable>; 4]) -> Result<()> {
    let mut pos = 0;
    while pos < payload.len() {
        let info = payload[pos];
        pos += 1;
        if info >> 4 != 0 {
            return Err(Error::malformed(
                "jpeg: 16-bit quantization tables are not 8-bit baseline",
            ));
        }
        let id = (info & 0x0F) as usize;
        if id > 3 {
            return Err(Error::malformed(format!(
                "jpeg: quantization table id {}",
                id
            )));
        }

        let values: [u8; 64] = payload
            .get(pos..pos + 64)
            .ok_or_else(|| Error::malformed("jpeg: DQT entries truncated"))?
            .try_into()
            .unwrap();
        pos += 64;

        quant_tables[id] = Some(QuantTable { values });
    }
    Ok(())
}

fn parse_sos(payload: &[u8]) -> Result<ScanHeader> {
    if payload.is_empty() {
        return Err(Error::malformed("jpeg: empty scan header"));
    }
    let count = payload[0] as usize;
    if payload.len() != 1 + count * 2 + 3 {
        return Err(Error::malformed("jpeg: scan header length mismatch"));
    }

    let mut selectors = Vec::with_capacity(count);
    for i in 0..count {
        let id = payload[1 + i * 2];
        let tables = payload[2 + i * 2];
        selectors.push(ScanComponentSelector::from(id, tables >> 4, tables & 0x0F));
    }

    let tail = &payload[1 + count * 2..];
    Ok(ScanHeader {
        selectors,
        spectral_start: tail[0],
        spectral_end: tail[1],
        approximation: tail[2],
    })
}

/// Binds the scan's table selections onto the frame components and resets
/// every DC predictor for the new scan.
fn apply_scan(
    frame: &mut FrameHeader,
    scan: &ScanHeader,
    dc_tables: &[Option<HuffmanTable>; 4],
    ac_tables: &[Option<HuffmanTable>; 4],
) -> Result<()> {
    if !scan.is_baseline() {
        return Err(Error::unsupported(
            "jpeg: progressive scan parameters in a sequential frame",
        ));
    }
    if scan.selectors.len() != frame.components.len() {
        return Err(Error::unsupported(
            "jpeg: scan does not cover every frame component",
        ));
    }

    for selector in &scan.selectors {
        let component = frame
            .components
            .iter_mut()
            .find(|c| c.id == selector.component_id)
            .ok_or_else(|| {
                Error::malformed(format!(
                    "jpeg: scan references unknown component {}",
                    selector.component_id
                ))
            })?;

        if selector.dc_table_id > 3 || dc_tables[selector.dc_table_id as usize].is_none() {
            return Err(Error::malformed(format!(
                "jpeg: scan references undefined DC table {}",
                selector.dc_table_id
            )));
        }
        if selector.ac_table_id > 3 || ac_tables[selector.ac_table_id as usize].is_none() {
            return Err(Error::malformed(format!(
                "jpeg: scan references undefined AC table {}",
                selector.ac_table_id
            )));
        }

        component.dc_table_id = selector.dc_table_id;
        component.ac_table_id = selector.ac_table_id;
        component.prev_dc = 0;
    }

    Ok(())
}
