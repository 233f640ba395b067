use crate::color_spaces::ycbcr_to_rgb;
use crate::dct::Dct;
use crate::error::{Error, Result};
use crate::frame_header::FrameHeader;
use crate::huffman::HuffmanTable;
use crate::image::PixelBuffer;
use crate::jpeg_parser::{parse_jpeg, ParsedJpeg};
use crate::jpeg_tables::{QuantTable, ZIGZAG};
use crate::scan_reader::ScanReader;
use log::debug;

/// Decodes a baseline JPEG into an RGB pixel buffer.
///
/// Grayscale (one component) and YCbCr (three components) frames are
/// handled, with arbitrary sampling factors in [1, 4] on the decode side;
/// chroma is upsampled by nearest neighbor.
pub fn decode_jpeg(data: &[u8]) -> Result<PixelBuffer> {
    let ParsedJpeg {
        mut frame,
        quant_tables,
        dc_tables,
        ac_tables,
        entropy,
    } = parse_jpeg(data)?;

    for component in &frame.components {
        if quant_tables[component.quant_table_id as usize].is_none() {
            return Err(Error::malformed(format!(
                "jpeg: component {} references undefined quantization table {}",
                component.id, component.quant_table_id
            )));
        }
    }

    let (hmax, vmax) = frame.max_sampling_factors();
    let mcu_width = hmax * 8;
    let mcu_height = vmax * 8;
    let mcus_x = frame.image_width.div_ceil(mcu_width);
    let mcus_y = frame.image_height.div_ceil(mcu_height);
    debug!(
        "jpeg: {}x{} MCUs of {}x{} pixels",
        mcus_x, mcus_y, mcu_width, mcu_height
    );

    let dct = Dct::new();
    let mut reader = ScanReader::new(entropy);
    let mut output = PixelBuffer::blank(frame.image_width, frame.image_height, 3)?;

    // Spatial blocks of the MCU being decoded, per component in frame
    // order, raster order within the component.
    let mut mcu_blocks: Vec<Vec<[f32; 64]>> = frame
        .components
        .iter()
        .map(|c| vec![[0.0f32; 64]; c.blocks_per_mcu()])
        .collect();

    for mcu_y in 0..mcus_y {
        for mcu_x in 0..mcus_x {
            for (ci, component) in frame.components.iter_mut().enumerate() {
                let dc_table = dc_tables[component.dc_table_id as usize]
                    .as_ref()
                    .ok_or_else(|| Error::malformed("jpeg: undefined DC table"))?;
                let ac_table = ac_tables[component.ac_table_id as usize]
                    .as_ref()
                    .ok_or_else(|| Error::malformed("jpeg: undefined AC table"))?;
                let quant = quant_tables[component.quant_table_id as usize]
                    .as_ref()
                    .ok_or_else(|| Error::malformed("jpeg: undefined quantization table"))?;

                for block in mcu_blocks[ci].iter_mut() {
                    let coefficients = decode_block(
                        &mut reader,
                        dc_table,
                        ac_table,
                        quant,
                        &mut component.prev_dc,
                    )?;
                    *block = dct.inverse(&coefficients);
                }
            }

            write_mcu(
                &mut output,
                &frame,
                &mcu_blocks,
                mcu_x * mcu_width,
                mcu_y * mcu_height,
                hmax,
                vmax,
            );
        }
    }

    Ok(output)
}

/// Sign-magnitude rule shared by DC differences and AC coefficients: `bits`
/// below 2^(s-1) map to the negative range.
fn sign_extend(bits: u32, size: u8) -> i32 {
    debug_assert!(size >= 1);
    if (bits as i32) < (1 << (size - 1)) {
        bits as i32 - (1 << size) + 1
    } else {
        bits as i32
    }
}

/// Entropy-decodes and dequantizes one 8x8 block into natural order.
fn decode_block(
    reader: &mut ScanReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant: &QuantTable,
    prev_dc: &mut i32,
) -> Result<[f32; 64]> {
    let mut block = [0.0f32; 64];

    let size = dc_table.decode(reader)? as u8;
    if size > 16 {
        return Err(Error::malformed(format!(
            "jpeg: DC size symbol {} out of range",
            size
        )));
    }
    let diff = if size == 0 {
        0
    } else {
        sign_extend(reader.read_bits(size)?, size)
    };
    *prev_dc += diff;
    block[0] = (*prev_dc * quant.values[0] as i32) as f32;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode(reader)? as u8;
        if rs == 0x00 {
            // EOB: the rest of the block stays zero.
            break;
        }
        if rs == 0xF0 {
            // ZRL: sixteen zero coefficients.
            k += 16;
            if k > 64 {
                return Err(Error::malformed("jpeg: zero run past end of block"));
            }
            continue;
        }

        let run = (rs >> 4) as usize;
        let size = rs & 0x0F;
        if size == 0 {
            return Err(Error::malformed(format!(
                "jpeg: invalid AC symbol {:#04x}",
                rs
            )));
        }
        k += run;
        if k > 63 {
            return Err(Error::malformed("jpeg: coefficient index past end of block"));
        }

        let value = sign_extend(reader.read_bits(size)?, size);
        block[ZIGZAG[k]] = (value * quant.values[k] as i32) as f32;
        k += 1;
    }

    Ok(block)
}

/// Level-shifts, upsamples and color-converts one decoded MCU into the
/// output buffer, clipping pixels that fall outside the declared image.
fn write_mcu(
    output: &mut PixelBuffer,
    frame: &FrameHeader,
    mcu_blocks: &[Vec<[f32; 64]>],
    origin_x: usize,
    origin_y: usize,
    hmax: usize,
    vmax: usize,
) {
    let color = frame.components.len() == 3;

    for y in 0..vmax * 8 {
        let global_y = origin_y + y;
        if global_y >= output.height {
            break;
        }
        for x in 0..hmax * 8 {
            let global_x = origin_x + x;
            if global_x >= output.width {
                break;
            }

            let luma = sample_component(frame, mcu_blocks, 0, x, y, hmax, vmax) + 128.0;
            let (cb, cr) = if color {
                (
                    sample_component(frame, mcu_blocks, 1, x, y, hmax, vmax) + 128.0,
                    sample_component(frame, mcu_blocks, 2, x, y, hmax, vmax) + 128.0,
                )
            } else {
                (128.0, 128.0)
            };

            let (r, g, b) = ycbcr_to_rgb(luma, cb, cr);
            let offset = output.offset(global_x, global_y);
            output.data[offset] = r;
            output.data[offset + 1] = g;
            output.data[offset + 2] = b;
        }
    }
}

/// Nearest-neighbor sample of a component at MCU-local pixel (x, y): the
/// sampling coordinate is (x*Hi/Hmax, y*Vi/Vmax), split into a block index
/// and an intra-block offset.
fn sample_component(
    frame: &FrameHeader,
    mcu_blocks: &[Vec<[f32; 64]>],
    index: usize,
    x: usize,
    y: usize,
    hmax: usize,
    vmax: usize,
) -> f32 {
    let component = &frame.components[index];
    let h = component.horizontal_factor as usize;
    let v = component.vertical_factor as usize;

    let cx = x * h / hmax;
    let cy = y * v / vmax;

    let bx = (cx / 8).min(h - 1);
    let by = (cy / 8).min(v - 1);
    let ox = cx % 8;
    let oy = cy % 8;

    mcu_blocks[index][by * h + bx][oy * 8 + ox]
}
