//! Entropy-coded scan decoding: block decode with dequantization, the MCU
//! loop, restart-marker resynchronization, and plane assembly.

use log::trace;

use crate::DecodeOutput;
use crate::bit_reader::BitReader;
use crate::constants::{DE_ZIG_ZAG, NCOMPS_MAX};
use crate::error::{JpegError, Result};
use crate::huffman::HuffmanTable;
use crate::idct::idct8x8;
use crate::image::Image;
use crate::marker;
use crate::quantization::QuantTable;
use crate::stream_reader::StreamReader;

/// How an entropy-coded scan ended: bytes consumed from the coded buffer and
/// the marker the bit reader ran into (0 if none).
pub struct ScanOutcome {
    pub consumed: usize,
    pub pending_marker: u8,
}

/// Sign extension of a magnitude-category value (T.81 F.2.2.1): a raw value
/// below 2^(len-1) encodes a negative number.
fn extend(value: u32, len: u32) -> i32 {
    if len > 0 && value < 1 << (len - 1) {
        value as i32 + 1 - (1 << len)
    } else {
        value as i32
    }
}

/// Decodes one Huffman symbol plus its variable-length value. The symbol's
/// low nibble is the bit length of the raw value that follows.
fn decode_vlc(bits: &mut BitReader<'_>, table: &HuffmanTable) -> Result<(u8, i32)> {
    let symbol = table.decode(bits)?;
    let len = u32::from(symbol & 0xF);
    let raw = bits.read_bits(len)?;
    Ok((symbol, extend(raw, len)))
}

/// Decodes and dequantizes one 8x8 block into natural order.
///
/// The DC delta accumulates into `pred`; AC coefficients run-length expand
/// along the zig-zag scan until the end-of-block symbol or position 63.
pub fn decode_block(
    bits: &mut BitReader<'_>,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant: &QuantTable,
    pred: &mut i32,
) -> Result<[i32; 64]> {
    let mut block = [0i32; 64];
    let q = quant.values();
    let (_, delta) = decode_vlc(bits, dc_table)?;
    *pred += delta;
    block[0] = *pred * i32::from(q[0]);
    let mut j = 0usize;
    loop {
        let (symbol, value) = decode_vlc(bits, ac_table)?;
        if symbol == 0 {
            break;
        }
        j += usize::from(symbol >> 4) + 1;
        if j > 63 {
            return Err(JpegError::SyntaxError("indexing outside block"));
        }
        let pos = DE_ZIG_ZAG[j];
        block[pos] = value * i32::from(q[pos]);
        if j >= 63 {
            break;
        }
    }
    Ok(block)
}

/// Runs the MCU loop for the current scan, writing every decoded block to
/// the requested output domain of its component plane.
///
/// After each MCU the restart countdown is checked: when it elapses, the
/// next byte must be the RSTn marker matching the restart counter mod 8,
/// which resets the bit reader and all DC predictors. EOI ends the scan
/// early but successfully.
pub fn decode_scan(
    reader: &StreamReader<'_>,
    img: &mut Image,
    out: DecodeOutput,
) -> Result<ScanOutcome> {
    let frame = reader.frame()?;
    let scan = reader.scan()?;
    if img.planes.len() != frame.components.len() {
        return Err(JpegError::SyntaxError("image does not match frame geometry"));
    }
    let restart_interval = i32::from(reader.restart_interval());
    let mut bits = BitReader::new(reader.remaining());
    let mut dc_pred = [0i32; NCOMPS_MAX];
    let mut mcu_counter = restart_interval;
    let mut rst_counter: u32 = 0;
    for mby in 0..usize::from(frame.nvmb) {
        for mbx in 0..usize::from(frame.nhmb) {
            for (i, comp) in scan.components.iter().enumerate() {
                let fc = &frame.components[comp.frame_index];
                let quant = reader.quant_table(fc.tq)?;
                let dc_table = reader.dc_table(comp.td)?;
                let ac_table = reader.ac_table(comp.ta)?;
                let plane = &mut img.planes[comp.frame_index];
                for sby in 0..usize::from(fc.vsamp) {
                    for sbx in 0..usize::from(fc.hsamp) {
                        let mut block =
                            decode_block(&mut bits, dc_table, ac_table, quant, &mut dc_pred[i])?;
                        let brow = mby * usize::from(fc.vsamp) + sby;
                        let bcol = mbx * usize::from(fc.hsamp) + sbx;
                        match out {
                            DecodeOutput::Coefficients => {
                                plane.put_coef_block(brow, bcol, &block);
                            }
                            DecodeOutput::Residual => {
                                idct8x8(&mut block);
                                plane.put_coef_block(brow, bcol, &block);
                            }
                            DecodeOutput::Planar | DecodeOutput::Rgb => {
                                idct8x8(&mut block);
                                plane.put_block(brow, bcol, &block);
                            }
                        }
                    }
                }
            }
            mcu_counter -= 1;
            trace!("MCU ({mbx},{mby}), restart countdown {mcu_counter}");
            if restart_interval != 0 && mcu_counter == 0 {
                match bits.take_marker() {
                    None => {
                        return Err(JpegError::RestartSync("expected restart marker"));
                    }
                    Some(m) if marker::is_restart(m) => {
                        if u32::from(m & 0x7) != (rst_counter & 0x7) {
                            return Err(JpegError::RestartSync("restart marker out of sequence"));
                        }
                        bits.discard_bits();
                        mcu_counter = restart_interval;
                        rst_counter += 1;
                        dc_pred = [0; NCOMPS_MAX];
                    }
                    Some(0xD9) => {
                        // EOI mid-scan ends the loop successfully.
                        return Ok(ScanOutcome {
                            consumed: bits.position(),
                            pending_marker: 0xD9,
                        });
                    }
                    Some(_) => {
                        return Err(JpegError::SyntaxError("unknown marker found in scan"));
                    }
                }
            }
        }
    }
    let pending_marker = bits.take_marker().unwrap_or(0);
    Ok(ScanOutcome {
        consumed: bits.position(),
        pending_marker,
    })
}
