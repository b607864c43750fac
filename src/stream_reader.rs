//! Marker-segment stream parsing.
//!
//! `StreamReader` drives the segment-level state machine: it owns the coded
//! buffer cursor, the four-slot quantization and Huffman table arrays, the
//! frame and scan headers, and the restart interval. Entropy-coded data is
//! handed off to the scan decoder, which reports back how many bytes it
//! consumed and which marker it ran into.

use log::debug;

use crate::constants::{NHUFF_MAX, NQUANT_MAX};
use crate::error::{JpegError, Result};
use crate::header::{FrameComponent, FrameHeader, JpegHeader, ScanComponent, ScanHeader};
use crate::huffman::{HuffmanTable, TableClass};
use crate::marker::{self, MARKER_START_BYTE, Marker};
use crate::quantization::QuantTable;

/// Where segment parsing paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEvent {
    /// A scan is ready: either SOS was fully parsed (decode pass) or it is
    /// latched as pending (header-only pass).
    ScanReady,
    /// EOI was consumed; the stream is exhausted.
    EndOfImage,
}

pub struct StreamReader<'a> {
    source: &'a [u8],
    position: usize,
    /// Marker byte latched by the scan decoder or a header-only pass;
    /// 0 means none.
    pending_marker: u8,
    start_of_image: bool,
    end_of_image: bool,
    quant: [Option<QuantTable>; NQUANT_MAX],
    dc_huff: [Option<HuffmanTable>; NHUFF_MAX],
    ac_huff: [Option<HuffmanTable>; NHUFF_MAX],
    restart_interval: u16,
    frame: Option<FrameHeader>,
    scan: Option<ScanHeader>,
}

impl<'a> StreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            pending_marker: 0,
            start_of_image: false,
            end_of_image: false,
            quant: [const { None }; NQUANT_MAX],
            dc_huff: [const { None }; NHUFF_MAX],
            ac_huff: [const { None }; NHUFF_MAX],
            restart_interval: 0,
            frame: None,
            scan: None,
        }
    }

    /// Rewinds to the start of the coded buffer, dropping all tables and
    /// headers, for a fresh decode of the same stream.
    pub fn reset(&mut self) {
        *self = Self::new(self.source);
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    pub fn frame(&self) -> Result<&FrameHeader> {
        self.frame.as_ref().ok_or(JpegError::SyntaxError("missing SOF"))
    }

    pub fn scan(&self) -> Result<&ScanHeader> {
        self.scan.as_ref().ok_or(JpegError::SyntaxError("missing SOS"))
    }

    pub fn frame_geometry(&self) -> Result<JpegHeader> {
        Ok(self.frame()?.geometry())
    }

    pub fn quant_table(&self, tq: u8) -> Result<&QuantTable> {
        self.quant
            .get(usize::from(tq))
            .and_then(Option::as_ref)
            .ok_or(JpegError::UndefinedTableReference("quantization table not loaded"))
    }

    pub fn dc_table(&self, td: u8) -> Result<&HuffmanTable> {
        self.dc_huff
            .get(usize::from(td))
            .and_then(Option::as_ref)
            .ok_or(JpegError::UndefinedTableReference("DC entropy table not loaded"))
    }

    pub fn ac_table(&self, ta: u8) -> Result<&HuffmanTable> {
        self.ac_huff
            .get(usize::from(ta))
            .and_then(Option::as_ref)
            .ok_or(JpegError::UndefinedTableReference("AC entropy table not loaded"))
    }

    /// Records the outcome of an entropy-coded scan: bytes consumed and the
    /// marker the scan ran into (0 if none).
    pub fn finish_scan(&mut self, consumed: usize, pending_marker: u8) {
        self.position += consumed;
        self.pending_marker = pending_marker;
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .source
            .get(self.position)
            .ok_or(JpegError::StreamUnderrun("reading past the end of file"))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from(hi) << 8 | u16::from(lo))
    }

    fn skip_bytes(&mut self, nbytes: usize) -> Result<()> {
        if self.source.len() - self.position < nbytes {
            return Err(JpegError::StreamUnderrun("skipping past the end of file"));
        }
        self.position += nbytes;
        Ok(())
    }

    /// Declared segment length minus the length field itself.
    fn read_segment_length(&mut self) -> Result<usize> {
        let len = self.read_u16()?;
        len.checked_sub(2)
            .map(usize::from)
            .ok_or(JpegError::MalformedSegment("invalid segment length"))
    }

    fn next_marker_byte(&mut self) -> Result<u8> {
        if self.pending_marker != 0 {
            let byte = self.pending_marker;
            self.pending_marker = 0;
            return Ok(byte);
        }
        if self.read_u8()? != MARKER_START_BYTE {
            return Err(JpegError::SyntaxError("invalid JPEG syntax"));
        }
        self.read_u8()
    }

    /// Parses segments until a scan is ready or the image ends.
    ///
    /// With `headers_only` the SOS marker is latched and left unparsed so a
    /// later decode pass can resume at it.
    pub fn next_segment(&mut self, headers_only: bool) -> Result<SegmentEvent> {
        loop {
            if self.end_of_image {
                return Ok(SegmentEvent::EndOfImage);
            }
            let byte = self.next_marker_byte()?;
            if !self.start_of_image && byte != Marker::StartOfImage as u8 {
                return Err(JpegError::SyntaxError("missing SOI"));
            }
            if headers_only && byte == Marker::StartOfScan as u8 {
                self.pending_marker = byte;
                return Ok(SegmentEvent::ScanReady);
            }
            if marker::is_arithmetic_conditioning(byte) {
                return Err(JpegError::UnsupportedFeature("arithmetic entropy coding"));
            }
            if marker::is_unsupported_frame(byte) {
                return Err(JpegError::UnsupportedFeature(
                    "only baseline (SOF0) frames supported",
                ));
            }
            match Marker::try_from(byte) {
                Ok(Marker::StartOfImage) => self.parse_soi()?,
                Ok(Marker::EndOfImage) => {
                    self.parse_eoi()?;
                    return Ok(SegmentEvent::EndOfImage);
                }
                Ok(Marker::DefineQuantizationTable) => self.parse_dqt()?,
                Ok(Marker::DefineHuffmanTable) => self.parse_dht()?,
                Ok(Marker::StartOfFrameBaseline) => self.parse_sof0()?,
                Ok(Marker::DefineRestartInterval) => self.parse_dri()?,
                Ok(Marker::StartOfScan) => {
                    self.parse_sos()?;
                    return Ok(SegmentEvent::ScanReady);
                }
                Ok(_) => self.skip_segment()?,
                Err(_) if marker::is_restart(byte) => {
                    return Err(JpegError::SyntaxError("unexpected restart marker"));
                }
                Err(_) => self.skip_segment()?,
            }
        }
    }

    fn parse_soi(&mut self) -> Result<()> {
        if self.start_of_image {
            return Err(JpegError::SyntaxError("already found SOI"));
        }
        debug!("start of image");
        self.start_of_image = true;
        Ok(())
    }

    fn parse_eoi(&mut self) -> Result<()> {
        debug!("end of image");
        self.end_of_image = true;
        if self.position != self.source.len() {
            return Err(JpegError::MalformedSegment("EOI with unprocessed bytes"));
        }
        Ok(())
    }

    fn parse_dqt(&mut self) -> Result<()> {
        let mut len = self.read_segment_length()?;
        while len >= 65 {
            let byte = self.read_u8()?;
            let pq = byte >> 4;
            if pq > 1 {
                return Err(JpegError::MalformedSegment("DQT expected Pq value 0 or 1"));
            }
            let tq = byte & 0x7;
            if tq > 3 {
                return Err(JpegError::MalformedSegment("DQT expected Tq value 0 to 3"));
            }
            let bits = if pq == 1 { 16 } else { 8 };
            let mut zigzag = [0u16; 64];
            for q in zigzag.iter_mut() {
                *q = if pq == 1 {
                    self.read_u16()?
                } else {
                    u16::from(self.read_u8()?)
                };
            }
            debug!("loaded quantization table {tq} ({bits}-bit)");
            self.quant[usize::from(tq)] = Some(QuantTable::from_zigzag(bits, &zigzag));
            len = len
                .checked_sub(65 + 64 * usize::from(pq))
                .ok_or(JpegError::MalformedSegment("DQT unprocessed bytes"))?;
        }
        if len != 0 {
            return Err(JpegError::MalformedSegment("DQT unprocessed bytes"));
        }
        Ok(())
    }

    fn parse_dht(&mut self) -> Result<()> {
        let mut len = self.read_segment_length()?;
        while len >= 17 {
            let byte = self.read_u8()?;
            let tc = byte >> 4;
            if tc > 1 {
                return Err(JpegError::MalformedSegment("DHT expected Tc value 0 or 1"));
            }
            let th = byte & 0x7;
            if th > 3 {
                return Err(JpegError::MalformedSegment("DHT expected Th value 0 to 3"));
            }
            let mut nbits = [0u8; 16];
            let mut nsymbs = 0usize;
            for n in nbits.iter_mut() {
                *n = self.read_u8()?;
                nsymbs += usize::from(*n);
            }
            len -= 17;
            if nsymbs > 256 {
                return Err(JpegError::MalformedSegment("DHT has more than 256 symbols"));
            }
            if nsymbs > len {
                return Err(JpegError::MalformedSegment("DHT needs more bytes than available"));
            }
            let mut symbols = [0u8; 256];
            for s in symbols[..nsymbs].iter_mut() {
                *s = self.read_u8()?;
            }
            len -= nsymbs;
            let class = if tc == 1 { TableClass::Ac } else { TableClass::Dc };
            debug!(
                "loaded {} Huffman table {th}, {nsymbs} symbols",
                if tc == 1 { "AC" } else { "DC" }
            );
            let table = HuffmanTable::build(class, &nbits, &symbols[..nsymbs])?;
            if tc == 1 {
                self.ac_huff[usize::from(th)] = Some(table);
            } else {
                self.dc_huff[usize::from(th)] = Some(table);
            }
        }
        if len != 0 {
            return Err(JpegError::MalformedSegment("DHT unprocessed bytes"));
        }
        Ok(())
    }

    fn parse_sof0(&mut self) -> Result<()> {
        let mut len = self.read_segment_length()?;
        if len < 9 {
            return Err(JpegError::MalformedSegment("SOF needs at least 9 bytes"));
        }
        if self.frame.is_some() {
            return Err(JpegError::SyntaxError("multiple SOF not supported"));
        }
        let bits = self.read_u8()?;
        if bits != 8 {
            return Err(JpegError::UnsupportedFeature("only 8-bit samples supported"));
        }
        let height = self.read_u16()?;
        if height == 0 {
            return Err(JpegError::MalformedSegment("SOF has invalid height"));
        }
        let width = self.read_u16()?;
        if width == 0 {
            return Err(JpegError::MalformedSegment("SOF has invalid width"));
        }
        let ncomps = self.read_u8()?;
        if ncomps != 1 && ncomps != 3 {
            return Err(JpegError::UnsupportedFeature("only 1 or 3 components supported"));
        }
        len -= 6;
        if len < 3 * usize::from(ncomps) {
            return Err(JpegError::MalformedSegment("SOF needs more bytes than available"));
        }
        let mut components = Vec::with_capacity(usize::from(ncomps));
        let mut hmax = 0u8;
        let mut vmax = 0u8;
        for _ in 0..ncomps {
            let id = self.read_u8()?;
            let byte = self.read_u8()?;
            let hsamp = byte >> 4;
            if hsamp == 0 || hsamp > 4 {
                return Err(JpegError::MalformedSegment("SOF expected Hi value 1 to 4"));
            }
            if hsamp == 3 {
                return Err(JpegError::UnsupportedFeature("horizontal sample factor 3"));
            }
            let vsamp = byte & 0x7;
            if vsamp == 0 || vsamp > 4 {
                return Err(JpegError::MalformedSegment("SOF expected Vi value 1 to 4"));
            }
            if vsamp == 3 {
                return Err(JpegError::UnsupportedFeature("vertical sample factor 3"));
            }
            hmax = hmax.max(hsamp);
            vmax = vmax.max(vsamp);
            let tq = self.read_u8()?;
            if tq > 3 {
                return Err(JpegError::MalformedSegment("SOF expected Tq value 0 to 3"));
            }
            let quant = self.quant_table(tq).map_err(|_| {
                JpegError::UndefinedTableReference("SOF references unloaded quantization table")
            })?;
            if quant.bits > bits {
                return Err(JpegError::MalformedSegment(
                    "quantization table bits exceed frame bits",
                ));
            }
            components.push(FrameComponent { id, hsamp, vsamp, tq });
            len -= 3;
        }
        if len != 0 {
            return Err(JpegError::MalformedSegment("SOF unprocessed bytes"));
        }
        let mcu_width = u32::from(hmax) << 3;
        let mcu_height = u32::from(vmax) << 3;
        let nhmb = ((u32::from(width) + mcu_width - 1) / mcu_width) as u16;
        let nvmb = ((u32::from(height) + mcu_height - 1) / mcu_height) as u16;
        debug!(
            "frame {width}x{height}, {ncomps} components, {nhmb}x{nvmb} MCUs of {mcu_width}x{mcu_height}"
        );
        self.frame = Some(FrameHeader {
            bits,
            width,
            height,
            components,
            hmax,
            vmax,
            nhmb,
            nvmb,
        });
        Ok(())
    }

    fn parse_dri(&mut self) -> Result<()> {
        let len = self.read_segment_length()?;
        if len != 2 {
            return Err(JpegError::MalformedSegment("DRI unprocessed bytes"));
        }
        self.restart_interval = self.read_u16()?;
        debug!("restart interval {}", self.restart_interval);
        Ok(())
    }

    fn parse_sos(&mut self) -> Result<()> {
        let mut len = self.read_segment_length()?;
        if len < 6 {
            return Err(JpegError::MalformedSegment("SOS needs at least 6 bytes"));
        }
        if self.scan.is_some() {
            return Err(JpegError::SyntaxError("multiple SOS not supported"));
        }
        let frame = self.frame.clone().ok_or(JpegError::SyntaxError("SOS before SOF"))?;
        let ncomps = self.read_u8()?;
        if ncomps == 0 || ncomps > 4 {
            return Err(JpegError::MalformedSegment("SOS expected Ns value 1 to 4"));
        }
        if ncomps != 1 && ncomps != 3 {
            return Err(JpegError::UnsupportedFeature(
                "only scans with 1 or 3 components supported",
            ));
        }
        len -= 1;
        let mut components = Vec::with_capacity(usize::from(ncomps));
        for _ in 0..ncomps {
            let id = self.read_u8()?;
            let frame_index = frame
                .components
                .iter()
                .position(|c| c.id == id)
                .ok_or(JpegError::MalformedSegment("SOS references invalid component"))?;
            let byte = self.read_u8()?;
            let td = byte >> 4;
            if td > 3 {
                return Err(JpegError::MalformedSegment("SOS expected Td value 0 to 3"));
            }
            self.dc_table(td).map_err(|_| {
                JpegError::UndefinedTableReference("SOS references unloaded DC entropy table")
            })?;
            let ta = byte & 0x7;
            if ta > 3 {
                return Err(JpegError::MalformedSegment("SOS expected Ta value 0 to 3"));
            }
            self.ac_table(ta).map_err(|_| {
                JpegError::UndefinedTableReference("SOS references unloaded AC entropy table")
            })?;
            components.push(ScanComponent { id, frame_index, td, ta });
            len = len
                .checked_sub(2)
                .ok_or(JpegError::MalformedSegment("SOS unprocessed bytes"))?;
        }
        let ss = self.read_u8()?;
        if ss != 0 {
            return Err(JpegError::MalformedSegment("SOS expected Ss value 0"));
        }
        let se = self.read_u8()?;
        if se != 63 {
            return Err(JpegError::MalformedSegment("SOS expected Se value 63"));
        }
        let byte = self.read_u8()?;
        if byte >> 4 != 0 {
            return Err(JpegError::MalformedSegment("SOS expected Ah value 0"));
        }
        if byte & 0xF != 0 {
            return Err(JpegError::MalformedSegment("SOS expected Al value 0"));
        }
        len = len
            .checked_sub(3)
            .ok_or(JpegError::MalformedSegment("SOS unprocessed bytes"))?;
        if len != 0 {
            return Err(JpegError::MalformedSegment("SOS unprocessed bytes"));
        }
        debug!("scan with {ncomps} components");
        self.scan = Some(ScanHeader { components });
        Ok(())
    }

    fn skip_segment(&mut self) -> Result<()> {
        let len = self.read_segment_length()?;
        debug!("skipping {len} bytes");
        self.skip_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn dqt_body(tq: u8, value: u8) -> Vec<u8> {
        let mut body = vec![tq];
        body.extend_from_slice(&[value; 64]);
        body
    }

    /// DHT body for a one-symbol table: a single 1-bit code.
    fn dht_body(class_and_slot: u8, symbol: u8) -> Vec<u8> {
        let mut body = vec![class_and_slot, 1];
        body.extend_from_slice(&[0u8; 15]);
        body.push(symbol);
        body
    }

    fn sof0_gray_body(width: u16, height: u16) -> Vec<u8> {
        let mut body = vec![8];
        body.extend_from_slice(&height.to_be_bytes());
        body.extend_from_slice(&width.to_be_bytes());
        body.extend_from_slice(&[1, 1, 0x11, 0]);
        body
    }

    fn headers(width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xDB, &dqt_body(0, 16)));
        data.extend(segment(0xC4, &dht_body(0x00, 0)));
        data.extend(segment(0xC4, &dht_body(0x10, 0)));
        data.extend(segment(0xC0, &sof0_gray_body(width, height)));
        data
    }

    #[test]
    fn header_only_pass_stops_at_sos() {
        let mut data = headers(16, 16);
        data.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.next_segment(true).unwrap(), SegmentEvent::ScanReady);
        let geometry = reader.frame_geometry().unwrap();
        assert_eq!(geometry.width, 16);
        assert_eq!(geometry.ncomps, 1);
        assert_eq!(geometry.components[0].hblocks, 2);
        assert_eq!(geometry.components[0].vblocks, 2);
        // The SOS is still pending and parses on the next (full) pass.
        assert_eq!(reader.next_segment(false).unwrap(), SegmentEvent::ScanReady);
        assert_eq!(reader.scan().unwrap().components.len(), 1);
    }

    #[test]
    fn missing_soi_is_a_syntax_error() {
        let data = segment(0xDB, &dqt_body(0, 16));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::SyntaxError("missing SOI"))
        );
    }

    #[test]
    fn progressive_frames_are_unsupported() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xC2, &sof0_gray_body(16, 16)));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::UnsupportedFeature("only baseline (SOF0) frames supported"))
        );
    }

    #[test]
    fn twelve_bit_frames_are_unsupported() {
        let mut body = sof0_gray_body(16, 16);
        body[0] = 12;
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xDB, &dqt_body(0, 16)));
        data.extend(segment(0xC0, &body));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::UnsupportedFeature("only 8-bit samples supported"))
        );
    }

    #[test]
    fn sample_factor_3_is_unsupported() {
        let mut body = sof0_gray_body(16, 16);
        body[6] = 0x31;
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xDB, &dqt_body(0, 16)));
        data.extend(segment(0xC0, &body));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::UnsupportedFeature("horizontal sample factor 3"))
        );
    }

    #[test]
    fn sof_requires_loaded_quant_table() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xC0, &sof0_gray_body(16, 16)));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::UndefinedTableReference(
                "SOF references unloaded quantization table"
            ))
        );
    }

    #[test]
    fn sos_requires_loaded_entropy_tables() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xDB, &dqt_body(0, 16)));
        data.extend(segment(0xC0, &sof0_gray_body(16, 16)));
        data.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(false),
            Err(JpegError::UndefinedTableReference(
                "SOS references unloaded DC entropy table"
            ))
        );
    }

    #[test]
    fn segment_length_must_match_consumption() {
        let mut data = vec![0xFF, 0xD8];
        // DQT declaring one trailing byte beyond the table.
        let mut body = dqt_body(0, 16);
        body.push(0);
        data.extend(segment(0xDB, &body));
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::MalformedSegment("DQT unprocessed bytes"))
        );
    }

    #[test]
    fn unknown_segments_are_skipped_by_length() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xE1, b"Exif\0\0payload"));
        data.extend(segment(0xFE, b"comment"));
        data.extend(segment(0xDB, &dqt_body(0, 16)));
        data.extend([0xFF, 0xD9]);
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.next_segment(true).unwrap(), SegmentEvent::EndOfImage);
        assert!(reader.quant_table(0).is_ok());
    }

    #[test]
    fn eoi_with_trailing_bytes_is_rejected() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xD9];
        data.push(0x55);
        let mut reader = StreamReader::new(&data);
        assert_eq!(
            reader.next_segment(true),
            Err(JpegError::MalformedSegment("EOI with unprocessed bytes"))
        );
    }

    #[test]
    fn reset_allows_redecoding() {
        let mut data = headers(16, 16);
        data.extend([0xFF, 0xD9]);
        let mut reader = StreamReader::new(&data);
        assert_eq!(reader.next_segment(true).unwrap(), SegmentEvent::EndOfImage);
        reader.reset();
        assert_eq!(reader.next_segment(true).unwrap(), SegmentEvent::EndOfImage);
        assert!(reader.frame_geometry().is_ok());
    }
}
