//! Decoder backends.
//!
//! The display tool selects a concrete backend at construction time through
//! the `DecodeBackend` trait; `BaselineDecoder` is the built-in engine. A
//! wrapper around an external reference decoder can implement the same trait
//! for side-by-side comparison.

use crate::DecodeOutput;
use crate::color;
use crate::error::Result;
use crate::header::JpegHeader;
use crate::image::Image;
use crate::scan_decoder::decode_scan;
use crate::stream_reader::{SegmentEvent, StreamReader};

pub trait DecodeBackend {
    /// Parses up to the start of the first scan and returns the frame
    /// geometry needed to allocate an `Image`.
    fn read_header(&mut self) -> Result<JpegHeader>;

    /// Decodes the stream into caller-owned image buffers, producing the
    /// requested output domain. The decoder owns its tables; the caller owns
    /// the image.
    fn decode_image(&mut self, img: &mut Image, out: DecodeOutput) -> Result<()>;

    /// Rewinds to the start of the coded buffer for a fresh decode. Image
    /// buffers are reused by the caller.
    fn reset(&mut self);
}

/// The built-in baseline decoding engine.
pub struct BaselineDecoder<'a> {
    reader: StreamReader<'a>,
}

impl<'a> BaselineDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: StreamReader::new(source),
        }
    }
}

impl DecodeBackend for BaselineDecoder<'_> {
    fn read_header(&mut self) -> Result<JpegHeader> {
        // Either event means every header segment before the scan data has
        // been consumed; geometry requires that a SOF was among them.
        match self.reader.next_segment(true)? {
            SegmentEvent::ScanReady | SegmentEvent::EndOfImage => {}
        }
        self.reader.frame_geometry()
    }

    fn decode_image(&mut self, img: &mut Image, out: DecodeOutput) -> Result<()> {
        loop {
            match self.reader.next_segment(false)? {
                SegmentEvent::ScanReady => {
                    let outcome = decode_scan(&self.reader, img, out)?;
                    self.reader.finish_scan(outcome.consumed, outcome.pending_marker);
                }
                SegmentEvent::EndOfImage => break,
            }
        }
        if out == DecodeOutput::Rgb {
            color::fill_rgb(img)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.reader.reset();
    }
}
