//! Baseline JPEG decoding engine with inspectable intermediate outputs.
//!
//! Decodes sequential, Huffman-coded, 8-bit JPEG streams into planar sample
//! buffers, optionally exposing the de-quantized frequency-domain
//! coefficients or the pixel-domain residual of every block. Built as the
//! reference engine behind a display/inspection tool: the caller allocates
//! an [`Image`] from the parsed header, then runs one decode per displayed
//! frame.
//!
//! ```no_run
//! use jpegscope_rs::{BaselineDecoder, DecodeBackend, DecodeOutput, Image};
//!
//! # fn main() -> Result<(), jpegscope_rs::JpegError> {
//! let data = std::fs::read("input.jpg").expect("read input");
//! let mut decoder = BaselineDecoder::new(&data);
//! let header = decoder.read_header()?;
//! let mut img = Image::allocate(&header)?;
//! decoder.decode_image(&mut img, DecodeOutput::Planar)?;
//! # Ok(())
//! # }
//! ```

pub mod bit_reader;
pub mod color;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod header;
pub mod huffman;
pub mod idct;
pub mod image;
pub mod marker;
pub mod quantization;
pub mod scan_decoder;
pub mod stream_reader;

pub use decoder::{BaselineDecoder, DecodeBackend};
pub use error::JpegError;
pub use header::JpegHeader;
pub use image::{Image, ImagePlane};

/// Output domain requested from a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeOutput {
    /// De-quantized, de-zig-zagged coefficients, no transform.
    Coefficients,
    /// Coefficients after the inverse transform: the pixel-domain residual
    /// before the +128 level shift.
    Residual,
    /// Planar 8-bit luma/chroma samples.
    #[default]
    Planar,
    /// Interleaved 8-bit RGB samples via the display colour conversion.
    Rgb,
}
