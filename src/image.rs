//! Caller-owned image buffers and plane geometry.

use crate::constants::ilog;
use crate::error::{JpegError, Result};
use crate::header::JpegHeader;

/// One planar buffer of the decoded image.
///
/// Dimensions are block-aligned (multiples of 8) and cover the full MCU
/// grid, which may extend past the nominal frame size. `xdec`/`ydec` give
/// the log2 subsampling of this plane relative to the most densely sampled
/// component.
pub struct ImagePlane {
    pub width: u32,
    pub height: u32,
    pub xdec: u8,
    pub ydec: u8,
    pub xstride: usize,
    pub ystride: usize,
    /// 8-bit samples, `height * ystride` long.
    pub data: Vec<u8>,
    /// Coefficient-domain view of the plane: dequantized coefficients or
    /// post-transform residuals, depending on the requested output.
    pub coef: Vec<i16>,
    pub cstride: usize,
}

impl ImagePlane {
    fn new(width: u32, height: u32, xdec: u8, ydec: u8) -> Self {
        let ystride = width as usize;
        Self {
            width,
            height,
            xdec,
            ydec,
            xstride: 1,
            ystride,
            data: vec![0; ystride * height as usize],
            coef: vec![0; ystride * height as usize],
            cstride: ystride,
        }
    }

    /// Writes an 8x8 spatial block at block coordinates (`brow`, `bcol`),
    /// applying the +128 level shift and clamping to [0, 255].
    pub fn put_block(&mut self, brow: usize, bcol: usize, block: &[i32; 64]) {
        debug_assert!((bcol + 1) * 8 <= self.width as usize);
        debug_assert!((brow + 1) * 8 <= self.height as usize);
        for k in 0..8 {
            let row = (brow * 8 + k) * self.ystride + bcol * 8 * self.xstride;
            for j in 0..8 {
                self.data[row + j * self.xstride] = (block[k * 8 + j] + 128).clamp(0, 255) as u8;
            }
        }
    }

    /// Writes an 8x8 coefficient-domain block, narrowing with saturation.
    pub fn put_coef_block(&mut self, brow: usize, bcol: usize, block: &[i32; 64]) {
        debug_assert!((bcol + 1) * 8 <= self.width as usize);
        debug_assert!((brow + 1) * 8 <= self.height as usize);
        for k in 0..8 {
            let row = (brow * 8 + k) * self.cstride + bcol * 8;
            for j in 0..8 {
                self.coef[row + j] =
                    block[k * 8 + j].clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            }
        }
    }
}

/// The decoded image: one plane per frame component, plus an interleaved
/// RGB buffer filled only when RGB output is requested. Owned by the caller
/// and reused across re-decodes.
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub planes: Vec<ImagePlane>,
    /// Interleaved 8-bit RGB at the nominal frame size.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Allocates planes for the given frame geometry.
    pub fn allocate(header: &JpegHeader) -> Result<Self> {
        if header.ncomps == 0 || header.ncomps > crate::constants::NCOMPS_MAX {
            return Err(JpegError::UnsupportedFeature("only 1 or 3 components supported"));
        }
        let hmax = header.components[..header.ncomps]
            .iter()
            .map(|c| c.hsamp)
            .max()
            .unwrap_or(1);
        let vmax = header.components[..header.ncomps]
            .iter()
            .map(|c| c.vsamp)
            .max()
            .unwrap_or(1);
        let mut planes = Vec::with_capacity(header.ncomps);
        for c in &header.components[..header.ncomps] {
            let xdec = (ilog(u32::from(hmax)) - ilog(u32::from(c.hsamp))) as u8;
            let ydec = (ilog(u32::from(vmax)) - ilog(u32::from(c.vsamp))) as u8;
            planes.push(ImagePlane::new(u32::from(c.hblocks) * 8, u32::from(c.vblocks) * 8, xdec, ydec));
        }
        Ok(Self {
            width: header.width,
            height: header.height,
            planes,
            pixels: Vec::new(),
        })
    }
}
