//! Approximate YCbCr to RGB conversion for display output.

use crate::error::{JpegError, Result};
use crate::image::{Image, ImagePlane};

#[inline]
fn clamp255(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn plane_sample(plane: &ImagePlane, x: usize, y: usize) -> u8 {
    plane.data[(y >> plane.ydec) * plane.ystride + ((x >> plane.xdec) * plane.xstride)]
}

/// Fills `img.pixels` with interleaved RGB at the nominal frame size.
///
/// Chroma planes are upsampled by sample replication via their `xdec`/`ydec`
/// shifts. Grayscale images replicate luma into all three channels. The
/// conversion uses the display-precision BT.601 formulas.
pub fn fill_rgb(img: &mut Image) -> Result<()> {
    let width = usize::from(img.width);
    let height = usize::from(img.height);
    let Image { planes, pixels, .. } = img;
    pixels.clear();
    pixels.resize(width * height * 3, 0);
    match planes.len() {
        1 => {
            let luma = &planes[0];
            for y in 0..height {
                for x in 0..width {
                    let v = plane_sample(luma, x, y);
                    let out = (y * width + x) * 3;
                    pixels[out] = v;
                    pixels[out + 1] = v;
                    pixels[out + 2] = v;
                }
            }
        }
        3 => {
            for y in 0..height {
                for x in 0..width {
                    let yv = f32::from(plane_sample(&planes[0], x, y));
                    let cb = f32::from(plane_sample(&planes[1], x, y)) - 128.0;
                    let cr = f32::from(plane_sample(&planes[2], x, y)) - 128.0;
                    let out = (y * width + x) * 3;
                    pixels[out] = clamp255(yv + 1.402 * cr);
                    pixels[out + 1] = clamp255(yv - 0.344136 * cb - 0.714136 * cr);
                    pixels[out + 2] = clamp255(yv + 1.772 * cb);
                }
            }
        }
        _ => return Err(JpegError::UnsupportedFeature("only 1 or 3 components supported")),
    }
    Ok(())
}
