//! Frame and scan headers.

use crate::constants::NCOMPS_MAX;

/// One component of the frame, from SOF0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameComponent {
    pub id: u8,
    pub hsamp: u8,
    pub vsamp: u8,
    /// Quantization table slot bound to this component.
    pub tq: u8,
}

#[derive(Debug, Clone, Default)]
pub struct FrameHeader {
    pub bits: u8,
    pub width: u16,
    pub height: u16,
    pub components: Vec<FrameComponent>,
    /// Largest horizontal/vertical sample factors across components.
    pub hmax: u8,
    pub vmax: u8,
    /// MCU grid dimensions.
    pub nhmb: u16,
    pub nvmb: u16,
}

impl FrameHeader {
    /// Geometry summary handed to the caller for image allocation.
    pub fn geometry(&self) -> JpegHeader {
        let mut header = JpegHeader {
            bits: self.bits,
            width: self.width,
            height: self.height,
            ncomps: self.components.len(),
            components: [HeaderComponent::default(); NCOMPS_MAX],
        };
        for (i, c) in self.components.iter().enumerate() {
            header.components[i] = HeaderComponent {
                hblocks: self.nhmb * u16::from(c.hsamp),
                vblocks: self.nvmb * u16::from(c.vsamp),
                hsamp: c.hsamp,
                vsamp: c.vsamp,
            };
        }
        header
    }
}

/// One component of the current scan, from SOS.
#[derive(Debug, Clone, Copy)]
pub struct ScanComponent {
    pub id: u8,
    /// Index of the matching frame component (and its image plane).
    pub frame_index: usize,
    /// DC entropy table slot.
    pub td: u8,
    /// AC entropy table slot.
    pub ta: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
}

/// Frame geometry exposed to callers: enough to allocate image planes
/// without retaining the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JpegHeader {
    pub bits: u8,
    pub width: u16,
    pub height: u16,
    pub ncomps: usize,
    pub components: [HeaderComponent; NCOMPS_MAX],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderComponent {
    /// Plane width/height in 8x8 blocks, covering the full MCU grid.
    pub hblocks: u16,
    pub vblocks: u16,
    pub hsamp: u8,
    pub vsamp: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_covers_the_mcu_grid() {
        // 33x17 4:2:0: MCUs are 16x16, so a 3x2 grid.
        let frame = FrameHeader {
            bits: 8,
            width: 33,
            height: 17,
            components: vec![
                FrameComponent { id: 1, hsamp: 2, vsamp: 2, tq: 0 },
                FrameComponent { id: 2, hsamp: 1, vsamp: 1, tq: 1 },
                FrameComponent { id: 3, hsamp: 1, vsamp: 1, tq: 1 },
            ],
            hmax: 2,
            vmax: 2,
            nhmb: 3,
            nvmb: 2,
        };
        let header = frame.geometry();
        assert_eq!(header.components[0].hblocks, 6);
        assert_eq!(header.components[0].vblocks, 4);
        assert_eq!(header.components[1].hblocks, 3);
        assert_eq!(header.components[1].vblocks, 2);
    }
}
