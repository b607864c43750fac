//! JPEG marker codes.

use num_enum::TryFromPrimitive;

pub const MARKER_START_BYTE: u8 = 0xFF;
pub const RESTART_MARKER_BASE: u8 = 0xD0;
pub const RESTART_MARKER_COUNT: u8 = 8;

/// Marker codes the segment parser dispatches on. Anything else is either
/// rejected as unsupported (non-baseline frame types) or skipped using its
/// declared segment length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Marker {
    /// SOF0: baseline DCT frame.
    StartOfFrameBaseline = 0xC0,
    /// DHT: Huffman table definition.
    DefineHuffmanTable = 0xC4,
    /// SOI: start of image.
    StartOfImage = 0xD8,
    /// EOI: end of image.
    EndOfImage = 0xD9,
    /// SOS: start of scan.
    StartOfScan = 0xDA,
    /// DQT: quantization table definition.
    DefineQuantizationTable = 0xDB,
    /// DNL: number of lines.
    DefineNumberOfLines = 0xDC,
    /// DRI: restart interval.
    DefineRestartInterval = 0xDD,
    /// APP0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    /// APP13: used by Photoshop IRB.
    ApplicationData13 = 0xED,
    /// APP14: used by Adobe.
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,
    /// COM: comment block.
    Comment = 0xFE,
}

/// RST0-RST7. The low 3 bits carry the restart counter.
pub fn is_restart(byte: u8) -> bool {
    (RESTART_MARKER_BASE..RESTART_MARKER_BASE + RESTART_MARKER_COUNT).contains(&byte)
}

/// SOF1-SOF15 (minus DHT/JPG/DAC): extended sequential, progressive,
/// lossless, hierarchical and arithmetic-coded frames.
pub fn is_unsupported_frame(byte: u8) -> bool {
    matches!(byte, 0xC1..=0xCF) && !matches!(byte, 0xC4 | 0xC8 | 0xCC)
}

/// DAC (arithmetic conditioning) and JPG (reserved).
pub fn is_arithmetic_conditioning(byte: u8) -> bool {
    byte == 0xCC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_marker_range() {
        assert!(!is_restart(0xCF));
        assert!(is_restart(0xD0));
        assert!(is_restart(0xD7));
        assert!(!is_restart(0xD8));
    }

    #[test]
    fn frame_markers_other_than_sof0_are_unsupported() {
        assert!(!is_unsupported_frame(0xC0));
        assert!(is_unsupported_frame(0xC1)); // extended sequential
        assert!(is_unsupported_frame(0xC2)); // progressive
        assert!(!is_unsupported_frame(0xC4)); // DHT
        assert!(is_unsupported_frame(0xC7)); // differential lossless
        assert!(is_unsupported_frame(0xCF)); // differential lossless, arithmetic
    }

    #[test]
    fn marker_round_trip() {
        assert_eq!(Marker::try_from(0xD8), Ok(Marker::StartOfImage));
        assert_eq!(Marker::try_from(0xDB), Ok(Marker::DefineQuantizationTable));
        assert!(Marker::try_from(0x01).is_err());
    }
}
