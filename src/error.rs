use thiserror::Error;

/// Decode errors. The first error raised aborts the remainder of the decode
/// invocation; partially-filled image buffers must be treated as invalid.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegError {
    #[error("stream underrun: {0}")]
    StreamUnderrun(&'static str),
    #[error("malformed segment: {0}")]
    MalformedSegment(&'static str),
    #[error("undefined table reference: {0}")]
    UndefinedTableReference(&'static str),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    #[error("invalid huffman table: {0}")]
    InvalidHuffmanTable(&'static str),
    #[error("restart sync error: {0}")]
    RestartSync(&'static str),
    #[error("syntax error: {0}")]
    SyntaxError(&'static str),
}

pub type Result<T> = std::result::Result<T, JpegError>;
