//! # LZW decoder and encoder
//!
//! This crate provides an LZW [`Encoder`] and [`Decoder`] built around a growing dictionary
//! that is never reset. The encoder keeps its dictionary as a prefix tree, the decoder as a
//! dense table indexed by code. Codes are packed most significant bit first and may be either
//! of a fixed width or grow one bit at a time as the dictionary fills up.
//!
//! The compressed stream consists of a single header byte holding the maximum code size,
//! followed directly by the packed codes. There is no clear code and no end code, the end of
//! the stream is the end of the data. Note that the header does not record whether the code
//! width was fixed or adaptive, both sides must agree on it.
//!
//! Exemplary use of the slice interface:
//!
//! ```
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//! let (compressed, codes) = trielzw::compress(data, 12, true);
//! assert_eq!(codes, 16);
//!
//! let decompressed = trielzw::decompress(&compressed, 12, true).unwrap();
//! assert_eq!(decompressed, data);
//! ```
//!
//! [`Encoder`]: encode/struct.Encoder.html
//! [`Decoder`]: decode/struct.Decoder.html
#![forbid(unsafe_code)]
use std::io;

/// The smallest allowed maximum code size, and the starting size of adaptive streams.
pub const MIN_CODESIZE: u8 = 9;
/// The largest allowed maximum code size.
pub const MAX_CODESIZE: u8 = 24;

/// Codes below this value stand for themselves as single bytes.
pub(crate) const RESERVED: Code = 256;

/// Alias for a LZW code point
pub type Code = u32;

/// How the width of codes in the packed stream is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeWidth {
    /// Every code is written with the configured maximum size.
    Fixed,
    /// Codes start at 9 bits and grow by one bit whenever the next assignable code would no
    /// longer fit, up to the configured maximum size.
    Adaptive,
}

/// The error type of the en- and decoder.
#[derive(Debug, thiserror::Error)]
pub enum LzwError {
    /// A code was neither in the dictionary nor the next one to be assigned, or the stream
    /// ended in the middle of a code.
    #[error("invalid code in compressed stream")]
    InvalidCode,
    /// The stream did not even contain its header byte.
    #[error("compressed stream has no header")]
    MissingHeader,
    /// The header holds a code size that can not be decoded.
    #[error("unsupported maximum code size {0} in header")]
    InvalidHeader(u8),
    /// The header holds a different code size than the decoder was configured with.
    #[error("header declares {found} bit codes but the decoder expects {expected}")]
    HeaderMismatch { found: u8, expected: u8 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The result of coding a whole stream.
#[derive(Debug)]
pub struct AllResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The number of codes written or read, excluding the header.
    pub codes: usize,
    pub status: Result<(), LzwError>,
}

/// The current code size of a stream and its growth rule.
///
/// Encoder and decoder call [`grow`] after each dictionary insertion with the number of
/// entries the *encoder* holds at that point. The decoder is always one entry behind when a
/// code is transferred so it passes its own count plus one.
///
/// [`grow`]: #method.grow
#[derive(Clone, Copy, Debug)]
pub(crate) struct CodeSize {
    current: u8,
    max: u8,
}

impl CodeSize {
    pub(crate) fn new(width: CodeWidth, max: u8) -> Self {
        let current = match width {
            CodeWidth::Fixed => max,
            CodeWidth::Adaptive => MIN_CODESIZE,
        };

        CodeSize { current, max }
    }

    pub(crate) fn get(self) -> u8 {
        self.current
    }

    /// Widen by one bit if `entries` no longer fits, returning if the size changed.
    pub(crate) fn grow(&mut self, entries: Code) -> bool {
        if self.current < self.max && entries >= 1 << self.current {
            self.current += 1;
            true
        } else {
            false
        }
    }
}

impl From<LzwError> for io::Error {
    fn from(err: LzwError) -> Self {
        match err {
            LzwError::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub(crate) fn assert_code_size(size: u8) {
    assert!(
        size >= MIN_CODESIZE && size <= MAX_CODESIZE,
        "Maximum code size must be between {} and {}, got {}",
        MIN_CODESIZE,
        MAX_CODESIZE,
        size
    );
}

fn code_width(adaptive: bool) -> CodeWidth {
    if adaptive {
        CodeWidth::Adaptive
    } else {
        CodeWidth::Fixed
    }
}

/// Compress `data`, returning the compressed stream and the number of codes in it.
///
/// # Panics
///
/// Panics if `max_bits` is outside `9..=24`.
pub fn compress(data: &[u8], max_bits: u8, adaptive: bool) -> (Vec<u8>, usize) {
    let mut compressed = Vec::with_capacity(data.len() / 2 + 1);
    let mut encoder = encode::Encoder::new(code_width(adaptive), max_bits);
    let result = encoder.into_stream(&mut compressed).encode_all(data);
    // Reading a slice and writing a vector never fail.
    debug_assert!(result.status.is_ok(), "{:?}", result.status);
    (compressed, result.codes)
}

/// Decompress a stream produced by [`compress`] with the same parameters.
///
/// # Panics
///
/// Panics if `max_bits` is outside `9..=24`.
///
/// [`compress`]: fn.compress.html
pub fn decompress(data: &[u8], max_bits: u8, adaptive: bool) -> Result<Vec<u8>, LzwError> {
    let mut decompressed = Vec::with_capacity(2 * data.len());
    let mut decoder = decode::Decoder::new(code_width(adaptive), max_bits);
    decoder.into_stream(&mut decompressed).decode_all(data).status?;
    Ok(decompressed)
}

/// The compression ratio, uncompressed size over compressed size.
///
/// Returns `0.0` for an empty compressed size.
pub fn compression_ratio(uncompressed: usize, compressed: usize) -> f64 {
    if compressed == 0 {
        0.0
    } else {
        uncompressed as f64 / compressed as f64
    }
}

mod bits;
pub mod decode;
pub mod encode;
