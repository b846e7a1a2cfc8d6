//! Definitions of error related things.

use thiserror::Error;

/// Errors of this crate
///
/// Except for [`LazError::IoError`], all of these are fatal for the stream
/// (or chunk) being processed: the coder state is cumulative, so once one of
/// them is returned every point that would follow is unusable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LazError {
    /// Wrapper around an io error from the std lib
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
    /// The compressed data ended before all the requested points were decoded
    #[error("The compressed stream ended before all the expected points were decoded")]
    UnexpectedEndOfStream,
    /// The decoder reached a state that no valid stream can produce
    #[error("The compressed stream is corrupted: {0}")]
    CorruptedStream(&'static str),
    /// The return number or the number of returns does not fit in 3 bits,
    /// so no compression context exists for it
    #[error(
        "Return number ({return_number}) and number of returns ({number_of_returns}) must be in [0, 7]"
    )]
    InvalidReturnFields {
        return_number: u8,
        number_of_returns: u8,
    },
    /// An integer compressor was asked to use a context it does not have
    #[error("Context {context} is out of bounds, the compressor has {contexts} contexts")]
    ContextOutOfBounds { context: u32, contexts: u32 },
    /// An arithmetic model must have between 2 and 2048 symbols
    #[error("A model must have between 2 and 2048 symbols, got {0}")]
    InvalidSymbolCount(u32),
    /// The parameters given to an integer (de)compressor builder are not usable
    #[error(
        "Invalid integer compressor parameters: bits: {bits}, contexts: {contexts}, bits_high: {bits_high}"
    )]
    InvalidIntegerCompressor {
        bits: u32,
        contexts: u32,
        bits_high: u32,
    },
    /// The chunk size must hold at least one point
    #[error("The chunk size must be greater than 0")]
    InvalidChunkSize,
    #[error("The len of the buffer ({buffer_len}) is not a multiple of the point size {point_size}")]
    BufferLenNotMultipleOfPointSize {
        buffer_len: usize,
        point_size: usize,
    },
    /// The output buffer does not have room for exactly the points of the chunks
    #[error("The chunks hold {expected} points but the buffer has room for {actual}")]
    PointCountMismatch { expected: u64, actual: u64 },
    /// The point counts of the chunks add up to more than a `u64` holds
    #[error("The sum of the chunks point counts overflows")]
    PointCountOverflow,
}

impl LazError {
    /// Converts an io error coming from the compressed input.
    ///
    /// Running out of bytes is a structural problem of the stream, not an
    /// io failure, so it gets its own variant.
    pub(crate) fn from_input(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            LazError::UnexpectedEndOfStream
        } else {
            LazError::IoError(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, LazError>;
