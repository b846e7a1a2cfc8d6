//! LASzip compatible compression of the core fields of LAS points
//! (`POINT10`, compression version 2)
//!
//! The points are coded with an adaptive arithmetic coder: every field is
//! predicted from the previous points and only the prediction error is
//! coded, with probability models that learn as the stream goes. The encoder
//! and the decoder evolve the same state, so a stream can only be decoded
//! from its beginning, with exactly the same number of points.
//!
//! # Compressing chunks of points
//!
//! ```
//! use laz_point10::las::chunked::{compress_points, decompress_chunks, ChunkConfigBuilder};
//! use laz_point10::las::Point10;
//!
//! # fn main() -> laz_point10::Result<()> {
//! let points = (0..1000)
//!     .map(|i| Point10 {
//!         x: i,
//!         y: 2 * i,
//!         z: i % 10,
//!         return_number: 1,
//!         number_of_returns_of_given_pulse: 1,
//!         ..Default::default()
//!     })
//!     .collect::<Vec<_>>();
//!
//! let config = ChunkConfigBuilder::new().with_chunk_size(500).build()?;
//! let chunks = compress_points(&points, &config)?;
//! assert_eq!(chunks.len(), 2);
//!
//! let decompressed = decompress_chunks(&chunks)?;
//! assert_eq!(decompressed, points);
//! # Ok(())
//! # }
//! ```
//!
//! # Streaming
//!
//! The record (de)compressors work point by point on any `Write` / `Read`.
//!
//! ```
//! use laz_point10::las::v2::{Point10Compressor, Point10Decompressor};
//! use laz_point10::las::Point10;
//! use laz_point10::record::{SequentialPointRecordCompressor, SequentialPointRecordDecompressor};
//!
//! # fn main() -> laz_point10::Result<()> {
//! let point = Point10 {
//!     x: 10,
//!     return_number: 1,
//!     number_of_returns_of_given_pulse: 1,
//!     ..Default::default()
//! };
//!
//! let output = std::io::Cursor::new(Vec::<u8>::new());
//! let mut compressor = SequentialPointRecordCompressor::new(output, Point10Compressor::new()?);
//! compressor.compress_next(&point)?;
//! compressor.compress_next(&point)?;
//! compressor.done()?; // don't forget to call done when you are...done compressing
//!
//! let input = std::io::Cursor::new(compressor.into_inner().into_inner());
//! let mut decompressor = SequentialPointRecordDecompressor::new(input, Point10Decompressor::new()?);
//! assert_eq!(decompressor.decompress_many(2)?, vec![point, point]);
//! # Ok(())
//! # }
//! ```
//!
//! # Parallelism
//!
//! This crate has an optional feature 'parallel'.
//! When using this feature, additional `par_` functions are exposed.
//!
//! - [`par_compress_points`]
//! - [`par_decompress_chunks`]
//!
//! [`par_compress_points`]: las/chunked/fn.par_compress_points.html
//! [`par_decompress_chunks`]: las/chunked/fn.par_decompress_chunks.html

pub mod compressors;
pub mod decoders;
pub mod decompressors;
pub mod encoders;
pub mod models;

pub mod errors;
pub mod las;
pub mod packers;
pub mod record;

pub use errors::{LazError, Result};
pub use las::chunked::{
    compress_buffer, compress_chunk, compress_points, decompress_buffer, decompress_chunk,
    decompress_chunks, ChunkConfig, ChunkConfigBuilder, CompressedChunk,
};
#[cfg(feature = "parallel")]
pub use las::chunked::{par_compress_points, par_decompress_chunks};
pub use las::Point10;
