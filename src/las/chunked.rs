//! Compression of point clouds in independent chunks.
//!
//! Each chunk is a complete stream on its own (raw first point, then the
//! arithmetic coded points), so chunks can be compressed and decompressed in
//! any order, on any thread. Where the chunks end up and how they are indexed
//! is left to the caller.

use std::convert::TryFrom;
use std::io::Cursor;

use crate::errors::{LazError, Result};
use crate::las::point10::v2::{Point10Compressor, Point10Decompressor};
use crate::las::point10::Point10;
use crate::packers::Packable;
use crate::record::{SequentialPointRecordCompressor, SequentialPointRecordDecompressor};

/// Number of points per chunk used by LASzip.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
}

impl ChunkConfig {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct ChunkConfigBuilder {
    config: ChunkConfig,
}

impl ChunkConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Default::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<ChunkConfig> {
        if self.config.chunk_size == 0 {
            return Err(LazError::InvalidChunkSize);
        }
        Ok(self.config)
    }
}

impl Default for ChunkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A compressed chunk and the number of points it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedChunk {
    pub point_count: u64,
    pub data: Vec<u8>,
}

/// Compresses `points` as a single chunk.
pub fn compress_chunk(points: &[Point10]) -> Result<CompressedChunk> {
    let mut compressor = SequentialPointRecordCompressor::new(
        Cursor::new(Vec::<u8>::new()),
        Point10Compressor::new()?,
    );
    compressor.compress_many(points)?;
    compressor.done()?;
    let data = compressor.into_inner().into_inner();
    tracing::debug!(
        point_count = points.len(),
        byte_count = data.len(),
        "compressed chunk"
    );
    Ok(CompressedChunk {
        point_count: points.len() as u64,
        data,
    })
}

/// Compresses the points in chunks of `config.chunk_size()` points, the last
/// chunk may be smaller.
pub fn compress_points(points: &[Point10], config: &ChunkConfig) -> Result<Vec<CompressedChunk>> {
    points
        .chunks(config.chunk_size())
        .map(compress_chunk)
        .collect()
}

pub fn decompress_chunk(chunk: &CompressedChunk) -> Result<Vec<Point10>> {
    let mut decompressor = SequentialPointRecordDecompressor::new(
        Cursor::new(chunk.data.as_slice()),
        Point10Decompressor::new()?,
    );
    // a count that does not fit in memory cannot be backed by the data
    let point_count =
        usize::try_from(chunk.point_count).map_err(|_| LazError::UnexpectedEndOfStream)?;
    let points = decompressor.decompress_many(point_count)?;
    tracing::debug!(
        point_count = chunk.point_count,
        byte_count = chunk.data.len(),
        "decompressed chunk"
    );
    Ok(points)
}

/// Decompresses the chunks one after the other, points are returned in order.
pub fn decompress_chunks(chunks: &[CompressedChunk]) -> Result<Vec<Point10>> {
    let mut points = Vec::new();
    for chunk in chunks {
        points.extend(decompress_chunk(chunk)?);
    }
    Ok(points)
}

/// Compresses points given in the 20 bytes LAS layout.
pub fn compress_buffer(
    uncompressed_points: &[u8],
    config: &ChunkConfig,
) -> Result<Vec<CompressedChunk>> {
    let points = unpack_points(uncompressed_points)?;
    compress_points(&points, config)
}

/// Decompresses the chunks into `decompressed_points`, in the 20 bytes LAS
/// layout, which must be exactly as large as the points of the chunks.
pub fn decompress_buffer(chunks: &[CompressedChunk], decompressed_points: &mut [u8]) -> Result<()> {
    check_output_len(chunks, decompressed_points)?;
    let mut outputs = decompressed_points.chunks_exact_mut(Point10::SIZE);
    for chunk in chunks {
        for (point, output) in decompress_chunk(chunk)?.iter().zip(&mut outputs) {
            point.pack_into(output);
        }
    }
    Ok(())
}

fn total_point_count(chunks: &[CompressedChunk]) -> Result<u64> {
    chunks
        .iter()
        .try_fold(0u64, |total, chunk| total.checked_add(chunk.point_count))
        .ok_or(LazError::PointCountOverflow)
}

fn check_point_buffer(buffer: &[u8]) -> Result<()> {
    if buffer.len() % Point10::SIZE != 0 {
        Err(LazError::BufferLenNotMultipleOfPointSize {
            buffer_len: buffer.len(),
            point_size: Point10::SIZE,
        })
    } else {
        Ok(())
    }
}

fn check_output_len(chunks: &[CompressedChunk], output: &[u8]) -> Result<()> {
    check_point_buffer(output)?;
    let expected = total_point_count(chunks)?;
    let actual = (output.len() / Point10::SIZE) as u64;
    if expected != actual {
        return Err(LazError::PointCountMismatch { expected, actual });
    }
    Ok(())
}

fn unpack_points(buffer: &[u8]) -> Result<Vec<Point10>> {
    check_point_buffer(buffer)?;
    Ok(buffer
        .chunks_exact(Point10::SIZE)
        .map(Point10::unpack_from)
        .collect())
}

/// Compresses the points in parallel, one chunk per task.
///
/// The output is the same as the one of [`compress_points`].
///
/// # Note
///
/// Point order [is conserved](https://github.com/rayon-rs/rayon/issues/551)
#[cfg(feature = "parallel")]
pub fn par_compress_points(
    points: &[Point10],
    config: &ChunkConfig,
) -> Result<Vec<CompressedChunk>> {
    use rayon::prelude::*;

    points
        .par_chunks(config.chunk_size())
        .map(compress_chunk)
        .collect()
}

/// Decompresses the chunks in parallel, points are returned in order.
#[cfg(feature = "parallel")]
pub fn par_decompress_chunks(chunks: &[CompressedChunk]) -> Result<Vec<Point10>> {
    use rayon::prelude::*;

    let decompressed = chunks
        .par_iter()
        .map(decompress_chunk)
        .collect::<Result<Vec<Vec<Point10>>>>()?;
    Ok(decompressed.into_iter().flatten().collect())
}
