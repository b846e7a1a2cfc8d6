//! Streams of records: the first one stored raw, the following ones
//! arithmetic coded.

use std::io::{Read, Write};
use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt};

use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
use crate::decoders::ArithmeticDecoder;
use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
use crate::encoders::ArithmeticEncoder;
use crate::errors::{LazError, Result};
use crate::packers::Packable;

// decompress_many does not reserve room for more records than this up front
const MAX_PREALLOCATED_RECORDS: usize = 4096;

/***************************************************************************************************
                    Decompression Related Traits
***************************************************************************************************/

pub trait FieldDecompressor<R: Read> {
    type Item;

    fn size_of_field(&self) -> usize;

    /// Reads the raw first item and sets up the prediction state with it.
    fn decompress_first(&mut self, src: &mut R) -> Result<Self::Item>;

    fn decompress_with(&mut self, decoder: &mut ArithmeticDecoder<R>) -> Result<Self::Item>;
}

/***************************************************************************************************
                    Compression related Traits
***************************************************************************************************/

pub trait FieldCompressor<W: Write> {
    type Item;

    fn size_of_field(&self) -> usize;

    /// Writes the first item raw and sets up the prediction state with it.
    fn compress_first(&mut self, dst: &mut W, first: &Self::Item) -> Result<()>;

    fn compress_with(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        item: &Self::Item,
    ) -> Result<()>;
}

/***************************************************************************************************
                    Record Decompressors implementations
***************************************************************************************************/

/// Decompresses records written by a [`SequentialPointRecordCompressor`].
///
/// The data is organized as follow:
///
/// 1) 1 raw record
/// 2) the arithmetic coded stream of the other records
pub struct SequentialPointRecordDecompressor<R: Read, D: FieldDecompressor<R>> {
    field_decompressor: D,
    decoder: ArithmeticDecoder<R>,
    is_first_decompression: bool,
    num_decompressed: u64,
}

impl<R: Read, D: FieldDecompressor<R>> SequentialPointRecordDecompressor<R, D> {
    pub fn new(input: R, field_decompressor: D) -> Self {
        Self {
            field_decompressor,
            decoder: ArithmeticDecoder::new(input),
            is_first_decompression: true,
            num_decompressed: 0,
        }
    }

    pub fn record_size(&self) -> usize {
        self.field_decompressor.size_of_field()
    }

    pub fn decompress_next(&mut self) -> Result<D::Item> {
        let item = if self.is_first_decompression {
            let item = self
                .field_decompressor
                .decompress_first(self.decoder.in_stream())?;
            self.is_first_decompression = false;

            // the decoder needs to be told that it should read the
            // init bytes after the first record has been read
            self.decoder.read_init_bytes()?;
            item
        } else {
            self.field_decompressor.decompress_with(&mut self.decoder)?
        };
        self.num_decompressed += 1;
        Ok(item)
    }

    /// Decompresses the next `count` records.
    ///
    /// `count` usually comes from the same place as the data, so it is not
    /// trusted for the allocation.
    pub fn decompress_many(&mut self, count: usize) -> Result<Vec<D::Item>> {
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATED_RECORDS));
        for _ in 0..count {
            items.push(self.decompress_next()?);
        }
        Ok(items)
    }

    pub fn num_decompressed(&self) -> u64 {
        self.num_decompressed
    }

    /// Prepares for the next chunk, which the stream must be positioned at.
    pub fn reset(&mut self, field_decompressor: D) {
        tracing::trace!(
            num_decompressed = self.num_decompressed,
            "resetting record decompressor"
        );
        self.decoder.reset();
        self.field_decompressor = field_decompressor;
        self.is_first_decompression = true;
        self.num_decompressed = 0;
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.decoder.in_stream()
    }

    pub fn into_inner(self) -> R {
        self.decoder.into_stream()
    }
}

/***************************************************************************************************
                    Record Compressors implementations
***************************************************************************************************/

pub struct SequentialPointRecordCompressor<W: Write, C: FieldCompressor<W>> {
    is_first_compression: bool,
    field_compressor: C,
    encoder: ArithmeticEncoder<W>,
    num_compressed: u64,
}

impl<W: Write, C: FieldCompressor<W>> SequentialPointRecordCompressor<W, C> {
    pub fn new(output: W, field_compressor: C) -> Self {
        Self {
            is_first_compression: true,
            field_compressor,
            encoder: ArithmeticEncoder::new(output),
            num_compressed: 0,
        }
    }

    pub fn record_size(&self) -> usize {
        self.field_compressor.size_of_field()
    }

    pub fn compress_next(&mut self, item: &C::Item) -> Result<()> {
        if self.is_first_compression {
            self.field_compressor
                .compress_first(self.encoder.out_stream(), item)?;
            self.is_first_compression = false;
        } else {
            self.field_compressor.compress_with(&mut self.encoder, item)?;
        }
        self.num_compressed += 1;
        Ok(())
    }

    pub fn compress_many(&mut self, items: &[C::Item]) -> Result<()> {
        items.iter().try_for_each(|item| self.compress_next(item))
    }

    /// Flushes the arithmetic coder, must be called once all the records of a
    /// chunk were compressed.
    pub fn done(&mut self) -> Result<()> {
        self.encoder.done()?;
        tracing::trace!(
            num_compressed = self.num_compressed,
            "record stream finished"
        );
        Ok(())
    }

    /// Prepares for a new chunk, appended to what was already written.
    pub fn reset(&mut self, field_compressor: C) {
        self.is_first_compression = true;
        self.encoder.reset();
        self.field_compressor = field_compressor;
        self.num_compressed = 0;
    }

    pub fn num_compressed(&self) -> u64 {
        self.num_compressed
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.encoder.out_stream()
    }

    pub fn into_inner(self) -> W {
        self.encoder.into_stream()
    }
}

/***************************************************************************************************
                    Integer fields
***************************************************************************************************/

/// Compresses a stream of integers, each one predicted by the previous one.
pub struct IntegerFieldCompressor<IntType> {
    compressor: IntegerCompressor,
    last_value: i32,
    int_type: PhantomData<IntType>,
}

impl<IntType: PrimInt> IntegerFieldCompressor<IntType> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            compressor: IntegerCompressorBuilder::new()
                .bits(std::mem::size_of::<IntType>() as u32 * 8)
                .build()?,
            last_value: 0,
            int_type: PhantomData,
        })
    }
}

impl<IntType, W> FieldCompressor<W> for IntegerFieldCompressor<IntType>
where
    IntType: PrimInt + Packable + AsPrimitive<i32>,
    W: Write,
{
    type Item = IntType;

    fn size_of_field(&self) -> usize {
        IntType::SIZE
    }

    fn compress_first(&mut self, dst: &mut W, first: &IntType) -> Result<()> {
        let mut buf = [0u8; 4];
        first.pack_into(&mut buf);
        dst.write_all(&buf[..IntType::SIZE])?;
        self.last_value = first.as_();
        Ok(())
    }

    fn compress_with(&mut self, encoder: &mut ArithmeticEncoder<W>, item: &IntType) -> Result<()> {
        let value = item.as_();
        self.compressor.compress(encoder, self.last_value, value, 0)?;
        self.last_value = value;
        Ok(())
    }
}

/// Inverse of [`IntegerFieldCompressor`].
pub struct IntegerFieldDecompressor<IntType> {
    decompressor: IntegerDecompressor,
    last_value: i32,
    int_type: PhantomData<IntType>,
}

impl<IntType: PrimInt> IntegerFieldDecompressor<IntType> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decompressor: IntegerDecompressorBuilder::new()
                .bits(std::mem::size_of::<IntType>() as u32 * 8)
                .build()?,
            last_value: 0,
            int_type: PhantomData,
        })
    }
}

impl<IntType, R> FieldDecompressor<R> for IntegerFieldDecompressor<IntType>
where
    IntType: PrimInt + Packable + AsPrimitive<i32> + 'static,
    i32: AsPrimitive<IntType>,
    R: Read,
{
    type Item = IntType;

    fn size_of_field(&self) -> usize {
        IntType::SIZE
    }

    fn decompress_first(&mut self, src: &mut R) -> Result<IntType> {
        let mut buf = [0u8; 4];
        src.read_exact(&mut buf[..IntType::SIZE])
            .map_err(LazError::from_input)?;
        let first = IntType::unpack_from(&buf);
        self.last_value = first.as_();
        Ok(first)
    }

    fn decompress_with(&mut self, decoder: &mut ArithmeticDecoder<R>) -> Result<IntType> {
        let value: IntType = self
            .decompressor
            .decompress(decoder, self.last_value, 0)?
            .as_();
        self.last_value = value.as_();
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_empty_stream() {
        let stream = Cursor::new(Vec::<u8>::new());

        let mut compressor = SequentialPointRecordCompressor::new(
            stream,
            IntegerFieldCompressor::<i32>::new().unwrap(),
        );
        compressor.done().unwrap();
        assert_eq!(compressor.num_compressed(), 0);

        let data = compressor.into_inner().into_inner();
        assert_eq!(&data, &[1u8, 0u8, 0u8, 0u8]);
    }

    #[test]
    fn test_first_record_is_raw() {
        let stream = Cursor::new(Vec::<u8>::new());

        let mut compressor = SequentialPointRecordCompressor::new(
            stream,
            IntegerFieldCompressor::<i32>::new().unwrap(),
        );
        compressor
            .compress_next(&i32::from_le_bytes([17u8, 42u8, 35u8, 1u8]))
            .unwrap();
        compressor.done().unwrap();

        let data = compressor.into_inner().into_inner();
        assert_eq!(&data, &[17u8, 42u8, 35u8, 1u8, 1u8, 0u8, 0u8, 0u8]);
    }

    #[test]
    fn test_integer_records_round_trip() {
        let values: Vec<u16> = (0..1000u32).map(|i| ((i * i * 31) % 65_536) as u16).collect();

        let mut compressor = SequentialPointRecordCompressor::new(
            Cursor::new(Vec::<u8>::new()),
            IntegerFieldCompressor::<u16>::new().unwrap(),
        );
        assert_eq!(compressor.record_size(), 2);
        compressor.compress_many(&values).unwrap();
        compressor.done().unwrap();
        assert_eq!(compressor.num_compressed(), 1000);
        let data = compressor.into_inner().into_inner();

        let mut decompressor = SequentialPointRecordDecompressor::new(
            Cursor::new(data),
            IntegerFieldDecompressor::<u16>::new().unwrap(),
        );
        assert_eq!(decompressor.decompress_many(values.len()).unwrap(), values);
        assert_eq!(decompressor.num_decompressed(), 1000);
    }

    #[test]
    fn test_signed_records_round_trip() {
        let values = [-3i16, -1, 32_767, -32_768, 0, -1, 12];
        let mut compressor = SequentialPointRecordCompressor::new(
            Cursor::new(Vec::<u8>::new()),
            IntegerFieldCompressor::<i16>::new().unwrap(),
        );
        compressor.compress_many(&values).unwrap();
        compressor.done().unwrap();

        let mut decompressor = SequentialPointRecordDecompressor::new(
            Cursor::new(compressor.into_inner().into_inner()),
            IntegerFieldDecompressor::<i16>::new().unwrap(),
        );
        assert_eq!(decompressor.decompress_many(values.len()).unwrap(), values);
    }

    #[test]
    fn test_reset_between_chunks() {
        let first_chunk = [5i32, -3, 1_000_000, 7];
        let second_chunk = [-20i32, -21, -22];

        let mut compressor = SequentialPointRecordCompressor::new(
            Cursor::new(Vec::<u8>::new()),
            IntegerFieldCompressor::<i32>::new().unwrap(),
        );
        compressor.compress_many(&first_chunk).unwrap();
        compressor.done().unwrap();
        let first_chunk_len = compressor.get_mut().get_ref().len();
        compressor.reset(IntegerFieldCompressor::<i32>::new().unwrap());
        compressor.compress_many(&second_chunk).unwrap();
        compressor.done().unwrap();
        let data = compressor.into_inner().into_inner();

        let mut decompressor = SequentialPointRecordDecompressor::new(
            Cursor::new(data),
            IntegerFieldDecompressor::<i32>::new().unwrap(),
        );
        assert_eq!(decompressor.decompress_many(4).unwrap(), first_chunk);
        // the decoder consumed the whole first chunk
        assert_eq!(decompressor.get_mut().position() as usize, first_chunk_len);
        decompressor.reset(IntegerFieldDecompressor::<i32>::new().unwrap());
        assert_eq!(decompressor.decompress_many(3).unwrap(), second_chunk);
    }

    #[test]
    fn test_missing_first_record() {
        let mut decompressor = SequentialPointRecordDecompressor::new(
            Cursor::new(vec![1u8, 2u8]),
            IntegerFieldDecompressor::<i32>::new().unwrap(),
        );
        assert!(matches!(
            decompressor.decompress_next(),
            Err(LazError::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_count_larger_than_the_stream() {
        let mut compressor = SequentialPointRecordCompressor::new(
            Cursor::new(Vec::<u8>::new()),
            IntegerFieldCompressor::<i32>::new().unwrap(),
        );
        compressor.compress_many(&[5, 8, 13]).unwrap();
        compressor.done().unwrap();

        let mut decompressor = SequentialPointRecordDecompressor::new(
            Cursor::new(compressor.into_inner().into_inner()),
            IntegerFieldDecompressor::<i32>::new().unwrap(),
        );
        assert!(matches!(
            decompressor.decompress_many(usize::MAX),
            Err(LazError::UnexpectedEndOfStream) | Err(LazError::CorruptedStream(_))
        ));
    }
}
