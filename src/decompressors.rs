/*
===============================================================================

  CONTENTS:
    Integer decompressor

  PROGRAMMERS:

    martin.isenburg@rapidlasso.com  -  http://rapidlasso.com
    uday.karan@gmail.com - Hobu, Inc.

  COPYRIGHT:

    (c) 2007-2014, martin isenburg, rapidlasso - tools to catch reality
    (c) 2014, Uday Verma, Hobu, Inc.
    (c) 2019, Thomas Montaigu

    This is free software; you can redistribute and/or modify it under the
    terms of the GNU Lesser General Licence as published by the Free Software
    Foundation. See the COPYING file for more information.

    This software is distributed WITHOUT ANY WARRANTY and without even the
    implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

  CHANGE HISTORY:
    6 June 2019: Translated to Rust

===============================================================================
*/

//! Decompression of integers relative to a prediction.

use std::io::Read;

use crate::compressors::{
    check_parameters, CorrectorModels, CorrectorRange, DEFAULT_BITS, DEFAULT_BITS_HIGH,
    DEFAULT_CONTEXTS, DEFAULT_RANGE,
};
use crate::decoders::ArithmeticDecoder;
use crate::errors::{LazError, Result};

/// Inverse of [`IntegerCompressor`](crate::compressors::IntegerCompressor).
///
/// Must be built with the same parameters as the compressor and fed the same
/// predictions and contexts, in the same order.
pub struct IntegerDecompressor {
    k: u32,
    contexts: u32,
    bits_high: u32,
    corr: CorrectorRange,
    models: CorrectorModels,
}

impl IntegerDecompressor {
    pub fn new(bits: u32, contexts: u32, bits_high: u32, range: u32) -> Result<Self> {
        check_parameters(bits, contexts, bits_high)?;
        let corr = CorrectorRange::new(bits, range);
        Ok(Self {
            k: 0,
            contexts,
            bits_high,
            models: CorrectorModels::new(&corr, contexts, bits_high, false)?,
            corr,
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn decompress<R: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<R>,
        pred: i32,
        context: u32,
    ) -> Result<i32> {
        let contexts = self.contexts;
        let m_bit = self
            .models
            .m_bits
            .get_mut(context as usize)
            .ok_or(LazError::ContextOutOfBounds { context, contexts })?;

        // decode within which interval the corrector is falling
        self.k = decoder.decode_symbol(m_bit)?;

        let corr = if self.k == 0 {
            decoder.decode_bit(&mut self.models.m_corrector_0)? as i32
        } else if self.k < 32 {
            let m_corrector = &mut self.models.m_corrector[(self.k - 1) as usize];
            let c = if self.k <= self.bits_high {
                decoder.decode_symbol(m_corrector)?
            } else {
                let k1 = self.k - self.bits_high;
                let high = decoder.decode_symbol(m_corrector)?;
                let low = decoder.read_bits(k1)?;
                (high << k1) | low
            };
            let c = c as i32;

            if c >= (1u32 << (self.k - 1)) as i32 {
                // [ 2^(k-1) ... 2^k - 1 ] back to [ 2^(k-1) + 1 ... 2^k ]
                c.wrapping_add(1)
            } else {
                // [ 0 ... 2^(k-1) - 1 ] back to [ -(2^k - 1) ... -(2^(k-1)) ]
                c.wrapping_sub(((1u32 << self.k) - 1) as i32)
            }
        } else {
            self.corr.min
        };

        Ok(self.corr.unfold(pred.wrapping_add(corr)))
    }
}

pub struct IntegerDecompressorBuilder {
    bits: u32,
    contexts: u32,
    bits_high: u32,
    range: u32,
}

impl IntegerDecompressorBuilder {
    pub fn new() -> Self {
        Self {
            bits: DEFAULT_BITS,
            contexts: DEFAULT_CONTEXTS,
            bits_high: DEFAULT_BITS_HIGH,
            range: DEFAULT_RANGE,
        }
    }

    pub fn bits(&mut self, bits: u32) -> &mut Self {
        self.bits = bits;
        self
    }

    pub fn contexts(&mut self, contexts: u32) -> &mut Self {
        self.contexts = contexts;
        self
    }

    pub fn bits_high(&mut self, bits_high: u32) -> &mut Self {
        self.bits_high = bits_high;
        self
    }

    pub fn range(&mut self, range: u32) -> &mut Self {
        self.range = range;
        self
    }

    pub fn build(&self) -> Result<IntegerDecompressor> {
        IntegerDecompressor::new(self.bits, self.contexts, self.bits_high, self.range)
    }
}

impl Default for IntegerDecompressorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::compressors::IntegerCompressorBuilder;
    use crate::encoders::ArithmeticEncoder;

    #[test]
    fn test_context_out_of_bounds() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut compressor = IntegerCompressorBuilder::new().build().unwrap();
        compressor.compress(&mut encoder, 0, 17, 0).unwrap();
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(encoder.into_stream().into_inner()));
        decoder.read_init_bytes().unwrap();
        let mut decompressor = IntegerDecompressorBuilder::new().build().unwrap();
        assert!(matches!(
            decompressor.decompress(&mut decoder, 0, 1),
            Err(LazError::ContextOutOfBounds {
                context: 1,
                contexts: 1
            })
        ));
        assert_eq!(decompressor.decompress(&mut decoder, 0, 0).unwrap(), 17);
    }

    #[test]
    fn test_large_corrector_uses_raw_low_bits() {
        let values = [123_456_789, -98_765_432, 1 << 30, 0, 7];
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut compressor = IntegerCompressorBuilder::new()
            .bits(32)
            .bits_high(4)
            .build()
            .unwrap();
        let mut pred = 0i32;
        for &value in &values {
            compressor.compress(&mut encoder, pred, value, 0).unwrap();
            pred = value;
        }
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(encoder.into_stream().into_inner()));
        decoder.read_init_bytes().unwrap();
        let mut decompressor = IntegerDecompressorBuilder::new()
            .bits(32)
            .bits_high(4)
            .build()
            .unwrap();
        let mut pred = 0i32;
        for &value in &values {
            pred = decompressor.decompress(&mut decoder, pred, 0).unwrap();
            assert_eq!(pred, value);
        }
    }

    #[test]
    fn test_truncated_stream() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut compressor = IntegerCompressorBuilder::new().bits(32).build().unwrap();
        for i in 0..100 {
            compressor
                .compress(&mut encoder, 0, i * 1_000_003, 0)
                .unwrap();
        }
        encoder.done().unwrap();
        let mut data = encoder.into_stream().into_inner();
        data.truncate(data.len() / 2);

        let mut decoder = ArithmeticDecoder::new(Cursor::new(data));
        decoder.read_init_bytes().unwrap();
        let mut decompressor = IntegerDecompressorBuilder::new().bits(32).build().unwrap();
        let result =
            (0..100).try_for_each(|_| decompressor.decompress(&mut decoder, 0, 0).map(|_| ()));
        assert!(matches!(result, Err(LazError::UnexpectedEndOfStream)));
    }
}
