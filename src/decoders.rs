/*
===============================================================================

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

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
//                       ****************************                        -
//                        ARITHMETIC CODING EXAMPLES                         -
//                       ****************************                        -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// Fast arithmetic coding implementation                                     -
// -> 32-bit variables, 32-bit product, periodic updates, table decoding     -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// Version 1.00  -  April 25, 2004                                           -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
//                                  WARNING                                  -
//                                 =========                                 -
//                                                                           -
// The only purpose of this program is to demonstrate the basic principles   -
// of arithmetic coding. The original version of this code can be found in   -
// Digital Signal Compression: Principles and Practice                       -
// (Cambridge University Press, 2011, ISBN: 9780511984655)                   -
//                                                                           -
// Copyright (c) 2019 by Amir Said (said@ieee.org) &                         -
//                       William A. Pearlman (pearlw@ecse.rpi.edu)           -
//                                                                           -
// Redistribution and use in source and binary forms, with or without        -
// modification, are permitted provided that the following conditions are    -
// met:                                                                      -
//                                                                           -
// 1. Redistributions of source code must retain the above copyright notice, -
// this list of conditions and the following disclaimer.                     -
//                                                                           -
// 2. Redistributions in binary form must reproduce the above copyright      -
// notice, this list of conditions and the following disclaimer in the       -
// documentation and/or other materials provided with the distribution.      -
//                                                                           -
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS       -
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED -
// TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A           -
// PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER -
// OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,  -
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,       -
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR        -
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF    -
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING      -
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS        -
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.              -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// A description of the arithmetic coding method used here is available in   -
//                                                                           -
// Lossless Compression Handbook, ed. K. Sayood                              -
// Chapter 5: Arithmetic Coding (A. Said), pp. 101-152, Academic Press, 2003 -
//                                                                           -
// A. Said, Introduction to Arithetic Coding Theory and Practice             -
// HP Labs report HPL-2004-76  -  http://www.hpl.hp.com/techreports/         -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

//! Decoding side of the range coder.
//!
//! The decoder mirrors every interval update of the
//! [`ArithmeticEncoder`](crate::encoders::ArithmeticEncoder) and keeps
//! `value`, the distance between the coded number and the interval base.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::{LazError, Result};
use crate::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};

// maximum AC interval length
pub const AC_MAX_LENGTH: u32 = 0xFFFF_FFFF;
// threshold for renormalization
pub const AC_MIN_LENGTH: u32 = 0x0100_0000;

fn corrupted(reason: &'static str) -> LazError {
    tracing::warn!("arithmetic decoder desynchronized: {}", reason);
    LazError::CorruptedStream(reason)
}

pub struct ArithmeticDecoder<R: Read> {
    in_stream: R,
    value: u32,
    length: u32,
}

impl<R: Read> ArithmeticDecoder<R> {
    pub fn new(in_stream: R) -> Self {
        Self {
            in_stream,
            value: 0,
            length: AC_MAX_LENGTH,
        }
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.length = AC_MAX_LENGTH;
    }

    /// Reads the first 4 bytes of the coded stream.
    ///
    /// Must be called once before decoding anything, after any raw data
    /// that precedes the coded stream has been read from the input.
    pub fn read_init_bytes(&mut self) -> Result<()> {
        self.value = self
            .in_stream
            .read_u32::<BigEndian>()
            .map_err(LazError::from_input)?;
        Ok(())
    }

    pub fn decode_bit(&mut self, model: &mut ArithmeticBitModel) -> Result<u32> {
        // product l x p0
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);
        let bit = (self.value >= x) as u32;

        if bit == 0 {
            self.length = x;
        } else {
            self.value -= x;
            self.length -= x;
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        model.record(bit);
        Ok(bit)
    }

    pub fn decode_symbol(&mut self, model: &mut ArithmeticModel) -> Result<u32> {
        if self.value >= self.length {
            return Err(corrupted("value outside of the coding interval"));
        }

        let mut y = self.length;
        self.length >>= DM_LENGTH_SHIFT;

        let (sym, x) = if !model.decoder_table.is_empty() {
            // use table look-up for faster decoding
            let dv = self.value / self.length;
            let t = (dv >> model.table_shift) as usize;

            // initial decision based on table look-up
            let mut sym = model.decoder_table[t];
            let mut n = model.decoder_table[t + 1] + 1;

            // finish with bisection search
            while n > sym + 1 {
                let k = (sym + n) >> 1;
                if model.distribution[k as usize] > dv {
                    n = k;
                } else {
                    sym = k;
                }
            }

            // compute products
            if sym != model.last_symbol {
                y = model.distribution[sym as usize + 1] * self.length;
            }
            (sym, model.distribution[sym as usize] * self.length)
        } else {
            // decode using only multiplications
            let mut sym = 0u32;
            let mut x = 0u32;
            let mut n = model.symbols;
            let mut k = n >> 1;
            loop {
                let z = self.length * model.distribution[k as usize];
                if z > self.value {
                    // value is smaller
                    n = k;
                    y = z;
                } else {
                    // value is larger or equal
                    sym = k;
                    x = z;
                }
                k = (sym + n) >> 1;
                if k == sym {
                    break;
                }
            }
            (sym, x)
        };

        // update interval
        self.value -= x;
        self.length = y - x;
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        model.record(sym);
        Ok(sym)
    }

    /// Decodes a bit written without modelling
    pub fn read_bit(&mut self) -> Result<u32> {
        self.read_raw(1)
    }

    pub fn read_bits(&mut self, bits: u32) -> Result<u32> {
        debug_assert!(bits > 0 && bits <= 32);
        if bits > 19 {
            let lower = u32::from(self.read_short()?);
            let upper = self.read_raw(bits - 16)?;
            Ok(upper << 16 | lower)
        } else {
            self.read_raw(bits)
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_raw(8)? as u8)
    }

    pub fn read_short(&mut self) -> Result<u16> {
        Ok(self.read_raw(16)? as u16)
    }

    pub fn read_int(&mut self) -> Result<u32> {
        let lower = u32::from(self.read_short()?);
        let upper = u32::from(self.read_short()?);
        Ok(upper << 16 | lower)
    }

    pub fn read_int_64(&mut self) -> Result<u64> {
        let lower = u64::from(self.read_int()?);
        let upper = u64::from(self.read_int()?);
        Ok(upper << 32 | lower)
    }

    pub fn in_stream(&mut self) -> &mut R {
        &mut self.in_stream
    }

    pub fn into_stream(self) -> R {
        self.in_stream
    }

    #[inline]
    fn read_raw(&mut self, bits: u32) -> Result<u32> {
        debug_assert!(bits <= 19);
        // decode symbol, change length
        self.length >>= bits;
        let sym = self.value / self.length;
        if sym >> bits != 0 {
            return Err(corrupted("raw value wider than requested"));
        }
        // update interval
        self.value -= self.length * sym;
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        Ok(sym)
    }

    fn renorm_dec_interval(&mut self) -> Result<()> {
        loop {
            let byte = self.in_stream.read_u8().map_err(LazError::from_input)?;
            self.value = (self.value << 8) | u32::from(byte);
            // length multiplied by 256
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::encoders::ArithmeticEncoder;
    use crate::models::ArithmeticModelBuilder;

    fn symbols() -> impl Iterator<Item = u32> {
        (0..3_000u32).map(|i| (i * i + 3 * i) % 97 % 40)
    }

    #[test]
    fn test_symbols_and_bits() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut model = ArithmeticModelBuilder::new(40)
            .for_compression()
            .build()
            .unwrap();
        let mut bit_model = ArithmeticBitModel::new();
        for sym in symbols() {
            encoder.encode_symbol(&mut model, sym).unwrap();
            encoder.encode_bit(&mut bit_model, sym & 1).unwrap();
            encoder.write_bits(6 + sym % 14, sym).unwrap();
        }
        encoder.write_bits(32, 0xDEAD_BEEF).unwrap();
        encoder.write_int64(0x0123_4567_89AB_CDEF).unwrap();
        encoder.write_byte(0xAB).unwrap();
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(encoder.into_stream());
        decoder.in_stream().set_position(0);
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(40).build().unwrap();
        let mut bit_model = ArithmeticBitModel::new();
        for sym in symbols() {
            assert_eq!(decoder.decode_symbol(&mut model).unwrap(), sym);
            assert_eq!(decoder.decode_bit(&mut bit_model).unwrap(), sym & 1);
            assert_eq!(decoder.read_bits(6 + sym % 14).unwrap(), sym);
        }
        assert_eq!(decoder.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(decoder.read_int_64().unwrap(), 0x0123_4567_89AB_CDEF);
        assert_eq!(decoder.read_byte().unwrap(), 0xAB);
    }

    #[test]
    fn test_decoder_consumes_exactly_the_encoded_bytes() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut model = ArithmeticModelBuilder::new(40)
            .for_compression()
            .build()
            .unwrap();
        for sym in symbols() {
            encoder.encode_symbol(&mut model, sym).unwrap();
        }
        encoder.done().unwrap();
        let data = encoder.into_stream().into_inner();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(&data[..]));
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(40).build().unwrap();
        for sym in symbols() {
            assert_eq!(decoder.decode_symbol(&mut model).unwrap(), sym);
        }
        assert_eq!(decoder.in_stream().position() as usize, data.len());

        let truncated = &data[..data.len() - 1];
        let mut decoder = ArithmeticDecoder::new(Cursor::new(truncated));
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(40).build().unwrap();
        let result = symbols().try_for_each(|_| decoder.decode_symbol(&mut model).map(|_| ()));
        assert!(matches!(result, Err(LazError::UnexpectedEndOfStream)));
    }

    #[test]
    fn test_missing_init_bytes() {
        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0u8, 1u8]));
        assert!(matches!(
            decoder.read_init_bytes(),
            Err(LazError::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_value_outside_interval_is_detected() {
        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0xFFu8; 16]));
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(64).build().unwrap();
        assert!(matches!(
            decoder.decode_symbol(&mut model),
            Err(LazError::CorruptedStream(_))
        ));
    }
}
