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

//! Encoding side of the range coder.
//!
//! The interval is kept as a 32-bit `base` and `length`; a byte of `base` is
//! shifted out every time `length` falls under [`AC_MIN_LENGTH`].

use std::io::Write;

use crate::decoders::{AC_MAX_LENGTH, AC_MIN_LENGTH};
use crate::errors::Result;
use crate::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};

// Bytes already produced stay in memory until at least this many newer bytes
// exist, a carry can still reach them until then.
const AC_BUFFER_SIZE: usize = 1024;

pub struct ArithmeticEncoder<W: Write> {
    pending: Vec<u8>,
    base: u32,
    length: u32,
    out_stream: W,
}

impl<W: Write> ArithmeticEncoder<W> {
    pub fn new(out_stream: W) -> Self {
        Self {
            pending: Vec::with_capacity(2 * AC_BUFFER_SIZE),
            base: 0,
            length: AC_MAX_LENGTH,
            out_stream,
        }
    }

    /// Puts the encoder back in its initial state, bytes not yet written
    /// by [`done`](Self::done) are discarded.
    pub fn reset(&mut self) {
        self.base = 0;
        self.length = AC_MAX_LENGTH;
        self.pending.clear();
    }

    /// Terminates the stream: writes the bytes needed to identify the final
    /// interval and everything still held back.
    ///
    /// A decoder reading the stream consumes exactly the bytes produced here,
    /// no more, no less.
    pub fn done(&mut self) -> Result<()> {
        let init_base = self.base;
        let another_byte = if self.length > 2 * AC_MIN_LENGTH {
            // base offset, set new length for 1 more byte
            self.base = self.base.wrapping_add(AC_MIN_LENGTH);
            self.length = AC_MIN_LENGTH >> 1;
            true
        } else {
            // base offset, set new length for 2 more bytes
            self.base = self.base.wrapping_add(AC_MIN_LENGTH >> 1);
            self.length = AC_MIN_LENGTH >> 9;
            false
        };

        if init_base > self.base {
            self.propagate_carry();
        }
        self.renorm_enc_interval()?;

        self.pending.extend_from_slice(&[0u8, 0u8]);
        if another_byte {
            self.pending.push(0u8);
        }
        self.out_stream.write_all(&self.pending)?;
        self.pending.clear();
        Ok(())
    }

    pub fn encode_bit(&mut self, model: &mut ArithmeticBitModel, bit: u32) -> Result<()> {
        debug_assert!(bit <= 1);
        // product l x p0
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);

        if bit == 0 {
            self.length = x;
        } else {
            let init_base = self.base;
            self.base = self.base.wrapping_add(x);
            self.length -= x;
            // overflow = carry
            if init_base > self.base {
                self.propagate_carry();
            }
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        model.record(bit);
        Ok(())
    }

    pub fn encode_symbol(&mut self, model: &mut ArithmeticModel, sym: u32) -> Result<()> {
        debug_assert!(sym <= model.last_symbol);
        let init_base = self.base;

        if sym == model.last_symbol {
            // the last symbol takes whatever is left of the interval
            let x = model.distribution[sym as usize] * (self.length >> DM_LENGTH_SHIFT);
            self.base = self.base.wrapping_add(x);
            self.length -= x;
        } else {
            self.length >>= DM_LENGTH_SHIFT;
            let x = model.distribution[sym as usize] * self.length;
            self.base = self.base.wrapping_add(x);
            self.length = model.distribution[sym as usize + 1] * self.length - x;
        }

        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        model.record(sym);
        Ok(())
    }

    /// Encodes a bit without modelling
    pub fn write_bit(&mut self, bit: u32) -> Result<()> {
        debug_assert!(bit <= 1);
        self.write_raw(1, bit)
    }

    /// Encodes the `bits` lower bits of `sym` without modelling.
    pub fn write_bits(&mut self, mut bits: u32, mut sym: u32) -> Result<()> {
        debug_assert!(bits > 0 && bits <= 32);
        debug_assert!(bits == 32 || sym < (1u32 << bits));

        if bits > 19 {
            self.write_short((sym & 0xFFFF) as u16)?;
            sym >>= 16;
            bits -= 16;
        }
        self.write_raw(bits, sym)
    }

    pub fn write_byte(&mut self, sym: u8) -> Result<()> {
        self.write_raw(8, u32::from(sym))
    }

    pub fn write_short(&mut self, sym: u16) -> Result<()> {
        self.write_raw(16, u32::from(sym))
    }

    pub fn write_int(&mut self, sym: u32) -> Result<()> {
        // lower 16 bits
        self.write_short((sym & 0xFFFF) as u16)?;
        // upper 16 bits
        self.write_short((sym >> 16) as u16)
    }

    pub fn write_int64(&mut self, sym: u64) -> Result<()> {
        // lower 32 bits
        self.write_int((sym & 0xFFFF_FFFF) as u32)?;
        // upper 32 bits
        self.write_int((sym >> 32) as u32)
    }

    /// The stream the encoder writes to.
    ///
    /// Writing to it directly is only valid when no coded byte is
    /// pending, i.e. right after creation, a [`reset`](Self::reset) or a
    /// [`done`](Self::done).
    pub fn out_stream(&mut self) -> &mut W {
        &mut self.out_stream
    }

    pub fn into_stream(self) -> W {
        self.out_stream
    }

    #[inline]
    fn write_raw(&mut self, bits: u32, sym: u32) -> Result<()> {
        let init_base = self.base;
        // new interval base and length
        self.length >>= bits;
        self.base = self.base.wrapping_add(sym * self.length);

        // overflow = carry
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    fn propagate_carry(&mut self) {
        for byte in self.pending.iter_mut().rev() {
            if *byte == 0xFF {
                *byte = 0;
            } else {
                *byte += 1;
                return;
            }
        }
        debug_assert!(false, "carry propagated past the held back bytes");
    }

    fn renorm_enc_interval(&mut self) -> Result<()> {
        loop {
            self.pending.push((self.base >> 24) as u8);
            self.base <<= 8;
            // length multiplied by 256
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        if self.pending.len() >= 2 * AC_BUFFER_SIZE {
            self.out_stream.write_all(&self.pending[..AC_BUFFER_SIZE])?;
            self.pending.drain(..AC_BUFFER_SIZE);
        }
        Ok(())
    }
}
