/*
===============================================================================

  CONTENTS:
    Integer compressor

  PROGRAMMERS:

    martin.isenburg@rapidlasso.com  -  http://rapidlasso.com
    uday.karan@gmail.com - Hobu, Inc.

  COPYRIGHT:

    (c) 2007-2014, martin isenburg, rapidlasso - tools to catch reality
    (c) 2014, Uday Verma, Hobu, Inc.
    (c) 2019, Thomas Montaigu

    This is free software; you can redistribute and/or modify it under the
    terms of the Apache Public License 2.0 published by the Apache Software
    Foundation. See the COPYING file for more information.

    This software is distributed WITHOUT ANY WARRANTY and without even the
    implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

  CHANGE HISTORY:
    6 June 2019: Translated to Rust

===============================================================================
*/

//! Compression of integers relative to a prediction.
//!
//! What gets coded is the corrector `real - pred`: first `k`, the number of
//! bits needed to represent it, with a model chosen by the caller's context,
//! then the corrector within its `k` bit interval.

use std::io::Write;

use crate::encoders::ArithmeticEncoder;
use crate::errors::{LazError, Result};
use crate::models::{ArithmeticBitModel, ArithmeticModel, ArithmeticModelBuilder};

pub const DEFAULT_BITS: u32 = 16;
pub const DEFAULT_CONTEXTS: u32 = 1;
pub const DEFAULT_BITS_HIGH: u32 = 8;
pub const DEFAULT_RANGE: u32 = 0;

// a corrector model for k > bits_high has 2^bits_high symbols
const MAX_BITS_HIGH: u32 = 11;

/// The interval a corrector is folded into before being coded.
#[derive(Debug, Copy, Clone)]
pub(crate) struct CorrectorRange {
    pub(crate) bits: u32,
    pub(crate) range: u32,
    pub(crate) min: i32,
    pub(crate) max: i32,
}

impl CorrectorRange {
    pub(crate) fn new(bits: u32, range: u32) -> Self {
        if range != 0 {
            // the corrector's significant bits and range
            let mut corr_bits = 32 - range.leading_zeros();
            if range == 1u32 << (corr_bits - 1) {
                corr_bits -= 1;
            }
            let min = -((range / 2) as i32);
            Self {
                bits: corr_bits,
                range,
                min,
                max: min.wrapping_add((range - 1) as i32),
            }
        } else if bits < 32 {
            let range = 1u32 << bits;
            let min = -((range / 2) as i32);
            Self {
                bits,
                range,
                min,
                max: min + (range - 1) as i32,
            }
        } else {
            Self {
                bits: 32,
                range: 0,
                min: std::i32::MIN,
                max: std::i32::MAX,
            }
        }
    }

    /// Folds `corr` into `[min, max]`
    #[inline]
    pub(crate) fn fold(&self, corr: i32) -> i32 {
        if corr < self.min {
            corr.wrapping_add(self.range as i32)
        } else if corr > self.max {
            corr.wrapping_sub(self.range as i32)
        } else {
            corr
        }
    }

    /// Brings a reconstructed value back into `[0, range)` when the
    /// corrector was folded.
    #[inline]
    pub(crate) fn unfold(&self, real: i32) -> i32 {
        if self.range == 0 {
            return real;
        }
        let range = i64::from(self.range);
        let real = i64::from(real);
        if real < 0 {
            (real + range) as i32
        } else if real >= range {
            (real - range) as i32
        } else {
            real as i32
        }
    }
}

/// Models shared by the compressor and decompressor, they must be built
/// identically on both sides.
pub(crate) struct CorrectorModels {
    pub(crate) m_bits: Vec<ArithmeticModel>,
    pub(crate) m_corrector_0: ArithmeticBitModel,
    pub(crate) m_corrector: Vec<ArithmeticModel>,
}

impl CorrectorModels {
    pub(crate) fn new(
        corr: &CorrectorRange,
        contexts: u32,
        bits_high: u32,
        compress: bool,
    ) -> Result<Self> {
        let model = |symbols: u32| {
            let builder = ArithmeticModelBuilder::new(symbols);
            if compress {
                builder.for_compression().build()
            } else {
                builder.build()
            }
        };

        let m_bits = (0..contexts)
            .map(|_| model(corr.bits + 1))
            .collect::<Result<Vec<_>>>()?;
        let m_corrector = (1..=corr.bits)
            .map(|i| model(1u32 << i.min(bits_high)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            m_bits,
            m_corrector_0: ArithmeticBitModel::new(),
            m_corrector,
        })
    }
}

pub(crate) fn check_parameters(bits: u32, contexts: u32, bits_high: u32) -> Result<()> {
    if bits == 0 || bits > 32 || contexts == 0 || bits_high == 0 || bits_high > MAX_BITS_HIGH {
        Err(LazError::InvalidIntegerCompressor {
            bits,
            contexts,
            bits_high,
        })
    } else {
        Ok(())
    }
}

/// Number of bits `k` of the tightest interval `[-(2^k - 1), 2^k]`
/// containing `corr`.
#[inline]
pub(crate) fn corrector_bits(corr: i32) -> u32 {
    // absolute value of c, adjusted for the case that c is 2^k
    let c1 = if corr <= 0 {
        corr.wrapping_neg() as u32
    } else {
        (corr - 1) as u32
    };
    32 - c1.leading_zeros()
}

pub struct IntegerCompressor {
    k: u32,
    contexts: u32,
    bits_high: u32,
    corr: CorrectorRange,
    models: CorrectorModels,
}

impl IntegerCompressor {
    pub fn new(bits: u32, contexts: u32, bits_high: u32, range: u32) -> Result<Self> {
        check_parameters(bits, contexts, bits_high)?;
        let corr = CorrectorRange::new(bits, range);
        Ok(Self {
            k: 0,
            contexts,
            bits_high,
            models: CorrectorModels::new(&corr, contexts, bits_high, true)?,
            corr,
        })
    }

    /// Number of bits of the last compressed corrector
    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn compress<W: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        pred: i32,
        real: i32,
        context: u32,
    ) -> Result<()> {
        let contexts = self.contexts;
        let m_bit = self
            .models
            .m_bits
            .get_mut(context as usize)
            .ok_or(LazError::ContextOutOfBounds { context, contexts })?;

        // the corrector will be within the interval [ - (corr_range - 1)  ...  + (corr_range - 1) ]
        // we fold it into the interval [ corr_min  ...  corr_max ]
        let c = self.corr.fold(real.wrapping_sub(pred));
        self.k = corrector_bits(c);

        // the number k is between 0 and corr_bits and describes the interval the corrector falls into
        encoder.encode_symbol(m_bit, self.k)?;

        if self.k == 0 {
            // then c is 0 or 1
            debug_assert!(c == 0 || c == 1);
            return encoder.encode_bit(&mut self.models.m_corrector_0, c as u32);
        }
        if self.k == 32 {
            // only i32::MIN needs 32 bits, nothing more to tell
            return Ok(());
        }

        // translate the corrector c into the k-bit interval [ 0 ... 2^k - 1 ]
        let c = if c >= 0 {
            // [ 2^(k-1) ... 2^k - 1 ]
            c.wrapping_sub(1)
        } else {
            // [ 0 ... 2^(k-1) - 1 ]
            c.wrapping_add(((1u32 << self.k) - 1) as i32)
        };
        let c = c as u32;

        let m_corrector = &mut self.models.m_corrector[(self.k - 1) as usize];
        if self.k <= self.bits_high {
            // for small k we code the interval in one step
            encoder.encode_symbol(m_corrector, c)
        } else {
            // for larger k we code the highest bits_high bits with the model
            // and the k1 lowest bits raw
            let k1 = self.k - self.bits_high;
            encoder.encode_symbol(m_corrector, c >> k1)?;
            encoder.write_bits(k1, c & ((1u32 << k1) - 1))
        }
    }
}

pub struct IntegerCompressorBuilder {
    bits: u32,
    contexts: u32,
    bits_high: u32,
    range: u32,
}

impl IntegerCompressorBuilder {
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

    pub fn build(&self) -> Result<IntegerCompressor> {
        IntegerCompressor::new(self.bits, self.contexts, self.bits_high, self.range)
    }
}

impl Default for IntegerCompressorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
