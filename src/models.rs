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

//! Adaptive probability models driving the arithmetic coder.
//!
//! Both models only change state when a symbol is coded, and they change it
//! the same way on both sides, which is what keeps an encoder and a decoder in
//! sync without ever transmitting a model.

use crate::errors::{LazError, Result};

// length bits discarded before mult.
pub const DM_LENGTH_SHIFT: u32 = 15;
// for adaptive models
pub const DM_MAX_COUNT: u32 = 1 << DM_LENGTH_SHIFT;

// length bits discarded before mult.
pub const BM_LENGTH_SHIFT: u32 = 13;
// for adaptive models
pub const BM_MAX_COUNT: u32 = 1 << BM_LENGTH_SHIFT;

const MIN_SYMBOLS: u32 = 2;
const MAX_SYMBOLS: u32 = 1 << 11;

/// Adaptive frequency table over `symbols` symbols.
///
/// Counts start at 1 (uniform prior), every coded symbol adds one to its count
/// and the cumulative distribution is only recomputed every `update_cycle`
/// symbols. Counts are halved (rounding up, so never to 0) once the total goes
/// above [`DM_MAX_COUNT`].
#[derive(Debug, Clone)]
pub struct ArithmeticModel {
    pub(crate) symbols: u32,
    compress: bool,

    pub(crate) distribution: Vec<u32>,
    symbol_count: Vec<u32>,
    pub(crate) decoder_table: Vec<u32>,

    total_count: u32,
    update_cycle: u32,
    symbols_until_update: u32,
    pub(crate) last_symbol: u32,
    table_size: u32,
    pub(crate) table_shift: u32,
}

impl ArithmeticModel {
    /// Creates a model with uniform counts.
    ///
    /// `compress` models skip the decoder lookup table, which only speeds up
    /// decoding; both kinds produce the same distribution.
    pub fn new(symbols: u32, compress: bool) -> Result<Self> {
        if symbols < MIN_SYMBOLS || symbols > MAX_SYMBOLS {
            return Err(LazError::InvalidSymbolCount(symbols));
        }
        let (table_size, table_shift) = if !compress && symbols > 16 {
            let mut table_bits = 3u32;
            while symbols > (1u32 << (table_bits + 2)) {
                table_bits += 1;
            }
            (1u32 << table_bits, DM_LENGTH_SHIFT - table_bits)
        } else {
            (0, 0)
        };

        let mut model = Self {
            symbols,
            compress,
            distribution: vec![0u32; symbols as usize],
            symbol_count: vec![1u32; symbols as usize],
            decoder_table: if table_size > 0 {
                vec![0u32; (table_size + 2) as usize]
            } else {
                Vec::new()
            },
            // the first update brings it to `symbols`
            total_count: 0,
            update_cycle: symbols,
            symbols_until_update: 0,
            last_symbol: symbols - 1,
            table_size,
            table_shift,
        };
        model.update();
        model.update_cycle = (symbols + 6) >> 1;
        model.symbols_until_update = model.update_cycle;
        Ok(model)
    }

    pub fn symbols(&self) -> u32 {
        self.symbols
    }

    /// Sum of the counts as of the last distribution update.
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn symbol_count(&self, symbol: u32) -> u32 {
        self.symbol_count[symbol as usize]
    }

    /// Start of the symbol's interval, scaled to `1 << DM_LENGTH_SHIFT`.
    pub fn cumulative_frequency(&self, symbol: u32) -> u32 {
        self.distribution[symbol as usize]
    }

    /// Records that `symbol` was just coded.
    #[inline]
    pub(crate) fn record(&mut self, symbol: u32) {
        self.symbol_count[symbol as usize] += 1;
        self.symbols_until_update -= 1;
        if self.symbols_until_update == 0 {
            self.update();
        }
    }

    fn update(&mut self) {
        // halve counts when a threshold is reached
        self.total_count += self.update_cycle;
        if self.total_count > DM_MAX_COUNT {
            self.total_count = 0;
            for count in &mut self.symbol_count {
                *count = (*count + 1) >> 1;
                self.total_count += *count;
            }
        }

        // compute cumulative distribution, decoder table
        let scale = 0x8000_0000u32 / self.total_count;
        let mut sum = 0u32;
        if self.compress || self.table_size == 0 {
            for (dist, count) in self.distribution.iter_mut().zip(&self.symbol_count) {
                *dist = (scale * sum) >> (31 - DM_LENGTH_SHIFT);
                sum += *count;
            }
        } else {
            let mut s = 0usize;
            for (k, (dist, count)) in self
                .distribution
                .iter_mut()
                .zip(&self.symbol_count)
                .enumerate()
            {
                *dist = (scale * sum) >> (31 - DM_LENGTH_SHIFT);
                sum += *count;
                let w = (*dist >> self.table_shift) as usize;
                while s < w {
                    s += 1;
                    self.decoder_table[s] = k as u32 - 1;
                }
            }
            self.decoder_table[0] = 0;
            while s <= self.table_size as usize {
                s += 1;
                self.decoder_table[s] = self.symbols - 1;
            }
        }

        // set frequency of model updates
        self.update_cycle = (5 * self.update_cycle) >> 2;
        let max_cycle = (self.symbols + 6) << 3;
        if self.update_cycle > max_cycle {
            self.update_cycle = max_cycle;
        }
        self.symbols_until_update = self.update_cycle;
    }
}

/// Two symbol model, cheaper than an [`ArithmeticModel`] with 2 symbols.
///
/// Only the probability of a 0 is tracked, with [`BM_LENGTH_SHIFT`] bits of
/// precision.
#[derive(Debug, Clone)]
pub struct ArithmeticBitModel {
    bit_0_count: u32,
    bit_count: u32,
    pub(crate) bit_0_prob: u32,
    bits_until_update: u32,
    update_cycle: u32,
}

impl ArithmeticBitModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability of a 0, scaled to `1 << BM_LENGTH_SHIFT`.
    pub fn bit_0_probability(&self) -> u32 {
        self.bit_0_prob
    }

    #[inline]
    pub(crate) fn record(&mut self, bit: u32) {
        if bit == 0 {
            self.bit_0_count += 1;
        }
        self.bits_until_update -= 1;
        if self.bits_until_update == 0 {
            self.update();
        }
    }

    fn update(&mut self) {
        // halve counts when a threshold is reached
        self.bit_count += self.update_cycle;
        if self.bit_count > BM_MAX_COUNT {
            self.bit_count = (self.bit_count + 1) >> 1;
            self.bit_0_count = (self.bit_0_count + 1) >> 1;
            if self.bit_0_count == self.bit_count {
                self.bit_count += 1;
            }
        }

        // compute scaled bit 0 probability
        let scale = 0x8000_0000u32 / self.bit_count;
        self.bit_0_prob = (self.bit_0_count * scale) >> (31 - BM_LENGTH_SHIFT);

        // set frequency of model updates
        self.update_cycle = (5 * self.update_cycle) >> 2;
        if self.update_cycle > 64 {
            self.update_cycle = 64;
        }
        self.bits_until_update = self.update_cycle;
    }
}

impl Default for ArithmeticBitModel {
    fn default() -> Self {
        // initialization to equiprobable model
        Self {
            bit_0_count: 1,
            bit_count: 2,
            bit_0_prob: 1u32 << (BM_LENGTH_SHIFT - 1),
            // start with frequent updates
            bits_until_update: 4,
            update_cycle: 4,
        }
    }
}

pub struct ArithmeticModelBuilder {
    symbols: u32,
    compress: bool,
}

impl ArithmeticModelBuilder {
    pub fn new(symbols: u32) -> Self {
        Self {
            symbols,
            compress: false,
        }
    }

    /// The model will only be used to encode, no decoder table is built.
    pub fn for_compression(mut self) -> Self {
        self.compress = true;
        self
    }

    pub fn build(self) -> Result<ArithmeticModel> {
        ArithmeticModel::new(self.symbols, self.compress)
    }

    /// Builds `n` independent models with the same parameters.
    pub fn build_many(self, n: usize) -> Result<Vec<ArithmeticModel>> {
        (0..n)
            .map(|_| ArithmeticModel::new(self.symbols, self.compress))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_count_bounds() {
        assert!(matches!(
            ArithmeticModel::new(1, false),
            Err(LazError::InvalidSymbolCount(1))
        ));
        assert!(matches!(
            ArithmeticModel::new(2049, true),
            Err(LazError::InvalidSymbolCount(2049))
        ));
        assert!(ArithmeticModel::new(2, false).is_ok());
        assert!(ArithmeticModel::new(2048, false).is_ok());
    }

    #[test]
    fn test_initial_distribution_is_uniform() {
        let model = ArithmeticModelBuilder::new(4).build().unwrap();
        assert_eq!(model.total_count(), 4);
        let quarter = DM_MAX_COUNT / 4;
        for sym in 0..4 {
            assert_eq!(model.symbol_count(sym), 1);
            assert_eq!(model.cumulative_frequency(sym), sym * quarter);
        }
    }

    #[test]
    fn test_compress_and_decompress_models_agree() {
        let mut enc_model = ArithmeticModelBuilder::new(64)
            .for_compression()
            .build()
            .unwrap();
        let mut dec_model = ArithmeticModelBuilder::new(64).build().unwrap();
        assert!(enc_model.decoder_table.is_empty());
        assert!(!dec_model.decoder_table.is_empty());

        for i in 0..5_000u32 {
            let sym = (i * 7 + i / 13) % 64;
            enc_model.record(sym);
            dec_model.record(sym);
        }
        assert_eq!(enc_model.distribution, dec_model.distribution);
        assert_eq!(enc_model.total_count(), dec_model.total_count());
    }

    #[test]
    fn test_rescale_keeps_invariants() {
        let mut model = ArithmeticModelBuilder::new(256).build().unwrap();
        // heavily skewed so that the rescale happens many times
        for i in 0..200_000u32 {
            let sym = if i % 10 == 0 { i % 256 } else { 3 };
            model.record(sym);
            assert!(model.total_count() <= DM_MAX_COUNT);
        }
        for sym in 0..256 {
            assert!(model.symbol_count(sym) > 0);
        }
        assert!(model.cumulative_frequency(4) > model.cumulative_frequency(3));
    }

    #[test]
    fn test_bit_model_adapts() {
        let mut model = ArithmeticBitModel::new();
        assert_eq!(model.bit_0_probability(), 1 << (BM_LENGTH_SHIFT - 1));
        for _ in 0..1_000 {
            model.record(0);
        }
        assert!(model.bit_0_probability() > 1 << (BM_LENGTH_SHIFT - 1));
        assert!(model.bit_0_probability() < BM_MAX_COUNT);

        for _ in 0..10_000 {
            model.record(1);
        }
        assert!(model.bit_0_probability() < 1 << (BM_LENGTH_SHIFT - 1));
        assert!(model.bit_0_probability() > 0);
    }
}
