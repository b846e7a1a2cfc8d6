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
    terms of the Apache Public License 2.0 published by the Apache Software
    Foundation. See the COPYING file for more information.

    This software is distributed WITHOUT ANY WARRANTY and without even the
    implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

  CHANGE HISTORY:
    6 June 2019: Translated to Rust
===============================================================================
*/


//! Predictors and context tables shared by the point codecs.

use num_traits::Zero;

use crate::errors::{LazError, Result};

/// Approximate median of the last five values added.
///
/// The five values are kept sorted, each insertion evicts either the largest
/// or the smallest one, alternating depending on which side the previous
/// value went to. This is not an exact sliding median, but it is what LASzip
/// streams are coded with.
#[derive(Debug, Copy, Clone)]
pub struct StreamingMedian<T: Zero + Copy + PartialOrd> {
    values: [T; 5],
    high: bool,
}

impl<T: Zero + Copy + PartialOrd> StreamingMedian<T> {
    pub fn new() -> Self {
        Self {
            values: [T::zero(); 5],
            high: true,
        }
    }

    /// Forgets every value, the median is back to zero.
    pub fn init(&mut self) {
        *self = Self::new();
    }

    pub fn add(&mut self, v: T) {
        let values = &mut self.values;
        if self.high {
            if v < values[2] {
                // drop the largest, v goes into the lower half
                values[4] = values[3];
                values[3] = values[2];
                if v < values[0] {
                    values[2] = values[1];
                    values[1] = values[0];
                    values[0] = v;
                } else if v < values[1] {
                    values[2] = values[1];
                    values[1] = v;
                } else {
                    values[2] = v;
                }
            } else {
                if v < values[3] {
                    values[4] = values[3];
                    values[3] = v;
                } else {
                    values[4] = v;
                }
                self.high = false;
            }
        } else if values[2] < v {
            // drop the smallest, v goes into the upper half
            values[0] = values[1];
            values[1] = values[2];
            if values[4] < v {
                values[2] = values[3];
                values[3] = values[4];
                values[4] = v;
            } else if values[3] < v {
                values[2] = values[3];
                values[3] = v;
            } else {
                values[2] = v;
            }
        } else {
            if values[1] < v {
                values[0] = values[1];
                values[1] = v;
            } else {
                values[0] = v;
            }
            self.high = true;
        }
    }

    pub fn get(&self) -> T {
        self.values[2]
    }
}

impl<T: Zero + Copy + PartialOrd> Default for StreamingMedian<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the lowest bit, used to pair up contexts.
#[inline]
pub(crate) fn u32_zero_bit(n: u32) -> u32 {
    n & 0xFF_FF_FF_FEu32
}

// for LAS files with the return (r) and the number (n) of
// returns field correctly populated the mapping should really
// be only the following.
//  { 15, 15, 15, 15, 15, 15, 15, 15 },
//  { 15,  0, 15, 15, 15, 15, 15, 15 },
//  { 15,  1,  2, 15, 15, 15, 15, 15 },
//  { 15,  3,  4,  5, 15, 15, 15, 15 },
//  { 15,  6,  7,  8,  9, 15, 15, 15 },
//  { 15, 10, 11, 12, 13, 14, 15, 15 },
//  { 15, 15, 15, 15, 15, 15, 15, 15 },
//  { 15, 15, 15, 15, 15, 15, 15, 15 }
// however, some files start the numbering of r and n with 0,
// only have return counts r, or only have number of return
// counts n, or mix up the position of r and n. we therefore
// "complete" the table to also map those "undesired" r & n
// combinations to different contexts
pub const NUMBER_RETURN_MAP: [[u8; 8]; 8] = [
    [15, 14, 13, 12, 11, 10, 9, 8],
    [14, 0, 1, 3, 6, 10, 10, 9],
    [13, 1, 2, 4, 7, 11, 11, 10],
    [12, 3, 4, 5, 8, 12, 12, 11],
    [11, 6, 7, 8, 9, 13, 13, 12],
    [10, 10, 11, 12, 13, 14, 14, 13],
    [9, 10, 11, 12, 13, 14, 15, 14],
    [8, 9, 10, 11, 12, 13, 14, 15],
];

// the level of penetration of a return, n - r when both are
// valid, completed like the map above for the other combinations
pub const NUMBER_RETURN_LEVEL: [[u8; 8]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7],
    [1, 0, 1, 2, 3, 4, 5, 6],
    [2, 1, 0, 1, 2, 3, 4, 5],
    [3, 2, 1, 0, 1, 2, 3, 4],
    [4, 3, 2, 1, 0, 1, 2, 3],
    [5, 4, 3, 2, 1, 0, 1, 2],
    [6, 5, 4, 3, 2, 1, 0, 1],
    [7, 6, 5, 4, 3, 2, 1, 0],
];

/// Returns the `(m, l)` contexts of a point: its entries in
/// [`NUMBER_RETURN_MAP`] and [`NUMBER_RETURN_LEVEL`].
#[inline]
pub fn return_contexts(number_of_returns: u8, return_number: u8) -> Result<(usize, usize)> {
    let n = number_of_returns as usize;
    let r = return_number as usize;
    match (
        NUMBER_RETURN_MAP.get(n).and_then(|row| row.get(r)),
        NUMBER_RETURN_LEVEL.get(n).and_then(|row| row.get(r)),
    ) {
        (Some(&m), Some(&l)) => Ok((m as usize, l as usize)),
        _ => Err(LazError::InvalidReturnFields {
            return_number,
            number_of_returns,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_defaults_to_zero() {
        let median = StreamingMedian::<i32>::new();
        assert_eq!(median.get(), 0);
    }

    #[test]
    fn test_median_of_constant_window() {
        let mut median = StreamingMedian::<i32>::new();
        for _ in 0..5 {
            median.add(42);
        }
        assert_eq!(median.get(), 42);

        median.init();
        assert_eq!(median.get(), 0);
    }

    #[test]
    fn test_median_of_increasing_values() {
        let mut median = StreamingMedian::<i32>::new();
        for v in 1..=5 {
            median.add(v);
        }
        assert_eq!(median.get(), 3);
        for v in 6..=100 {
            median.add(v);
            assert_eq!(median.get(), v - 2);
        }
    }

    #[test]
    fn test_median_follows_negative_values() {
        let mut median = StreamingMedian::<i32>::new();
        for v in &[-10, -20, -30, -40, -50] {
            median.add(*v);
        }
        assert!(median.get() < 0);
    }

    #[test]
    fn test_return_map_on_valid_returns() {
        let expected_m: [&[u8]; 5] = [&[0], &[1, 2], &[3, 4, 5], &[6, 7, 8, 9], &[10, 11, 12, 13, 14]];
        for (i, row) in expected_m.iter().enumerate() {
            let n = i + 1;
            for (j, &m) in row.iter().enumerate() {
                let r = j + 1;
                assert_eq!(NUMBER_RETURN_MAP[n][r], m);
                assert_eq!(NUMBER_RETURN_LEVEL[n][r] as usize, n - r);
            }
        }
    }

    #[test]
    fn test_tables_cover_all_cells() {
        // number_return_map of LASzip's laszip_common_v2.hpp, row n, column r,
        // flattened
        #[rustfmt::skip]
        let laszip_map: [u8; 64] = [
            15, 14, 13, 12, 11, 10,  9,  8,
            14,  0,  1,  3,  6, 10, 10,  9,
            13,  1,  2,  4,  7, 11, 11, 10,
            12,  3,  4,  5,  8, 12, 12, 11,
            11,  6,  7,  8,  9, 13, 13, 12,
            10, 10, 11, 12, 13, 14, 14, 13,
             9, 10, 11, 12, 13, 14, 15, 14,
             8,  9, 10, 11, 12, 13, 14, 15,
        ];
        for n in 0..8u8 {
            for r in 0..8u8 {
                let (m, l) = return_contexts(n, r).unwrap();
                assert_eq!(m, usize::from(laszip_map[usize::from(n) * 8 + usize::from(r)]));
                assert_eq!(l, (i32::from(n) - i32::from(r)).abs() as usize);
            }
        }
    }

    #[test]
    fn test_return_contexts_out_of_range() {
        assert!(matches!(
            return_contexts(8, 1),
            Err(LazError::InvalidReturnFields {
                return_number: 1,
                number_of_returns: 8
            })
        ));
        assert!(return_contexts(1, 9).is_err());
    }
}
