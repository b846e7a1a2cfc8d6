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


//! The core fields of LAS point formats 0 to 5 (`POINT10` in LASzip).

use crate::packers::Packable;

#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub struct Point10 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,

    // 3 bits
    pub return_number: u8,
    // 3 bits
    pub number_of_returns_of_given_pulse: u8,
    // 1 bit
    pub scan_direction_flag: bool,
    // 1 bit
    pub edge_of_flight_line: bool,

    // 5 bits for classification the rest are bit flags
    pub classification: u8,

    pub scan_angle_rank: i8,
    pub user_data: u8,
    pub point_source_id: u16,
}

impl Point10 {
    /// Size of a point in the LAS layout.
    pub const SIZE: usize = 20;

    pub fn populate_bit_fields_from(&mut self, byte: u8) {
        self.return_number = byte & 0x7;
        self.number_of_returns_of_given_pulse = (byte >> 3) & 0x7;
        self.scan_direction_flag = ((byte >> 6) & 0x1) != 0;
        self.edge_of_flight_line = ((byte >> 7) & 0x1) != 0;
    }

    /// The return byte, the 4 bit fields packed in one byte.
    pub fn bit_fields_to_byte(&self) -> u8 {
        (self.edge_of_flight_line as u8) << 7
            | (self.scan_direction_flag as u8) << 6
            | (self.number_of_returns_of_given_pulse & 0x7) << 3
            | (self.return_number & 0x7)
    }
}

impl Packable for Point10 {
    const SIZE: usize = Point10::SIZE;

    fn unpack_from(input: &[u8]) -> Self {
        let mut point = Point10 {
            x: i32::unpack_from(&input[0..4]),
            y: i32::unpack_from(&input[4..8]),
            z: i32::unpack_from(&input[8..12]),
            intensity: u16::unpack_from(&input[12..14]),
            classification: u8::unpack_from(&input[15..16]),
            scan_angle_rank: i8::unpack_from(&input[16..17]),
            user_data: u8::unpack_from(&input[17..18]),
            point_source_id: u16::unpack_from(&input[18..20]),
            ..Default::default()
        };
        point.populate_bit_fields_from(input[14]);
        point
    }

    fn pack_into(&self, output: &mut [u8]) {
        self.x.pack_into(&mut output[0..4]);
        self.y.pack_into(&mut output[4..8]);
        self.z.pack_into(&mut output[8..12]);
        self.intensity.pack_into(&mut output[12..14]);
        self.bit_fields_to_byte().pack_into(&mut output[14..15]);
        self.classification.pack_into(&mut output[15..16]);
        self.scan_angle_rank.pack_into(&mut output[16..17]);
        self.user_data.pack_into(&mut output[17..18]);
        self.point_source_id.pack_into(&mut output[18..20]);
    }
}

pub mod v2 {
    //! Version 2 of the `POINT10` compression.
    //!
    //! Apart from x, y and z, a field is only coded when it differs from the
    //! previous point, which a 6 bit mask coded first tells. The coordinates
    //! are coded as deltas predicted by the median of the last deltas of points
    //! with the same return context, z is predicted by the last z of points
    //! with the same return level.

    use std::io::{Read, Write};

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::errors::{LazError, Result};
    use crate::las::utils::{return_contexts, u32_zero_bit, StreamingMedian};
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::Point10;

    /// Bit map of the fields, other than x, y and z, that differ from the
    /// previous point.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub(crate) struct ChangedValues(u8);

    impl ChangedValues {
        const BIT_FIELDS: u8 = 1 << 5;
        const INTENSITY: u8 = 1 << 4;
        const CLASSIFICATION: u8 = 1 << 3;
        const SCAN_ANGLE_RANK: u8 = 1 << 2;
        const USER_DATA: u8 = 1 << 1;
        const POINT_SOURCE_ID: u8 = 1;

        /// The intensity is compared with `last_intensity`, the last intensity
        /// seen for the return context of `current`, not the one of `last`.
        fn from_points(current: &Point10, last: &Point10, last_intensity: u16) -> Self {
            let mut value = 0u8;
            if current.bit_fields_to_byte() != last.bit_fields_to_byte() {
                value |= Self::BIT_FIELDS;
            }
            if current.intensity != last_intensity {
                value |= Self::INTENSITY;
            }
            if current.classification != last.classification {
                value |= Self::CLASSIFICATION;
            }
            if current.scan_angle_rank != last.scan_angle_rank {
                value |= Self::SCAN_ANGLE_RANK;
            }
            if current.user_data != last.user_data {
                value |= Self::USER_DATA;
            }
            if current.point_source_id != last.point_source_id {
                value |= Self::POINT_SOURCE_ID;
            }
            ChangedValues(value)
        }

        fn is_set(self, flag: u8) -> bool {
            (self.0 & flag) != 0
        }

        fn bit_fields_changed(self) -> bool {
            self.is_set(Self::BIT_FIELDS)
        }

        fn intensity_changed(self) -> bool {
            self.is_set(Self::INTENSITY)
        }

        fn classification_changed(self) -> bool {
            self.is_set(Self::CLASSIFICATION)
        }

        fn scan_angle_rank_changed(self) -> bool {
            self.is_set(Self::SCAN_ANGLE_RANK)
        }

        fn user_data_changed(self) -> bool {
            self.is_set(Self::USER_DATA)
        }

        fn point_source_id_changed(self) -> bool {
            self.is_set(Self::POINT_SOURCE_ID)
        }
    }

    /// Adaptive models for the fields coded without an integer compressor.
    struct Point10Models {
        changed_values: ArithmeticModel,
        // one per previous return byte
        bit_byte: Vec<ArithmeticModel>,
        // one per previous classification
        classification: Vec<ArithmeticModel>,
        // one per scan direction
        scan_angle_rank: Vec<ArithmeticModel>,
        // one per previous user data
        user_data: Vec<ArithmeticModel>,
    }

    impl Point10Models {
        fn new(compress: bool) -> Result<Self> {
            let model = |symbols: u32| {
                let builder = ArithmeticModelBuilder::new(symbols);
                if compress {
                    builder.for_compression()
                } else {
                    builder
                }
            };
            Ok(Self {
                changed_values: model(64).build()?,
                bit_byte: model(256).build_many(256)?,
                classification: model(256).build_many(256)?,
                scan_angle_rank: model(256).build_many(2)?,
                user_data: model(256).build_many(256)?,
            })
        }
    }

    /// What the next point is predicted from.
    #[derive(Copy, Clone)]
    struct Predictors {
        last_point: Point10,
        last_intensity: [u16; 16],
        last_x_diff_median: [StreamingMedian<i32>; 16],
        last_y_diff_median: [StreamingMedian<i32>; 16],
        last_height: [i32; 8],
    }

    impl Predictors {
        fn new(first_point: Point10) -> Self {
            Self {
                last_point: first_point,
                last_intensity: [0u16; 16],
                last_x_diff_median: [StreamingMedian::new(); 16],
                last_y_diff_median: [StreamingMedian::new(); 16],
                last_height: [0i32; 8],
            }
        }
    }

    impl Default for Predictors {
        fn default() -> Self {
            Self::new(Point10::default())
        }
    }

    #[inline]
    fn dy_context(n: u8, kx: u32) -> u32 {
        (n == 1) as u32 + if kx < 20 { u32_zero_bit(kx) } else { 20 }
    }

    #[inline]
    fn z_context(n: u8, kx: u32, ky: u32) -> u32 {
        let k_bits = (kx + ky) / 2;
        (n == 1) as u32 + if k_bits < 18 { u32_zero_bit(k_bits) } else { 18 }
    }

    /// Compresses one stream of points, a new one is needed for every chunk.
    pub struct Point10Compressor {
        ic_intensity: IntegerCompressor,
        ic_point_source_id: IntegerCompressor,
        ic_dx: IntegerCompressor,
        ic_dy: IntegerCompressor,
        ic_z: IntegerCompressor,

        models: Point10Models,
        predictors: Predictors,
    }

    impl Point10Compressor {
        pub fn new() -> Result<Self> {
            Ok(Self {
                ic_intensity: IntegerCompressorBuilder::new().bits(16).contexts(4).build()?,
                ic_point_source_id: IntegerCompressorBuilder::new().bits(16).build()?,
                ic_dx: IntegerCompressorBuilder::new().bits(32).contexts(2).build()?,
                ic_dy: IntegerCompressorBuilder::new().bits(32).contexts(22).build()?,
                ic_z: IntegerCompressorBuilder::new().bits(32).contexts(20).build()?,
                models: Point10Models::new(true)?,
                predictors: Predictors::default(),
            })
        }
    }

    impl<W: Write> FieldCompressor<W> for Point10Compressor {
        type Item = Point10;

        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, first_point: &Point10) -> Result<()> {
            return_contexts(
                first_point.number_of_returns_of_given_pulse,
                first_point.return_number,
            )?;
            self.predictors = Predictors::new(*first_point);

            let mut buf = [0u8; Point10::SIZE];
            first_point.pack_into(&mut buf);
            dst.write_all(&buf)?;
            Ok(())
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            current: &Point10,
        ) -> Result<()> {
            let n = current.number_of_returns_of_given_pulse;
            let (m, l) = return_contexts(n, current.return_number)?;
            let models = &mut self.models;
            let state = &mut self.predictors;
            let last = state.last_point;

            let changed_values =
                ChangedValues::from_points(current, &last, state.last_intensity[m]);
            encoder.encode_symbol(&mut models.changed_values, u32::from(changed_values.0))?;

            if changed_values.bit_fields_changed() {
                encoder.encode_symbol(
                    &mut models.bit_byte[last.bit_fields_to_byte() as usize],
                    u32::from(current.bit_fields_to_byte()),
                )?;
            }

            if changed_values.intensity_changed() {
                self.ic_intensity.compress(
                    encoder,
                    i32::from(state.last_intensity[m]),
                    i32::from(current.intensity),
                    m.min(3) as u32,
                )?;
                state.last_intensity[m] = current.intensity;
            }

            if changed_values.classification_changed() {
                encoder.encode_symbol(
                    &mut models.classification[last.classification as usize],
                    u32::from(current.classification),
                )?;
            }

            if changed_values.scan_angle_rank_changed() {
                let delta =
                    (current.scan_angle_rank as u8).wrapping_sub(last.scan_angle_rank as u8);
                encoder.encode_symbol(
                    &mut models.scan_angle_rank[current.scan_direction_flag as usize],
                    u32::from(delta),
                )?;
            }

            if changed_values.user_data_changed() {
                encoder.encode_symbol(
                    &mut models.user_data[last.user_data as usize],
                    u32::from(current.user_data),
                )?;
            }

            if changed_values.point_source_id_changed() {
                self.ic_point_source_id.compress(
                    encoder,
                    i32::from(last.point_source_id),
                    i32::from(current.point_source_id),
                    0,
                )?;
            }

            // x
            let diff = current.x.wrapping_sub(last.x);
            let median = state.last_x_diff_median[m].get();
            self.ic_dx.compress(encoder, median, diff, (n == 1) as u32)?;
            state.last_x_diff_median[m].add(diff);

            // y
            let kx = self.ic_dx.k();
            let diff = current.y.wrapping_sub(last.y);
            let median = state.last_y_diff_median[m].get();
            self.ic_dy.compress(encoder, median, diff, dy_context(n, kx))?;
            state.last_y_diff_median[m].add(diff);

            // z
            let context = z_context(n, kx, self.ic_dy.k());
            self.ic_z
                .compress(encoder, state.last_height[l], current.z, context)?;
            state.last_height[l] = current.z;

            state.last_point = *current;
            Ok(())
        }
    }

    /// Decompresses one stream of points written by a [`Point10Compressor`].
    pub struct Point10Decompressor {
        ic_intensity: IntegerDecompressor,
        ic_point_source_id: IntegerDecompressor,
        ic_dx: IntegerDecompressor,
        ic_dy: IntegerDecompressor,
        ic_z: IntegerDecompressor,

        models: Point10Models,
        predictors: Predictors,
    }

    impl Point10Decompressor {
        pub fn new() -> Result<Self> {
            Ok(Self {
                ic_intensity: IntegerDecompressorBuilder::new()
                    .bits(16)
                    .contexts(4)
                    .build()?,
                ic_point_source_id: IntegerDecompressorBuilder::new().bits(16).build()?,
                ic_dx: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(2)
                    .build()?,
                ic_dy: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(22)
                    .build()?,
                ic_z: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(20)
                    .build()?,
                models: Point10Models::new(false)?,
                predictors: Predictors::default(),
            })
        }
    }

    impl<R: Read> FieldDecompressor<R> for Point10Decompressor {
        type Item = Point10;

        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn decompress_first(&mut self, src: &mut R) -> Result<Point10> {
            let mut buf = [0u8; Point10::SIZE];
            src.read_exact(&mut buf).map_err(LazError::from_input)?;
            let first_point = Point10::unpack_from(&buf);

            self.predictors = Predictors::new(first_point);
            // the intensity is predicted per return context, not from this point
            self.predictors.last_point.intensity = 0;
            Ok(first_point)
        }

        fn decompress_with(&mut self, decoder: &mut ArithmeticDecoder<R>) -> Result<Point10> {
            let models = &mut self.models;
            let state = &mut self.predictors;
            let mut point = state.last_point;

            let changed_values =
                ChangedValues(decoder.decode_symbol(&mut models.changed_values)? as u8);

            if changed_values.bit_fields_changed() {
                let last_byte = point.bit_fields_to_byte();
                let byte = decoder.decode_symbol(&mut models.bit_byte[last_byte as usize])?;
                point.populate_bit_fields_from(byte as u8);
            }

            let n = point.number_of_returns_of_given_pulse;
            let (m, l) = return_contexts(n, point.return_number)?;

            if changed_values.intensity_changed() {
                point.intensity = self.ic_intensity.decompress(
                    decoder,
                    i32::from(state.last_intensity[m]),
                    m.min(3) as u32,
                )? as u16;
                state.last_intensity[m] = point.intensity;
            } else {
                point.intensity = state.last_intensity[m];
            }

            if changed_values.classification_changed() {
                point.classification = decoder
                    .decode_symbol(&mut models.classification[point.classification as usize])?
                    as u8;
            }

            if changed_values.scan_angle_rank_changed() {
                let delta = decoder.decode_symbol(
                    &mut models.scan_angle_rank[point.scan_direction_flag as usize],
                )? as u8;
                point.scan_angle_rank = delta.wrapping_add(point.scan_angle_rank as u8) as i8;
            }

            if changed_values.user_data_changed() {
                point.user_data = decoder
                    .decode_symbol(&mut models.user_data[point.user_data as usize])?
                    as u8;
            }

            if changed_values.point_source_id_changed() {
                point.point_source_id = self.ic_point_source_id.decompress(
                    decoder,
                    i32::from(point.point_source_id),
                    0,
                )? as u16;
            }

            // x
            let median = state.last_x_diff_median[m].get();
            let diff = self.ic_dx.decompress(decoder, median, (n == 1) as u32)?;
            point.x = point.x.wrapping_add(diff);
            state.last_x_diff_median[m].add(diff);

            // y
            let kx = self.ic_dx.k();
            let median = state.last_y_diff_median[m].get();
            let diff = self.ic_dy.decompress(decoder, median, dy_context(n, kx))?;
            point.y = point.y.wrapping_add(diff);
            state.last_y_diff_median[m].add(diff);

            // z
            let context = z_context(n, kx, self.ic_dy.k());
            point.z = self
                .ic_z
                .decompress(decoder, state.last_height[l], context)?;
            state.last_height[l] = point.z;

            state.last_point = point;
            Ok(point)
        }
    }

}
