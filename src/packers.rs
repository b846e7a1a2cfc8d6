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


//! Little endian packing of the raw LAS fields.

use byteorder::{ByteOrder, LittleEndian};

/// Types with a fixed size little endian representation.
///
/// # Panics
///
/// Both functions panic if the slice is shorter than `SIZE`.
pub trait Packable: Sized {
    const SIZE: usize;

    fn unpack_from(input: &[u8]) -> Self;
    fn pack_into(&self, output: &mut [u8]);
}

impl Packable for u8 {
    const SIZE: usize = 1;

    fn unpack_from(input: &[u8]) -> Self {
        input[0]
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self;
    }
}

impl Packable for i8 {
    const SIZE: usize = 1;

    fn unpack_from(input: &[u8]) -> Self {
        input[0] as i8
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self as u8;
    }
}

macro_rules! impl_packable_with_byteorder {
    ($type:ty, $size:expr, $read:ident, $write:ident) => {
        impl Packable for $type {
            const SIZE: usize = $size;

            #[inline]
            fn unpack_from(input: &[u8]) -> Self {
                LittleEndian::$read(&input[..$size])
            }

            #[inline]
            fn pack_into(&self, output: &mut [u8]) {
                LittleEndian::$write(&mut output[..$size], *self)
            }
        }
    };
}

impl_packable_with_byteorder!(u16, 2, read_u16, write_u16);
impl_packable_with_byteorder!(i16, 2, read_i16, write_i16);
impl_packable_with_byteorder!(u32, 4, read_u32, write_u32);
impl_packable_with_byteorder!(i32, 4, read_i32, write_i32);
