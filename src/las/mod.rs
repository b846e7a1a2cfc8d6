pub mod chunked;
pub mod point10;
pub mod utils;

pub use point10::Point10;

pub mod v2 {
    pub use crate::las::point10::v2::{Point10Compressor, Point10Decompressor};
}
