//! Closed set of cell value kinds a [`crate::grid::Grid`] can hold.
//!
//! [`DataType`] is the runtime tag; [`Scalar`] is implemented for exactly the
//! seven Rust primitives that back those tags.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Nodata sentinel shared by both float kinds (exactly `f32::MIN`), so a
/// float grid can be narrowed or widened without remapping its nodata cells.
pub const FLOAT_NODATA: f64 = -3.402_823_466_385_288_6e38;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    U8,
    U16,
    U32,
    I16,
    I32,
    F32,
    F64,
}

impl DataType {
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Inclusive finite value range of this kind.
    pub fn range(self) -> (f64, f64) {
        match self {
            DataType::U8 => (0.0, u8::MAX as f64),
            DataType::U16 => (0.0, u16::MAX as f64),
            DataType::U32 => (0.0, u32::MAX as f64),
            DataType::I16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::I32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::F32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Sentinel used when a caller does not pick one. Unsigned kinds take their
    /// maximum, signed kinds their minimum, floats [`FLOAT_NODATA`].
    pub fn default_nodata(self) -> f64 {
        match self {
            DataType::U8 => u8::MAX as f64,
            DataType::U16 => u16::MAX as f64,
            DataType::U32 => u32::MAX as f64,
            DataType::I16 => i16::MIN as f64,
            DataType::I32 => i32::MIN as f64,
            DataType::F32 | DataType::F64 => FLOAT_NODATA,
        }
    }

    /// Whether `value` can be stored in this kind without loss of meaning.
    /// Integer kinds require an integral value inside their range; float kinds
    /// also accept NaN and infinities.
    pub fn can_represent(self, value: f64) -> bool {
        if self.is_float() {
            if value.is_nan() || value.is_infinite() {
                return true;
            }
            let (lo, hi) = self.range();
            return value >= lo && value <= hi;
        }
        let (lo, hi) = self.range();
        value.is_finite() && value.fract() == 0.0 && value >= lo && value <= hi
    }
}

/// A primitive that can be stored in a grid buffer.
pub trait Scalar: Copy + PartialEq + PartialOrd + Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn to_f64(self) -> f64;

    /// Converts from `f64`, rounding to nearest for integer kinds. `None` when
    /// the rounded value falls outside the kind's range.
    fn from_f64(value: f64) -> Option<Self>;

    /// Total order used for sorting and majority counting.
    fn total_cmp(&self, other: &Self) -> Ordering;

    fn default_nodata() -> Self;

    /// Nodata test; float NaN sentinels match NaN cells.
    fn is_nodata(self, nodata: Self) -> bool;
}

macro_rules! impl_int_scalar {
    ($t:ty, $tag:expr) => {
        impl Scalar for $t {
            const DATA_TYPE: DataType = $tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Option<Self> {
                let r = value.round();
                if r.is_finite() && r >= <$t>::MIN as f64 && r <= <$t>::MAX as f64 {
                    Some(r as $t)
                } else {
                    None
                }
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }

            fn default_nodata() -> Self {
                if <$t>::MIN == 0 {
                    <$t>::MAX
                } else {
                    <$t>::MIN
                }
            }

            #[inline]
            fn is_nodata(self, nodata: Self) -> bool {
                self == nodata
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($t:ty, $tag:expr) => {
        impl Scalar for $t {
            const DATA_TYPE: DataType = $tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Option<Self> {
                if $tag.can_represent(value) {
                    Some(value as $t)
                } else {
                    None
                }
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                <$t>::total_cmp(self, other)
            }

            fn default_nodata() -> Self {
                FLOAT_NODATA as $t
            }

            #[inline]
            fn is_nodata(self, nodata: Self) -> bool {
                self == nodata || (self.is_nan() && nodata.is_nan())
            }
        }
    };
}

impl_int_scalar!(u8, DataType::U8);
impl_int_scalar!(u16, DataType::U16);
impl_int_scalar!(u32, DataType::U32);
impl_int_scalar!(i16, DataType::I16);
impl_int_scalar!(i32, DataType::I32);
impl_float_scalar!(f32, DataType::F32);
impl_float_scalar!(f64, DataType::F64);
