//! Closed set of pixel sample types, type-suggestion rules and saturating casts.
//!
//! [`DataType`] is the runtime tag carried by every image header. [`Sample`] is
//! the compile-time counterpart implemented by the 13 Rust types that back
//! those tags; all conversions between them go through [`Value`] and clamp to
//! the destination's representable range instead of wrapping.

use crate::error::Error;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel sample type. Variants are ordered by "rank", which the type
/// suggestion rules rely on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bin,
    UInt8,
    SInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
    UInt64,
    SInt64,
    SFloat,
    DFloat,
    SComplex,
    DComplex,
}

impl DataType {
    pub const ALL: [DataType; 13] = [
        DataType::Bin,
        DataType::UInt8,
        DataType::SInt8,
        DataType::UInt16,
        DataType::SInt16,
        DataType::UInt32,
        DataType::SInt32,
        DataType::UInt64,
        DataType::SInt64,
        DataType::SFloat,
        DataType::DFloat,
        DataType::SComplex,
        DataType::DComplex,
    ];

    /// Size of one sample in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            DataType::Bin | DataType::UInt8 | DataType::SInt8 => 1,
            DataType::UInt16 | DataType::SInt16 => 2,
            DataType::UInt32 | DataType::SInt32 | DataType::SFloat => 4,
            DataType::UInt64 | DataType::SInt64 | DataType::DFloat | DataType::SComplex => 8,
            DataType::DComplex => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Bin => "bin",
            DataType::UInt8 => "uint8",
            DataType::SInt8 => "sint8",
            DataType::UInt16 => "uint16",
            DataType::SInt16 => "sint16",
            DataType::UInt32 => "uint32",
            DataType::SInt32 => "sint32",
            DataType::UInt64 => "uint64",
            DataType::SInt64 => "sint64",
            DataType::SFloat => "sfloat",
            DataType::DFloat => "dfloat",
            DataType::SComplex => "scomplex",
            DataType::DComplex => "dcomplex",
        }
    }

    pub const fn is_binary(self) -> bool {
        matches!(self, DataType::Bin)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    /// Signed integers, floats and complex types can all represent negative values.
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            DataType::SInt8
                | DataType::SInt16
                | DataType::SInt32
                | DataType::SInt64
                | DataType::SFloat
                | DataType::DFloat
                | DataType::SComplex
                | DataType::DComplex
        )
    }

    pub const fn is_integer(self) -> bool {
        self.is_unsigned()
            || matches!(
                self,
                DataType::SInt8 | DataType::SInt16 | DataType::SInt32 | DataType::SInt64
            )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::SFloat | DataType::DFloat)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, DataType::SComplex | DataType::DComplex)
    }

    pub const fn is_real(self) -> bool {
        !self.is_complex()
    }

    pub const fn is_flex(self) -> bool {
        self.is_float() || self.is_complex()
    }

    pub const fn is_flex_bin(self) -> bool {
        self.is_flex() || self.is_binary()
    }

    /// The type of one component: complex types map to the matching float.
    pub const fn real(self) -> DataType {
        match self {
            DataType::SComplex => DataType::SFloat,
            DataType::DComplex => DataType::DFloat,
            other => other,
        }
    }

    const fn is_wide(self) -> bool {
        matches!(
            self,
            DataType::UInt32
                | DataType::SInt32
                | DataType::UInt64
                | DataType::SInt64
                | DataType::DFloat
                | DataType::DComplex
        )
    }

    /// An integer type able to hold the integer part of `self`.
    pub const fn suggest_integer(self) -> DataType {
        match self {
            DataType::Bin => DataType::UInt8,
            DataType::SFloat | DataType::SComplex => DataType::SInt32,
            DataType::DFloat | DataType::DComplex => DataType::SInt64,
            other => other,
        }
    }

    /// A signed type able to hold all values of `self`.
    pub const fn suggest_signed(self) -> DataType {
        match self {
            DataType::Bin => DataType::SInt8,
            DataType::UInt8 => DataType::SInt16,
            DataType::UInt16 => DataType::SInt32,
            DataType::UInt32 | DataType::UInt64 => DataType::SInt64,
            other => other,
        }
    }

    pub const fn suggest_float(self) -> DataType {
        if self.is_wide() {
            DataType::DFloat
        } else {
            DataType::SFloat
        }
    }

    pub const fn suggest_double(self) -> DataType {
        if self.is_complex() {
            DataType::DComplex
        } else {
            DataType::DFloat
        }
    }

    pub const fn suggest_complex(self) -> DataType {
        if self.is_wide() {
            DataType::DComplex
        } else {
            DataType::SComplex
        }
    }

    /// A float or complex type able to hold the result of arithmetic on `self`.
    pub const fn suggest_flex(self) -> DataType {
        match self {
            DataType::SComplex | DataType::DComplex => self,
            _ => self.suggest_float(),
        }
    }

    /// Like [`DataType::suggest_flex`], but binary stays binary.
    pub const fn suggest_flex_bin(self) -> DataType {
        match self {
            DataType::Bin => DataType::Bin,
            _ => self.suggest_flex(),
        }
    }

    pub const fn suggest_real(self) -> DataType {
        self.real()
    }

    /// Output type for an arithmetic operation between two images.
    pub fn suggest_arithmetic(a: DataType, b: DataType) -> DataType {
        let (hi, lo) = sorted(a.suggest_flex_bin(), b.suggest_flex_bin());
        match (hi, lo) {
            (DataType::DComplex, _) => DataType::DComplex,
            (DataType::SComplex, DataType::DFloat) => DataType::DComplex,
            (DataType::SComplex, _) => DataType::SComplex,
            (DataType::DFloat, _) => DataType::DFloat,
            (DataType::SFloat, _) => DataType::SFloat,
            _ => DataType::Bin,
        }
    }

    /// Smallest type able to represent all values of both inputs.
    pub fn suggest_dyadic_operation(a: DataType, b: DataType) -> DataType {
        if a == b {
            return a;
        }
        let (hi, lo) = sorted(a, b);
        match hi {
            DataType::DComplex => DataType::DComplex,
            DataType::SComplex if lo == DataType::DFloat || lo.is_wide() => DataType::DComplex,
            DataType::SComplex => DataType::SComplex,
            DataType::DFloat => DataType::DFloat,
            DataType::SFloat if lo.is_wide() => DataType::DFloat,
            DataType::SFloat => DataType::SFloat,
            DataType::SInt64 => DataType::SInt64,
            DataType::UInt64 if lo.is_signed() => DataType::DFloat,
            DataType::UInt64 => DataType::UInt64,
            DataType::SInt32 if lo == DataType::UInt32 => DataType::SInt64,
            DataType::SInt32 => DataType::SInt32,
            DataType::UInt32 if lo.is_signed() => DataType::SInt64,
            DataType::UInt32 => DataType::UInt32,
            DataType::SInt16 if lo == DataType::UInt16 => DataType::SInt32,
            DataType::SInt16 => DataType::SInt16,
            DataType::UInt16 if lo == DataType::SInt8 => DataType::SInt32,
            DataType::UInt16 => DataType::UInt16,
            DataType::SInt8 if lo == DataType::UInt8 => DataType::SInt16,
            DataType::SInt8 => DataType::SInt8,
            _ => DataType::UInt8,
        }
    }
}

fn sorted(a: DataType, b: DataType) -> (DataType, DataType) {
    if b > a {
        (b, a)
    } else {
        (a, b)
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::SFloat
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.name() == s)
            .ok_or_else(|| Error::parameter(format!("unknown data type \"{s}\"")))
    }
}

/// Type-erased sample value used as the pivot of every conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i128),
    Float(f64),
    Complex(Complex64),
}

impl Value {
    /// Real interpretation; complex values yield their modulus.
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(f) => f,
            Value::Complex(c) => c.norm(),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i128)
            }
        })*
    };
}
value_from_int!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(v as i128)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Complex32> for Value {
    fn from(v: Complex32) -> Self {
        Value::Complex(Complex64::new(v.re as f64, v.im as f64))
    }
}

impl From<Complex64> for Value {
    fn from(v: Complex64) -> Self {
        Value::Complex(v)
    }
}

impl From<Bin> for Value {
    fn from(v: Bin) -> Self {
        Value::Int(v.is_set() as i128)
    }
}

/// Binary sample, stored as one byte. Any non-zero byte reads as `true`.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bin(u8);

impl Bin {
    pub const FALSE: Bin = Bin(0);
    pub const TRUE: Bin = Bin(1);

    pub const fn new(v: bool) -> Self {
        Bin(v as u8)
    }

    pub const fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bin {
    fn from(v: bool) -> Self {
        Bin::new(v)
    }
}

impl From<Bin> for bool {
    fn from(v: Bin) -> Self {
        v.is_set()
    }
}

impl fmt::Debug for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.is_set())
    }
}

/// Rust type backing one [`DataType`].
mod sealed {
    pub trait Sealed {}
}

/// Implemented exactly once per [`DataType`]; sealed so that `DATA_TYPE`
/// identifies the Rust type.
pub trait Sample:
    sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const DATA_TYPE: DataType;

    /// Saturating conversion from any value.
    fn from_value(value: Value) -> Self;

    fn to_value(self) -> Value;

    fn max_value() -> Self;

    fn lowest() -> Self;

    /// Inversion that stays inside the type's range: unsigned values reflect
    /// around the midpoint, signed minimum maps to maximum, binary is negated.
    fn saturated_inv(self) -> Self;

    #[inline]
    fn cast<O: Sample>(self) -> O {
        if Self::DATA_TYPE == O::DATA_TYPE {
            // Same data type means same Rust type.
            unsafe { std::mem::transmute_copy::<Self, O>(&self) }
        } else {
            O::from_value(self.to_value())
        }
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_value().as_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::from_value(Value::Float(v))
    }
}

/// Saturating cast between two sample types.
#[inline]
pub fn clamp_cast<I: Sample, O: Sample>(v: I) -> O {
    v.cast::<O>()
}

impl sealed::Sealed for Bin {}

impl Sample for Bin {
    const DATA_TYPE: DataType = DataType::Bin;

    #[inline]
    fn from_value(value: Value) -> Self {
        Bin::new(match value {
            Value::Int(i) => i != 0,
            Value::Float(f) => f != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
        })
    }

    #[inline]
    fn to_value(self) -> Value {
        Value::Int(self.is_set() as i128)
    }

    fn max_value() -> Self {
        Bin::TRUE
    }

    fn lowest() -> Self {
        Bin::FALSE
    }

    #[inline]
    fn saturated_inv(self) -> Self {
        Bin::new(!self.is_set())
    }
}

macro_rules! impl_integer_sample {
    ($t:ty, $dt:ident, |$v:ident| $inv:expr) => {
        impl sealed::Sealed for $t {}

        impl Sample for $t {
            const DATA_TYPE: DataType = DataType::$dt;

            #[inline]
            fn from_value(value: Value) -> Self {
                match value {
                    Value::Int(i) => i.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t,
                    // `as` saturates, truncates toward zero and maps NaN to 0.
                    Value::Float(f) => f as $t,
                    Value::Complex(c) => c.norm() as $t,
                }
            }

            #[inline]
            fn to_value(self) -> Value {
                Value::Int(self as i128)
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn lowest() -> Self {
                <$t>::MIN
            }

            #[inline]
            fn saturated_inv(self) -> Self {
                let $v = self;
                $inv
            }
        }
    };
}

impl_integer_sample!(u8, UInt8, |v| u8::MAX - v);
impl_integer_sample!(u16, UInt16, |v| u16::MAX - v);
impl_integer_sample!(u32, UInt32, |v| u32::MAX - v);
impl_integer_sample!(u64, UInt64, |v| u64::MAX - v);
impl_integer_sample!(i8, SInt8, |v| v.checked_neg().unwrap_or(i8::MAX));
impl_integer_sample!(i16, SInt16, |v| v.checked_neg().unwrap_or(i16::MAX));
impl_integer_sample!(i32, SInt32, |v| v.checked_neg().unwrap_or(i32::MAX));
impl_integer_sample!(i64, SInt64, |v| v.checked_neg().unwrap_or(i64::MAX));

macro_rules! impl_float_sample {
    ($t:ty, $dt:ident) => {
        impl sealed::Sealed for $t {}

        impl Sample for $t {
            const DATA_TYPE: DataType = DataType::$dt;

            #[inline]
            fn from_value(value: Value) -> Self {
                match value {
                    Value::Int(i) => i as $t,
                    Value::Float(f) => f as $t,
                    Value::Complex(c) => c.norm() as $t,
                }
            }

            #[inline]
            fn to_value(self) -> Value {
                Value::Float(self as f64)
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn lowest() -> Self {
                <$t>::MIN
            }

            #[inline]
            fn saturated_inv(self) -> Self {
                -self
            }
        }
    };
}

impl_float_sample!(f32, SFloat);
impl_float_sample!(f64, DFloat);

macro_rules! impl_complex_sample {
    ($t:ty, $c:ty, $dt:ident) => {
        impl sealed::Sealed for $c {}

        impl Sample for $c {
            const DATA_TYPE: DataType = DataType::$dt;

            #[inline]
            fn from_value(value: Value) -> Self {
                match value {
                    Value::Int(i) => <$c>::new(i as $t, 0.0),
                    Value::Float(f) => <$c>::new(f as $t, 0.0),
                    Value::Complex(c) => <$c>::new(c.re as $t, c.im as $t),
                }
            }

            #[inline]
            fn to_value(self) -> Value {
                Value::Complex(Complex64::new(self.re as f64, self.im as f64))
            }

            fn max_value() -> Self {
                <$c>::new(<$t>::MAX, <$t>::MAX)
            }

            fn lowest() -> Self {
                <$c>::new(<$t>::MIN, <$t>::MIN)
            }

            #[inline]
            fn saturated_inv(self) -> Self {
                -self
            }
        }
    };
}

impl_complex_sample!(f32, Complex32, SComplex);
impl_complex_sample!(f64, Complex64, DComplex);

/// Expands `$body` once per data type with `$T` bound to the matching
/// [`Sample`] type.
macro_rules! dispatch_type {
    ($dt:expr, $T:ident => $body:expr) => {
        match $dt {
            $crate::datatype::DataType::Bin => {
                type $T = $crate::datatype::Bin;
                $body
            }
            $crate::datatype::DataType::UInt8 => {
                type $T = u8;
                $body
            }
            $crate::datatype::DataType::SInt8 => {
                type $T = i8;
                $body
            }
            $crate::datatype::DataType::UInt16 => {
                type $T = u16;
                $body
            }
            $crate::datatype::DataType::SInt16 => {
                type $T = i16;
                $body
            }
            $crate::datatype::DataType::UInt32 => {
                type $T = u32;
                $body
            }
            $crate::datatype::DataType::SInt32 => {
                type $T = i32;
                $body
            }
            $crate::datatype::DataType::UInt64 => {
                type $T = u64;
                $body
            }
            $crate::datatype::DataType::SInt64 => {
                type $T = i64;
                $body
            }
            $crate::datatype::DataType::SFloat => {
                type $T = f32;
                $body
            }
            $crate::datatype::DataType::DFloat => {
                type $T = f64;
                $body
            }
            $crate::datatype::DataType::SComplex => {
                type $T = ::num_complex::Complex32;
                $body
            }
            $crate::datatype::DataType::DComplex => {
                type $T = ::num_complex::Complex64;
                $body
            }
        }
    };
}
pub(crate) use dispatch_type;
