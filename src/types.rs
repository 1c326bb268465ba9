//! Core value types exchanged with the storage engine

use crate::error::{FitsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types supported by rasters and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeCode {
    /// Unsigned 8-bit integer
    U8 = 0,
    /// Signed 8-bit integer
    I8 = 1,
    /// Signed 16-bit integer
    I16 = 2,
    /// Unsigned 16-bit integer
    U16 = 3,
    /// Signed 32-bit integer
    I32 = 4,
    /// Unsigned 32-bit integer
    U32 = 5,
    /// Signed 64-bit integer
    I64 = 6,
    /// Unsigned 64-bit integer
    U64 = 7,
    /// 32-bit floating point
    F32 = 8,
    /// 64-bit floating point
    F64 = 9,
    /// Character string (table columns only)
    Str = 10,
}

impl TypeCode {
    /// Size in bytes of one value (one character for strings)
    pub fn size_in_bytes(&self) -> usize {
        match self {
            TypeCode::U8 | TypeCode::I8 | TypeCode::Str => 1,
            TypeCode::I16 | TypeCode::U16 => 2,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 4,
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, TypeCode::F32 | TypeCode::F64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        !self.is_float() && !self.is_string()
    }

    /// Check if this is the string type
    pub fn is_string(&self) -> bool {
        matches!(self, TypeCode::Str)
    }

    /// Image bit depth (negative for floating point), `None` for strings.
    pub fn bitpix(&self) -> Option<i32> {
        match self {
            TypeCode::Str => None,
            t if t.is_float() => Some(-8 * t.size_in_bytes() as i32),
            t => Some(8 * t.size_in_bytes() as i32),
        }
    }

    /// Binary table format letter
    pub fn tform_letter(&self) -> char {
        match self {
            TypeCode::U8 => 'B',
            TypeCode::I8 => 'S',
            TypeCode::I16 => 'I',
            TypeCode::U16 => 'U',
            TypeCode::I32 => 'J',
            TypeCode::U32 => 'V',
            TypeCode::I64 => 'K',
            TypeCode::U64 => 'W',
            TypeCode::F32 => 'E',
            TypeCode::F64 => 'D',
            TypeCode::Str => 'A',
        }
    }

    /// Parse a binary table format letter
    pub fn from_tform_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(TypeCode::U8),
            'S' => Some(TypeCode::I8),
            'I' => Some(TypeCode::I16),
            'U' => Some(TypeCode::U16),
            'J' => Some(TypeCode::I32),
            'V' => Some(TypeCode::U32),
            'K' => Some(TypeCode::I64),
            'W' => Some(TypeCode::U64),
            'E' => Some(TypeCode::F32),
            'D' => Some(TypeCode::F64),
            'A' => Some(TypeCode::Str),
            _ => None,
        }
    }

    /// Format code of a column with the given repeat count, e.g. `16A` or `3E`
    pub fn tform(&self, repeat_count: usize) -> String {
        format!("{}{}", repeat_count, self.tform_letter())
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Parse a format code into its type and repeat count.
///
/// A missing repeat count means 1.
pub fn parse_tform(tform: &str) -> Result<(TypeCode, usize)> {
    let tform = tform.trim();
    let split = tform
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| FitsError::Validation(format!("Missing type letter in TFORM '{}'", tform)))?;
    let (digits, rest) = tform.split_at(split);
    let repeat_count = if digits.is_empty() {
        1
    } else {
        digits
            .parse::<usize>()
            .map_err(|e| FitsError::Validation(format!("Bad repeat count in '{}': {}", tform, e)))?
    };
    let mut letters = rest.chars();
    let type_code = letters
        .next()
        .and_then(TypeCode::from_tform_letter)
        .ok_or_else(|| FitsError::Validation(format!("Unknown type letter in TFORM '{}'", tform)))?;
    if letters.next().is_some() {
        return Err(FitsError::Validation(format!(
            "Trailing characters in TFORM '{}'",
            tform
        )));
    }
    Ok((type_code, repeat_count))
}

/// Borrowed, type-tagged values handed to the engine for writing
#[derive(Debug, Clone, Copy)]
pub enum Cells<'a> {
    U8(&'a [u8]),
    I8(&'a [i8]),
    I16(&'a [i16]),
    U16(&'a [u16]),
    I32(&'a [i32]),
    U32(&'a [u32]),
    I64(&'a [i64]),
    U64(&'a [u64]),
    F32(&'a [f32]),
    F64(&'a [f64]),
    Str(&'a [String]),
}

/// Borrowed, type-tagged buffer filled by the engine when reading
#[derive(Debug)]
pub enum CellsMut<'a> {
    U8(&'a mut [u8]),
    I8(&'a mut [i8]),
    I16(&'a mut [i16]),
    U16(&'a mut [u16]),
    I32(&'a mut [i32]),
    U32(&'a mut [u32]),
    I64(&'a mut [i64]),
    U64(&'a mut [u64]),
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
    Str(&'a mut [String]),
}

/// Owned, type-tagged values, as kept by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Values {
    U8(Vec<u8>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<String>),
}

macro_rules! each_variant {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            Self::U8($v) => $body,
            Self::I8($v) => $body,
            Self::I16($v) => $body,
            Self::U16($v) => $body,
            Self::I32($v) => $body,
            Self::U32($v) => $body,
            Self::I64($v) => $body,
            Self::U64($v) => $body,
            Self::F32($v) => $body,
            Self::F64($v) => $body,
            Self::Str($v) => $body,
        }
    };
}

macro_rules! type_code_of {
    ($value:expr) => {
        match $value {
            Self::U8(_) => TypeCode::U8,
            Self::I8(_) => TypeCode::I8,
            Self::I16(_) => TypeCode::I16,
            Self::U16(_) => TypeCode::U16,
            Self::I32(_) => TypeCode::I32,
            Self::U32(_) => TypeCode::U32,
            Self::I64(_) => TypeCode::I64,
            Self::U64(_) => TypeCode::U64,
            Self::F32(_) => TypeCode::F32,
            Self::F64(_) => TypeCode::F64,
            Self::Str(_) => TypeCode::Str,
        }
    };
}

impl Cells<'_> {
    pub fn type_code(&self) -> TypeCode {
        type_code_of!(self)
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CellsMut<'_> {
    pub fn type_code(&self) -> TypeCode {
        type_code_of!(self)
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Values {
    /// Default-initialized values of the given type
    pub fn filled_default(type_code: TypeCode, len: usize) -> Self {
        match type_code {
            TypeCode::U8 => Values::U8(vec![0; len]),
            TypeCode::I8 => Values::I8(vec![0; len]),
            TypeCode::I16 => Values::I16(vec![0; len]),
            TypeCode::U16 => Values::U16(vec![0; len]),
            TypeCode::I32 => Values::I32(vec![0; len]),
            TypeCode::U32 => Values::U32(vec![0; len]),
            TypeCode::I64 => Values::I64(vec![0; len]),
            TypeCode::U64 => Values::U64(vec![0; len]),
            TypeCode::F32 => Values::F32(vec![0.0; len]),
            TypeCode::F64 => Values::F64(vec![0.0; len]),
            TypeCode::Str => Values::Str(vec![String::new(); len]),
        }
    }

    pub fn type_code(&self) -> TypeCode {
        type_code_of!(self)
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink, filling with default values
    pub fn resize(&mut self, len: usize) {
        each_variant!(self, v => v.resize(len, Default::default()))
    }

    pub fn as_cells(&self) -> Cells<'_> {
        match self {
            Values::U8(v) => Cells::U8(v),
            Values::I8(v) => Cells::I8(v),
            Values::I16(v) => Cells::I16(v),
            Values::U16(v) => Cells::U16(v),
            Values::I32(v) => Cells::I32(v),
            Values::U32(v) => Cells::U32(v),
            Values::I64(v) => Cells::I64(v),
            Values::U64(v) => Cells::U64(v),
            Values::F32(v) => Cells::F32(v),
            Values::F64(v) => Cells::F64(v),
            Values::Str(v) => Cells::Str(v),
        }
    }
}

/// Numeric value which can be stored in a raster or a column
pub trait Scalar: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Engine-side type tag
    const TYPE_CODE: TypeCode;

    /// Tag a slice for writing
    fn cells(values: &[Self]) -> Cells<'_>;

    /// Tag a slice for reading
    fn cells_mut(values: &mut [Self]) -> CellsMut<'_>;
}

macro_rules! impl_scalar {
    ($t:ty, $variant:ident) => {
        impl Scalar for $t {
            const TYPE_CODE: TypeCode = TypeCode::$variant;

            fn cells(values: &[Self]) -> Cells<'_> {
                Cells::$variant(values)
            }

            fn cells_mut(values: &mut [Self]) -> CellsMut<'_> {
                CellsMut::$variant(values)
            }
        }
    };
}

impl_scalar!(u8, U8);
impl_scalar!(i8, I8);
impl_scalar!(i16, I16);
impl_scalar!(u16, U16);
impl_scalar!(i32, I32);
impl_scalar!(u32, U32);
impl_scalar!(i64, I64);
impl_scalar!(u64, U64);
impl_scalar!(f32, F32);
impl_scalar!(f64, F64);
