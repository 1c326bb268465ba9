//! Utility functions

use crate::error::{FitsError, Result};
use crate::types::TypeCode;

/// Number of values of an array of given shape.
///
/// Fails on negative lengths and on overflow.
pub fn shape_size(shape: &[i64]) -> Result<usize> {
    shape.iter().try_fold(1usize, |acc, &length| {
        let length = to_usize(length, "axis length")?;
        acc.checked_mul(length).ok_or_else(|| {
            FitsError::Validation(format!("Shape {:?} overflows the address space", shape))
        })
    })
}

/// Convert a coordinate or length to `usize`, rejecting negative values
pub fn to_usize(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| FitsError::OutOfBounds(format!("Negative {}: {}", what, value)))
}

/// Convert a count to a coordinate
pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| FitsError::OutOfBounds(format!("Count {} exceeds i64", value)))
}

/// Resolve a possibly backward index against a length.
///
/// `-k` addresses `length - k`.
pub fn resolve_backward(index: i64, length: i64) -> Result<i64> {
    let resolved = if index < 0 { length + index } else { index };
    if resolved < 0 || resolved >= length {
        return Err(FitsError::OutOfBounds(format!(
            "Index {} not in [{}, {})",
            index, -length, length
        )));
    }
    Ok(resolved)
}

/// Byte count with a binary unit, as in `1.50 KiB`
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Value count of a data unit together with its size in bytes
pub fn format_values(type_code: TypeCode, count: usize) -> String {
    let bytes = count.saturating_mul(type_code.size_in_bytes());
    format!("{} {} values ({})", count, type_code, format_bytes(bytes))
}
