//! Storage engine interface
//!
//! The engine owns the bytes: it creates arrays, transfers array regions and
//! table cells, and encodes compressed data. This crate drives it through the
//! object-safe [`StorageEngine`] trait, so any backend can be plugged in:
//!
//! ```rust,ignore
//! use fitsaccess::{StorageEngine, MemoryEngine, bintable};
//!
//! let mut engine: Box<dyn StorageEngine> = Box::new(MemoryEngine::new());
//! let column = bintable::read_column::<f32>(engine.as_ref(), "FLUX")?;
//! ```
//!
//! A row segment passed to the engine is 0-based and half-open. Failures are
//! reported as [`FitsError::Engine`](crate::error::FitsError::Engine) carrying
//! one of the [`status`] codes.

use crate::compression::Algo;
use crate::error::Result;
use crate::region::Segment;
use crate::types::{parse_tform, Cells, CellsMut, TypeCode};
use serde::{Deserialize, Serialize};

/// Engine status codes, numbered like CFITSIO's
pub mod status {
    /// Tried to modify a read-only data unit
    pub const READONLY_FILE: i32 = 112;
    /// No column matches the name
    pub const COL_NOT_FOUND: i32 = 219;
    /// Data unit holds no array
    pub const NOT_IMAGE: i32 = 233;
    /// Malformed column format code
    pub const BAD_TFORM: i32 = 261;
    /// Column number out of range
    pub const BAD_COL_NUM: i32 = 302;
    /// Row number out of range
    pub const BAD_ROW_NUM: i32 = 307;
    /// Region or shape out of range
    pub const BAD_DIMEN: i32 = 320;
    /// Value type does not match the stored type
    pub const BAD_DATATYPE: i32 = 410;
    /// Value does not fit in the stored type
    pub const NUM_OVERFLOW: i32 = 412;

    /// Short description of a status code
    pub fn describe(status: i32) -> &'static str {
        match status {
            READONLY_FILE => "data unit is read-only",
            COL_NOT_FOUND => "column not found",
            NOT_IMAGE => "not an image",
            BAD_TFORM => "bad column format",
            BAD_COL_NUM => "bad column number",
            BAD_ROW_NUM => "bad row number",
            BAD_DIMEN => "bad dimension",
            BAD_DATATYPE => "bad data type",
            NUM_OVERFLOW => "numerical overflow",
            _ => "unknown status",
        }
    }
}

/// Name, format code and unit of a table column, as stored by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Format code such as `16A` or `3E`
    pub tform: String,
    pub unit: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, tform: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tform: tform.into(),
            unit: unit.into(),
        }
    }

    /// Value type and repeat count parsed from the format code
    pub fn format(&self) -> Result<(TypeCode, usize)> {
        parse_tform(&self.tform)
    }
}

/// Trait for array and table access to one data unit of a storage engine.
///
/// Reading methods take `&self`, methods which modify the data take `&mut self`,
/// so that the borrow checker serializes access to one handle.
pub trait StorageEngine {
    /// Create the array, replacing any previous one
    fn create_array(&mut self, type_code: TypeCode, shape: &[i64]) -> Result<()>;

    /// Value type of the array
    fn array_type(&self) -> Result<TypeCode>;

    /// Shape of the array
    fn array_shape(&self) -> Result<Vec<i64>>;

    /// Read the closed box `front..=back`, axis 0 fastest, into `out`
    fn read_array_region(&self, front: &[i64], back: &[i64], out: CellsMut<'_>) -> Result<()>;

    /// Write the closed box `front..=back`, axis 0 fastest
    fn write_array_region(&mut self, front: &[i64], back: &[i64], values: Cells<'_>) -> Result<()>;

    /// Number of table rows
    fn row_count(&self) -> Result<usize>;

    /// Number of table columns
    fn column_count(&self) -> Result<usize>;

    /// 0-based index of the column of given name
    fn column_index(&self, name: &str) -> Result<usize>;

    fn read_column_info(&self, index: usize) -> Result<ColumnDescriptor>;

    /// Read `rows.count * repeat_count` values, or `rows.count` strings
    fn read_column_cells(
        &self,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        out: CellsMut<'_>,
    ) -> Result<()>;

    /// Write `rows.count * repeat_count` values, or `rows.count` strings,
    /// growing the table if needed
    fn write_column_cells(
        &mut self,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        values: Cells<'_>,
    ) -> Result<()>;

    /// Number of rows best transferred at once; 0 means none can be
    fn optimal_row_chunk_size(&self) -> Result<usize>;

    /// Insert columns before the column at `position` (0-based)
    fn insert_columns(&mut self, position: usize, columns: &[ColumnDescriptor]) -> Result<()>;

    /// Compression applied to arrays created afterwards
    fn set_compression(&mut self, algo: &Algo) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_format() {
        let descriptor = ColumnDescriptor::new("NAME", "16A", "");
        assert_eq!(descriptor.format().unwrap(), (TypeCode::Str, 16));
        assert!(ColumnDescriptor::new("X", "?", "m").format().is_err());
    }

    #[test]
    fn test_describe_status() {
        assert_eq!(status::describe(status::COL_NOT_FOUND), "column not found");
        assert_eq!(status::describe(-7), "unknown status");
    }
}
