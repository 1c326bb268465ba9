//! In-memory storage engine
//!
//! [`MemoryEngine`] keeps one array and one table in memory and implements
//! [`StorageEngine`] on them, checking every request like a file-based engine
//! would. Each transfer and modification is appended to a call log, which makes
//! the access pattern of the higher layers observable.
//!
//! The whole state can be saved as a snapshot: bincode inside a gzip stream.

use crate::compression::Algo;
use crate::config::{EngineConfig, FormatVersion};
use crate::engine::{status, ColumnDescriptor, StorageEngine};
use crate::error::{FitsError, Result};
use crate::position::{linear_index, DynPosition};
use crate::region::{Region, Segment};
use crate::types::{Cells, CellsMut, TypeCode, Values};
use crate::utils::{format_bytes, format_values, shape_size};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Transfer or modification requested from a [`MemoryEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineCall {
    CreateArray {
        type_code: TypeCode,
        shape: Vec<i64>,
    },
    ReadArrayRegion {
        front: Vec<i64>,
        back: Vec<i64>,
    },
    WriteArrayRegion {
        front: Vec<i64>,
        back: Vec<i64>,
    },
    ReadColumnCells {
        index: usize,
        rows: Segment,
    },
    WriteColumnCells {
        index: usize,
        rows: Segment,
    },
    InsertColumns {
        position: usize,
        names: Vec<String>,
    },
    OptimalRowChunkSize,
    SetCompression {
        algo: Algo,
    },
}

impl EngineCall {
    /// Check whether the call transfers table cells
    pub fn is_column_transfer(&self) -> bool {
        matches!(
            self,
            EngineCall::ReadColumnCells { .. } | EngineCall::WriteColumnCells { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ImageData {
    shape: Vec<i64>,
    values: Values,
    compression: Algo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TableColumn {
    descriptor: ColumnDescriptor,
    repeat_count: usize,
    /// One string per row, or `repeat_count` numbers per row
    values: Values,
}

impl TableColumn {
    fn values_per_row(&self) -> usize {
        if self.values.type_code().is_string() {
            1
        } else {
            self.repeat_count
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TableData {
    rows: usize,
    columns: Vec<TableColumn>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: FormatVersion,
    config: &'a EngineConfig,
    compression: &'a Algo,
    image: &'a Option<ImageData>,
    table: &'a TableData,
}

#[derive(Deserialize)]
struct Snapshot {
    version: FormatVersion,
    config: EngineConfig,
    compression: Algo,
    image: Option<ImageData>,
    table: TableData,
}

/// Storage engine keeping its data in memory
#[derive(Debug)]
pub struct MemoryEngine {
    config: EngineConfig,
    compression: Algo,
    image: Option<ImageData>,
    table: TableData,
    calls: Mutex<Vec<EngineCall>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

fn fail<T>(status: i32, context: impl Into<String>) -> Result<T> {
    let context = context.into();
    debug!(status, reason = status::describe(status), %context, "Engine request rejected");
    Err(FitsError::engine(status, context))
}

/// Match a stored buffer with a caller buffer of the same type
macro_rules! with_matching {
    ($values:expr, $cells:expr, $Cells:ident, |$v:ident, $c:ident| $body:expr) => {
        match ($values, $cells) {
            (Values::U8($v), $Cells::U8($c)) => $body,
            (Values::I8($v), $Cells::I8($c)) => $body,
            (Values::I16($v), $Cells::I16($c)) => $body,
            (Values::U16($v), $Cells::U16($c)) => $body,
            (Values::I32($v), $Cells::I32($c)) => $body,
            (Values::U32($v), $Cells::U32($c)) => $body,
            (Values::I64($v), $Cells::I64($c)) => $body,
            (Values::U64($v), $Cells::U64($c)) => $body,
            (Values::F32($v), $Cells::F32($c)) => $body,
            (Values::F64($v), $Cells::F64($c)) => $body,
            (Values::Str($v), $Cells::Str($c)) => $body,
            (values, cells) => fail(
                status::BAD_DATATYPE,
                format!(
                    "transfer {} values to or from {} storage",
                    cells.type_code(),
                    values.type_code()
                ),
            ),
        }
    };
}

/// Stored offset and length of each axis-0 run of a region
fn region_runs(shape: &[i64], front: &[i64], back: &[i64]) -> Result<Vec<(usize, usize)>> {
    if front.len() != shape.len() || back.len() != shape.len() {
        return fail(
            status::BAD_DIMEN,
            format!(
                "access region {:?}-{:?} of an array of shape {:?}",
                front, back, shape
            ),
        );
    }
    let region = Region::new(DynPosition::from(front.to_vec()), DynPosition::from(back.to_vec()))?;
    if !region.is_within(&DynPosition::from(shape.to_vec())) {
        return fail(
            status::BAD_DIMEN,
            format!(
                "access region {:?}-{:?} outside of shape {:?}",
                front, back, shape
            ),
        );
    }
    let run_length = match (front.first(), back.first()) {
        (Some(&f), Some(&b)) => (b - f + 1) as usize,
        _ => 1,
    };
    let mut locus = region;
    if let Some(first) = front.first() {
        locus.back[0] = *first;
    }
    Ok(locus
        .positions()
        .map(|position| (linear_index(shape, position.as_slice()) as usize, run_length))
        .collect())
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            compression: config.compression.clone(),
            config,
            image: None,
            table: TableData::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compression applied to the next created array
    pub fn compression(&self) -> &Algo {
        &self.compression
    }

    /// Compression the current array was created with
    pub fn array_compression(&self) -> Option<&Algo> {
        self.image.as_ref().map(|image| &image.compression)
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.config.read_only = read_only;
    }

    pub fn set_row_chunk_size(&mut self, rows: usize) {
        self.config.row_chunk_size = rows;
    }

    /// Calls recorded since creation or the last [`clear_calls`](Self::clear_calls)
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: EngineCall) {
        trace!(?call, "Engine call");
        self.calls.lock().push(call);
    }

    fn check_writable(&self, context: &str) -> Result<()> {
        if self.config.read_only {
            return fail(status::READONLY_FILE, context.to_string());
        }
        Ok(())
    }

    fn image(&self) -> Result<&ImageData> {
        match &self.image {
            Some(image) => Ok(image),
            None => fail(status::NOT_IMAGE, "access the array of a data unit without array"),
        }
    }

    fn column(&self, index: usize) -> Result<&TableColumn> {
        match self.table.columns.get(index) {
            Some(column) => Ok(column),
            None => fail(
                status::BAD_COL_NUM,
                format!(
                    "access column {} of a table with {} columns",
                    index,
                    self.table.columns.len()
                ),
            ),
        }
    }

    fn check_cells(
        column: &TableColumn,
        rows: Segment,
        repeat_count: usize,
        len: usize,
    ) -> Result<()> {
        if repeat_count != column.repeat_count {
            return fail(
                status::BAD_DIMEN,
                format!(
                    "access column '{}' of repeat count {} with repeat count {}",
                    column.descriptor.name, column.repeat_count, repeat_count
                ),
            );
        }
        if len != rows.count * column.values_per_row() {
            return fail(
                status::BAD_DIMEN,
                format!(
                    "transfer {} rows of column '{}' with a buffer of {} values",
                    rows.count, column.descriptor.name, len
                ),
            );
        }
        Ok(())
    }

    /// Grow every column to at least `rows` rows
    fn reserve_rows(&mut self, rows: usize) {
        if rows <= self.table.rows {
            return;
        }
        for column in &mut self.table.columns {
            let per_row = column.values_per_row();
            column.values.resize(rows * per_row);
        }
        self.table.rows = rows;
    }

    /// Serialize the whole state into a gzip-compressed snapshot
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = SnapshotRef {
            version: FormatVersion::CURRENT,
            config: &self.config,
            compression: &self.compression,
            image: &self.image,
            table: &self.table,
        };
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::new(self.config.snapshot_level));
        bincode::serialize_into(&mut encoder, &snapshot)?;
        let bytes = encoder.finish()?;
        debug!(size = %format_bytes(bytes.len()), "Serialized engine snapshot");
        Ok(bytes)
    }

    /// Restore a snapshot; the call log starts empty
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = bincode::deserialize_from(GzDecoder::new(bytes))?;
        if !snapshot.version.is_compatible(&FormatVersion::CURRENT) {
            return Err(FitsError::Configuration(format!(
                "Snapshot version {}.{} is not compatible with {}.{}",
                snapshot.version.major,
                snapshot.version.minor,
                FormatVersion::CURRENT.major,
                FormatVersion::CURRENT.minor
            )));
        }
        if snapshot.version.minor > FormatVersion::CURRENT.minor {
            warn!(
                minor = snapshot.version.minor,
                "Snapshot written by a newer minor version"
            );
        }
        debug!(
            size = %format_bytes(bytes.len()),
            rows = snapshot.table.rows,
            columns = snapshot.table.columns.len(),
            "Restored engine snapshot"
        );
        Ok(Self {
            config: snapshot.config,
            compression: snapshot.compression,
            image: snapshot.image,
            table: snapshot.table,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

impl StorageEngine for MemoryEngine {
    fn create_array(&mut self, type_code: TypeCode, shape: &[i64]) -> Result<()> {
        self.check_writable("create an array")?;
        if type_code.is_string() {
            return fail(status::BAD_DATATYPE, "create an array of strings");
        }
        let size = match shape_size(shape) {
            Ok(size) => size,
            Err(_) => return fail(status::BAD_DIMEN, format!("create an array of shape {:?}", shape)),
        };
        self.record(EngineCall::CreateArray {
            type_code,
            shape: shape.to_vec(),
        });
        debug!(
            %type_code,
            ?shape,
            size = %format_values(type_code, size),
            compression = %self.compression,
            "Created array"
        );
        self.image = Some(ImageData {
            shape: shape.to_vec(),
            values: Values::filled_default(type_code, size),
            compression: self.compression.clone(),
        });
        Ok(())
    }

    fn array_type(&self) -> Result<TypeCode> {
        Ok(self.image()?.values.type_code())
    }

    fn array_shape(&self) -> Result<Vec<i64>> {
        Ok(self.image()?.shape.clone())
    }

    fn read_array_region(&self, front: &[i64], back: &[i64], out: CellsMut<'_>) -> Result<()> {
        let image = self.image()?;
        let runs = region_runs(&image.shape, front, back)?;
        let size: usize = runs.iter().map(|(_, len)| len).sum();
        if out.len() != size {
            return fail(
                status::BAD_DIMEN,
                format!("read {} values into a buffer of {}", size, out.len()),
            );
        }
        self.record(EngineCall::ReadArrayRegion {
            front: front.to_vec(),
            back: back.to_vec(),
        });
        with_matching!(&image.values, out, CellsMut, |stored, out| {
            let mut cursor = 0;
            for &(start, len) in &runs {
                out[cursor..cursor + len].clone_from_slice(&stored[start..start + len]);
                cursor += len;
            }
            Ok(())
        })
    }

    fn write_array_region(&mut self, front: &[i64], back: &[i64], values: Cells<'_>) -> Result<()> {
        self.check_writable("write an array region")?;
        let runs = region_runs(&self.image()?.shape, front, back)?;
        let size: usize = runs.iter().map(|(_, len)| len).sum();
        if values.len() != size {
            return fail(
                status::BAD_DIMEN,
                format!("write {} values from a buffer of {}", size, values.len()),
            );
        }
        self.record(EngineCall::WriteArrayRegion {
            front: front.to_vec(),
            back: back.to_vec(),
        });
        let image = match &mut self.image {
            Some(image) => image,
            None => return fail(status::NOT_IMAGE, "write an array region"),
        };
        with_matching!(&mut image.values, values, Cells, |stored, values| {
            let mut cursor = 0;
            for &(start, len) in &runs {
                stored[start..start + len].clone_from_slice(&values[cursor..cursor + len]);
                cursor += len;
            }
            Ok(())
        })
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.table.rows)
    }

    fn column_count(&self) -> Result<usize> {
        Ok(self.table.columns.len())
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        match self
            .table
            .columns
            .iter()
            .position(|column| column.descriptor.name == name)
        {
            Some(index) => Ok(index),
            None => fail(status::COL_NOT_FOUND, format!("find column '{}'", name)),
        }
    }

    fn read_column_info(&self, index: usize) -> Result<ColumnDescriptor> {
        Ok(self.column(index)?.descriptor.clone())
    }

    fn read_column_cells(
        &self,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        out: CellsMut<'_>,
    ) -> Result<()> {
        let column = self.column(index)?;
        if rows.end() > self.table.rows {
            return fail(
                status::BAD_ROW_NUM,
                format!(
                    "read rows {}..{} of a table with {} rows",
                    rows.first,
                    rows.end(),
                    self.table.rows
                ),
            );
        }
        Self::check_cells(column, rows, repeat_count, out.len())?;
        self.record(EngineCall::ReadColumnCells { index, rows });
        let per_row = column.values_per_row();
        let range = rows.first * per_row..rows.end() * per_row;
        with_matching!(&column.values, out, CellsMut, |stored, out| {
            out.clone_from_slice(&stored[range]);
            Ok(())
        })
    }

    fn write_column_cells(
        &mut self,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        values: Cells<'_>,
    ) -> Result<()> {
        self.check_writable("write column cells")?;
        let column = self.column(index)?;
        Self::check_cells(column, rows, repeat_count, values.len())?;
        if let Cells::Str(strings) = values {
            if let Some(long) = strings.iter().find(|s| s.len() > repeat_count) {
                return fail(
                    status::NUM_OVERFLOW,
                    format!(
                        "write a string of {} bytes into column '{}' of width {}",
                        long.len(),
                        column.descriptor.name,
                        repeat_count
                    ),
                );
            }
        }
        self.record(EngineCall::WriteColumnCells { index, rows });
        self.reserve_rows(rows.end());
        let column = &mut self.table.columns[index];
        let per_row = column.values_per_row();
        let range = rows.first * per_row..rows.end() * per_row;
        with_matching!(&mut column.values, values, Cells, |stored, values| {
            stored[range].clone_from_slice(values);
            Ok(())
        })
    }

    fn optimal_row_chunk_size(&self) -> Result<usize> {
        self.record(EngineCall::OptimalRowChunkSize);
        Ok(self.config.row_chunk_size)
    }

    fn insert_columns(&mut self, position: usize, columns: &[ColumnDescriptor]) -> Result<()> {
        self.check_writable("insert columns")?;
        if position > self.table.columns.len() {
            return fail(
                status::BAD_COL_NUM,
                format!(
                    "insert columns at {} in a table with {} columns",
                    position,
                    self.table.columns.len()
                ),
            );
        }
        let mut inserted = Vec::with_capacity(columns.len());
        for descriptor in columns {
            let (type_code, repeat_count) = match descriptor.format() {
                Ok(format) => format,
                Err(_) => {
                    return fail(
                        status::BAD_TFORM,
                        format!(
                            "insert column '{}' of format '{}'",
                            descriptor.name, descriptor.tform
                        ),
                    )
                }
            };
            let per_row = if type_code.is_string() { 1 } else { repeat_count };
            inserted.push(TableColumn {
                descriptor: descriptor.clone(),
                repeat_count,
                values: Values::filled_default(type_code, self.table.rows * per_row),
            });
        }
        self.record(EngineCall::InsertColumns {
            position,
            names: columns.iter().map(|c| c.name.clone()).collect(),
        });
        debug!(position, count = inserted.len(), "Inserted columns");
        self.table.columns.splice(position..position, inserted);
        Ok(())
    }

    fn set_compression(&mut self, algo: &Algo) -> Result<()> {
        self.record(EngineCall::SetCompression { algo: algo.clone() });
        debug!(algo = %algo, "Set compression");
        self.compression = algo.clone();
        Ok(())
    }
}
